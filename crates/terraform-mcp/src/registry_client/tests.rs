// crates/terraform-mcp/src/registry_client/tests.rs
// ============================================================================
// Module: Registry Client Unit Tests
// Description: URL building and base address validation.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use super::*;

fn client(base: &str) -> RegistryClient {
    RegistryClient::new(&RegistryConfig {
        base_url: base.to_string(),
        ..RegistryConfig::default()
    })
    .unwrap()
}

#[test]
fn builds_versioned_urls() {
    let registry = client("https://registry.terraform.io");
    let url = registry.url(&["v1", "providers", "hashicorp", "aws"], &[]).unwrap();
    assert_eq!(url.as_str(), "https://registry.terraform.io/v1/providers/hashicorp/aws");
    let search =
        registry.url(&["v1", "modules", "search"], &[("q", "vpc module".to_string())]).unwrap();
    assert_eq!(search.query(), Some("q=vpc+module"));
}

#[test]
fn keeps_base_path_prefix() {
    let registry = client("http://127.0.0.1:9000/mirror/");
    let url = registry.url(&["v2", "policies"], &[]).unwrap();
    assert_eq!(url.path(), "/mirror/v2/policies");
}

#[test]
fn rejects_non_base_urls() {
    let err = RegistryClient::new(&RegistryConfig {
        base_url: "mailto:nobody@example.com".to_string(),
        ..RegistryConfig::default()
    })
    .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidUrl(_)));
}
