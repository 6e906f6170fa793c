//! Config loading and env override tests for terraform-mcp-config.
// crates/terraform-mcp-config/tests/config_loading.rs
// =============================================================================
// Module: Config Loading Tests
// Description: Validate file loading, env overrides, and validation limits.
// Purpose: Ensure the server starts only with coherent configuration.
// =============================================================================

use std::collections::HashMap;
use std::io::Write;

use terraform_mcp_config::ConfigError;
use terraform_mcp_config::ServerTransport;
use terraform_mcp_config::SessionMode;
use terraform_mcp_config::TerraformMcpConfig;
use terraform_mcp_config::Toolset;
use terraform_mcp_config::env_flag_enabled;

type TestResult = Result<(), String>;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let map: HashMap<String, String> =
        pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
    move |key: &str| map.get(key).cloned()
}

fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn defaults_load_without_a_file() -> TestResult {
    let config = TerraformMcpConfig::load_with_env(None, &env_from(&[]))
        .map_err(|err| err.to_string())?;
    if config.server.transport != ServerTransport::Stdio {
        return Err("default transport should be stdio".to_string());
    }
    if config.server.bind_addr() != "127.0.0.1:8080" {
        return Err(format!("unexpected bind addr {}", config.server.bind_addr()));
    }
    if config.tfe.address != "https://app.terraform.io" {
        return Err("default tfe address mismatch".to_string());
    }
    if config.tfe.enable_operations {
        return Err("operations must default to disabled".to_string());
    }
    let (selection, invalid) = config.toolset_selection();
    if !invalid.is_empty() || selection.toolsets() != vec![Toolset::Registry] {
        return Err("default toolsets should be registry only".to_string());
    }
    Ok(())
}

#[test]
fn file_values_are_loaded_and_env_overrides_win() -> TestResult {
    let mut file = tempfile::NamedTempFile::new().map_err(|err| err.to_string())?;
    writeln!(
        file,
        "toolsets = [\"registry\", \"terraform\"]\n\n[server]\ntransport = \"http\"\nport = \
         9000\n\n[tfe]\naddress = \"https://tfe.example.com\"\n"
    )
    .map_err(|err| err.to_string())?;
    let env = env_from(&[
        ("TRANSPORT_PORT", "9100"),
        ("MCP_SESSION_MODE", "stateless"),
        ("ENABLE_TF_OPERATIONS", "TRUE"),
    ]);
    let config =
        TerraformMcpConfig::load_with_env(Some(file.path()), &env).map_err(|err| err.to_string())?;
    if config.server.transport != ServerTransport::Http || config.server.port != 9100 {
        return Err("transport or port not applied".to_string());
    }
    if config.server.session_mode != SessionMode::Stateless {
        return Err("session mode override not applied".to_string());
    }
    if config.tfe.address != "https://tfe.example.com" || !config.tfe.enable_operations {
        return Err("tfe settings not applied".to_string());
    }
    let (selection, _) = config.toolset_selection();
    if !selection.is_enabled(Toolset::Terraform) || selection.is_enabled(Toolset::RegistryPrivate)
    {
        return Err("toolsets not applied".to_string());
    }
    Ok(())
}

#[test]
fn config_path_can_come_from_env() -> TestResult {
    let mut file = tempfile::NamedTempFile::new().map_err(|err| err.to_string())?;
    writeln!(file, "[registry]\nbase_url = \"http://127.0.0.1:9\"").map_err(|err| err.to_string())?;
    let path = file.path().to_string_lossy().to_string();
    let env = env_from(&[("TERRAFORM_MCP_CONFIG", path.as_str())]);
    let config = TerraformMcpConfig::load_with_env(None, &env).map_err(|err| err.to_string())?;
    if config.registry.base_url != "http://127.0.0.1:9" {
        return Err("registry base url not loaded from env path".to_string());
    }
    Ok(())
}

#[test]
fn unknown_fields_are_rejected() -> TestResult {
    let mut file = tempfile::NamedTempFile::new().map_err(|err| err.to_string())?;
    writeln!(file, "[server]\nbogus = true").map_err(|err| err.to_string())?;
    assert_invalid(TerraformMcpConfig::load_with_env(Some(file.path()), &env_from(&[])), "parse")
}

#[test]
fn missing_file_is_an_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    assert_invalid(TerraformMcpConfig::load_with_env(Some(&path), &env_from(&[])), "io error")
}

#[test]
fn invalid_env_values_fail_closed() -> TestResult {
    assert_invalid(
        TerraformMcpConfig::load_with_env(None, &env_from(&[("TRANSPORT_PORT", "eighty")])),
        "TRANSPORT_PORT",
    )?;
    assert_invalid(
        TerraformMcpConfig::load_with_env(None, &env_from(&[("TRANSPORT_MODE", "carrier")])),
        "TRANSPORT_MODE",
    )?;
    assert_invalid(
        TerraformMcpConfig::load_with_env(None, &env_from(&[("MCP_ENDPOINT", "mcp")])),
        "server.endpoint",
    )?;
    assert_invalid(
        TerraformMcpConfig::load_with_env(None, &env_from(&[("TFE_ADDRESS", "ftp://tfe")])),
        "tfe.address",
    )
}

#[test]
fn unknown_or_empty_toolsets_are_rejected() -> TestResult {
    let mut config = TerraformMcpConfig {
        toolsets: vec!["nope".to_string()],
        ..Default::default()
    };
    assert_invalid(config.validate(), "unknown toolset: nope")?;
    config.toolsets = vec![" , ".to_string()];
    assert_invalid(config.validate(), "at least one toolset")
}

#[test]
fn comma_separated_toolsets_are_split() -> TestResult {
    let config = TerraformMcpConfig {
        toolsets: vec!["registry-private, terraform".to_string()],
        ..Default::default()
    };
    config.validate().map_err(|err| err.to_string())?;
    let (selection, _) = config.toolset_selection();
    if selection.toolsets() != vec![Toolset::RegistryPrivate, Toolset::Terraform] {
        return Err("comma separated toolsets not split".to_string());
    }
    Ok(())
}

#[test]
fn operations_flag_accepts_only_literal_true() -> TestResult {
    let cases = [
        (None, false),
        (Some(""), false),
        (Some("false"), false),
        (Some("invalid"), false),
        (Some("1"), false),
        (Some("true"), true),
        (Some("TRUE"), true),
        (Some("True"), true),
    ];
    for (value, expected) in cases {
        if env_flag_enabled(value) != expected {
            return Err(format!("flag {} expected {expected}", value.unwrap_or("<unset>")));
        }
    }
    Ok(())
}
