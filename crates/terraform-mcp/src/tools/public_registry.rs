// crates/terraform-mcp/src/tools/public_registry.rs
// ============================================================================
// Module: Public Registry Tools
// Description: Provider, module, and policy lookups against the public registry.
// Purpose: Credential-free tools registered at startup.
// Dependencies: serde, serde_json, crate::registry_client
// ============================================================================

//! ## Overview
//! These tools return registry payloads (or a single extracted version) as
//! JSON text. They need no TFE session and bypass the per-call gate.
//!
//! Provider documentation lookups resolve a concrete version first. Inputs
//! that are not `x.y.z[-tag]` resolve to the latest release, falling back to
//! the `hashicorp` namespace when the requested one has no such provider.
//! Doc entries are filtered or grouped but passed through unchanged.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tracing::debug;

use super::InputSchema;
use super::ToolError;
use super::ToolName;
use super::registry_tool;
use super::require_non_empty;
use crate::catalog::CallToolResult;
use crate::catalog::ServerTool;
use crate::catalog::ToolDefinition;
use crate::registry_client::RegistryClient;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of policies fetched for search.
const POLICY_SEARCH_PAGE_SIZE: &str = "100";

/// Namespace tried when a provider is missing from the requested one.
const FALLBACK_NAMESPACE: &str = "hashicorp";

/// Documentation categories a provider search accepts.
const PROVIDER_DATA_TYPES: &[&str] =
    &["resources", "data-sources", "functions", "guides", "overview"];

/// Upper bound on documentation pages read from the v2 listing.
const MAX_DOC_PAGES: u32 = 20;

/// Examples shown per capability when the category is large.
const CAPABILITY_EXAMPLES: usize = 3;

/// Categories at or below this size are listed in full.
const CAPABILITY_FULL_LISTING: usize = 10;

// ============================================================================
// SECTION: Latest Versions
// ============================================================================

#[derive(Debug, Deserialize)]
struct ProviderVersionArgs {
    namespace: String,
    name: String,
}

pub(crate) fn get_latest_provider_version(client: RegistryClient) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::GetLatestProviderVersion.as_str(),
        "Return the latest published version of a public Terraform provider.",
    )
    .with_title("Get latest provider version")
    .with_schema(
        InputSchema::new()
            .required_string("namespace", "Provider namespace, e.g. hashicorp")
            .required_string("name", "Provider name, e.g. aws")
            .build(),
    )
    .read_only()
    .open_world();
    registry_tool(definition, client, run_provider_version)
}

async fn run_provider_version(
    client: RegistryClient,
    args: ProviderVersionArgs,
) -> Result<CallToolResult, ToolError> {
    let namespace = require_non_empty("namespace", &args.namespace)?;
    let name = require_non_empty("name", &args.name)?;
    let body = client.get_json(&["v1", "providers", namespace, name], &[]).await?;
    version_result(&body)
}

#[derive(Debug, Deserialize)]
struct ModuleVersionArgs {
    module_publisher: String,
    module_name: String,
    module_provider: String,
}

pub(crate) fn get_latest_module_version(client: RegistryClient) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::GetLatestModuleVersion.as_str(),
        "Return the latest published version of a public Terraform module.",
    )
    .with_title("Get latest module version")
    .with_schema(
        InputSchema::new()
            .required_string("module_publisher", "Module publisher, e.g. terraform-aws-modules")
            .required_string("module_name", "Module name, e.g. vpc")
            .required_string("module_provider", "Module provider, e.g. aws")
            .build(),
    )
    .read_only()
    .open_world();
    registry_tool(definition, client, run_module_version)
}

async fn run_module_version(
    client: RegistryClient,
    args: ModuleVersionArgs,
) -> Result<CallToolResult, ToolError> {
    let publisher = require_non_empty("module_publisher", &args.module_publisher)?;
    let name = require_non_empty("module_name", &args.module_name)?;
    let provider = require_non_empty("module_provider", &args.module_provider)?;
    let body = client.get_json(&["v1", "modules", publisher, name, provider], &[]).await?;
    version_result(&body)
}

fn version_result(body: &Value) -> Result<CallToolResult, ToolError> {
    body.get("version")
        .and_then(Value::as_str)
        .map(CallToolResult::text)
        .ok_or_else(|| ToolError::Backend("registry response missing version".to_string()))
}

// ============================================================================
// SECTION: Providers
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchProvidersArgs {
    provider_name: String,
    #[serde(default)]
    provider_namespace: Option<String>,
    service_slug: String,
    #[serde(default)]
    provider_data_type: Option<String>,
    #[serde(default)]
    provider_version: Option<String>,
}

pub(crate) fn search_providers(client: RegistryClient) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::SearchProviders.as_str(),
        "List provider documentation matching a service slug. Call this before \
         get_provider_details to obtain a provider_doc_id; prefer a single-word service_slug \
         and use the provider name when unsure.",
    )
    .with_title("Search provider documentation")
    .with_schema(
        InputSchema::new()
            .required_string("provider_name", "Provider name, e.g. aws")
            .string("provider_namespace", "Provider publisher, defaults to hashicorp")
            .required_string("service_slug", "Service to look up, e.g. s3_bucket")
            .string_enum(
                "provider_data_type",
                "Documentation category",
                PROVIDER_DATA_TYPES,
                Some("resources"),
            )
            .string("provider_version", "Version as x.y.z, or latest")
            .build(),
    )
    .read_only()
    .open_world();
    registry_tool(definition, client, run_search_providers)
}

/// Provider coordinates after version resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedProvider {
    namespace: String,
    name: String,
    version: String,
}

impl ResolvedProvider {
    fn to_json(&self) -> Value {
        json!({"namespace": self.namespace, "name": self.name, "version": self.version})
    }
}

async fn run_search_providers(
    client: RegistryClient,
    args: SearchProvidersArgs,
) -> Result<CallToolResult, ToolError> {
    let name = require_non_empty("provider_name", &args.provider_name)?;
    let slug = require_non_empty("service_slug", &args.service_slug)?;
    let namespace = args
        .provider_namespace
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(FALLBACK_NAMESPACE);
    let data_type = args.provider_data_type.as_deref().unwrap_or("resources");
    if !PROVIDER_DATA_TYPES.contains(&data_type) {
        return Err(ToolError::InvalidParams(format!(
            "provider_data_type must be one of {}",
            PROVIDER_DATA_TYPES.join(", ")
        )));
    }
    let requested = args.provider_version.as_deref().unwrap_or("latest");
    let provider = resolve_provider(&client, namespace, name, requested).await?;

    let docs: Vec<Value> = if matches!(data_type, "resources" | "data-sources") {
        let body = provider_version_docs(&client, &provider).await?;
        hcl_docs(&body)
            .into_iter()
            .filter(|doc| {
                doc_field(doc, "category") == data_type && slug_matches(doc, &provider.name, slug)
            })
            .cloned()
            .collect()
    } else {
        let version_id = provider_version_id(&client, &provider).await?;
        category_docs(&client, &version_id, data_type).await?
    };
    if docs.is_empty() {
        return Err(ToolError::NotFound(format!(
            "no {data_type} documentation found for service_slug {slug} in provider {}/{}; \
             try a more relevant slug or the provider name",
            provider.namespace, provider.name
        )));
    }
    CallToolResult::json(&json!({
        "provider": provider.to_json(),
        "provider_data_type": data_type,
        "docs": docs,
    }))
}

/// Returns true for `x.y.z` versions with an optional `v` prefix and tag.
fn is_provider_version(value: &str) -> bool {
    let value = value.strip_prefix('v').unwrap_or(value);
    let (core, tag) = match value.split_once('-') {
        Some((core, tag)) => (core, Some(tag)),
        None => (value, None),
    };
    if let Some(tag) = tag {
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return false;
        }
    }
    let parts: Vec<&str> = core.split('.').collect();
    parts.len() == 3
        && parts.iter().all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

async fn latest_provider_version(
    client: &RegistryClient,
    namespace: &str,
    name: &str,
) -> Result<String, ToolError> {
    let body = client.get_json(&["v1", "providers", namespace, name], &[]).await?;
    body.get("version")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ToolError::Backend("registry response missing version".to_string()))
}

/// Pins `requested` to a concrete version, trying the fallback namespace.
async fn resolve_provider(
    client: &RegistryClient,
    namespace: &str,
    name: &str,
    requested: &str,
) -> Result<ResolvedProvider, ToolError> {
    let resolved = |namespace: &str, version: &str| ResolvedProvider {
        namespace: namespace.to_string(),
        name: name.to_string(),
        version: version.trim_start_matches('v').to_string(),
    };
    if is_provider_version(requested) {
        return Ok(resolved(namespace, requested));
    }
    match latest_provider_version(client, namespace, name).await {
        Ok(version) => Ok(resolved(namespace, &version)),
        Err(err) if namespace == FALLBACK_NAMESPACE => Err(err),
        Err(err) => {
            debug!(namespace, name, error = %err, "provider lookup failed, trying fallback");
            let version = latest_provider_version(client, FALLBACK_NAMESPACE, name)
                .await
                .map_err(|_| {
                    ToolError::NotFound(format!(
                        "provider {name} not found in the {namespace} or {FALLBACK_NAMESPACE} \
                         namespace"
                    ))
                })?;
            Ok(resolved(FALLBACK_NAMESPACE, &version))
        }
    }
}

/// Reads the v1 payload for a provider version, which carries its doc index.
async fn provider_version_docs(
    client: &RegistryClient,
    provider: &ResolvedProvider,
) -> Result<Value, ToolError> {
    Ok(client
        .get_json(&["v1", "providers", &provider.namespace, &provider.name, &provider.version], &[])
        .await?)
}

/// Doc index entries written in HCL.
fn hcl_docs(body: &Value) -> Vec<&Value> {
    body.get("docs")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|doc| doc.get("language").and_then(Value::as_str) == Some("hcl"))
        .collect()
}

fn doc_field<'a>(doc: &'a Value, key: &str) -> &'a str {
    doc.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn slug_matches(doc: &Value, provider_name: &str, slug: &str) -> bool {
    let doc_slug = doc_field(doc, "slug");
    doc_slug.contains(slug) || format!("{provider_name}_{doc_slug}").contains(slug)
}

/// Finds the registry's internal id for a provider version.
async fn provider_version_id(
    client: &RegistryClient,
    provider: &ResolvedProvider,
) -> Result<String, ToolError> {
    let body = client
        .get_json(
            &["v2", "providers", &provider.namespace, &provider.name],
            &[("include", "provider-versions".to_string())],
        )
        .await?;
    body.get("included")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|item| {
            item.pointer("/attributes/version").and_then(Value::as_str)
                == Some(provider.version.as_str())
        })
        .and_then(|item| item.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ToolError::NotFound(format!(
                "version {} of provider {}/{} not found",
                provider.version, provider.namespace, provider.name
            ))
        })
}

/// Reads every page of HCL docs in `category` for a provider version.
async fn category_docs(
    client: &RegistryClient,
    version_id: &str,
    category: &str,
) -> Result<Vec<Value>, ToolError> {
    let mut docs = Vec::new();
    for page in 1..=MAX_DOC_PAGES {
        let body = client
            .get_json(
                &["v2", "provider-docs"],
                &[
                    ("filter[provider-version]", version_id.to_string()),
                    ("filter[category]", category.to_string()),
                    ("filter[language]", "hcl".to_string()),
                    ("page[number]", page.to_string()),
                ],
            )
            .await?;
        match body.get("data").and_then(Value::as_array) {
            Some(data) if !data.is_empty() => docs.extend(data.iter().cloned()),
            _ => break,
        }
    }
    Ok(docs)
}

#[derive(Debug, Deserialize)]
struct ProviderDetailsArgs {
    provider_doc_id: String,
}

pub(crate) fn get_provider_details(client: RegistryClient) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::GetProviderDetails.as_str(),
        "Return one provider document, including its markdown content. Obtain provider_doc_id \
         from search_providers first.",
    )
    .with_title("Get provider documentation")
    .with_schema(
        InputSchema::new()
            .required_string("provider_doc_id", "Numeric document id, e.g. 8894603")
            .build(),
    )
    .read_only()
    .open_world();
    registry_tool(definition, client, run_provider_details)
}

async fn run_provider_details(
    client: RegistryClient,
    args: ProviderDetailsArgs,
) -> Result<CallToolResult, ToolError> {
    let doc_id = require_non_empty("provider_doc_id", &args.provider_doc_id)?;
    if doc_id.parse::<u64>().is_err() {
        return Err(ToolError::InvalidParams("provider_doc_id must be a valid number".to_string()));
    }
    let body = client.get_json(&["v2", "provider-docs", doc_id], &[]).await?;
    CallToolResult::json(&body)
}

#[derive(Debug, Deserialize)]
struct ProviderCapabilitiesArgs {
    namespace: String,
    name: String,
    #[serde(default)]
    version: Option<String>,
}

pub(crate) fn get_provider_capabilities(client: RegistryClient) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::GetProviderCapabilities.as_str(),
        "Group a provider's documentation by category (resources, data sources, functions, \
         guides, and so on) with a count and example entries per category.",
    )
    .with_title("Get provider capabilities")
    .with_schema(
        InputSchema::new()
            .required_string("namespace", "Provider namespace, e.g. hashicorp")
            .required_string("name", "Provider name, e.g. aws")
            .string("version", "Version as x.y.z, defaults to latest")
            .build(),
    )
    .read_only()
    .open_world();
    registry_tool(definition, client, run_provider_capabilities)
}

async fn run_provider_capabilities(
    client: RegistryClient,
    args: ProviderCapabilitiesArgs,
) -> Result<CallToolResult, ToolError> {
    let namespace = require_non_empty("namespace", &args.namespace)?.to_lowercase();
    let name = require_non_empty("name", &args.name)?.to_lowercase();
    let version = match args.version.as_deref().map(str::trim) {
        Some(version) if is_provider_version(version) => {
            version.trim_start_matches('v').to_string()
        }
        _ => latest_provider_version(&client, &namespace, &name).await?,
    };
    let provider = ResolvedProvider {
        namespace,
        name,
        version,
    };
    let body = provider_version_docs(&client, &provider).await?;
    CallToolResult::json(&json!({
        "provider": provider.to_json(),
        "capabilities": capabilities(&hcl_docs(&body)),
    }))
}

/// Groups docs by lowercased category; large groups keep a few examples.
fn capabilities(docs: &[&Value]) -> Value {
    let mut groups: BTreeMap<String, Vec<&Value>> = BTreeMap::new();
    for &doc in docs {
        groups.entry(doc_field(doc, "category").to_lowercase()).or_default().push(doc);
    }
    let mut out = Map::new();
    for (category, items) in groups {
        let shown =
            if items.len() <= CAPABILITY_FULL_LISTING { items.len() } else { CAPABILITY_EXAMPLES };
        let examples: Vec<&Value> = items.iter().take(shown).copied().collect();
        out.insert(
            category,
            json!({"count": items.len(), "examples": examples, "more": items.len() - shown}),
        );
    }
    Value::Object(out)
}

// ============================================================================
// SECTION: Modules
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchModulesArgs {
    module_query: String,
    #[serde(default)]
    current_offset: Option<u32>,
}

pub(crate) fn search_modules(client: RegistryClient) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::SearchModules.as_str(),
        "Search public registry modules. Use get_module_details with a returned id for inputs \
         and outputs.",
    )
    .with_title("Search modules")
    .with_schema(
        InputSchema::new()
            .required_string("module_query", "Search terms, e.g. vpc")
            .integer("current_offset", "Result offset for pagination", 0)
            .build(),
    )
    .read_only()
    .open_world();
    registry_tool(definition, client, run_search_modules)
}

async fn run_search_modules(
    client: RegistryClient,
    args: SearchModulesArgs,
) -> Result<CallToolResult, ToolError> {
    let query = require_non_empty("module_query", &args.module_query)?;
    let offset = args.current_offset.unwrap_or(0);
    let body = client
        .get_json(
            &["v1", "modules", "search"],
            &[("q", query.to_string()), ("offset", offset.to_string())],
        )
        .await?;
    let modules: Vec<Value> = body
        .get("modules")
        .and_then(Value::as_array)
        .map(|modules| {
            modules
                .iter()
                .map(|module| {
                    json!({
                        "id": module.get("id"),
                        "namespace": module.get("namespace"),
                        "name": module.get("name"),
                        "provider": module.get("provider"),
                        "description": module.get("description"),
                        "downloads": module.get("downloads"),
                        "verified": module.get("verified"),
                        "published_at": module.get("published_at"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    if modules.is_empty() {
        return Err(ToolError::NotFound(format!("no modules found matching {query}")));
    }
    CallToolResult::json(&json!({ "modules": modules, "meta": body.get("meta") }))
}

#[derive(Debug, Deserialize)]
struct ModuleDetailsArgs {
    module_id: String,
}

pub(crate) fn get_module_details(client: RegistryClient) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::GetModuleDetails.as_str(),
        "Return a public module's inputs, outputs, dependencies, and examples by module id \
         (namespace/name/provider/version).",
    )
    .with_title("Get module details")
    .with_schema(
        InputSchema::new()
            .required_string("module_id", "Module id from search_modules")
            .build(),
    )
    .read_only()
    .open_world();
    registry_tool(definition, client, run_module_details)
}

async fn run_module_details(
    client: RegistryClient,
    args: ModuleDetailsArgs,
) -> Result<CallToolResult, ToolError> {
    let module_id = require_non_empty("module_id", &args.module_id)?;
    let parts: Vec<&str> = module_id.trim_matches('/').split('/').collect();
    if !(3..=4).contains(&parts.len()) || parts.iter().any(|part| part.is_empty()) {
        return Err(ToolError::InvalidParams(
            "module_id must look like namespace/name/provider[/version]".to_string(),
        ));
    }
    let mut segments = vec!["v1", "modules"];
    segments.extend(parts);
    let body = client.get_json(&segments, &[]).await?;
    CallToolResult::json(&body)
}

// ============================================================================
// SECTION: Policies
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchPoliciesArgs {
    policy_query: String,
}

pub(crate) fn search_policies(client: RegistryClient) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::SearchPolicies.as_str(),
        "Search public Sentinel policy libraries by name or title. Use get_policy_details with a \
         returned terraform_policy_id for details.",
    )
    .with_title("Search policies")
    .with_schema(
        InputSchema::new()
            .required_string("policy_query", "Search terms, e.g. cis aws")
            .build(),
    )
    .read_only()
    .open_world();
    registry_tool(definition, client, run_search_policies)
}

/// Policy summary extracted from the policy listing.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PolicySummary {
    terraform_policy_id: String,
    name: String,
    title: String,
    downloads: u64,
}

async fn run_search_policies(
    client: RegistryClient,
    args: SearchPoliciesArgs,
) -> Result<CallToolResult, ToolError> {
    let query = require_non_empty("policy_query", &args.policy_query)?;
    let body = client
        .get_json(
            &["v2", "policies"],
            &[
                ("page[size]", POLICY_SEARCH_PAGE_SIZE.to_string()),
                ("include", "latest-version".to_string()),
            ],
        )
        .await?;
    let matches = matching_policies(&body, query);
    if matches.is_empty() {
        return Err(ToolError::NotFound(format!(
            "No policies found matching the query: {query}. Try a different policy_query."
        )));
    }
    let mut lines = vec![format!("Matching policies for \"{query}\":"), String::new()];
    for policy in matches {
        lines.push(format!("- terraform_policy_id: {}", policy.terraform_policy_id));
        lines.push(format!("  Name: {}", policy.name));
        lines.push(format!("  Title: {}", policy.title));
        lines.push(format!("  Downloads: {}", policy.downloads));
    }
    Ok(CallToolResult::text(lines.join("\n")))
}

fn matching_policies(body: &Value, query: &str) -> Vec<PolicySummary> {
    let needle = query.to_lowercase();
    let Some(policies) = body.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };
    policies
        .iter()
        .filter_map(|policy| {
            let attributes = policy.get("attributes")?;
            let name = attributes.get("name").and_then(Value::as_str).unwrap_or_default();
            let title = attributes.get("title").and_then(Value::as_str).unwrap_or_default();
            if !name.to_lowercase().contains(&needle) && !title.to_lowercase().contains(&needle) {
                return None;
            }
            let link = policy
                .pointer("/relationships/latest-version/links/related")
                .and_then(Value::as_str)?;
            Some(PolicySummary {
                terraform_policy_id: link
                    .trim_start_matches('/')
                    .trim_start_matches("v2/")
                    .to_string(),
                name: name.to_string(),
                title: title.to_string(),
                downloads: attributes.get("downloads").and_then(Value::as_u64).unwrap_or(0),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct PolicyDetailsArgs {
    terraform_policy_id: String,
}

pub(crate) fn get_policy_details(client: RegistryClient) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::GetPolicyDetails.as_str(),
        "Return a policy library version with its policies and modules.",
    )
    .with_title("Get policy details")
    .with_schema(
        InputSchema::new()
            .required_string(
                "terraform_policy_id",
                "Policy id from search_policies, e.g. policies/hashicorp/name/1.0.0",
            )
            .build(),
    )
    .read_only()
    .open_world();
    registry_tool(definition, client, run_policy_details)
}

async fn run_policy_details(
    client: RegistryClient,
    args: PolicyDetailsArgs,
) -> Result<CallToolResult, ToolError> {
    let policy_id = require_non_empty("terraform_policy_id", &args.terraform_policy_id)?;
    let mut segments = vec!["v2"];
    segments.extend(policy_id.trim_matches('/').split('/').filter(|part| !part.is_empty()));
    let body = client
        .get_json(
            &segments,
            &[("include", "policies,policy-modules,policy-library".to_string())],
        )
        .await?;
    CallToolResult::json(&body)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
