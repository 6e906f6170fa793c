// crates/terraform-mcp/src/tools/private_registry.rs
// ============================================================================
// Module: Private Registry Tools
// Description: Search and inspect modules and providers in an organization registry.
// Purpose: Back the registry-private toolset with TFE registry endpoints.
// Dependencies: serde, crate::tfe
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;

use super::InputSchema;
use super::Pagination;
use super::ToolError;
use super::ToolName;
use super::list_result;
use super::require_non_empty;
use super::resource_result;
use super::tfe_tool;
use crate::catalog::CallToolResult;
use crate::catalog::ServerTool;
use crate::catalog::ToolDefinition;
use crate::lifecycle::SessionClients;
use crate::tfe::TfeClient;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Registry names accepted by detail lookups.
const REGISTRY_NAMES: &[&str] = &["private", "public"];

// ============================================================================
// SECTION: Search
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchArgs {
    terraform_org_name: String,
    #[serde(default)]
    search_query: Option<String>,
    #[serde(flatten)]
    pagination: Pagination,
}

fn search_schema(subject: &str) -> serde_json::Value {
    InputSchema::new()
        .required_string("terraform_org_name", "Terraform organization name")
        .string("search_query", &format!("Substring match on {subject} name"))
        .pagination()
        .build()
}

async fn search(
    client: &TfeClient,
    collection: &str,
    args: SearchArgs,
) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let mut query = args.pagination.query()?;
    if let Some(search) = args.search_query.filter(|value| !value.trim().is_empty()) {
        query.push(("q", search.trim().to_string()));
    }
    let body = client.get(&["api", "v2", "organizations", organization, collection], &query).await?;
    list_result(&body)
}

pub(crate) fn search_private_modules(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::SearchPrivateModules.as_str(),
        "Search the modules published in an organization's private registry.",
    )
    .with_title("Search private modules")
    .with_schema(search_schema("module"))
    .read_only()
    .open_world();
    tfe_tool(definition, clients, |client: TfeClient, args: SearchArgs| async move {
        search(&client, "registry-modules", args).await
    })
}

pub(crate) fn search_private_providers(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::SearchPrivateProviders.as_str(),
        "Search the providers published in an organization's private registry.",
    )
    .with_title("Search private providers")
    .with_schema(search_schema("provider"))
    .read_only()
    .open_world();
    tfe_tool(definition, clients, |client: TfeClient, args: SearchArgs| async move {
        search(&client, "registry-providers", args).await
    })
}

// ============================================================================
// SECTION: Details
// ============================================================================

#[derive(Debug, Deserialize)]
struct ModuleDetailsArgs {
    terraform_org_name: String,
    module_namespace: String,
    module_name: String,
    module_provider: String,
    #[serde(default)]
    registry_name: Option<String>,
}

pub(crate) fn get_private_module_details(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::GetPrivateModuleDetails.as_str(),
        "Show a private registry module's versions, status, and source.",
    )
    .with_title("Get private module details")
    .with_schema(
        InputSchema::new()
            .required_string("terraform_org_name", "Terraform organization name")
            .required_string("module_namespace", "Module namespace")
            .required_string("module_name", "Module name")
            .required_string("module_provider", "Module provider, e.g. aws")
            .string_enum(
                "registry_name",
                "Registry holding the module",
                REGISTRY_NAMES,
                Some("private"),
            )
            .build(),
    )
    .read_only()
    .open_world();
    tfe_tool(definition, clients, run_module_details)
}

async fn run_module_details(
    client: TfeClient,
    args: ModuleDetailsArgs,
) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let namespace = require_non_empty("module_namespace", &args.module_namespace)?;
    let name = require_non_empty("module_name", &args.module_name)?;
    let provider = require_non_empty("module_provider", &args.module_provider)?;
    let registry = registry_name(args.registry_name.as_deref())?;
    let body = client
        .get(
            &[
                "api",
                "v2",
                "organizations",
                organization,
                "registry-modules",
                registry,
                namespace,
                name,
                provider,
            ],
            &[],
        )
        .await?;
    resource_result(&body)
}

#[derive(Debug, Deserialize)]
struct ProviderDetailsArgs {
    terraform_org_name: String,
    provider_namespace: String,
    provider_name: String,
    #[serde(default)]
    registry_name: Option<String>,
}

pub(crate) fn get_private_provider_details(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::GetPrivateProviderDetails.as_str(),
        "Show a private registry provider and its versions.",
    )
    .with_title("Get private provider details")
    .with_schema(
        InputSchema::new()
            .required_string("terraform_org_name", "Terraform organization name")
            .required_string("provider_namespace", "Provider namespace")
            .required_string("provider_name", "Provider name")
            .string_enum(
                "registry_name",
                "Registry holding the provider",
                REGISTRY_NAMES,
                Some("private"),
            )
            .build(),
    )
    .read_only()
    .open_world();
    tfe_tool(definition, clients, run_provider_details)
}

async fn run_provider_details(
    client: TfeClient,
    args: ProviderDetailsArgs,
) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let namespace = require_non_empty("provider_namespace", &args.provider_namespace)?;
    let name = require_non_empty("provider_name", &args.provider_name)?;
    let registry = registry_name(args.registry_name.as_deref())?;
    let body = client
        .get(
            &[
                "api",
                "v2",
                "organizations",
                organization,
                "registry-providers",
                registry,
                namespace,
                name,
            ],
            &[("include", "provider-versions".to_string())],
        )
        .await?;
    resource_result(&body)
}

fn registry_name(value: Option<&str>) -> Result<&'static str, ToolError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None | Some("private") => Ok("private"),
        Some("public") => Ok("public"),
        Some(other) => Err(ToolError::InvalidParams(format!(
            "registry_name must be private or public, got {other}"
        ))),
    }
}
