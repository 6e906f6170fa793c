// crates/terraform-mcp/src/tools.rs
// ============================================================================
// Module: MCP Tools
// Description: Tool names, tool errors, schema helpers, and tool assembly.
// Purpose: Define the full tool surface and how each tool is constructed.
// Dependencies: async-trait, serde, serde_json, terraform-mcp-config
// ============================================================================

//! ## Overview
//! Tools fall into two groups. Public registry tools are registered at
//! startup and need no credentials. Authenticated TFE tools are described by
//! [`authenticated_tools`] and only registered, behind the per-call gate, once
//! a session proves it has valid credentials.
//!
//! Destructive operations (`action_run`, `delete_workspace_safely`) are only
//! listed when operations are enabled; `create_run` switches between its safe
//! and full variants on the same switch.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod no_code;
pub mod organizations;
pub mod private_registry;
pub mod public_registry;
pub mod runs;
pub mod tags;
pub mod variable_sets;
pub mod variables;
pub mod workspaces;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use terraform_mcp_config::Toolset;
use thiserror::Error;

use crate::catalog::CallToolResult;
use crate::catalog::ServerTool;
use crate::catalog::ToolDefinition;
use crate::catalog::ToolHandler;
use crate::context::CallContext;
use crate::dynamic::AuthenticatedTool;
use crate::elicitation::ElicitationError;
use crate::lifecycle::SessionClients;
use crate::registry_client::RegistryClient;
use crate::registry_client::RegistryError;
use crate::tfe::TfeClient;
use crate::tfe::TfeError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default page size for list tools.
const DEFAULT_PAGE_SIZE: u32 = 20;
/// Maximum page size for list tools.
const MAX_PAGE_SIZE: u32 = 100;

// ============================================================================
// SECTION: Tool Names
// ============================================================================

/// Every tool the server can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolName {
    /// Latest public provider version.
    GetLatestProviderVersion,
    /// Latest public module version.
    GetLatestModuleVersion,
    /// Public provider documentation search.
    SearchProviders,
    /// Public provider document content.
    GetProviderDetails,
    /// Public provider capability summary.
    GetProviderCapabilities,
    /// Public module search.
    SearchModules,
    /// Public module details.
    GetModuleDetails,
    /// Public policy search.
    SearchPolicies,
    /// Public policy details.
    GetPolicyDetails,
    /// Private module search.
    SearchPrivateModules,
    /// Private module details.
    GetPrivateModuleDetails,
    /// Private provider search.
    SearchPrivateProviders,
    /// Private provider details.
    GetPrivateProviderDetails,
    /// Organization listing.
    ListTerraformOrgs,
    /// Project listing.
    ListTerraformProjects,
    /// Workspace listing.
    ListWorkspaces,
    /// Workspace details.
    GetWorkspaceDetails,
    /// Workspace creation.
    CreateWorkspace,
    /// No-code module workspace creation.
    CreateNoCodeWorkspace,
    /// Workspace update.
    UpdateWorkspace,
    /// Safe workspace deletion.
    DeleteWorkspaceSafely,
    /// Run listing.
    ListRuns,
    /// Run details.
    GetRunDetails,
    /// Run creation.
    CreateRun,
    /// Run actions (apply, discard, cancel).
    ActionRun,
    /// Workspace variable listing.
    ListWorkspaceVariables,
    /// Workspace variable creation.
    CreateWorkspaceVariable,
    /// Workspace variable update.
    UpdateWorkspaceVariable,
    /// Variable set listing.
    ListVariableSets,
    /// Variable set creation.
    CreateVariableSet,
    /// Variable creation inside a variable set.
    CreateVariableInVariableSet,
    /// Variable deletion from a variable set.
    DeleteVariableInVariableSet,
    /// Variable set attachment to workspaces.
    AttachVariableSetToWorkspaces,
    /// Variable set detachment from workspaces.
    DetachVariableSetFromWorkspaces,
    /// Workspace tag creation.
    CreateWorkspaceTags,
    /// Workspace tag listing.
    ReadWorkspaceTags,
}

impl ToolName {
    /// Returns the canonical tool name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetLatestProviderVersion => "get_latest_provider_version",
            Self::GetLatestModuleVersion => "get_latest_module_version",
            Self::SearchProviders => "search_providers",
            Self::GetProviderDetails => "get_provider_details",
            Self::GetProviderCapabilities => "get_provider_capabilities",
            Self::SearchModules => "search_modules",
            Self::GetModuleDetails => "get_module_details",
            Self::SearchPolicies => "search_policies",
            Self::GetPolicyDetails => "get_policy_details",
            Self::SearchPrivateModules => "search_private_modules",
            Self::GetPrivateModuleDetails => "get_private_module_details",
            Self::SearchPrivateProviders => "search_private_providers",
            Self::GetPrivateProviderDetails => "get_private_provider_details",
            Self::ListTerraformOrgs => "list_terraform_orgs",
            Self::ListTerraformProjects => "list_terraform_projects",
            Self::ListWorkspaces => "list_workspaces",
            Self::GetWorkspaceDetails => "get_workspace_details",
            Self::CreateWorkspace => "create_workspace",
            Self::CreateNoCodeWorkspace => "create_no_code_workspace",
            Self::UpdateWorkspace => "update_workspace",
            Self::DeleteWorkspaceSafely => "delete_workspace_safely",
            Self::ListRuns => "list_runs",
            Self::GetRunDetails => "get_run_details",
            Self::CreateRun => "create_run",
            Self::ActionRun => "action_run",
            Self::ListWorkspaceVariables => "list_workspace_variables",
            Self::CreateWorkspaceVariable => "create_workspace_variable",
            Self::UpdateWorkspaceVariable => "update_workspace_variable",
            Self::ListVariableSets => "list_variable_sets",
            Self::CreateVariableSet => "create_variable_set",
            Self::CreateVariableInVariableSet => "create_variable_in_variable_set",
            Self::DeleteVariableInVariableSet => "delete_variable_in_variable_set",
            Self::AttachVariableSetToWorkspaces => "attach_variable_set_to_workspaces",
            Self::DetachVariableSetFromWorkspaces => "detach_variable_set_from_workspaces",
            Self::CreateWorkspaceTags => "create_workspace_tags",
            Self::ReadWorkspaceTags => "read_workspace_tags",
        }
    }

    /// Returns all tool names in canonical order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::GetLatestProviderVersion,
            Self::GetLatestModuleVersion,
            Self::SearchProviders,
            Self::GetProviderDetails,
            Self::GetProviderCapabilities,
            Self::SearchModules,
            Self::GetModuleDetails,
            Self::SearchPolicies,
            Self::GetPolicyDetails,
            Self::SearchPrivateModules,
            Self::GetPrivateModuleDetails,
            Self::SearchPrivateProviders,
            Self::GetPrivateProviderDetails,
            Self::ListTerraformOrgs,
            Self::ListTerraformProjects,
            Self::ListWorkspaces,
            Self::GetWorkspaceDetails,
            Self::CreateWorkspace,
            Self::CreateNoCodeWorkspace,
            Self::UpdateWorkspace,
            Self::DeleteWorkspaceSafely,
            Self::ListRuns,
            Self::GetRunDetails,
            Self::CreateRun,
            Self::ActionRun,
            Self::ListWorkspaceVariables,
            Self::CreateWorkspaceVariable,
            Self::UpdateWorkspaceVariable,
            Self::ListVariableSets,
            Self::CreateVariableSet,
            Self::CreateVariableInVariableSet,
            Self::DeleteVariableInVariableSet,
            Self::AttachVariableSetToWorkspaces,
            Self::DetachVariableSetFromWorkspaces,
            Self::CreateWorkspaceTags,
            Self::ReadWorkspaceTags,
        ]
    }

    /// Parses a tool name from its canonical string.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::all().iter().copied().find(|name| name.as_str() == value)
    }

    /// Returns the toolset the tool belongs to.
    #[must_use]
    pub const fn toolset(self) -> Toolset {
        match self {
            Self::GetLatestProviderVersion
            | Self::GetLatestModuleVersion
            | Self::SearchProviders
            | Self::GetProviderDetails
            | Self::GetProviderCapabilities
            | Self::SearchModules
            | Self::GetModuleDetails
            | Self::SearchPolicies
            | Self::GetPolicyDetails => Toolset::Registry,
            Self::SearchPrivateModules
            | Self::GetPrivateModuleDetails
            | Self::SearchPrivateProviders
            | Self::GetPrivateProviderDetails => Toolset::RegistryPrivate,
            _ => Toolset::Terraform,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Tool Assembly
// ============================================================================

/// Lists the authenticated tool factories.
///
/// `enable_operations` adds the destructive tools and selects the full
/// `create_run` variant.
#[must_use]
pub fn authenticated_tools(
    clients: &Arc<SessionClients>,
    enable_operations: bool,
) -> Vec<AuthenticatedTool> {
    macro_rules! plain {
        ($name:expr, $build:path) => {{
            let clients = Arc::clone(clients);
            AuthenticatedTool::plain($name, move || $build(Arc::clone(&clients)))
        }};
    }

    let mut tools = vec![
        plain!(ToolName::SearchPrivateModules, private_registry::search_private_modules),
        plain!(ToolName::GetPrivateModuleDetails, private_registry::get_private_module_details),
        plain!(ToolName::SearchPrivateProviders, private_registry::search_private_providers),
        plain!(ToolName::GetPrivateProviderDetails, private_registry::get_private_provider_details),
        plain!(ToolName::ListTerraformOrgs, organizations::list_terraform_orgs),
        plain!(ToolName::ListTerraformProjects, organizations::list_terraform_projects),
        plain!(ToolName::ListWorkspaces, workspaces::list_workspaces),
        plain!(ToolName::GetWorkspaceDetails, workspaces::get_workspace_details),
        plain!(ToolName::CreateWorkspace, workspaces::create_workspace),
        plain!(ToolName::UpdateWorkspace, workspaces::update_workspace),
        plain!(ToolName::ListRuns, runs::list_runs),
        plain!(ToolName::GetRunDetails, runs::get_run_details),
        plain!(ToolName::ListWorkspaceVariables, variables::list_workspace_variables),
        plain!(ToolName::CreateWorkspaceVariable, variables::create_workspace_variable),
        plain!(ToolName::UpdateWorkspaceVariable, variables::update_workspace_variable),
        plain!(ToolName::ListVariableSets, variable_sets::list_variable_sets),
        plain!(ToolName::CreateVariableSet, variable_sets::create_variable_set),
        plain!(
            ToolName::CreateVariableInVariableSet,
            variable_sets::create_variable_in_variable_set
        ),
        plain!(
            ToolName::DeleteVariableInVariableSet,
            variable_sets::delete_variable_in_variable_set
        ),
        plain!(
            ToolName::AttachVariableSetToWorkspaces,
            variable_sets::attach_variable_set_to_workspaces
        ),
        plain!(
            ToolName::DetachVariableSetFromWorkspaces,
            variable_sets::detach_variable_set_from_workspaces
        ),
        plain!(ToolName::CreateWorkspaceTags, tags::create_workspace_tags),
        plain!(ToolName::ReadWorkspaceTags, tags::read_workspace_tags),
    ];
    if enable_operations {
        tools.push(plain!(ToolName::CreateRun, runs::create_run));
        tools.push(plain!(ToolName::ActionRun, runs::action_run));
        tools.push(plain!(ToolName::DeleteWorkspaceSafely, workspaces::delete_workspace_safely));
    } else {
        tools.push(plain!(ToolName::CreateRun, runs::create_run_safe));
    }
    let no_code_clients = Arc::clone(clients);
    tools.push(AuthenticatedTool::with_elicitation(
        ToolName::CreateNoCodeWorkspace,
        move |elicitor| no_code::create_no_code_workspace(Arc::clone(&no_code_clients), elicitor),
    ));
    tools
}

/// Builds the public registry tools.
#[must_use]
pub fn public_registry_tools(client: &RegistryClient) -> Vec<ServerTool> {
    vec![
        public_registry::get_latest_provider_version(client.clone()),
        public_registry::get_latest_module_version(client.clone()),
        public_registry::search_providers(client.clone()),
        public_registry::get_provider_details(client.clone()),
        public_registry::get_provider_capabilities(client.clone()),
        public_registry::search_modules(client.clone()),
        public_registry::get_module_details(client.clone()),
        public_registry::search_policies(client.clone()),
        public_registry::get_policy_details(client.clone()),
    ]
}

// ============================================================================
// SECTION: Handler Adapters
// ============================================================================

/// Handler that decodes arguments and runs with the session's TFE client.
pub(crate) struct TfeToolHandler<A, F> {
    /// Session client source.
    clients: Arc<SessionClients>,
    /// Tool body.
    run: F,
    /// Argument type marker.
    args: PhantomData<fn() -> A>,
}

#[async_trait]
impl<A, F, Fut> ToolHandler for TfeToolHandler<A, F>
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(TfeClient, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallToolResult, ToolError>> + Send + 'static,
{
    async fn call(
        &self,
        context: &CallContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let args: A = decode(arguments)?;
        let client = self.clients.client_for_call(context)?;
        (self.run)(client, args).await
    }
}

/// Builds a TFE-backed tool.
pub(crate) fn tfe_tool<A, F, Fut>(
    definition: ToolDefinition,
    clients: Arc<SessionClients>,
    run: F,
) -> ServerTool
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(TfeClient, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallToolResult, ToolError>> + Send + 'static,
{
    ServerTool::new(
        definition,
        Arc::new(TfeToolHandler {
            clients,
            run,
            args: PhantomData,
        }),
    )
}

/// Handler that decodes arguments and runs against the public registry.
pub(crate) struct RegistryToolHandler<A, F> {
    /// Registry client.
    client: RegistryClient,
    /// Tool body.
    run: F,
    /// Argument type marker.
    args: PhantomData<fn() -> A>,
}

#[async_trait]
impl<A, F, Fut> ToolHandler for RegistryToolHandler<A, F>
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(RegistryClient, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallToolResult, ToolError>> + Send + 'static,
{
    async fn call(
        &self,
        _context: &CallContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let args: A = decode(arguments)?;
        (self.run)(self.client.clone(), args).await
    }
}

/// Builds a public registry tool.
pub(crate) fn registry_tool<A, F, Fut>(
    definition: ToolDefinition,
    client: RegistryClient,
    run: F,
) -> ServerTool
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(RegistryClient, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallToolResult, ToolError>> + Send + 'static,
{
    ServerTool::new(
        definition,
        Arc::new(RegistryToolHandler {
            client,
            run,
            args: PhantomData,
        }),
    )
}

// ============================================================================
// SECTION: Schema Helpers
// ============================================================================

/// Builder for object input schemas.
#[derive(Debug, Default)]
pub(crate) struct InputSchema {
    /// Property schemas.
    properties: Map<String, Value>,
    /// Required property names.
    required: Vec<String>,
}

impl InputSchema {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn property(mut self, name: &str, schema: Value, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    pub(crate) fn required_string(self, name: &str, description: &str) -> Self {
        self.property(name, json!({"type": "string", "description": description}), true)
    }

    pub(crate) fn string(self, name: &str, description: &str) -> Self {
        self.property(name, json!({"type": "string", "description": description}), false)
    }

    pub(crate) fn string_enum(
        self,
        name: &str,
        description: &str,
        values: &[&str],
        default: Option<&str>,
    ) -> Self {
        let mut schema = json!({"type": "string", "description": description, "enum": values});
        if let Some(default) = default {
            schema["default"] = json!(default);
        }
        self.property(name, schema, false)
    }

    pub(crate) fn required_string_enum(
        self,
        name: &str,
        description: &str,
        values: &[&str],
    ) -> Self {
        self.property(
            name,
            json!({"type": "string", "description": description, "enum": values}),
            true,
        )
    }

    pub(crate) fn boolean(self, name: &str, description: &str, default: bool) -> Self {
        self.property(
            name,
            json!({"type": "boolean", "description": description, "default": default}),
            false,
        )
    }

    pub(crate) fn integer(self, name: &str, description: &str, minimum: u32) -> Self {
        self.property(
            name,
            json!({"type": "integer", "description": description, "minimum": minimum}),
            false,
        )
    }

    pub(crate) fn object(self, name: &str, description: &str) -> Self {
        self.property(
            name,
            json!({
                "type": "object",
                "description": description,
                "additionalProperties": {"type": "string"},
            }),
            false,
        )
    }

    /// Adds `page` and `page_size`.
    pub(crate) fn pagination(self) -> Self {
        self.property(
            "page",
            json!({
                "type": "integer",
                "description": "Page number (starting at 1)",
                "minimum": 1,
                "default": 1
            }),
            false,
        )
        .property(
            "page_size",
            json!({
                "type": "integer",
                "description": "Results per page",
                "minimum": 1,
                "maximum": MAX_PAGE_SIZE,
                "default": DEFAULT_PAGE_SIZE,
            }),
            false,
        )
    }

    pub(crate) fn build(self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

// ============================================================================
// SECTION: Argument Helpers
// ============================================================================

/// Optional pagination arguments.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct Pagination {
    /// Page number, starting at 1.
    #[serde(default)]
    pub page: Option<u32>,
    /// Results per page.
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl Pagination {
    /// Validates and renders JSON:API pagination query pairs.
    pub(crate) fn query(self) -> Result<Vec<(&'static str, String)>, ToolError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(ToolError::InvalidParams("page must be at least 1".to_string()));
        }
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ToolError::InvalidParams(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(vec![("page[number]", page.to_string()), ("page[size]", page_size.to_string())])
    }
}

/// Decodes tool arguments; `null` decodes as an empty object.
pub(crate) fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, ToolError> {
    let payload = if payload.is_null() { Value::Object(Map::new()) } else { payload };
    serde_json::from_value(payload).map_err(|err| ToolError::InvalidParams(err.to_string()))
}

/// Rejects blank required strings.
pub(crate) fn require_non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str, ToolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidParams(format!("{field} cannot be empty")));
    }
    Ok(trimmed)
}

/// Splits a comma-separated argument, failing when nothing remains.
pub(crate) fn require_list(field: &str, value: &str) -> Result<Vec<String>, ToolError> {
    let items = terraform_mcp_config::split_list(value);
    if items.is_empty() {
        return Err(ToolError::InvalidParams(format!("{field} must contain at least one entry")));
    }
    Ok(items)
}

/// Resolves a workspace ID from organization and workspace name.
pub(crate) async fn workspace_id(
    client: &TfeClient,
    organization: &str,
    workspace: &str,
) -> Result<String, ToolError> {
    let response = client
        .get(&["api", "v2", "organizations", organization, "workspaces", workspace], &[])
        .await?;
    response
        .pointer("/data/id")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| ToolError::Backend("workspace response missing id".to_string()))
}

// ============================================================================
// SECTION: Result Shaping
// ============================================================================

/// Flattens a JSON:API resource into `{id, type, ...attributes}`.
///
/// Relationship IDs are kept under `relationships` keyed by name.
pub(crate) fn flatten_resource(resource: &Value) -> Value {
    let mut flat = Map::new();
    for key in ["id", "type"] {
        if let Some(value) = resource.get(key) {
            flat.insert(key.to_string(), value.clone());
        }
    }
    if let Some(Value::Object(attributes)) = resource.get("attributes") {
        for (key, value) in attributes {
            flat.insert(key.clone(), value.clone());
        }
    }
    if let Some(Value::Object(relationships)) = resource.get("relationships") {
        let mut related = Map::new();
        for (name, relationship) in relationships {
            match relationship.get("data") {
                Some(Value::Object(data)) => {
                    if let Some(id) = data.get("id") {
                        related.insert(name.clone(), id.clone());
                    }
                }
                Some(Value::Array(items)) => {
                    let ids: Vec<Value> =
                        items.iter().filter_map(|item| item.get("id").cloned()).collect();
                    related.insert(name.clone(), Value::Array(ids));
                }
                _ => {}
            }
        }
        if !related.is_empty() {
            flat.insert("relationships".to_string(), Value::Object(related));
        }
    }
    Value::Object(flat)
}

/// Renders a JSON:API collection as flattened items plus pagination.
pub(crate) fn list_result(body: &Value) -> Result<CallToolResult, ToolError> {
    let items: Vec<Value> = body
        .get("data")
        .and_then(Value::as_array)
        .map(|data| data.iter().map(flatten_resource).collect())
        .unwrap_or_default();
    let mut result = json!({ "items": items });
    if let Some(pagination) = body.pointer("/meta/pagination") {
        result["pagination"] = pagination.clone();
    }
    CallToolResult::json(&result)
}

/// Renders a single JSON:API resource.
pub(crate) fn resource_result(body: &Value) -> Result<CallToolResult, ToolError> {
    let resource = body.get("data").map(flatten_resource).unwrap_or(Value::Null);
    CallToolResult::json(&resource)
}

/// Inserts an attribute only when a value is present.
pub(crate) fn set_optional<T: serde::Serialize>(
    attributes: &mut Map<String, Value>,
    key: &str,
    value: Option<T>,
) {
    if let Some(value) = value {
        attributes.insert(key.to_string(), json!(value));
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tool call errors surfaced as JSON-RPC errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Tool name not recognized.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// Tool arguments failed validation.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// No usable TFE client for the call.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Backend resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Backend request failed.
    #[error("backend error: {0}")]
    Backend(String),
    /// Elicitation did not produce values.
    #[error("{0}")]
    Elicitation(String),
    /// Result serialization failed.
    #[error("serialization failure")]
    Serialization,
}

impl From<TfeError> for ToolError {
    fn from(error: TfeError) -> Self {
        match error {
            TfeError::Status {
                status: 404,
                message,
            } => Self::NotFound(message),
            TfeError::InvalidCredentials(message) => Self::Unauthenticated(message),
            TfeError::InvalidRequest(message) => Self::InvalidParams(message),
            other => Self::Backend(other.to_string()),
        }
    }
}

impl From<RegistryError> for ToolError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::NotFound(message) => Self::NotFound(message),
            other => Self::Backend(other.to_string()),
        }
    }
}

impl From<ElicitationError> for ToolError {
    fn from(error: ElicitationError) -> Self {
        Self::Elicitation(error.to_string())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
