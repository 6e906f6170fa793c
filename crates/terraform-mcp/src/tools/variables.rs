// crates/terraform-mcp/src/tools/variables.rs
// ============================================================================
// Module: Workspace Variable Tools
// Description: Workspace variable listing, creation, and update.
// Purpose: Manage Terraform and environment variables on a workspace.
// Dependencies: serde, serde_json, crate::tfe
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use super::InputSchema;
use super::ToolError;
use super::ToolName;
use super::list_result;
use super::require_non_empty;
use super::resource_result;
use super::set_optional;
use super::tfe_tool;
use super::workspace_id;
use crate::catalog::CallToolResult;
use crate::catalog::ServerTool;
use crate::catalog::ToolDefinition;
use crate::lifecycle::SessionClients;
use crate::tfe::TfeClient;

// ============================================================================
// SECTION: Shared
// ============================================================================

/// Variable categories.
pub(crate) const CATEGORIES: &[&str] = &["terraform", "env"];

/// Validates an optional category, falling back to `default`.
pub(crate) fn category_or(
    category: Option<&str>,
    default: &'static str,
) -> Result<String, ToolError> {
    let category = category.map(str::trim).filter(|value| !value.is_empty()).unwrap_or(default);
    if !CATEGORIES.contains(&category) {
        return Err(ToolError::InvalidParams(format!(
            "category must be one of {}",
            CATEGORIES.join(", ")
        )));
    }
    Ok(category.to_string())
}

/// Fields shared by variable create and update payloads.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct VariableFields {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hcl: Option<bool>,
    #[serde(default)]
    pub sensitive: Option<bool>,
}

impl VariableFields {
    pub(crate) fn apply(self, attributes: &mut Map<String, Value>) {
        set_optional(attributes, "description", self.description);
        set_optional(attributes, "hcl", self.hcl);
        set_optional(attributes, "sensitive", self.sensitive);
    }
}

/// Adds the optional variable flags to a schema.
pub(crate) fn with_variable_fields(schema: InputSchema) -> InputSchema {
    schema
        .string("description", "Variable description")
        .boolean("hcl", "Parse the value as HCL", false)
        .boolean("sensitive", "Hide the value after it is written", false)
}

// ============================================================================
// SECTION: list_workspace_variables
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListVariablesArgs {
    terraform_org_name: String,
    workspace_name: String,
}

pub(crate) fn list_workspace_variables(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::ListWorkspaceVariables.as_str(),
        "List a workspace's variables. Sensitive values are not returned.",
    )
    .with_title("List workspace variables")
    .with_schema(
        InputSchema::new()
            .required_string("terraform_org_name", "Terraform organization name")
            .required_string("workspace_name", "Workspace name")
            .build(),
    )
    .read_only()
    .open_world();
    tfe_tool(definition, clients, run_list_variables)
}

async fn run_list_variables(
    client: TfeClient,
    args: ListVariablesArgs,
) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let workspace = require_non_empty("workspace_name", &args.workspace_name)?;
    let id = workspace_id(&client, organization, workspace).await?;
    let body = client.get(&["api", "v2", "workspaces", &id, "vars"], &[]).await?;
    list_result(&body)
}

// ============================================================================
// SECTION: create_workspace_variable
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateVariableArgs {
    terraform_org_name: String,
    workspace_name: String,
    key: String,
    value: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(flatten)]
    fields: VariableFields,
}

pub(crate) fn create_workspace_variable(clients: Arc<SessionClients>) -> ServerTool {
    let schema = InputSchema::new()
        .required_string("terraform_org_name", "Terraform organization name")
        .required_string("workspace_name", "Workspace name")
        .required_string("key", "Variable name")
        .required_string("value", "Variable value")
        .string_enum("category", "Variable category", CATEGORIES, Some("env"));
    let definition = ToolDefinition::new(
        ToolName::CreateWorkspaceVariable.as_str(),
        "Create a Terraform or environment variable on a workspace.",
    )
    .with_title("Create workspace variable")
    .with_schema(with_variable_fields(schema).build())
    .mutating(false)
    .open_world();
    tfe_tool(definition, clients, run_create_variable)
}

async fn run_create_variable(
    client: TfeClient,
    args: CreateVariableArgs,
) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let workspace = require_non_empty("workspace_name", &args.workspace_name)?;
    let key = require_non_empty("key", &args.key)?;
    let category = category_or(args.category.as_deref(), "env")?;
    let mut attributes = Map::new();
    attributes.insert("key".to_string(), json!(key));
    attributes.insert("value".to_string(), json!(args.value));
    attributes.insert("category".to_string(), json!(category));
    args.fields.apply(&mut attributes);
    let id = workspace_id(&client, organization, workspace).await?;
    let body = json!({"data": {"type": "vars", "attributes": attributes}});
    let response = client.post(&["api", "v2", "workspaces", &id, "vars"], &body).await?;
    resource_result(&response)
}

// ============================================================================
// SECTION: update_workspace_variable
// ============================================================================

#[derive(Debug, Deserialize)]
struct UpdateVariableArgs {
    terraform_org_name: String,
    workspace_name: String,
    variable_id: String,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(flatten)]
    fields: VariableFields,
}

pub(crate) fn update_workspace_variable(clients: Arc<SessionClients>) -> ServerTool {
    let schema = InputSchema::new()
        .required_string("terraform_org_name", "Terraform organization name")
        .required_string("workspace_name", "Workspace name")
        .required_string("variable_id", "Variable ID (var-...)")
        .string("key", "New variable name")
        .string("value", "New variable value")
        .string_enum("category", "Variable category", CATEGORIES, None);
    let definition = ToolDefinition::new(
        ToolName::UpdateWorkspaceVariable.as_str(),
        "Update a workspace variable; only the supplied fields change.",
    )
    .with_title("Update workspace variable")
    .with_schema(with_variable_fields(schema).build())
    .mutating(false)
    .open_world();
    tfe_tool(definition, clients, run_update_variable)
}

async fn run_update_variable(
    client: TfeClient,
    args: UpdateVariableArgs,
) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let workspace = require_non_empty("workspace_name", &args.workspace_name)?;
    let variable_id = require_non_empty("variable_id", &args.variable_id)?;
    let mut attributes = Map::new();
    set_optional(&mut attributes, "key", args.key);
    set_optional(&mut attributes, "value", args.value);
    if let Some(category) = args.category.as_deref() {
        attributes.insert("category".to_string(), json!(category_or(Some(category), "env")?));
    }
    args.fields.apply(&mut attributes);
    if attributes.is_empty() {
        return Err(ToolError::InvalidParams("no variable fields to update".to_string()));
    }
    let id = workspace_id(&client, organization, workspace).await?;
    let body = json!({"data": {"type": "vars", "id": variable_id, "attributes": attributes}});
    let response =
        client.patch(&["api", "v2", "workspaces", &id, "vars", variable_id], &body).await?;
    resource_result(&response)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
