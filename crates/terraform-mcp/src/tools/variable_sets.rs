// crates/terraform-mcp/src/tools/variable_sets.rs
// ============================================================================
// Module: Variable Set Tools
// Description: Variable set listing, creation, variables, and workspace attachment.
// Purpose: Manage organization-wide variable sets.
// Dependencies: serde, serde_json, crate::tfe
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use super::InputSchema;
use super::Pagination;
use super::ToolError;
use super::ToolName;
use super::list_result;
use super::require_list;
use super::require_non_empty;
use super::resource_result;
use super::set_optional;
use super::tfe_tool;
use super::variables::CATEGORIES;
use super::variables::VariableFields;
use super::variables::category_or;
use super::variables::with_variable_fields;
use crate::catalog::CallToolResult;
use crate::catalog::ServerTool;
use crate::catalog::ToolDefinition;
use crate::lifecycle::SessionClients;
use crate::tfe::TfeClient;

// ============================================================================
// SECTION: list_variable_sets
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListVariableSetsArgs {
    terraform_org_name: String,
    #[serde(default)]
    query: Option<String>,
    #[serde(flatten)]
    pagination: Pagination,
}

pub(crate) fn list_variable_sets(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::ListVariableSets.as_str(),
        "List the variable sets of an organization, optionally filtered by name.",
    )
    .with_title("List variable sets")
    .with_schema(
        InputSchema::new()
            .required_string("terraform_org_name", "Terraform organization name")
            .string("query", "Substring match on variable set name")
            .pagination()
            .build(),
    )
    .read_only()
    .open_world();
    tfe_tool(definition, clients, run_list_variable_sets)
}

async fn run_list_variable_sets(
    client: TfeClient,
    args: ListVariableSetsArgs,
) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let mut query = args.pagination.query()?;
    if let Some(search) = args.query.filter(|value| !value.trim().is_empty()) {
        query.push(("q", search.trim().to_string()));
    }
    let body =
        client.get(&["api", "v2", "organizations", organization, "varsets"], &query).await?;
    list_result(&body)
}

// ============================================================================
// SECTION: create_variable_set
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateVariableSetArgs {
    terraform_org_name: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    global: Option<bool>,
}

pub(crate) fn create_variable_set(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::CreateVariableSet.as_str(),
        "Create a variable set; global sets apply to every workspace.",
    )
    .with_title("Create variable set")
    .with_schema(
        InputSchema::new()
            .required_string("terraform_org_name", "Terraform organization name")
            .required_string("name", "Variable set name")
            .string("description", "Variable set description")
            .boolean("global", "Apply to all workspaces in the organization", false)
            .build(),
    )
    .mutating(false)
    .open_world();
    tfe_tool(definition, clients, run_create_variable_set)
}

async fn run_create_variable_set(
    client: TfeClient,
    args: CreateVariableSetArgs,
) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let name = require_non_empty("name", &args.name)?;
    let mut attributes = Map::new();
    attributes.insert("name".to_string(), json!(name));
    set_optional(&mut attributes, "description", args.description);
    attributes.insert("global".to_string(), json!(args.global.unwrap_or(false)));
    let body = json!({"data": {"type": "varsets", "attributes": attributes}});
    let response =
        client.post(&["api", "v2", "organizations", organization, "varsets"], &body).await?;
    resource_result(&response)
}

// ============================================================================
// SECTION: create_variable_in_variable_set
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateSetVariableArgs {
    variable_set_id: String,
    key: String,
    value: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(flatten)]
    fields: VariableFields,
}

pub(crate) fn create_variable_in_variable_set(clients: Arc<SessionClients>) -> ServerTool {
    let schema = InputSchema::new()
        .required_string("variable_set_id", "Variable set ID (varset-...)")
        .required_string("key", "Variable name")
        .required_string("value", "Variable value")
        .string_enum("category", "Variable category", CATEGORIES, Some("terraform"));
    let definition = ToolDefinition::new(
        ToolName::CreateVariableInVariableSet.as_str(),
        "Add a variable to a variable set.",
    )
    .with_title("Create variable in variable set")
    .with_schema(with_variable_fields(schema).build())
    .mutating(false)
    .open_world();
    tfe_tool(definition, clients, run_create_set_variable)
}

async fn run_create_set_variable(
    client: TfeClient,
    args: CreateSetVariableArgs,
) -> Result<CallToolResult, ToolError> {
    let set_id = require_non_empty("variable_set_id", &args.variable_set_id)?;
    let key = require_non_empty("key", &args.key)?;
    let category = category_or(args.category.as_deref(), "terraform")?;
    let mut attributes = Map::new();
    attributes.insert("key".to_string(), json!(key));
    attributes.insert("value".to_string(), json!(args.value));
    attributes.insert("category".to_string(), json!(category));
    args.fields.apply(&mut attributes);
    let body = json!({"data": {"type": "vars", "attributes": attributes}});
    let response =
        client.post(&["api", "v2", "varsets", set_id, "relationships", "vars"], &body).await?;
    resource_result(&response)
}

// ============================================================================
// SECTION: delete_variable_in_variable_set
// ============================================================================

#[derive(Debug, Deserialize)]
struct DeleteSetVariableArgs {
    variable_set_id: String,
    variable_id: String,
}

pub(crate) fn delete_variable_in_variable_set(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::DeleteVariableInVariableSet.as_str(),
        "Remove a variable from a variable set.",
    )
    .with_title("Delete variable in variable set")
    .with_schema(
        InputSchema::new()
            .required_string("variable_set_id", "Variable set ID (varset-...)")
            .required_string("variable_id", "Variable ID (var-...)")
            .build(),
    )
    .mutating(true)
    .open_world();
    tfe_tool(definition, clients, run_delete_set_variable)
}

async fn run_delete_set_variable(
    client: TfeClient,
    args: DeleteSetVariableArgs,
) -> Result<CallToolResult, ToolError> {
    let set_id = require_non_empty("variable_set_id", &args.variable_set_id)?;
    let variable_id = require_non_empty("variable_id", &args.variable_id)?;
    client
        .delete(&["api", "v2", "varsets", set_id, "relationships", "vars", variable_id], None)
        .await?;
    Ok(CallToolResult::text(format!("Deleted variable {variable_id} from variable set {set_id}")))
}

// ============================================================================
// SECTION: Workspace Attachment
// ============================================================================

#[derive(Debug, Deserialize)]
struct AttachmentArgs {
    variable_set_id: String,
    workspace_ids: String,
}

fn attachment_schema() -> Value {
    InputSchema::new()
        .required_string("variable_set_id", "Variable set ID (varset-...)")
        .required_string("workspace_ids", "Comma-separated workspace IDs (ws-...)")
        .build()
}

fn workspace_refs(ids: &[String]) -> Value {
    let data: Vec<Value> =
        ids.iter().map(|id| json!({"type": "workspaces", "id": id})).collect();
    json!({ "data": data })
}

pub(crate) fn attach_variable_set_to_workspaces(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::AttachVariableSetToWorkspaces.as_str(),
        "Apply a variable set to one or more workspaces.",
    )
    .with_title("Attach variable set to workspaces")
    .with_schema(attachment_schema())
    .mutating(false)
    .open_world();
    tfe_tool(definition, clients, run_attach)
}

async fn run_attach(client: TfeClient, args: AttachmentArgs) -> Result<CallToolResult, ToolError> {
    let set_id = require_non_empty("variable_set_id", &args.variable_set_id)?;
    let ids = require_list("workspace_ids", &args.workspace_ids)?;
    let path = ["api", "v2", "varsets", set_id, "relationships", "workspaces"];
    client.post(&path, &workspace_refs(&ids)).await?;
    Ok(CallToolResult::text(format!(
        "Successfully attached variable set {set_id} to {} workspaces",
        ids.len()
    )))
}

pub(crate) fn detach_variable_set_from_workspaces(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::DetachVariableSetFromWorkspaces.as_str(),
        "Remove a variable set from one or more workspaces.",
    )
    .with_title("Detach variable set from workspaces")
    .with_schema(attachment_schema())
    .mutating(true)
    .open_world();
    tfe_tool(definition, clients, run_detach)
}

async fn run_detach(client: TfeClient, args: AttachmentArgs) -> Result<CallToolResult, ToolError> {
    let set_id = require_non_empty("variable_set_id", &args.variable_set_id)?;
    let ids = require_list("workspace_ids", &args.workspace_ids)?;
    client
        .delete(
            &["api", "v2", "varsets", set_id, "relationships", "workspaces"],
            Some(&workspace_refs(&ids)),
        )
        .await?;
    Ok(CallToolResult::text(format!(
        "Successfully detached variable set {set_id} from {} workspaces",
        ids.len()
    )))
}
