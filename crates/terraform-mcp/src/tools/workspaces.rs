// crates/terraform-mcp/src/tools/workspaces.rs
// ============================================================================
// Module: Workspace Tools
// Description: Workspace listing, inspection, creation, update, and deletion.
// Purpose: Manage TFE workspaces through JSON:API requests.
// Dependencies: serde, serde_json, crate::tfe
// ============================================================================

//! ## Overview
//! Workspaces are addressed by organization and name. `delete_workspace_safely`
//! uses the safe-delete action, which the API refuses while the workspace
//! still manages resources; it is only registered when operations are
//! enabled.

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
use super::require_non_empty;
use super::resource_result;
use super::set_optional;
use super::tags::parse_tags;
use super::tags::tag_binding_payload;
use super::tfe_tool;
use crate::catalog::CallToolResult;
use crate::catalog::ServerTool;
use crate::catalog::ToolDefinition;
use crate::lifecycle::SessionClients;
use crate::tfe::TfeClient;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Accepted execution modes.
const EXECUTION_MODES: &[&str] = &["remote", "local", "agent"];

// ============================================================================
// SECTION: list_workspaces
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListWorkspacesArgs {
    terraform_org_name: String,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    search_query: Option<String>,
    #[serde(default)]
    tags: Option<String>,
    #[serde(flatten)]
    pagination: Pagination,
}

pub(crate) fn list_workspaces(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::ListWorkspaces.as_str(),
        "List workspaces in an organization, optionally filtered by project, name, or tags.",
    )
    .with_title("List workspaces")
    .with_schema(
        InputSchema::new()
            .required_string("terraform_org_name", "Terraform organization name")
            .string("project_id", "Only workspaces in this project (prj-...)")
            .string("search_query", "Substring match on workspace name")
            .string("tags", "Comma-separated tags the workspaces must carry")
            .pagination()
            .build(),
    )
    .read_only()
    .open_world();
    tfe_tool(definition, clients, run_list_workspaces)
}

async fn run_list_workspaces(
    client: TfeClient,
    args: ListWorkspacesArgs,
) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let mut query = args.pagination.query()?;
    for (key, value) in [
        ("filter[project][id]", args.project_id),
        ("search[name]", args.search_query),
        ("search[tags]", args.tags.map(|tags| terraform_mcp_config::split_list(&tags).join(","))),
    ] {
        if let Some(value) = value.filter(|value| !value.trim().is_empty()) {
            query.push((key, value.trim().to_string()));
        }
    }
    let body =
        client.get(&["api", "v2", "organizations", organization, "workspaces"], &query).await?;
    list_result(&body)
}

// ============================================================================
// SECTION: get_workspace_details
// ============================================================================

#[derive(Debug, Deserialize)]
struct WorkspaceRef {
    terraform_org_name: String,
    workspace_name: String,
}

impl WorkspaceRef {
    fn segments(&self) -> Result<[String; 2], ToolError> {
        Ok([
            require_non_empty("terraform_org_name", &self.terraform_org_name)?.to_string(),
            require_non_empty("workspace_name", &self.workspace_name)?.to_string(),
        ])
    }
}

fn workspace_ref_schema() -> InputSchema {
    InputSchema::new()
        .required_string("terraform_org_name", "Terraform organization name")
        .required_string("workspace_name", "Workspace name")
}

pub(crate) fn get_workspace_details(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::GetWorkspaceDetails.as_str(),
        "Show a workspace's settings, current run, and relationships.",
    )
    .with_title("Get workspace details")
    .with_schema(workspace_ref_schema().build())
    .read_only()
    .open_world();
    tfe_tool(definition, clients, run_get_workspace)
}

async fn run_get_workspace(
    client: TfeClient,
    args: WorkspaceRef,
) -> Result<CallToolResult, ToolError> {
    let [organization, workspace] = args.segments()?;
    let body = client
        .get(&["api", "v2", "organizations", &organization, "workspaces", &workspace], &[])
        .await?;
    resource_result(&body)
}

// ============================================================================
// SECTION: create_workspace
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateWorkspaceArgs {
    terraform_org_name: String,
    workspace_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    terraform_version: Option<String>,
    #[serde(default)]
    working_directory: Option<String>,
    #[serde(default)]
    auto_apply: Option<bool>,
    #[serde(default)]
    execution_mode: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    vcs_repo_identifier: Option<String>,
    #[serde(default)]
    vcs_repo_branch: Option<String>,
    #[serde(default)]
    vcs_repo_oauth_token_id: Option<String>,
    #[serde(default)]
    tags: Option<String>,
}

pub(crate) fn create_workspace(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::CreateWorkspace.as_str(),
        "Create a workspace, optionally in a project, linked to a VCS repository, and tagged.",
    )
    .with_title("Create workspace")
    .with_schema(
        workspace_ref_schema()
            .string("description", "Workspace description")
            .string("terraform_version", "Terraform version constraint")
            .string("working_directory", "Directory Terraform runs in")
            .boolean("auto_apply", "Apply successful plans automatically", false)
            .string_enum("execution_mode", "Execution mode", EXECUTION_MODES, Some("remote"))
            .string("project_id", "Project to create the workspace in (prj-...)")
            .string("vcs_repo_identifier", "VCS repository as org/repo")
            .string("vcs_repo_branch", "VCS branch")
            .string("vcs_repo_oauth_token_id", "OAuth token ID for the VCS connection")
            .string("tags", "Comma-separated tags; key:value creates a tag binding")
            .build(),
    )
    .mutating(false)
    .open_world();
    tfe_tool(definition, clients, run_create_workspace)
}

async fn run_create_workspace(
    client: TfeClient,
    args: CreateWorkspaceArgs,
) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let name = require_non_empty("workspace_name", &args.workspace_name)?;
    validate_execution_mode(args.execution_mode.as_deref())?;

    let mut attributes = Map::new();
    attributes.insert("name".to_string(), json!(name));
    set_optional(&mut attributes, "description", args.description);
    set_optional(&mut attributes, "terraform-version", args.terraform_version);
    set_optional(&mut attributes, "working-directory", args.working_directory);
    set_optional(&mut attributes, "auto-apply", args.auto_apply);
    set_optional(&mut attributes, "execution-mode", args.execution_mode);
    if let Some(identifier) = args.vcs_repo_identifier.filter(|value| !value.trim().is_empty()) {
        let mut vcs = Map::new();
        vcs.insert("identifier".to_string(), json!(identifier));
        set_optional(&mut vcs, "branch", args.vcs_repo_branch);
        set_optional(&mut vcs, "oauth-token-id", args.vcs_repo_oauth_token_id);
        attributes.insert("vcs-repo".to_string(), Value::Object(vcs));
    }

    let mut relationships = Map::new();
    if let Some(project) = args.project_id.filter(|value| !value.trim().is_empty()) {
        relationships
            .insert("project".to_string(), json!({"data": {"type": "projects", "id": project}}));
    }
    if let Some(tags) = args.tags {
        let tags = parse_tags(&tags);
        if !tags.is_empty() {
            relationships.insert("tag-bindings".to_string(), tag_binding_payload(&tags));
        }
    }

    let body = json!({
        "data": {
            "type": "workspaces",
            "attributes": attributes,
            "relationships": relationships,
        }
    });
    let response =
        client.post(&["api", "v2", "organizations", organization, "workspaces"], &body).await?;
    resource_result(&response)
}

// ============================================================================
// SECTION: update_workspace
// ============================================================================

#[derive(Debug, Deserialize)]
struct UpdateWorkspaceArgs {
    #[serde(flatten)]
    workspace: WorkspaceRef,
    #[serde(default)]
    new_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    terraform_version: Option<String>,
    #[serde(default)]
    working_directory: Option<String>,
    #[serde(default)]
    auto_apply: Option<bool>,
    #[serde(default)]
    execution_mode: Option<String>,
}

pub(crate) fn update_workspace(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::UpdateWorkspace.as_str(),
        "Update workspace settings; only the supplied fields change.",
    )
    .with_title("Update workspace")
    .with_schema(
        workspace_ref_schema()
            .string("new_name", "Rename the workspace")
            .string("description", "Workspace description")
            .string("terraform_version", "Terraform version constraint")
            .string("working_directory", "Directory Terraform runs in")
            .boolean("auto_apply", "Apply successful plans automatically", false)
            .string_enum("execution_mode", "Execution mode", EXECUTION_MODES, None)
            .build(),
    )
    .mutating(false)
    .open_world();
    tfe_tool(definition, clients, run_update_workspace)
}

async fn run_update_workspace(
    client: TfeClient,
    args: UpdateWorkspaceArgs,
) -> Result<CallToolResult, ToolError> {
    let [organization, workspace] = args.workspace.segments()?;
    validate_execution_mode(args.execution_mode.as_deref())?;
    let mut attributes = Map::new();
    set_optional(&mut attributes, "name", args.new_name);
    set_optional(&mut attributes, "description", args.description);
    set_optional(&mut attributes, "terraform-version", args.terraform_version);
    set_optional(&mut attributes, "working-directory", args.working_directory);
    set_optional(&mut attributes, "auto-apply", args.auto_apply);
    set_optional(&mut attributes, "execution-mode", args.execution_mode);
    if attributes.is_empty() {
        return Err(ToolError::InvalidParams("no workspace fields to update".to_string()));
    }
    let body = json!({"data": {"type": "workspaces", "attributes": attributes}});
    let response = client
        .patch(&["api", "v2", "organizations", &organization, "workspaces", &workspace], &body)
        .await?;
    resource_result(&response)
}

// ============================================================================
// SECTION: delete_workspace_safely
// ============================================================================

pub(crate) fn delete_workspace_safely(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::DeleteWorkspaceSafely.as_str(),
        "Delete a workspace only if it manages no resources.",
    )
    .with_title("Delete workspace safely")
    .with_schema(workspace_ref_schema().build())
    .mutating(true)
    .open_world();
    tfe_tool(definition, clients, run_delete_workspace)
}

async fn run_delete_workspace(
    client: TfeClient,
    args: WorkspaceRef,
) -> Result<CallToolResult, ToolError> {
    let [organization, workspace] = args.segments()?;
    client
        .post(
            &[
                "api",
                "v2",
                "organizations",
                &organization,
                "workspaces",
                &workspace,
                "actions",
                "safe-delete",
            ],
            &Value::Null,
        )
        .await?;
    Ok(CallToolResult::text(format!(
        "Safe delete requested for workspace {workspace} in organization {organization}"
    )))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn validate_execution_mode(mode: Option<&str>) -> Result<(), ToolError> {
    match mode {
        Some(mode) if !EXECUTION_MODES.contains(&mode) => Err(ToolError::InvalidParams(format!(
            "execution_mode must be one of {}",
            EXECUTION_MODES.join(", ")
        ))),
        _ => Ok(()),
    }
}
