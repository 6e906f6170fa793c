// crates/terraform-mcp/src/tools/runs.rs
// ============================================================================
// Module: Run Tools
// Description: Run listing, inspection, creation, and run actions.
// Purpose: Drive Terraform runs with a safe default and opt-in operations.
// Dependencies: serde, serde_json, crate::tfe
// ============================================================================

//! ## Overview
//! `create_run` comes in two forms. The safe form only starts speculative
//! plans and refreshes. The full form, registered when operations are
//! enabled, can also apply, destroy, and auto-apply. `action_run` (apply,
//! discard, cancel) exists only in operations mode.

use std::collections::BTreeMap;
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
use super::tfe_tool;
use super::workspace_id;
use crate::catalog::CallToolResult;
use crate::catalog::ServerTool;
use crate::catalog::ToolDefinition;
use crate::lifecycle::SessionClients;
use crate::tfe::TfeClient;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Run types accepted by the full `create_run`.
const FULL_RUN_TYPES: &[&str] = &["plan_and_apply", "plan_only", "refresh_state", "destroy"];
/// Run types accepted by the safe `create_run`.
const SAFE_RUN_TYPES: &[&str] = &["plan_only", "refresh_state"];
/// Actions accepted by `action_run`.
const RUN_ACTIONS: &[&str] = &["apply", "discard", "cancel", "force_cancel", "force_execute"];
/// Default run message.
const DEFAULT_RUN_MESSAGE: &str = "Triggered via Terraform MCP Server";

// ============================================================================
// SECTION: list_runs
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListRunsArgs {
    terraform_org_name: String,
    workspace_name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(flatten)]
    pagination: Pagination,
}

pub(crate) fn list_runs(clients: Arc<SessionClients>) -> ServerTool {
    let definition =
        ToolDefinition::new(ToolName::ListRuns.as_str(), "List runs of a workspace, newest first.")
            .with_title("List runs")
            .with_schema(
                InputSchema::new()
                    .required_string("terraform_org_name", "Terraform organization name")
                    .required_string("workspace_name", "Workspace name")
                    .string("status", "Comma-separated run statuses to include")
                    .pagination()
                    .build(),
            )
            .read_only()
            .open_world();
    tfe_tool(definition, clients, run_list_runs)
}

async fn run_list_runs(client: TfeClient, args: ListRunsArgs) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let workspace = require_non_empty("workspace_name", &args.workspace_name)?;
    let mut query = args.pagination.query()?;
    if let Some(status) = args.status {
        let statuses = terraform_mcp_config::split_list(&status);
        if !statuses.is_empty() {
            query.push(("filter[status]", statuses.join(",")));
        }
    }
    let id = workspace_id(&client, organization, workspace).await?;
    let body = client.get(&["api", "v2", "workspaces", &id, "runs"], &query).await?;
    list_result(&body)
}

// ============================================================================
// SECTION: get_run_details
// ============================================================================

#[derive(Debug, Deserialize)]
struct RunRef {
    run_id: String,
}

pub(crate) fn get_run_details(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::GetRunDetails.as_str(),
        "Show a run's status, timestamps, and related plan/apply.",
    )
    .with_title("Get run details")
    .with_schema(InputSchema::new().required_string("run_id", "Run ID (run-...)").build())
    .read_only()
    .open_world();
    tfe_tool(definition, clients, run_get_run)
}

async fn run_get_run(client: TfeClient, args: RunRef) -> Result<CallToolResult, ToolError> {
    let run_id = require_non_empty("run_id", &args.run_id)?;
    let body = client.get(&["api", "v2", "runs", run_id], &[]).await?;
    resource_result(&body)
}

// ============================================================================
// SECTION: create_run
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateRunArgs {
    terraform_org_name: String,
    workspace_name: String,
    #[serde(default)]
    run_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    auto_apply: Option<bool>,
    #[serde(default)]
    variables: Option<BTreeMap<String, String>>,
}

fn create_run_schema(run_types: &[&str], default: &str, full: bool) -> Value {
    let mut schema = InputSchema::new()
        .required_string("terraform_org_name", "Terraform organization name")
        .required_string("workspace_name", "Workspace name")
        .string_enum("run_type", "Kind of run to start", run_types, Some(default))
        .string("message", "Run message");
    if full {
        schema = schema.boolean("auto_apply", "Apply automatically when the plan succeeds", false);
    }
    schema.object("variables", "Run-scoped Terraform variable values").build()
}

pub(crate) fn create_run(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::CreateRun.as_str(),
        "Start a run: plan and apply, plan only, refresh state, or destroy.",
    )
    .with_title("Create run")
    .with_schema(create_run_schema(FULL_RUN_TYPES, "plan_and_apply", true))
    .mutating(true)
    .open_world();
    tfe_tool(definition, clients, |client: TfeClient, args: CreateRunArgs| {
        start_run(client, args, FULL_RUN_TYPES, "plan_and_apply")
    })
}

pub(crate) fn create_run_safe(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::CreateRun.as_str(),
        "Start a speculative plan or a refresh-only run. Applying requires operations mode.",
    )
    .with_title("Create run (plan only)")
    .with_schema(create_run_schema(SAFE_RUN_TYPES, "plan_only", false))
    .mutating(false)
    .open_world();
    tfe_tool(definition, clients, |client: TfeClient, args: CreateRunArgs| {
        start_run(client, CreateRunArgs { auto_apply: None, ..args }, SAFE_RUN_TYPES, "plan_only")
    })
}

async fn start_run(
    client: TfeClient,
    args: CreateRunArgs,
    allowed: &'static [&'static str],
    default: &'static str,
) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let workspace = require_non_empty("workspace_name", &args.workspace_name)?;
    let run_type = args.run_type.as_deref().unwrap_or(default);
    if !allowed.contains(&run_type) {
        return Err(ToolError::InvalidParams(format!(
            "run_type must be one of {}",
            allowed.join(", ")
        )));
    }
    let attributes = run_attributes(run_type, args.message, args.auto_apply, args.variables);
    let id = workspace_id(&client, organization, workspace).await?;
    let body = json!({
        "data": {
            "type": "runs",
            "attributes": attributes,
            "relationships": {
                "workspace": {"data": {"type": "workspaces", "id": id}},
            },
        }
    });
    let response = client.post(&["api", "v2", "runs"], &body).await?;
    resource_result(&response)
}

fn run_attributes(
    run_type: &str,
    message: Option<String>,
    auto_apply: Option<bool>,
    variables: Option<BTreeMap<String, String>>,
) -> Map<String, Value> {
    let mut attributes = Map::new();
    let message = message
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_RUN_MESSAGE.to_string());
    attributes.insert("message".to_string(), json!(message));
    match run_type {
        "plan_only" => {
            attributes.insert("plan-only".to_string(), json!(true));
        }
        "refresh_state" => {
            attributes.insert("refresh-only".to_string(), json!(true));
        }
        "destroy" => {
            attributes.insert("is-destroy".to_string(), json!(true));
        }
        _ => {}
    }
    set_optional(&mut attributes, "auto-apply", auto_apply);
    if let Some(variables) = variables.filter(|variables| !variables.is_empty()) {
        let encoded: Vec<Value> = variables
            .into_iter()
            .map(|(key, value)| json!({"key": key, "value": value}))
            .collect();
        attributes.insert("variables".to_string(), Value::Array(encoded));
    }
    attributes
}

// ============================================================================
// SECTION: action_run
// ============================================================================

#[derive(Debug, Deserialize)]
struct ActionRunArgs {
    run_id: String,
    action: String,
    #[serde(default)]
    comment: Option<String>,
}

pub(crate) fn action_run(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::ActionRun.as_str(),
        "Apply, discard, or cancel a run.",
    )
    .with_title("Run action")
    .with_schema(
        InputSchema::new()
            .required_string("run_id", "Run ID (run-...)")
            .required_string_enum("action", "Action to perform", RUN_ACTIONS)
            .string("comment", "Optional comment recorded with the action")
            .build(),
    )
    .mutating(true)
    .open_world();
    tfe_tool(definition, clients, run_action)
}

async fn run_action(client: TfeClient, args: ActionRunArgs) -> Result<CallToolResult, ToolError> {
    let run_id = require_non_empty("run_id", &args.run_id)?;
    let action = args.action.trim();
    if !RUN_ACTIONS.contains(&action) {
        return Err(ToolError::InvalidParams(format!(
            "action must be one of {}",
            RUN_ACTIONS.join(", ")
        )));
    }
    let path_action = action.replace('_', "-");
    let body = match args.comment.filter(|comment| !comment.trim().is_empty()) {
        Some(comment) if action != "force_execute" => json!({ "comment": comment }),
        _ => Value::Null,
    };
    client.post(&["api", "v2", "runs", run_id, "actions", &path_action], &body).await?;
    Ok(CallToolResult::text(format!("Run {run_id}: {action} requested")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
