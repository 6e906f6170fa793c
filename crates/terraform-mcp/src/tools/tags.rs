// crates/terraform-mcp/src/tools/tags.rs
// ============================================================================
// Module: Workspace Tag Tools
// Description: Tag binding creation and tag listing for workspaces.
// Purpose: Parse `key` / `key:value` tag lists and apply them to workspaces.
// Dependencies: serde, serde_json, crate::tfe
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use super::InputSchema;
use super::ToolError;
use super::ToolName;
use super::require_list;
use super::require_non_empty;
use super::tfe_tool;
use super::workspace_id;
use crate::catalog::CallToolResult;
use crate::catalog::ServerTool;
use crate::catalog::ToolDefinition;
use crate::lifecycle::SessionClients;
use crate::tfe::TfeClient;

// ============================================================================
// SECTION: Tag Parsing
// ============================================================================

/// Parsed tag: plain key or key/value binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tag {
    pub key: String,
    pub value: Option<String>,
}

impl Tag {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.split_once(':') {
            Some((key, value)) => {
                let key = key.trim();
                if key.is_empty() {
                    return None;
                }
                let value = value.trim();
                Some(Self {
                    key: key.to_string(),
                    value: (!value.is_empty()).then(|| value.to_string()),
                })
            }
            None => Some(Self {
                key: raw.to_string(),
                value: None,
            }),
        }
    }
}

/// Parses a comma-separated tag list; blank entries are dropped.
pub(crate) fn parse_tags(raw: &str) -> Vec<Tag> {
    raw.split(',').filter_map(Tag::parse).collect()
}

/// Encodes tags as a `tag-bindings` relationship payload.
pub(crate) fn tag_binding_payload(tags: &[Tag]) -> Value {
    let data: Vec<Value> = tags
        .iter()
        .map(|tag| {
            let mut attributes = json!({"key": tag.key});
            if let Some(value) = &tag.value {
                attributes["value"] = json!(value);
            }
            json!({"type": "tag-bindings", "attributes": attributes})
        })
        .collect();
    json!({ "data": data })
}

// ============================================================================
// SECTION: create_workspace_tags
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateTagsArgs {
    terraform_org_name: String,
    workspace_name: String,
    tags: String,
}

pub(crate) fn create_workspace_tags(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::CreateWorkspaceTags.as_str(),
        "Add tags to a workspace. Use key:value for tag bindings, plain names for key-only tags.",
    )
    .with_title("Create workspace tags")
    .with_schema(
        InputSchema::new()
            .required_string("terraform_org_name", "Terraform organization name")
            .required_string("workspace_name", "Workspace name")
            .required_string("tags", "Comma-separated tags, e.g. env:prod,team:platform,critical")
            .build(),
    )
    .mutating(false)
    .open_world();
    tfe_tool(definition, clients, run_create_tags)
}

async fn run_create_tags(
    client: TfeClient,
    args: CreateTagsArgs,
) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let workspace = require_non_empty("workspace_name", &args.workspace_name)?;
    require_list("tags", &args.tags)?;
    let tags = parse_tags(&args.tags);
    if tags.is_empty() {
        return Err(ToolError::InvalidParams(
            "tags must contain at least one valid tag".to_string(),
        ));
    }
    let id = workspace_id(&client, organization, workspace).await?;
    client
        .patch(&["api", "v2", "workspaces", &id, "tag-bindings"], &tag_binding_payload(&tags))
        .await?;
    Ok(CallToolResult::text(format!("Added {} tags to workspace {workspace}", tags.len())))
}

// ============================================================================
// SECTION: read_workspace_tags
// ============================================================================

#[derive(Debug, Deserialize)]
struct ReadTagsArgs {
    terraform_org_name: String,
    workspace_name: String,
}

pub(crate) fn read_workspace_tags(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::ReadWorkspaceTags.as_str(),
        "List a workspace's tags and tag bindings.",
    )
    .with_title("Read workspace tags")
    .with_schema(
        InputSchema::new()
            .required_string("terraform_org_name", "Terraform organization name")
            .required_string("workspace_name", "Workspace name")
            .build(),
    )
    .read_only()
    .open_world();
    tfe_tool(definition, clients, run_read_tags)
}

async fn run_read_tags(client: TfeClient, args: ReadTagsArgs) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let workspace = require_non_empty("workspace_name", &args.workspace_name)?;
    let id = workspace_id(&client, organization, workspace).await?;

    let tags = client.get(&["api", "v2", "workspaces", &id, "relationships", "tags"], &[]).await?;
    let names: Vec<&str> = data_items(&tags)
        .filter_map(|tag| tag.pointer("/attributes/name").and_then(Value::as_str))
        .collect();

    let bindings = client.get(&["api", "v2", "workspaces", &id, "tag-bindings"], &[]).await?;
    let pairs: Vec<String> = data_items(&bindings)
        .filter_map(|binding| {
            let key = binding.pointer("/attributes/key").and_then(Value::as_str)?;
            let value = binding.pointer("/attributes/value").and_then(Value::as_str).unwrap_or("");
            Some(if value.is_empty() { key.to_string() } else { format!("{key}:{value}") })
        })
        .collect();

    let mut lines =
        vec![format!("Workspace {workspace} has {} tags: {}", names.len(), names.join(", "))];
    if !pairs.is_empty() {
        lines.push(format!("Tag bindings: {}", pairs.join(", ")));
    }
    Ok(CallToolResult::text(lines.join("\n")))
}

fn data_items(body: &Value) -> impl Iterator<Item = &Value> {
    body.get("data").and_then(Value::as_array).into_iter().flatten()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
