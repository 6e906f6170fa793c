// crates/terraform-mcp/src/tools/no_code.rs
// ============================================================================
// Module: No-Code Workspace Tool
// Description: Workspace creation from a no-code module with elicited variables.
// Purpose: Ask the caller for module inputs mid-call, then provision a workspace.
// Dependencies: serde, serde_json, crate::elicitation, crate::tfe
// ============================================================================

//! ## Overview
//! `create_no_code_workspace` resolves the project's organization, the
//! no-code module (with its variable options), the backing registry module,
//! and that module's input metadata. The inputs become an elicitation schema;
//! the caller's answer is converted into Terraform variable strings and sent
//! with the workspace creation request.
//!
//! Modules without inputs skip elicitation entirely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Number;
use serde_json::Value;
use serde_json::json;
use tracing::info;

use super::InputSchema;
use super::ToolError;
use super::ToolName;
use super::decode;
use super::require_non_empty;
use super::resource_result;
use crate::catalog::CallToolResult;
use crate::catalog::ServerTool;
use crate::catalog::ToolDefinition;
use crate::catalog::ToolHandler;
use crate::context::CallContext;
use crate::elicitation::ElicitationRequest;
use crate::elicitation::ElicitationResponse;
use crate::elicitation::Elicitor;
use crate::lifecycle::SessionClients;
use crate::tfe::TfeClient;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Required prefix of no-code module identifiers.
const NO_CODE_ID_PREFIX: &str = "nocode-";

// ============================================================================
// SECTION: Tool
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateNoCodeWorkspaceArgs {
    no_code_module_id: String,
    workspace_name: String,
    project_id: String,
    #[serde(default)]
    auto_apply: Option<bool>,
}

pub(crate) fn create_no_code_workspace(
    clients: Arc<SessionClients>,
    elicitor: Arc<dyn Elicitor>,
) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::CreateNoCodeWorkspace.as_str(),
        "Create a workspace from a no-code module. The module's input variables are requested \
         from the user before the workspace is created.",
    )
    .with_title("Create no-code workspace")
    .with_schema(
        InputSchema::new()
            .required_string("no_code_module_id", "No-code module ID (nocode-...)")
            .required_string("workspace_name", "Name of the workspace to create")
            .required_string("project_id", "Project to create the workspace in (prj-...)")
            .boolean("auto_apply", "Apply successful plans automatically", false)
            .build(),
    )
    .mutating(false)
    .open_world();
    ServerTool::new(
        definition,
        Arc::new(NoCodeWorkspaceHandler {
            clients,
            elicitor,
        }),
    )
}

/// Handler for `create_no_code_workspace`.
struct NoCodeWorkspaceHandler {
    /// Session client source.
    clients: Arc<SessionClients>,
    /// Caller input capability.
    elicitor: Arc<dyn Elicitor>,
}

#[async_trait]
impl ToolHandler for NoCodeWorkspaceHandler {
    async fn call(
        &self,
        context: &CallContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let args: CreateNoCodeWorkspaceArgs = decode(arguments)?;
        let module_id = require_non_empty("no_code_module_id", &args.no_code_module_id)?;
        if !module_id.starts_with(NO_CODE_ID_PREFIX) {
            return Err(ToolError::InvalidParams(format!(
                "no_code_module_id must start with '{NO_CODE_ID_PREFIX}'"
            )));
        }
        let workspace_name = require_non_empty("workspace_name", &args.workspace_name)?;
        let project_id = require_non_empty("project_id", &args.project_id)?;
        let client = self.clients.client_for_call(context)?;

        let organization = project_organization(&client, project_id).await?;
        let module = NoCodeModule::fetch(&client, module_id).await?;
        let inputs = module_inputs(&client, &organization, &module).await?;

        let variables = if inputs.is_empty() {
            Vec::new()
        } else {
            let request = ElicitationRequest {
                message: format!(
                    "The No Code module '{}' requires {} variable(s) to create the workspace. \
                     Please provide values for the required variables.",
                    module.display_name(),
                    inputs.len()
                ),
                requested_schema: elicitation_schema(&inputs, &module.options),
            };
            match self.elicitor.elicit(context, request).await? {
                ElicitationResponse::Accept(content) => convert_values(&inputs, &content)?,
                ElicitationResponse::Decline => {
                    return Err(ToolError::Elicitation(
                        "No Code module workspace creation declined by user".to_string(),
                    ));
                }
                ElicitationResponse::Cancel => {
                    return Err(ToolError::Elicitation(
                        "No Code module workspace creation cancelled by user".to_string(),
                    ));
                }
            }
        };

        let vars: Vec<Value> = variables
            .iter()
            .map(|(key, value)| {
                json!({
                    "type": "vars",
                    "attributes": {"key": key, "value": value, "category": "terraform"},
                })
            })
            .collect();
        let body = json!({
            "data": {
                "type": "workspaces",
                "attributes": {
                    "name": workspace_name,
                    "auto-apply": args.auto_apply.unwrap_or(false),
                },
                "relationships": {
                    "project": {"data": {"type": "projects", "id": project_id}},
                    "vars": {"data": vars},
                },
            }
        });
        let response =
            client.post(&["api", "v2", "no-code-modules", module_id, "workspaces"], &body).await?;
        info!(
            module_id,
            workspace = workspace_name,
            variables = variables.len(),
            "created no-code workspace"
        );
        resource_result(&response)
    }
}

// ============================================================================
// SECTION: Lookups
// ============================================================================

async fn project_organization(client: &TfeClient, project_id: &str) -> Result<String, ToolError> {
    let project = client.get(&["api", "v2", "projects", project_id], &[]).await?;
    project
        .pointer("/data/relationships/organization/data/id")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| ToolError::Backend("project response missing organization".to_string()))
}

/// No-code module fields needed to resolve inputs.
#[derive(Debug, Clone, Default, PartialEq)]
struct NoCodeModule {
    /// Registry module backing the no-code module.
    registry_module_id: String,
    /// Pinned module version.
    version_pin: String,
    /// Allowed values per variable name.
    options: HashMap<String, Vec<Value>>,
    namespace: String,
    name: String,
    provider: String,
}

impl NoCodeModule {
    async fn fetch(client: &TfeClient, module_id: &str) -> Result<Self, ToolError> {
        let body = client
            .get(
                &["api", "v2", "no-code-modules", module_id],
                &[("include", "variable-options".to_string())],
            )
            .await?;
        let mut module = Self::from_payload(&body)?;
        let registry = client
            .get(&["api", "v2", "registry-modules", &module.registry_module_id], &[])
            .await?;
        let attribute = |key: &str| {
            registry
                .pointer(&format!("/data/attributes/{key}"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        module.namespace = attribute("namespace");
        module.name = attribute("name");
        module.provider = attribute("provider");
        if module.namespace.is_empty() || module.name.is_empty() || module.provider.is_empty() {
            return Err(ToolError::Backend(
                "registry module response missing namespace, name, or provider".to_string(),
            ));
        }
        Ok(module)
    }

    fn from_payload(body: &Value) -> Result<Self, ToolError> {
        let registry_module_id = body
            .pointer("/data/relationships/registry-module/data/id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ToolError::Backend("no-code module missing registry module".to_string())
            })?
            .to_string();
        let version_pin = body
            .pointer("/data/attributes/version-pin")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::Backend("no-code module missing version pin".to_string()))?
            .to_string();
        let mut options = HashMap::new();
        for included in body.get("included").and_then(Value::as_array).into_iter().flatten() {
            if included.get("type").and_then(Value::as_str) != Some("variable-options") {
                continue;
            }
            let Some(attributes) = included.get("attributes") else {
                continue;
            };
            let Some(name) = attributes.get("variable-name").and_then(Value::as_str) else {
                continue;
            };
            let values =
                attributes.get("options").and_then(Value::as_array).cloned().unwrap_or_default();
            options.insert(name.to_string(), values);
        }
        Ok(Self {
            registry_module_id,
            version_pin,
            options,
            ..Self::default()
        })
    }

    fn display_name(&self) -> String {
        format!("{}/{}/{}", self.namespace, self.name, self.provider)
    }
}

/// Module input variable.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ModuleInput {
    name: String,
    kind: String,
    description: String,
    required: bool,
}

async fn module_inputs(
    client: &TfeClient,
    organization: &str,
    module: &NoCodeModule,
) -> Result<Vec<ModuleInput>, ToolError> {
    let metadata = client
        .get(
            &[
                "api",
                "registry",
                "private",
                "v2",
                "modules",
                &module.namespace,
                &module.name,
                &module.provider,
                "metadata",
                &module.version_pin,
            ],
            &[("organization_name", organization.to_string())],
        )
        .await?;
    Ok(parse_inputs(&metadata))
}

fn parse_inputs(metadata: &Value) -> Vec<ModuleInput> {
    let Some(inputs) = metadata.pointer("/root/inputs").and_then(Value::as_array) else {
        return Vec::new();
    };
    inputs
        .iter()
        .filter_map(|input| {
            let name = input.get("name").and_then(Value::as_str)?.to_string();
            Some(ModuleInput {
                name,
                kind: input.get("type").and_then(Value::as_str).unwrap_or("string").to_string(),
                description: input
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                required: input.get("required").and_then(Value::as_bool).unwrap_or(false),
            })
        })
        .collect()
}

// ============================================================================
// SECTION: Schema And Conversion
// ============================================================================

/// Maps a Terraform type to its JSON schema type.
fn json_type(kind: &str) -> &'static str {
    match kind {
        "number" => "number",
        "bool" => "boolean",
        _ => "string",
    }
}

fn elicitation_schema(inputs: &[ModuleInput], options: &HashMap<String, Vec<Value>>) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for input in inputs {
        let json_kind = json_type(&input.kind);
        let mut property = json!({
            "type": json_kind,
            "title": input.name,
            "description": input.description,
        });
        if let Some(values) = options.get(&input.name).filter(|values| !values.is_empty()) {
            let converted: Vec<Value> =
                values.iter().map(|value| convert_option(json_kind, value)).collect();
            property["enum"] = Value::Array(converted);
        }
        properties.insert(input.name.clone(), property);
        if input.required {
            required.push(Value::String(input.name.clone()));
        }
    }
    json!({"type": "object", "properties": properties, "required": required})
}

fn convert_option(json_kind: &str, value: &Value) -> Value {
    let Some(text) = value.as_str() else {
        return value.clone();
    };
    match json_kind {
        "number" => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or_else(|| value.clone(), Value::Number),
        "boolean" => match text.trim() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => value.clone(),
        },
        _ => value.clone(),
    }
}

/// Converts accepted values into Terraform variable strings.
fn convert_values(
    inputs: &[ModuleInput],
    content: &Map<String, Value>,
) -> Result<Vec<(String, String)>, ToolError> {
    let mut variables = Vec::new();
    for input in inputs {
        let Some(value) = content.get(&input.name).filter(|value| !value.is_null()) else {
            if input.required {
                return Err(ToolError::InvalidParams(format!(
                    "required variable '{}' is missing from elicitation response",
                    input.name
                )));
            }
            continue;
        };
        variables.push((input.name.clone(), variable_string(&input.name, value)?));
    }
    Ok(variables)
}

fn variable_string(name: &str, value: &Value) -> Result<String, ToolError> {
    match value {
        Value::String(text) if text.is_empty() => Err(ToolError::InvalidParams(format!(
            "variable '{name}' cannot be empty"
        ))),
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => serde_json::to_string(other).map_err(|_| ToolError::Serialization),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
