// crates/terraform-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: Server assembly and JSON-RPC dispatch for stdio and HTTP.
// Purpose: Wire the catalog, registry, lifecycle hooks, and transports.
// Dependencies: axum, serde, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! [`McpServer`] owns one [`ToolCatalog`], one [`SessionClientStore`], one
//! [`DynamicToolRegistry`], and the [`SessionLifecycle`] hooks that connect
//! them. Public registry tools are registered at startup; authenticated TFE
//! tools are registered by the registry when the first session is
//! authorized.
//!
//! JSON-RPC requests from either transport go through the same dispatch.
//! Tool failures the caller can act on (missing credentials, unknown
//! resources, declined elicitation) come back as `isError` tool results;
//! protocol and backend failures are JSON-RPC errors.
//! Security posture: request bodies and tool arguments are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use terraform_mcp_config::ServerTransport;
use terraform_mcp_config::TerraformMcpConfig;
use terraform_mcp_config::Toolset;
use tracing::debug;
use tracing::info;

use crate::audit::TracingGateAuditSink;
use crate::catalog::CallToolResult;
use crate::catalog::ToolCatalog;
use crate::catalog::ToolRuntime;
use crate::context::CallContext;
use crate::dynamic::DynamicToolRegistry;
use crate::dynamic::RegistryDeps;
use crate::elicitation::Elicitor;
use crate::elicitation::SessionElicitors;
use crate::lifecycle::SessionAuthorizationSink;
use crate::lifecycle::SessionClients;
use crate::lifecycle::SessionLifecycle;
use crate::registry_client::RegistryClient;
use crate::session::SessionClientStore;
use crate::tfe::EnvLookup;
use crate::tfe::TfeClientBuilder;
use crate::tfe::TfeSettings;
use crate::tfe::process_env;
use crate::tools::ToolError;
use crate::tools::authenticated_tools;
use crate::tools::public_registry_tools;

mod http;
mod stdio;

pub use http::SESSION_HEADER;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Server name reported by `initialize`.
pub const SERVER_NAME: &str = "terraform-mcp-server";
/// Protocol version used when the client does not send one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";

/// JSON-RPC parse error.
const PARSE_ERROR: i64 = -32700;
/// JSON-RPC invalid request.
const INVALID_REQUEST: i64 = -32600;
/// JSON-RPC method or tool not found.
const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC invalid params.
const INVALID_PARAMS: i64 = -32602;
/// Unknown or missing session.
const UNKNOWN_SESSION: i64 = -32001;
/// Backend request failure.
const BACKEND_ERROR: i64 = -32050;
/// Result serialization failure.
const SERIALIZATION_ERROR: i64 = -32060;
/// Request body over the configured limit.
const PAYLOAD_TOO_LARGE: i64 = -32070;

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
#[derive(Clone)]
pub struct McpServer {
    /// Shared server components.
    inner: Arc<ServerInner>,
}

/// Components shared by every transport task.
struct ServerInner {
    /// Validated configuration.
    config: TerraformMcpConfig,
    /// Callable tools.
    catalog: Arc<ToolCatalog>,
    /// Session-to-client bindings.
    store: Arc<SessionClientStore>,
    /// Authorized sessions and one-shot registration.
    registry: Arc<DynamicToolRegistry>,
    /// Session start/end hooks.
    lifecycle: Arc<SessionLifecycle>,
    /// Per-session elicitation peers.
    elicitors: Arc<SessionElicitors>,
}

impl McpServer {
    /// Builds a server reading credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when configuration or initialization fails.
    pub fn from_config(config: TerraformMcpConfig) -> Result<Self, McpServerError> {
        Self::with_env(config, process_env())
    }

    /// Builds a server with an explicit environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::Config`] for invalid configuration and
    /// [`McpServerError::Init`] when the registry client or public tools
    /// cannot be set up.
    pub fn with_env(config: TerraformMcpConfig, env: EnvLookup) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let (toolsets, _) = config.toolset_selection();

        let catalog = Arc::new(ToolCatalog::new());
        let store = Arc::new(SessionClientStore::new());
        let builder = TfeClientBuilder::new(TfeSettings::from_config(&config.tfe), env);
        let clients = Arc::new(SessionClients::new(Arc::clone(&store), builder));
        let elicitors = Arc::new(SessionElicitors::new());

        let runtime: Arc<dyn ToolRuntime> = Arc::clone(&catalog) as Arc<dyn ToolRuntime>;
        let elicitor: Arc<dyn Elicitor> = Arc::clone(&elicitors) as Arc<dyn Elicitor>;
        let registry = DynamicToolRegistry::new(RegistryDeps {
            runtime,
            store: Arc::clone(&store),
            toolsets: toolsets.clone(),
            elicitor,
            audit: Arc::new(TracingGateAuditSink),
            tools: authenticated_tools(&clients, config.tfe.enable_operations),
        });
        let sink: Arc<dyn SessionAuthorizationSink> =
            Arc::clone(&registry) as Arc<dyn SessionAuthorizationSink>;
        let lifecycle = Arc::new(SessionLifecycle::new(clients, sink));

        if toolsets.is_enabled(Toolset::Registry) {
            let client = RegistryClient::new(&config.registry)
                .map_err(|err| McpServerError::Init(err.to_string()))?;
            for tool in public_registry_tools(&client) {
                catalog.add_tool(tool).map_err(|err| McpServerError::Init(err.to_string()))?;
            }
        }

        let enabled: Vec<&str> = toolsets.toolsets().into_iter().map(Toolset::as_str).collect();
        info!(
            toolsets = %enabled.join(","),
            operations = config.tfe.enable_operations,
            public_tools = catalog.len(),
            "mcp server initialized"
        );
        Ok(Self {
            inner: Arc::new(ServerInner {
                config,
                catalog,
                store,
                registry,
                lifecycle,
                elicitors,
            }),
        })
    }

    /// Returns the tool catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.inner.catalog
    }

    /// Returns the session client store.
    #[must_use]
    pub fn store(&self) -> &Arc<SessionClientStore> {
        &self.inner.store
    }

    /// Returns the dynamic tool registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<DynamicToolRegistry> {
        &self.inner.registry
    }

    /// Returns the session lifecycle hooks.
    #[must_use]
    pub fn lifecycle(&self) -> &Arc<SessionLifecycle> {
        &self.inner.lifecycle
    }

    /// Returns the per-session elicitation router.
    #[must_use]
    pub fn elicitors(&self) -> &Arc<SessionElicitors> {
        &self.inner.elicitors
    }

    /// Returns the validated configuration.
    #[must_use]
    pub fn config(&self) -> &TerraformMcpConfig {
        &self.inner.config
    }

    /// Serves requests using the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the transport fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        match self.inner.config.server.transport {
            ServerTransport::Stdio => {
                self.serve_io(tokio::io::stdin(), tokio::io::stdout()).await
            }
            ServerTransport::Http => self.serve_http().await,
        }
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Dispatches a JSON-RPC message; notifications produce no response.
    async fn dispatch(
        &self,
        context: CallContext,
        request: JsonRpcRequest,
    ) -> Option<(StatusCode, JsonRpcResponse)> {
        let Some(id) = request.id else {
            debug!(method = %request.method, "notification received");
            return None;
        };
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcError::new(INVALID_REQUEST, "invalid json-rpc version").respond(id));
        }
        let context = context.with_request_id(id.to_string());
        let outcome = match request.method.as_str() {
            "initialize" => Ok(initialize_result(request.params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(&context, request.params).await,
            _ => Err(JsonRpcError::new(METHOD_NOT_FOUND, "method not found")),
        };
        Some(match outcome {
            Ok(result) => (StatusCode::OK, JsonRpcResponse::success(id, result)),
            Err(error) => error.respond(id),
        })
    }

    /// Handles `tools/list`.
    fn list_tools(&self) -> Result<Value, JsonRpcError> {
        serde_json::to_value(ToolListResult {
            tools: self.inner.catalog.list(),
        })
        .map_err(|_| JsonRpcError::new(SERIALIZATION_ERROR, "serialization failed"))
    }

    /// Handles `tools/call`.
    async fn call_tool(
        &self,
        context: &CallContext,
        params: Option<Value>,
    ) -> Result<Value, JsonRpcError> {
        let call: ToolCallParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|_| JsonRpcError::new(INVALID_PARAMS, "invalid tool params"))?;
        debug!(
            tool = %call.name,
            session_id = context.session.as_ref().map(|session| session.as_str()),
            "tool call"
        );
        let result = match self.inner.catalog.call(context, &call.name, call.arguments).await {
            Ok(result) => result,
            Err(error) => tool_error_result(error)?,
        };
        serde_json::to_value(result)
            .map_err(|_| JsonRpcError::new(SERIALIZATION_ERROR, "serialization failed"))
    }
}

/// Builds the `initialize` result.
fn initialize_result(params: Option<&Value>) -> Value {
    let protocol_version = params
        .and_then(|params| params.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);
    json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": {"listChanged": true},
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

/// Splits tool errors into caller-facing results and JSON-RPC errors.
fn tool_error_result(error: ToolError) -> Result<CallToolResult, JsonRpcError> {
    match error {
        ToolError::UnknownTool(name) => {
            Err(JsonRpcError::new(METHOD_NOT_FOUND, format!("unknown tool: {name}")))
        }
        ToolError::InvalidParams(message) => Err(JsonRpcError::new(INVALID_PARAMS, message)),
        ToolError::Backend(message) => Err(JsonRpcError::new(BACKEND_ERROR, message)),
        ToolError::Serialization => {
            Err(JsonRpcError::new(SERIALIZATION_ERROR, "serialization failed"))
        }
        error @ (ToolError::Unauthenticated(_)
        | ToolError::NotFound(_)
        | ToolError::Elicitation(_)) => Ok(CallToolResult::error(error.to_string())),
    }
}

// ============================================================================
// SECTION: JSON-RPC Types
// ============================================================================

/// Incoming JSON-RPC request or notification.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    id: Option<Value>,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    #[serde(default)]
    params: Option<Value>,
}

impl JsonRpcRequest {
    /// Returns true for `tools/call`.
    fn is_tool_call(&self) -> bool {
        self.method == "tools/call"
    }
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    const fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Clone, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
}

impl JsonRpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// HTTP status carried with this error.
    const fn status(&self) -> StatusCode {
        match self.code {
            PARSE_ERROR | INVALID_REQUEST | METHOD_NOT_FOUND | INVALID_PARAMS => {
                StatusCode::BAD_REQUEST
            }
            UNKNOWN_SESSION => StatusCode::NOT_FOUND,
            PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::OK,
        }
    }

    /// Wraps the error in a response envelope.
    fn respond(self, id: Value) -> (StatusCode, JsonRpcResponse) {
        (
            self.status(),
            JsonRpcResponse {
                jsonrpc: "2.0",
                id,
                result: None,
                error: Some(self),
            },
        )
    }
}

/// Tool call parameters.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Registered tool definitions.
    tools: Vec<crate::catalog::ToolDefinition>,
}

/// Decodes a JSON-RPC request payload.
///
/// Body size is checked before parsing; malformed JSON is a parse error and
/// well-formed JSON that is not a request is an invalid request.
fn parse_request(
    bytes: &[u8],
    max_body_bytes: usize,
) -> Result<JsonRpcRequest, (StatusCode, JsonRpcResponse)> {
    if bytes.len() > max_body_bytes {
        return Err(
            JsonRpcError::new(PAYLOAD_TOO_LARGE, "request body too large").respond(Value::Null)
        );
    }
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|_| JsonRpcError::new(PARSE_ERROR, "parse error").respond(Value::Null))?;
    request_from_value(value)
}

/// Decodes a parsed JSON value as a request.
fn request_from_value(value: Value) -> Result<JsonRpcRequest, (StatusCode, JsonRpcResponse)> {
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value)
        .map_err(|_| JsonRpcError::new(INVALID_REQUEST, "invalid json-rpc request").respond(id))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
