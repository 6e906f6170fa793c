// crates/terraform-mcp/src/server/http.rs
// ============================================================================
// Module: HTTP Transport
// Description: JSON-RPC over HTTP POST with header-tracked sessions.
// Purpose: Serve many MCP sessions with per-session credentials from headers.
// Dependencies: axum, tokio, tracing
// ============================================================================

//! ## Overview
//! In stateful mode `initialize` without a session header creates a session
//! and returns its id in `Mcp-Session-Id`; later requests must carry a known
//! id and `DELETE` ends the session. In stateless mode every request runs in
//! a session that starts and ends around it. Credentials come from the
//! `X-TFE-*` headers (or `Authorization: Bearer`) and fall back to the
//! environment. Elicitation is not available over HTTP.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use serde_json::Value;
use terraform_mcp_config::SessionMode;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::INVALID_REQUEST;
use super::JsonRpcError;
use super::JsonRpcRequest;
use super::JsonRpcResponse;
use super::McpServer;
use super::McpServerError;
use super::UNKNOWN_SESSION;
use super::parse_request;
use crate::context::CallContext;
use crate::context::CallTransport;
use crate::session::SessionId;
use crate::tfe::CredentialOverrides;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Session identifier header.
pub const SESSION_HEADER: &str = "mcp-session-id";
/// TFE address header.
const TFE_ADDRESS_HEADER: &str = "x-tfe-address";
/// TFE token header.
const TFE_TOKEN_HEADER: &str = "x-tfe-token";
/// TLS skip header.
const TFE_SKIP_VERIFY_HEADER: &str = "x-tfe-skip-verify";

// ============================================================================
// SECTION: Server State
// ============================================================================

/// Shared state for HTTP handlers.
struct HttpState {
    /// Server components.
    server: McpServer,
    /// Live stateful sessions.
    sessions: RwLock<HashSet<SessionId>>,
    /// Session handling mode.
    mode: SessionMode,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

impl HttpState {
    fn is_live(&self, session: &SessionId) -> bool {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).contains(session)
    }

    fn insert(&self, session: SessionId) {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner).insert(session);
    }

    fn remove(&self, session: &SessionId) -> bool {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner).remove(session)
    }
}

impl McpServer {
    /// Builds the HTTP router for the configured endpoint.
    #[must_use]
    pub fn http_router(&self) -> Router {
        let server_config = &self.inner.config.server;
        let state = Arc::new(HttpState {
            server: self.clone(),
            sessions: RwLock::new(HashSet::new()),
            mode: server_config.session_mode,
            max_body_bytes: server_config.max_body_bytes,
        });
        Router::new()
            .route(&server_config.endpoint, post(handle_post).delete(handle_delete))
            .layer(DefaultBodyLimit::max(server_config.max_body_bytes))
            .with_state(state)
    }

    /// Serves the HTTP transport on the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when binding or serving fails.
    pub async fn serve_http(self) -> Result<(), McpServerError> {
        let bind = self.inner.config.server.bind_addr();
        let addr: SocketAddr =
            bind.parse().map_err(|_| McpServerError::Config("invalid bind address".to_string()))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| McpServerError::Transport("http bind failed".to_string()))?;
        info!(
            address = %addr,
            endpoint = %self.inner.config.server.endpoint,
            "serving mcp over http"
        );
        axum::serve(listener, self.http_router())
            .await
            .map_err(|_| McpServerError::Transport("http server failed".to_string()))
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles `POST {endpoint}`.
async fn handle_post(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Response {
    let request = match parse_request(&bytes, state.max_body_bytes) {
        Ok(request) => request,
        Err((status, response)) => return (status, Json(response)).into_response(),
    };
    debug!(method = %request.method, bytes = bytes.len(), "http request");
    let credentials = credentials_from_headers(&headers);
    match state.mode {
        SessionMode::Stateless => handle_stateless(&state, credentials, request).await,
        SessionMode::Stateful => handle_stateful(&state, &headers, credentials, request).await,
    }
}

/// Runs a request in a session that ends with it.
async fn handle_stateless(
    state: &HttpState,
    credentials: CredentialOverrides,
    request: JsonRpcRequest,
) -> Response {
    let lifecycle = state.server.lifecycle();
    let session = SessionId::generate();
    lifecycle.on_session_start(&credentials, &session);
    let context = http_context(session.clone(), credentials);
    let response = state.server.dispatch(context, request).await;
    lifecycle.on_session_end(&session);
    finish(response, None)
}

/// Runs a request inside a tracked session.
async fn handle_stateful(
    state: &HttpState,
    headers: &HeaderMap,
    credentials: CredentialOverrides,
    request: JsonRpcRequest,
) -> Response {
    let lifecycle = state.server.lifecycle();
    let Some(session) = session_from_headers(headers) else {
        if request.method != "initialize" {
            let id = request.id.unwrap_or(Value::Null);
            let (status, response) =
                JsonRpcError::new(INVALID_REQUEST, "missing Mcp-Session-Id header").respond(id);
            return (status, Json(response)).into_response();
        }
        let session = SessionId::generate();
        lifecycle.on_session_start(&credentials, &session);
        state.insert(session.clone());
        let context = http_context(session.clone(), credentials);
        let response = state.server.dispatch(context, request).await;
        return finish(response, Some(&session));
    };
    if !state.is_live(&session) {
        let id = request.id.unwrap_or(Value::Null);
        let (status, response) = JsonRpcError::new(UNKNOWN_SESSION, "unknown session").respond(id);
        return (status, Json(response)).into_response();
    }
    let context = http_context(session, credentials);
    if request.is_tool_call() {
        lifecycle.refresh_from_context(&context);
    }
    let response = state.server.dispatch(context, request).await;
    finish(response, None)
}

/// Handles `DELETE {endpoint}`.
async fn handle_delete(State(state): State<Arc<HttpState>>, headers: HeaderMap) -> StatusCode {
    let Some(session) = session_from_headers(&headers) else {
        return StatusCode::BAD_REQUEST;
    };
    if !state.remove(&session) {
        return StatusCode::NOT_FOUND;
    }
    state.server.lifecycle().on_session_end(&session);
    StatusCode::NO_CONTENT
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a dispatch outcome; notifications are accepted without a body.
fn finish(
    response: Option<(StatusCode, JsonRpcResponse)>,
    session: Option<&SessionId>,
) -> Response {
    let mut rendered = match response {
        Some((status, body)) => (status, Json(body)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };
    if let Some(session) = session {
        match HeaderValue::from_str(session.as_str()) {
            Ok(value) => {
                rendered.headers_mut().insert(SESSION_HEADER, value);
            }
            Err(err) => error!(error = %err, "session id is not a valid header value"),
        }
    }
    rendered
}

fn http_context(session: SessionId, credentials: CredentialOverrides) -> CallContext {
    CallContext::for_session(session)
        .with_credentials(credentials)
        .with_transport(CallTransport::Http)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    header_value(headers, SESSION_HEADER).map(SessionId::new)
}

/// Reads credential overrides; `X-TFE-Token` wins over a bearer token.
fn credentials_from_headers(headers: &HeaderMap) -> CredentialOverrides {
    let bearer = header_value(headers, AUTHORIZATION.as_str()).and_then(|value| {
        value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
            .map(|token| token.trim().to_string())
    });
    CredentialOverrides {
        address: header_value(headers, TFE_ADDRESS_HEADER),
        token: header_value(headers, TFE_TOKEN_HEADER).or(bearer),
        skip_tls_verify: header_value(headers, TFE_SKIP_VERIFY_HEADER),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
