// crates/terraform-mcp/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Mock TFE/registry backend and server construction helpers.
// Purpose: Provide reusable, deterministic infrastructure for integration tests.
// Dependencies: terraform-mcp, terraform-mcp-config, tiny_http
// ============================================================================

//! ## Overview
//! [`MockBackend`] serves canned JSON:API responses from a local `tiny_http`
//! server and records every request it receives, so tests can assert both
//! what a tool returned and what it sent upstream.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;

use serde_json::Value;
use terraform_mcp::CallContext;
use terraform_mcp::EnvLookup;
use terraform_mcp::McpServer;
use terraform_mcp::SessionId;
use terraform_mcp_config::TerraformMcpConfig;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Mock Backend
// ============================================================================

/// Request observed by the mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Path and query string.
    pub url: String,
    /// `Authorization` header, when sent.
    pub authorization: Option<String>,
    /// Request body.
    pub body: String,
}

impl RecordedRequest {
    /// Path without the query string.
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or_default()
    }

    /// Parses the body as JSON.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Canned response returned by a route.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl MockResponse {
    /// 200 with a JSON body.
    pub fn ok(body: &Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    /// 201 with a JSON body.
    pub fn created(body: &Value) -> Self {
        Self {
            status: 201,
            body: body.to_string(),
        }
    }

    /// 204 with no body.
    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: String::new(),
        }
    }

    /// Error status with a JSON:API error body.
    pub fn error(status: u16, title: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({"errors": [{"status": status.to_string(), "title": title}]})
                .to_string(),
        }
    }
}

/// Local HTTP server standing in for TFE and the public registry.
pub struct MockBackend {
    /// Underlying server, shared with the serving thread.
    server: Arc<Server>,
    /// Base address, e.g. `http://127.0.0.1:4321`.
    address: String,
    /// Requests in arrival order.
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    /// Serving thread.
    handle: Option<JoinHandle<()>>,
}

impl MockBackend {
    /// Starts a backend that answers every request with `route`.
    pub fn start<F>(route: F) -> Self
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + 'static,
    {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let serving = Arc::clone(&server);
        let recorded = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            while let Ok(mut request) = serving.recv() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let authorization = request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv("Authorization"))
                    .map(|header| header.value.as_str().to_string());
                let observed = RecordedRequest {
                    method: request.method().as_str().to_string(),
                    url: request.url().to_string(),
                    authorization,
                    body,
                };
                let reply = route(&observed);
                recorded.lock().unwrap().push(observed);
                let content_type =
                    Header::from_bytes(&b"Content-Type"[..], &b"application/vnd.api+json"[..])
                        .unwrap();
                let response = Response::from_string(reply.body)
                    .with_status_code(reply.status)
                    .with_header(content_type);
                let _ = request.respond(response);
            }
        });
        Self {
            server,
            address: format!("http://{addr}"),
            requests,
            handle: Some(handle),
        }
    }

    /// Starts a backend serving fixed responses keyed by `"METHOD /path"`.
    ///
    /// Unlisted routes answer 404.
    pub fn with_routes(routes: Vec<(&str, MockResponse)>) -> Self {
        let routes: HashMap<String, MockResponse> =
            routes.into_iter().map(|(key, response)| (key.to_string(), response)).collect();
        Self::start(move |request| {
            let key = format!("{} {}", request.method, request.path());
            routes.get(&key).cloned().unwrap_or_else(|| MockResponse::error(404, "not found"))
        })
    }

    /// Base address for client configuration.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ============================================================================
// SECTION: Server Helpers
// ============================================================================

/// Token the mock backend expects.
pub const TEST_TOKEN: &str = "test-token";

/// Builds an environment lookup from fixed pairs.
pub fn env(pairs: &[(&str, &str)]) -> EnvLookup {
    let map: HashMap<String, String> =
        pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
    Arc::new(move |key: &str| map.get(key).cloned())
}

/// Configuration pointing both backends at `address` with no retries.
pub fn config_for(address: &str, toolsets: &str) -> TerraformMcpConfig {
    let mut config = TerraformMcpConfig::default();
    config.toolsets = vec![toolsets.to_string()];
    config.tfe.address = address.to_string();
    config.tfe.max_retries = 0;
    config.registry.base_url = address.to_string();
    config
}

/// Server whose environment carries a token for `address`.
pub fn server_with_token(address: &str, toolsets: &str) -> McpServer {
    let pairs = [("TFE_ADDRESS", address), ("TFE_TOKEN", TEST_TOKEN)];
    McpServer::with_env(config_for(address, toolsets), env(&pairs)).unwrap()
}

/// Server whose environment carries no TFE credentials.
pub fn server_without_token(address: &str, toolsets: &str) -> McpServer {
    McpServer::with_env(config_for(address, toolsets), env(&[])).unwrap()
}

/// Starts a session on `server` using environment credentials.
pub fn start_session(server: &McpServer, name: &str) -> SessionId {
    let session = SessionId::new(name);
    server.lifecycle().on_session_start(&terraform_mcp::CredentialOverrides::default(), &session);
    session
}

/// Call context bound to `session`.
pub fn context(session: &SessionId) -> CallContext {
    CallContext::for_session(session.clone())
}
