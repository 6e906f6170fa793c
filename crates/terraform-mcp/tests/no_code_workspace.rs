// crates/terraform-mcp/tests/no_code_workspace.rs
// ============================================================================
// Module: No-Code Workspace Integration Tests
// Description: Elicitation outcomes for create_no_code_workspace.
// Purpose: Verify accepted values reach TFE and refusals never create anything.
// ============================================================================

//! ## Overview
//! Drives `create_no_code_workspace` against a mock TFE backend with a
//! fixed-answer [`terraform_mcp::Elicitor`] attached to the calling session.
//! Refusals are checked over HTTP so the caller-facing `isError` result is
//! observed exactly as a client would see it.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use terraform_mcp::CallContext;
use terraform_mcp::Elicitor;
use terraform_mcp::McpServer;
use terraform_mcp::SessionId;
use terraform_mcp::ToolError;
use terraform_mcp::elicitation::ElicitationError;
use terraform_mcp::elicitation::ElicitationRequest;
use terraform_mcp::elicitation::ElicitationResponse;
use terraform_mcp::server::SESSION_HEADER;
use tokio::net::TcpListener;

use crate::common::MockBackend;
use crate::common::MockResponse;
use crate::common::context;
use crate::common::server_with_token;
use crate::common::start_session;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const WORKSPACES_PATH: &str = "/api/v2/no-code-modules/nocode-vpc/workspaces";

/// Elicitor that records each request and always gives the same answer.
struct FixedElicitor {
    response: ElicitationResponse,
    requests: Mutex<Vec<ElicitationRequest>>,
}

impl FixedElicitor {
    fn new(response: ElicitationResponse) -> Arc<Self> {
        Arc::new(Self {
            response,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ElicitationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Elicitor for FixedElicitor {
    async fn elicit(
        &self,
        _context: &CallContext,
        request: ElicitationRequest,
    ) -> Result<ElicitationResponse, ElicitationError> {
        self.requests.lock().unwrap().push(request);
        Ok(self.response.clone())
    }
}

/// Mock TFE serving one no-code module whose inputs come from `inputs`.
fn no_code_backend(inputs: &Value) -> MockBackend {
    MockBackend::with_routes(vec![
        (
            "GET /api/v2/projects/prj-1",
            MockResponse::ok(&json!({"data": {
                "id": "prj-1",
                "relationships": {"organization": {"data": {"id": "acme"}}}
            }})),
        ),
        (
            "GET /api/v2/no-code-modules/nocode-vpc",
            MockResponse::ok(&json!({
                "data": {
                    "id": "nocode-vpc",
                    "attributes": {"version-pin": "1.0.0"},
                    "relationships": {"registry-module": {"data": {"id": "mod-1"}}}
                },
                "included": [{
                    "type": "variable-options",
                    "attributes": {"variable-name": "size", "options": ["1", "2"]}
                }]
            })),
        ),
        (
            "GET /api/v2/registry-modules/mod-1",
            MockResponse::ok(&json!({"data": {
                "id": "mod-1",
                "attributes": {"namespace": "acme", "name": "vpc", "provider": "aws"}
            }})),
        ),
        (
            "GET /api/registry/private/v2/modules/acme/vpc/aws/metadata/1.0.0",
            MockResponse::ok(&json!({"root": {"inputs": inputs}})),
        ),
        (
            "POST /api/v2/no-code-modules/nocode-vpc/workspaces",
            MockResponse::created(&json!({"data": {
                "id": "ws-9",
                "type": "workspaces",
                "attributes": {"name": "network"}
            }})),
        ),
    ])
}

fn two_inputs() -> Value {
    json!([
        {"name": "region", "type": "string", "description": "Region", "required": true},
        {"name": "size", "type": "number", "description": "Size", "required": true}
    ])
}

fn arguments(module_id: &str) -> Value {
    json!({
        "no_code_module_id": module_id,
        "workspace_name": "network",
        "project_id": "prj-1"
    })
}

fn workspace_posts(backend: &MockBackend) -> usize {
    backend
        .requests()
        .iter()
        .filter(|request| request.method == "POST" && request.path() == WORKSPACES_PATH)
        .count()
}

/// Serves `server` over HTTP and opens a session, returning `(url, session)`.
async fn http_session(server: &McpServer) -> (String, String) {
    let router = server.http_router();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    let url = format!("http://{addr}{}", server.config().server.endpoint);
    let initialize = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {"protocolVersion": "2025-06-18", "capabilities": {"elicitation": {}}}
    });
    let response = reqwest::Client::new().post(&url).json(&initialize).send().await.unwrap();
    let session = response.headers().get(SESSION_HEADER).unwrap().to_str().unwrap().to_string();
    (url, session)
}

/// Calls the tool over HTTP after a refusal and returns the JSON-RPC result.
async fn refused_call(answer: ElicitationResponse) -> (Value, MockBackend) {
    let backend = no_code_backend(&two_inputs());
    let server = server_with_token(backend.address(), "terraform");
    let (url, session) = http_session(&server).await;
    let elicitor = FixedElicitor::new(answer);
    server.elicitors().attach(SessionId::new(session.clone()), elicitor.clone());

    let call = json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": {"name": "create_no_code_workspace", "arguments": arguments("nocode-vpc")}
    });
    let response = reqwest::Client::new()
        .post(&url)
        .header(SESSION_HEADER, &session)
        .json(&call)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(elicitor.requests().len(), 1);
    (body["result"].clone(), backend)
}

// ============================================================================
// SECTION: Elicitation Outcomes
// ============================================================================

#[tokio::test]
async fn accepted_values_are_sent_as_workspace_variables() {
    let backend = no_code_backend(&two_inputs());
    let server = server_with_token(backend.address(), "terraform");
    let session = start_session(&server, "accept");
    let mut content = serde_json::Map::new();
    content.insert("region".to_string(), json!("eu-west-1"));
    content.insert("size".to_string(), json!(2));
    let elicitor = FixedElicitor::new(ElicitationResponse::Accept(content));
    server.elicitors().attach(session.clone(), elicitor.clone());

    let result = server
        .catalog()
        .call(&context(&session), "create_no_code_workspace", arguments("nocode-vpc"))
        .await
        .unwrap();
    assert!(!result.is_error, "{}", result.text_content());

    let requests = elicitor.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].message.contains("acme/vpc/aws"), "{}", requests[0].message);
    let schema = &requests[0].requested_schema;
    assert_eq!(schema["required"], json!(["region", "size"]));
    assert_eq!(schema["properties"]["size"]["enum"], json!([1.0, 2.0]));

    let post = backend
        .requests()
        .into_iter()
        .find(|request| request.method == "POST")
        .unwrap();
    assert_eq!(post.path(), WORKSPACES_PATH);
    let body = post.json();
    assert_eq!(body["data"]["attributes"]["name"], "network");
    assert_eq!(body["data"]["relationships"]["project"]["data"]["id"], "prj-1");
    assert_eq!(
        body["data"]["relationships"]["vars"]["data"],
        json!([
            {"type": "vars",
             "attributes": {"key": "region", "value": "eu-west-1", "category": "terraform"}},
            {"type": "vars",
             "attributes": {"key": "size", "value": "2", "category": "terraform"}}
        ])
    );
}

#[tokio::test]
async fn declined_elicitation_returns_error_result_without_creating() {
    let (result, backend) = refused_call(ElicitationResponse::Decline).await;
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("declined by user"), "{text}");
    assert_eq!(workspace_posts(&backend), 0);
}

#[tokio::test]
async fn cancelled_elicitation_returns_error_result_without_creating() {
    let (result, backend) = refused_call(ElicitationResponse::Cancel).await;
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("cancelled by user"), "{text}");
    assert_eq!(workspace_posts(&backend), 0);
}

#[tokio::test]
async fn modules_without_inputs_skip_elicitation() {
    let backend = no_code_backend(&json!([]));
    let server = server_with_token(backend.address(), "terraform");
    let session = start_session(&server, "no-inputs");
    let elicitor = FixedElicitor::new(ElicitationResponse::Decline);
    server.elicitors().attach(session.clone(), elicitor.clone());

    let result = server
        .catalog()
        .call(&context(&session), "create_no_code_workspace", arguments("nocode-vpc"))
        .await
        .unwrap();
    assert!(!result.is_error, "{}", result.text_content());
    assert!(elicitor.requests().is_empty());
    assert_eq!(workspace_posts(&backend), 1);
    let post = backend.requests().into_iter().find(|request| request.method == "POST").unwrap();
    assert_eq!(post.json()["data"]["relationships"]["vars"]["data"], json!([]));
}

#[tokio::test]
async fn module_ids_without_no_code_prefix_are_rejected_before_any_request() {
    let backend = no_code_backend(&two_inputs());
    let server = server_with_token(backend.address(), "terraform");
    let session = start_session(&server, "prefix");
    let elicitor = FixedElicitor::new(ElicitationResponse::Decline);
    server.elicitors().attach(session.clone(), elicitor.clone());
    let before = backend.requests().len();

    let err = server
        .catalog()
        .call(&context(&session), "create_no_code_workspace", arguments("mod-vpc"))
        .await
        .unwrap_err();
    match err {
        ToolError::InvalidParams(message) => assert!(message.contains("nocode-"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(backend.requests().len(), before);
    assert!(elicitor.requests().is_empty());
}
