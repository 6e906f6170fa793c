// crates/terraform-mcp/tests/session_gate.rs
// ============================================================================
// Module: Session Gate Integration Tests
// Description: Session lifecycle, dynamic registration, and the per-call gate.
// Purpose: Exercise authenticated tools end to end against a mock TFE backend.
// ============================================================================

//! ## Overview
//! Drives [`terraform_mcp::McpServer`] through session start, tool calls, and
//! session end with a local mock backend. Covers one-time registration,
//! gate denials, late authorization, lifecycle symmetry, and isolation
//! between concurrent sessions.

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

use serde_json::Value;
use serde_json::json;
use terraform_mcp::CallContext;
use terraform_mcp::CredentialOverrides;
use terraform_mcp::SessionId;
use terraform_mcp::TfeClientBuilder;
use terraform_mcp::TfeSettings;
use terraform_mcp::dynamic::NO_SESSION_MESSAGE;
use terraform_mcp::dynamic::UNAUTHORIZED_MESSAGE;

use crate::common::MockBackend;
use crate::common::MockResponse;
use crate::common::TEST_TOKEN;
use crate::common::context;
use crate::common::env;
use crate::common::server_with_token;
use crate::common::server_without_token;
use crate::common::start_session;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const WORKSPACES_PATH: &str = "/api/v2/organizations/acme/workspaces";

fn workspace_resource(id: &str, name: &str) -> Value {
    json!({
        "data": {
            "id": id,
            "type": "workspaces",
            "attributes": {"name": name, "execution-mode": "remote"}
        }
    })
}

fn workspace_list() -> Value {
    json!({
        "data": [
            {"id": "ws-1", "type": "workspaces", "attributes": {"name": "network"}},
            {"id": "ws-2", "type": "workspaces", "attributes": {"name": "compute"}}
        ],
        "meta": {"pagination": {"current-page": 1, "total-count": 2}}
    })
}

fn workspace_backend() -> MockBackend {
    MockBackend::with_routes(vec![
        ("GET /api/v2/organizations/acme/workspaces", MockResponse::ok(&workspace_list())),
        (
            "POST /api/v2/organizations/acme/workspaces",
            MockResponse::created(&workspace_resource("ws-123", "demo")),
        ),
    ])
}

fn token_overrides(address: &str) -> CredentialOverrides {
    CredentialOverrides {
        address: Some(address.to_string()),
        token: Some(TEST_TOKEN.to_string()),
        skip_tls_verify: None,
    }
}

fn list_args() -> Value {
    json!({"terraform_org_name": "acme"})
}

// ============================================================================
// SECTION: Example Scenario
// ============================================================================

#[tokio::test]
async fn session_s1_runs_create_workspace_then_loses_access_after_end() {
    let backend = workspace_backend();
    let server = server_with_token(backend.address(), "terraform");
    assert!(!server.catalog().contains("create_workspace"));

    let s1 = start_session(&server, "s1");
    assert!(server.store().has_valid_client(&s1));
    assert!(server.registry().is_session_authorized(&s1));
    assert!(server.registry().tools_registered());
    assert!(server.catalog().contains("create_workspace"));

    let arguments = json!({"terraform_org_name": "acme", "workspace_name": "demo"});
    let result =
        server.catalog().call(&context(&s1), "create_workspace", arguments.clone()).await.unwrap();
    assert!(!result.is_error, "unexpected error: {}", result.text_content());
    let created: Value = serde_json::from_str(&result.text_content()).unwrap();
    assert_eq!(created["id"], "ws-123");
    assert_eq!(created["name"], "demo");

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path(), WORKSPACES_PATH);
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer test-token"));
    assert_eq!(requests[0].json()["data"]["attributes"]["name"], "demo");

    let detached = server
        .catalog()
        .call(&CallContext::detached(), "create_workspace", arguments.clone())
        .await
        .unwrap();
    assert!(detached.is_error);
    assert_eq!(detached.text_content(), NO_SESSION_MESSAGE);

    server.lifecycle().on_session_end(&s1);
    assert!(server.store().get(&s1).is_none());
    assert!(!server.registry().is_session_authorized(&s1));
    assert!(server.catalog().contains("create_workspace"));

    let after_end =
        server.catalog().call(&context(&s1), "create_workspace", arguments).await.unwrap();
    assert!(after_end.is_error);
    assert_eq!(after_end.text_content(), UNAUTHORIZED_MESSAGE);
    assert_eq!(backend.requests().len(), 1);
}

// ============================================================================
// SECTION: Registration
// ============================================================================

#[tokio::test]
async fn registration_runs_once_across_many_sessions() {
    let backend = workspace_backend();
    let server = server_with_token(backend.address(), "terraform");
    let changes = server.catalog().subscribe();

    let first = start_session(&server, "session-0");
    let registered = server.catalog().len();
    let version = *changes.borrow();
    assert!(registered > 0);

    let mut sessions = vec![first];
    for index in 1..10 {
        sessions.push(start_session(&server, &format!("session-{index}")));
    }
    assert_eq!(server.catalog().len(), registered);
    assert_eq!(*changes.borrow(), version);
    for session in &sessions {
        assert!(server.registry().is_session_authorized(session));
    }
}

#[tokio::test]
async fn invalid_session_start_registers_nothing() {
    let backend = workspace_backend();
    let server = server_without_token(backend.address(), "terraform");
    let session = start_session(&server, "no-token");

    let handle = server.store().get(&session).unwrap();
    assert!(!handle.is_valid());
    assert!(!server.registry().is_session_authorized(&session));
    assert!(!server.registry().tools_registered());
    assert!(server.catalog().is_empty());
}

// ============================================================================
// SECTION: Gate
// ============================================================================

#[tokio::test]
async fn unauthorized_session_never_reaches_backend() {
    let backend = workspace_backend();
    let server = server_without_token(backend.address(), "terraform");
    let authorized = SessionId::new("authorized");
    server.lifecycle().on_session_start(&token_overrides(backend.address()), &authorized);
    let anonymous = start_session(&server, "anonymous");
    let unknown = SessionId::new("never-started");

    for session in [&anonymous, &unknown] {
        let result =
            server.catalog().call(&context(session), "list_workspaces", list_args()).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.text_content(), UNAUTHORIZED_MESSAGE);
    }
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn authorized_call_invokes_backend_once_and_returns_result() {
    let backend = workspace_backend();
    let server = server_with_token(backend.address(), "terraform");
    let session = start_session(&server, "reader");

    let result =
        server.catalog().call(&context(&session), "list_workspaces", list_args()).await.unwrap();
    assert!(!result.is_error);
    let listed: Value = serde_json::from_str(&result.text_content()).unwrap();
    let names: Vec<&str> = listed["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["network", "compute"]);
    assert_eq!(listed["pagination"]["total-count"], 2);

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path(), WORKSPACES_PATH);
}

#[tokio::test]
async fn stored_client_promotes_session_at_call_time() {
    let backend = workspace_backend();
    let server = server_without_token(backend.address(), "terraform");
    let first = SessionId::new("first");
    server.lifecycle().on_session_start(&token_overrides(backend.address()), &first);

    let late = start_session(&server, "late");
    assert!(!server.registry().is_session_authorized(&late));

    let builder = TfeClientBuilder::new(TfeSettings::default(), env(&[]));
    let handle = builder.build_from(&token_overrides(backend.address()));
    assert!(handle.is_valid());
    server.store().put(late.clone(), handle);

    let result =
        server.catalog().call(&context(&late), "list_workspaces", list_args()).await.unwrap();
    assert!(!result.is_error, "unexpected error: {}", result.text_content());
    assert!(server.registry().is_session_authorized(&late));
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

#[tokio::test]
async fn lifecycle_start_then_end_leaves_no_state() {
    let backend = workspace_backend();
    let server = server_with_token(backend.address(), "terraform");
    let sessions: Vec<SessionId> =
        (0..5).map(|index| start_session(&server, &format!("cycle-{index}"))).collect();
    assert_eq!(server.store().len(), 5);
    assert!(server.registry().has_any_authorized_session());

    for session in &sessions {
        server.lifecycle().on_session_end(session);
    }
    assert!(server.store().is_empty());
    assert!(!server.registry().has_any_authorized_session());
    assert!(server.registry().tools_registered());

    server.lifecycle().on_session_end(&SessionId::new("cycle-0"));
    assert!(server.store().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sessions_are_isolated() {
    let backend = workspace_backend();
    let server = server_without_token(backend.address(), "terraform");
    let address = backend.address().to_string();

    let mut tasks = Vec::new();
    for index in 0..16 {
        let server = server.clone();
        let address = address.clone();
        tasks.push(tokio::spawn(async move {
            let session = SessionId::new(format!("worker-{index}"));
            let credentials = if index % 2 == 0 {
                token_overrides(&address)
            } else {
                CredentialOverrides::default()
            };
            server.lifecycle().on_session_start(&credentials, &session);
            (index, session)
        }));
    }
    let mut sessions = Vec::new();
    for task in tasks {
        sessions.push(task.await.unwrap());
    }

    let mut calls = Vec::new();
    for (index, session) in sessions.clone() {
        let server = server.clone();
        calls.push(tokio::spawn(async move {
            let result = server
                .catalog()
                .call(&context(&session), "list_workspaces", list_args())
                .await
                .unwrap();
            (index, result)
        }));
    }
    for call in calls {
        let (index, result) = call.await.unwrap();
        if index % 2 == 0 {
            assert!(!result.is_error, "worker-{index}: {}", result.text_content());
        } else {
            assert_eq!(result.text_content(), UNAUTHORIZED_MESSAGE, "worker-{index}");
        }
    }
    assert_eq!(backend.requests().len(), 8);

    for (index, session) in &sessions {
        assert_eq!(server.registry().is_session_authorized(session), index % 2 == 0);
    }
}
