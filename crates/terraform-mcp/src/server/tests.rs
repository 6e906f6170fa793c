// crates/terraform-mcp/src/server/tests.rs
// ============================================================================
// Module: MCP Server Unit Tests
// Description: Framing, JSON-RPC dispatch, and the stdio session loop.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::Value;
use serde_json::json;
use terraform_mcp_config::TerraformMcpConfig;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::io::DuplexStream;
use tokio::io::Lines;
use tokio::io::ReadHalf;
use tokio::sync::mpsc;

use super::JsonRpcRequest;
use super::McpServer;
use super::McpServerError;
use super::SERVER_NAME;
use super::parse_request;
use super::stdio::Framing;
use super::stdio::Inbound;
use super::stdio::StdioPeer;
use super::stdio::read_message;
use super::stdio::write_message;
use super::tool_error_result;
use crate::context::CallContext;
use crate::dynamic::NO_SESSION_MESSAGE;
use crate::elicitation::ElicitationError;
use crate::elicitation::ElicitationRequest;
use crate::elicitation::ElicitationResponse;
use crate::elicitation::Elicitor;
use crate::session::SessionId;
use crate::tfe::CredentialOverrides;
use crate::tfe::EnvLookup;
use crate::tools::ToolError;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn env(pairs: &[(&str, &str)]) -> EnvLookup {
    let map: HashMap<String, String> =
        pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
    Arc::new(move |key: &str| map.get(key).cloned())
}

const TOKEN_ENV: &[(&str, &str)] =
    &[("TFE_TOKEN", "test-token"), ("TFE_ADDRESS", "https://tfe.example.com")];

fn server_with(toolsets: &str, pairs: &[(&str, &str)]) -> McpServer {
    let mut config = TerraformMcpConfig::default();
    config.toolsets = vec![toolsets.to_string()];
    McpServer::with_env(config, env(pairs)).unwrap()
}

fn request(value: Value) -> JsonRpcRequest {
    serde_json::from_value(value).unwrap()
}

async fn call(server: &McpServer, context: CallContext, value: Value) -> (StatusCode, Value) {
    let (status, response) = server.dispatch(context, request(value)).await.unwrap();
    (status, serde_json::to_value(response).unwrap())
}

fn tool_names(result: &Value) -> Vec<String> {
    result["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// SECTION: Framing
// ============================================================================

fn reader(input: &str) -> BufReader<Cursor<Vec<u8>>> {
    BufReader::new(Cursor::new(input.as_bytes().to_vec()))
}

#[tokio::test]
async fn reads_newline_delimited_messages() {
    let mut input = reader("\n{\"a\":1}\n{\"b\":2}\n");
    let first = read_message(&mut input, 1024).await.unwrap();
    assert_eq!(
        first,
        Inbound::Message {
            framing: Framing::Ndjson,
            payload: b"{\"a\":1}".to_vec(),
        }
    );
    let second = read_message(&mut input, 1024).await.unwrap();
    assert!(matches!(second, Inbound::Message { framing: Framing::Ndjson, .. }));
    assert_eq!(read_message(&mut input, 1024).await.unwrap(), Inbound::Closed);
}

#[tokio::test]
async fn reads_content_length_frames() {
    let body = "{\"jsonrpc\":\"2.0\"}";
    let input = format!(
        "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    let message = read_message(&mut reader(&input), 1024).await.unwrap();
    assert_eq!(
        message,
        Inbound::Message {
            framing: Framing::ContentLength,
            payload: body.as_bytes().to_vec(),
        }
    );
}

#[tokio::test]
async fn rejects_duplicate_content_length() {
    let input = "Content-Length: 2\r\nContent-Length: 2\r\n\r\n{}";
    let result = read_message(&mut reader(input), 1024).await;
    assert!(matches!(result, Err(McpServerError::Transport(_))));
}

#[tokio::test]
async fn rejects_oversized_header_lines() {
    let input = format!("Content-Length: 2{}\r\n\r\n{{}}", " ".repeat(9000));
    let result = read_message(&mut reader(&input), 1024).await;
    assert!(matches!(result, Err(McpServerError::Transport(_))));
}

#[tokio::test]
async fn oversized_frames_are_skipped() {
    let big = "x".repeat(64);
    let input = format!("Content-Length: 64\r\n\r\n{big}{{\"small\":true}}\n");
    let mut input = reader(&input);
    assert_eq!(
        read_message(&mut input, 32).await.unwrap(),
        Inbound::Oversized {
            framing: Framing::ContentLength,
        }
    );
    let next = read_message(&mut input, 32).await.unwrap();
    assert_eq!(
        next,
        Inbound::Message {
            framing: Framing::Ndjson,
            payload: b"{\"small\":true}".to_vec(),
        }
    );
    let long_line = format!("{big}\n");
    assert_eq!(
        read_message(&mut reader(&long_line), 32).await.unwrap(),
        Inbound::Oversized {
            framing: Framing::Ndjson,
        }
    );
}

#[tokio::test]
async fn writes_in_the_requested_framing() {
    let mut ndjson = Vec::new();
    write_message(&mut ndjson, Framing::Ndjson, b"{}").await.unwrap();
    assert_eq!(ndjson, b"{}\n");
    let mut framed = Vec::new();
    write_message(&mut framed, Framing::ContentLength, b"{}").await.unwrap();
    assert_eq!(framed, b"Content-Length: 2\r\n\r\n{}");
}

// ============================================================================
// SECTION: Request Parsing
// ============================================================================

#[test]
fn parse_request_classifies_failures() {
    let (status, response) = parse_request(&[b' '; 16], 8).unwrap_err();
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.error.unwrap().code, -32070);

    let (status, response) = parse_request(b"{not json", 1024).unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error.unwrap().code, -32700);

    let (_, response) = parse_request(br#"{"jsonrpc":"2.0","id":4}"#, 1024).unwrap_err();
    assert_eq!(response.id, json!(4));
    assert_eq!(response.error.unwrap().code, -32600);

    let parsed = parse_request(br#"{"jsonrpc":"2.0","method":"ping"}"#, 1024).unwrap();
    assert!(parsed.id.is_none());
}

#[test]
fn caller_facing_tool_errors_become_error_results() {
    let result = tool_error_result(ToolError::NotFound("no such workspace".to_string())).unwrap();
    assert!(result.is_error);
    assert!(result.text_content().contains("no such workspace"));
    assert!(tool_error_result(ToolError::Elicitation("declined".to_string())).unwrap().is_error);

    let backend = tool_error_result(ToolError::Backend("status 500".to_string())).unwrap_err();
    assert_eq!(backend.code, -32050);
    let params = tool_error_result(ToolError::InvalidParams("bad".to_string())).unwrap_err();
    assert_eq!(params.code, -32602);
    let unknown = tool_error_result(ToolError::UnknownTool("x".to_string())).unwrap_err();
    assert_eq!(unknown.code, -32601);
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

#[tokio::test]
async fn initialize_reports_server_info_and_echoes_version() {
    let server = server_with("default", &[]);
    let (status, response) = call(
        &server,
        CallContext::detached(),
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"protocolVersion": "2025-03-26"},
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(response["result"]["capabilities"]["tools"]["listChanged"], true);
    assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);

    let (_, defaulted) = call(
        &server,
        CallContext::detached(),
        json!({"jsonrpc": "2.0", "id": 2, "method": "initialize"}),
    )
    .await;
    assert_eq!(defaulted["result"]["protocolVersion"], "2025-06-18");
}

#[tokio::test]
async fn protocol_errors_use_json_rpc_codes() {
    let server = server_with("default", &[]);
    let (status, unknown) =
        call(&server, CallContext::detached(), json!({"jsonrpc": "2.0", "id": 1, "method": "nope"}))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown["error"]["code"], -32601);

    let (_, version) =
        call(&server, CallContext::detached(), json!({"jsonrpc": "1.0", "id": 2, "method": "ping"}))
            .await;
    assert_eq!(version["error"]["code"], -32600);

    let (_, params) = call(
        &server,
        CallContext::detached(),
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": 5}}),
    )
    .await;
    assert_eq!(params["error"]["code"], -32602);

    let (_, ping) =
        call(&server, CallContext::detached(), json!({"jsonrpc": "2.0", "id": 4, "method": "ping"}))
            .await;
    assert_eq!(ping["result"], json!({}));

    let notification = server
        .dispatch(
            CallContext::detached(),
            request(json!({"jsonrpc": "2.0", "method": "notifications/initialized"})),
        )
        .await;
    assert!(notification.is_none());
}

#[tokio::test]
async fn public_registry_tools_are_listed_at_startup() {
    let server = server_with("default", &[]);
    let (_, response) = call(
        &server,
        CallContext::detached(),
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
    )
    .await;
    let names = tool_names(&response["result"]);
    assert_eq!(names.len(), 9);
    assert!(names.contains(&"search_modules".to_string()));
    assert!(names.contains(&"get_provider_capabilities".to_string()));
    assert!(names.contains(&"get_policy_details".to_string()));

    let (_, missing) = call(
        &server,
        CallContext::detached(),
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {"name": "list_workspaces", "arguments": {}},
        }),
    )
    .await;
    assert_eq!(missing["error"]["code"], -32601);
}

#[tokio::test]
async fn registry_toolset_off_skips_public_tools() {
    let server = server_with("terraform", &[]);
    assert!(server.catalog().is_empty());
}

#[tokio::test]
async fn gated_tools_reject_calls_without_a_session() {
    let server = server_with("all", TOKEN_ENV);
    let session = SessionId::from("s1");
    server.lifecycle().on_session_start(&CredentialOverrides::default(), &session);
    assert!(server.catalog().contains("list_workspaces"));

    let (status, response) = call(
        &server,
        CallContext::detached(),
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {"name": "list_workspaces", "arguments": {"terraform_org_name": "acme"}},
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["result"]["isError"], true);
    assert_eq!(response["result"]["content"][0]["text"], NO_SESSION_MESSAGE);
}

// ============================================================================
// SECTION: Stdio Session
// ============================================================================

type ClientLines = Lines<BufReader<ReadHalf<DuplexStream>>>;

/// Reads until a message with the given id, skipping notifications.
async fn next_response(lines: &mut ClientLines, id: Value) -> Value {
    loop {
        let line = lines.next_line().await.unwrap().expect("server closed the stream");
        let message: Value = serde_json::from_str(&line).unwrap();
        if message.get("id") == Some(&id) {
            return message;
        }
    }
}

#[tokio::test]
async fn stdio_session_registers_tools_and_ends_on_eof() {
    let server = server_with("all", TOKEN_ENV);
    let (client, transport) = tokio::io::duplex(256 * 1024);
    let (server_read, server_write) = tokio::io::split(transport);
    let serving = {
        let server = server.clone();
        tokio::spawn(async move { server.serve_io(server_read, server_write).await })
    };
    let (client_read, mut client_write) = tokio::io::split(client);
    let mut lines = BufReader::new(client_read).lines();

    client_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n")
        .await
        .unwrap();
    let initialized = next_response(&mut lines, json!(1)).await;
    assert_eq!(initialized["result"]["serverInfo"]["name"], SERVER_NAME);

    client_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
        .await
        .unwrap();
    client_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n")
        .await
        .unwrap();
    let listed = next_response(&mut lines, json!(2)).await;
    let names = tool_names(&listed["result"]);
    assert!(names.contains(&"list_workspaces".to_string()));
    assert!(names.contains(&"search_modules".to_string()));
    assert!(server.registry().has_any_authorized_session());
    assert_eq!(server.store().len(), 1);

    client_write.write_all(b"{not json}\n").await.unwrap();
    let parse_error = next_response(&mut lines, Value::Null).await;
    assert_eq!(parse_error["error"]["code"], -32700);

    client_write.shutdown().await.unwrap();
    serving.await.unwrap().unwrap();
    assert!(server.store().is_empty());
    assert!(!server.registry().has_any_authorized_session());
    assert!(server.registry().tools_registered());
}

#[tokio::test]
async fn stdio_replies_in_content_length_framing_when_asked() {
    let server = server_with("default", &[]);
    let (client, transport) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(transport);
    let serving = {
        let server = server.clone();
        tokio::spawn(async move { server.serve_io(server_read, server_write).await })
    };
    let (client_read, mut client_write) = tokio::io::split(client);
    let mut client_reader = BufReader::new(client_read);

    let body = "{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}";
    let frame = format!("Content-Length: {}\r\n\r\n{body}", body.len());
    client_write.write_all(frame.as_bytes()).await.unwrap();
    let reply = read_message(&mut client_reader, 1024).await.unwrap();
    let Inbound::Message {
        framing,
        payload,
    } = reply
    else {
        panic!("expected a framed reply");
    };
    assert_eq!(framing, Framing::ContentLength);
    let reply: Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(reply["id"], 9);
    assert_eq!(reply["result"], json!({}));

    client_write.shutdown().await.unwrap();
    serving.await.unwrap().unwrap();
}

// ============================================================================
// SECTION: Elicitation Peer
// ============================================================================

fn elicitation_request() -> ElicitationRequest {
    ElicitationRequest {
        message: "values please".to_string(),
        requested_schema: json!({"type": "object"}),
    }
}

#[tokio::test]
async fn stdio_peer_round_trips_elicitation() {
    let (sender, mut queue) = mpsc::unbounded_channel();
    let peer = Arc::new(StdioPeer::new(sender));
    peer.set_supported(true);

    let waiting = {
        let peer = Arc::clone(&peer);
        tokio::spawn(async move {
            peer.elicit(&CallContext::detached(), elicitation_request()).await
        })
    };
    let sent: Value = serde_json::from_slice(&queue.recv().await.unwrap()).unwrap();
    assert_eq!(sent["method"], "elicitation/create");
    assert_eq!(sent["params"]["message"], "values please");
    peer.resolve(json!({
        "jsonrpc": "2.0",
        "id": sent["id"],
        "result": {"action": "accept", "content": {"region": "eu"}},
    }));
    let answer = waiting.await.unwrap().unwrap();
    let ElicitationResponse::Accept(values) = answer else {
        panic!("expected accept");
    };
    assert_eq!(values["region"], "eu");
}

#[tokio::test]
async fn stdio_peer_requires_capability_and_open_channel() {
    let (sender, mut queue) = mpsc::unbounded_channel();
    let peer = Arc::new(StdioPeer::new(sender));
    let unsupported = peer.elicit(&CallContext::detached(), elicitation_request()).await;
    assert_eq!(unsupported.unwrap_err(), ElicitationError::Unsupported);

    peer.set_supported(true);
    let waiting = {
        let peer = Arc::clone(&peer);
        tokio::spawn(async move {
            peer.elicit(&CallContext::detached(), elicitation_request()).await
        })
    };
    queue.recv().await.unwrap();
    peer.close();
    assert_eq!(waiting.await.unwrap().unwrap_err(), ElicitationError::Closed);
}
