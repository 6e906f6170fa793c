// crates/terraform-mcp/src/server/stdio.rs
// ============================================================================
// Module: Stdio Transport
// Description: Single-session JSON-RPC over a byte stream pair.
// Purpose: Serve one MCP client over stdin/stdout with elicitation support.
// Dependencies: tokio, serde_json, tracing
// ============================================================================

//! ## Overview
//! A stdio connection is one session whose credentials come from the
//! environment. Messages are newline-delimited JSON; `Content-Length` framed
//! input is accepted too, and replies use the framing of the first inbound
//! message. Tool calls run on their own tasks so elicitation replies can be
//! read while a call waits for them. End of input ends the session.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::warn;

use super::INVALID_REQUEST;
use super::JsonRpcError;
use super::JsonRpcResponse;
use super::McpServer;
use super::McpServerError;
use super::PARSE_ERROR;
use super::PAYLOAD_TOO_LARGE;
use super::request_from_value;
use crate::context::CallContext;
use crate::context::CallTransport;
use crate::elicitation::ElicitationError;
use crate::elicitation::ElicitationRequest;
use crate::elicitation::ElicitationResponse;
use crate::elicitation::Elicitor;
use crate::session::SessionId;
use crate::tfe::CredentialOverrides;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Longest accepted `Content-Length` header line.
const MAX_HEADER_LINE_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Framing
// ============================================================================

/// Wire framing of stdio messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Framing {
    /// One JSON document per line.
    Ndjson,
    /// `Content-Length` header block followed by the body.
    ContentLength,
}

/// Result of reading one inbound message.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Inbound {
    /// A complete message body.
    Message {
        /// Framing the message arrived in.
        framing: Framing,
        /// Raw message bytes.
        payload: Vec<u8>,
    },
    /// A message over the size limit; its bytes were consumed.
    Oversized {
        /// Framing the message arrived in.
        framing: Framing,
    },
    /// The input stream ended.
    Closed,
}

/// Reads the next message in either framing.
///
/// # Errors
///
/// Returns [`McpServerError::Transport`] for I/O failures and malformed
/// `Content-Length` headers.
pub(super) async fn read_message<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_body_bytes: usize,
) -> Result<Inbound, McpServerError> {
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .await
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        if bytes == 0 {
            return Ok(Inbound::Closed);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_frame_header(trimmed) {
            return read_framed_body(reader, line, max_body_bytes).await;
        }
        if trimmed.len() > max_body_bytes {
            return Ok(Inbound::Oversized {
                framing: Framing::Ndjson,
            });
        }
        return Ok(Inbound::Message {
            framing: Framing::Ndjson,
            payload: trimmed.as_bytes().to_vec(),
        });
    }
}

/// Returns true when a line opens a `Content-Length` header block.
fn is_frame_header(line: &str) -> bool {
    line.split_once(':').is_some_and(|(name, _)| {
        let name = name.trim();
        name.eq_ignore_ascii_case("content-length") || name.eq_ignore_ascii_case("content-type")
    })
}

/// Reads the rest of a header block and its body.
async fn read_framed_body<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    first_line: String,
    max_body_bytes: usize,
) -> Result<Inbound, McpServerError> {
    let mut content_length: Option<usize> = None;
    let mut line = first_line;
    loop {
        if line.len() > MAX_HEADER_LINE_BYTES {
            return Err(McpServerError::Transport("header line too long".to_string()));
        }
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            if content_length.is_some() {
                return Err(McpServerError::Transport("duplicate content length".to_string()));
            }
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| McpServerError::Transport("invalid content length".to_string()))?;
            content_length = Some(parsed);
        }
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .await
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        if bytes == 0 {
            return Err(McpServerError::Transport("stdio closed inside a frame".to_string()));
        }
        if line.trim().is_empty() {
            break;
        }
    }
    let len = content_length
        .ok_or_else(|| McpServerError::Transport("missing content length".to_string()))?;
    if len > max_body_bytes {
        let limit = u64::try_from(len).unwrap_or(u64::MAX);
        tokio::io::copy(&mut (&mut *reader).take(limit), &mut tokio::io::sink())
            .await
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        return Ok(Inbound::Oversized {
            framing: Framing::ContentLength,
        });
    }
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
    Ok(Inbound::Message {
        framing: Framing::ContentLength,
        payload,
    })
}

/// Writes one message in the given framing.
///
/// # Errors
///
/// Returns [`McpServerError::Transport`] when the write fails.
pub(super) async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    framing: Framing,
    payload: &[u8],
) -> Result<(), McpServerError> {
    let write_failed =
        |_: std::io::Error| McpServerError::Transport("stdio write failed".to_string());
    match framing {
        Framing::Ndjson => {
            writer.write_all(payload).await.map_err(write_failed)?;
            writer.write_all(b"\n").await.map_err(write_failed)?;
        }
        Framing::ContentLength => {
            let header = format!("Content-Length: {}\r\n\r\n", payload.len());
            writer.write_all(header.as_bytes()).await.map_err(write_failed)?;
            writer.write_all(payload).await.map_err(write_failed)?;
        }
    }
    writer.flush().await.map_err(write_failed)
}

// ============================================================================
// SECTION: Outbound Queue
// ============================================================================

/// Serialized outbound messages shared by the connection's tasks.
#[derive(Clone)]
struct Outbound {
    /// Queue drained by the writer task.
    sender: mpsc::UnboundedSender<Vec<u8>>,
}

impl Outbound {
    fn send_value(&self, value: &Value) {
        match serde_json::to_vec(value) {
            Ok(payload) => {
                if self.sender.send(payload).is_err() {
                    debug!("stdio writer closed; dropping outbound message");
                }
            }
            Err(err) => error!(error = %err, "outbound message serialization failed"),
        }
    }

    fn send_response(&self, response: &JsonRpcResponse) {
        match serde_json::to_value(response) {
            Ok(value) => self.send_value(&value),
            Err(err) => error!(error = %err, "json-rpc response serialization failed"),
        }
    }
}

/// Drains the outbound queue into the writer.
async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut queue: mpsc::UnboundedReceiver<Vec<u8>>,
    framing: Arc<OnceLock<Framing>>,
) -> Result<(), McpServerError> {
    while let Some(payload) = queue.recv().await {
        let framing = framing.get().copied().unwrap_or(Framing::Ndjson);
        write_message(&mut writer, framing, &payload).await?;
    }
    Ok(())
}

/// Forwards catalog changes as `notifications/tools/list_changed`.
async fn forward_list_changes(
    mut changes: watch::Receiver<u64>,
    outbound: Outbound,
    initialized: Arc<AtomicBool>,
) {
    while changes.changed().await.is_ok() {
        if initialized.load(Ordering::Acquire) {
            outbound.send_value(&json!({
                "jsonrpc": "2.0",
                "method": "notifications/tools/list_changed",
            }));
        }
    }
}

// ============================================================================
// SECTION: Elicitation Peer
// ============================================================================

/// Elicitation peer speaking to the stdio client.
pub(super) struct StdioPeer {
    /// Outbound message queue.
    outbound: Outbound,
    /// Replies awaited by in-flight requests, keyed by request id.
    pending: Mutex<HashMap<String, oneshot::Sender<Value>>>,
    /// Request id counter.
    next_id: AtomicU64,
    /// Set when the client advertised the elicitation capability.
    supported: AtomicBool,
}

impl StdioPeer {
    pub(super) fn new(sender: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self {
            outbound: Outbound {
                sender,
            },
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            supported: AtomicBool::new(false),
        }
    }

    pub(super) fn set_supported(&self, supported: bool) {
        self.supported.store(supported, Ordering::Release);
    }

    /// Hands a client reply to the request waiting on its id.
    pub(super) fn resolve(&self, message: Value) {
        let Some(id) = message.get("id").and_then(Value::as_str).map(ToString::to_string) else {
            debug!("dropping client reply without a string id");
            return;
        };
        let waiter = self.pending.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
        match waiter {
            Some(waiter) => {
                let _ = waiter.send(message);
            }
            None => debug!(request_id = %id, "dropping reply for unknown request"),
        }
    }

    /// Fails every waiting request.
    pub(super) fn close(&self) {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[async_trait]
impl Elicitor for StdioPeer {
    async fn elicit(
        &self,
        _context: &CallContext,
        request: ElicitationRequest,
    ) -> Result<ElicitationResponse, ElicitationError> {
        if !self.supported.load(Ordering::Acquire) {
            return Err(ElicitationError::Unsupported);
        }
        let id = format!("elicitation-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).insert(id.clone(), sender);
        self.outbound.send_value(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "elicitation/create",
            "params": request.to_params(),
        }));
        let reply = receiver.await.map_err(|_| ElicitationError::Closed)?;
        if let Some(error) = reply.get("error") {
            let message = error.get("message").and_then(Value::as_str).unwrap_or("client error");
            return Err(ElicitationError::Protocol(message.to_string()));
        }
        ElicitationResponse::from_result(reply.get("result").unwrap_or(&Value::Null))
    }
}

/// Returns true when `initialize` params advertise elicitation.
fn advertises_elicitation(params: Option<&Value>) -> bool {
    params
        .and_then(|params| params.pointer("/capabilities/elicitation"))
        .is_some_and(|capability| !capability.is_null())
}

// ============================================================================
// SECTION: Connection
// ============================================================================

/// Per-connection state shared by the read loop.
struct Connection {
    /// Session served by this connection.
    session: SessionId,
    /// Outbound message queue.
    outbound: Outbound,
    /// Elicitation peer for the session.
    peer: Arc<StdioPeer>,
    /// Framing fixed by the first inbound message.
    framing: Arc<OnceLock<Framing>>,
    /// Set once the client sent `notifications/initialized`.
    initialized: Arc<AtomicBool>,
}

impl McpServer {
    /// Serves one session over a reader/writer pair until end of input.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::Transport`] when reading, framing, or
    /// writing fails.
    pub async fn serve_io<R, W>(&self, reader: R, writer: W) -> Result<(), McpServerError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, queue) = mpsc::unbounded_channel();
        let outbound = Outbound {
            sender,
        };
        let framing = Arc::new(OnceLock::new());
        let writer_task = tokio::spawn(write_loop(writer, queue, Arc::clone(&framing)));

        let connection = Connection {
            session: SessionId::generate(),
            outbound: outbound.clone(),
            peer: Arc::new(StdioPeer::new(outbound.sender.clone())),
            framing,
            initialized: Arc::new(AtomicBool::new(false)),
        };
        let peer: Arc<dyn Elicitor> = Arc::clone(&connection.peer) as Arc<dyn Elicitor>;
        self.inner.elicitors.attach(connection.session.clone(), peer);
        let notifier = tokio::spawn(forward_list_changes(
            self.inner.catalog.subscribe(),
            outbound,
            Arc::clone(&connection.initialized),
        ));
        self.inner.lifecycle.on_session_start(&CredentialOverrides::default(), &connection.session);

        let mut reader = BufReader::new(reader);
        let result = self.read_loop(&mut reader, &connection).await;

        notifier.abort();
        self.inner.elicitors.detach(&connection.session);
        connection.peer.close();
        self.inner.lifecycle.on_session_end(&connection.session);
        drop(connection);
        let written = writer_task
            .await
            .map_err(|_| McpServerError::Transport("stdio writer task failed".to_string()))?;
        result.and(written)
    }

    /// Reads and routes inbound messages until end of input.
    async fn read_loop<R: AsyncBufRead + Unpin>(
        &self,
        reader: &mut R,
        connection: &Connection,
    ) -> Result<(), McpServerError> {
        let max_body_bytes = self.inner.config.server.max_body_bytes;
        loop {
            let payload = match read_message(reader, max_body_bytes).await? {
                Inbound::Closed => return Ok(()),
                Inbound::Oversized {
                    framing,
                } => {
                    connection.framing.get_or_init(|| framing);
                    warn!(limit = max_body_bytes, "dropping oversized stdio message");
                    let (_, response) =
                        JsonRpcError::new(PAYLOAD_TOO_LARGE, "request body too large")
                            .respond(Value::Null);
                    connection.outbound.send_response(&response);
                    continue;
                }
                Inbound::Message {
                    framing,
                    payload,
                } => {
                    connection.framing.get_or_init(|| framing);
                    payload
                }
            };
            match serde_json::from_slice::<Value>(&payload) {
                Ok(message) => self.route(message, connection).await,
                Err(_) => {
                    let (_, response) =
                        JsonRpcError::new(PARSE_ERROR, "parse error").respond(Value::Null);
                    connection.outbound.send_response(&response);
                }
            }
        }
    }

    /// Routes one parsed message; tool calls run on their own task.
    async fn route(&self, message: Value, connection: &Connection) {
        if message.get("method").is_none() {
            if message.get("id").is_some()
                && (message.get("result").is_some() || message.get("error").is_some())
            {
                connection.peer.resolve(message);
            } else {
                let id = message.get("id").cloned().unwrap_or(Value::Null);
                let (_, response) =
                    JsonRpcError::new(INVALID_REQUEST, "invalid json-rpc request").respond(id);
                connection.outbound.send_response(&response);
            }
            return;
        }
        let request = match request_from_value(message) {
            Ok(request) => request,
            Err((_, response)) => {
                connection.outbound.send_response(&response);
                return;
            }
        };
        match request.method.as_str() {
            "initialize" => {
                connection.peer.set_supported(advertises_elicitation(request.params.as_ref()));
            }
            "notifications/initialized" => {
                connection.initialized.store(true, Ordering::Release);
            }
            _ => {}
        }
        let context = CallContext::for_session(connection.session.clone())
            .with_transport(CallTransport::Stdio);
        if !request.is_tool_call() {
            if let Some((_, response)) = self.dispatch(context, request).await {
                connection.outbound.send_response(&response);
            }
            return;
        }
        let server = self.clone();
        let outbound = connection.outbound.clone();
        tokio::spawn(async move {
            if let Some((_, response)) = server.dispatch(context, request).await {
                outbound.send_response(&response);
            }
        });
    }
}
