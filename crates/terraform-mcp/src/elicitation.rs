// crates/terraform-mcp/src/elicitation.rs
// ============================================================================
// Module: Elicitation
// Description: Mid-call structured input requests to the calling client.
// Purpose: Let tools ask the caller for values and route replies per session.
// Dependencies: async-trait, serde_json, tokio
// ============================================================================

//! ## Overview
//! A tool that needs more input pauses and sends an elicitation request to
//! the caller, which answers with accept (plus data), decline, or cancel.
//! [`Elicitor`] is the capability injected into such tools.
//! [`SessionElicitors`] routes each request to the peer registered for the
//! calling session; sessions without a peer (HTTP) get
//! [`ElicitationError::Unsupported`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::context::CallContext;
use crate::session::SessionId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Structured input request.
#[derive(Debug, Clone, PartialEq)]
pub struct ElicitationRequest {
    /// Message shown to the user.
    pub message: String,
    /// JSON schema of the requested object.
    pub requested_schema: Value,
}

impl ElicitationRequest {
    /// Encodes the request as `elicitation/create` params.
    #[must_use]
    pub fn to_params(&self) -> Value {
        json!({
            "message": self.message,
            "requestedSchema": self.requested_schema,
        })
    }
}

/// Caller's answer to an elicitation request.
#[derive(Debug, Clone, PartialEq)]
pub enum ElicitationResponse {
    /// Caller supplied the requested values.
    Accept(Map<String, Value>),
    /// Caller declined to supply values.
    Decline,
    /// Caller dismissed the request.
    Cancel,
}

impl ElicitationResponse {
    /// Decodes an `elicitation/create` result payload.
    ///
    /// # Errors
    ///
    /// Returns [`ElicitationError::Protocol`] for unknown actions or
    /// non-object accept content.
    pub fn from_result(result: &Value) -> Result<Self, ElicitationError> {
        let action = result.get("action").and_then(Value::as_str).unwrap_or_default();
        match action {
            "accept" => match result.get("content") {
                Some(Value::Object(content)) => Ok(Self::Accept(content.clone())),
                None | Some(Value::Null) => Ok(Self::Accept(Map::new())),
                Some(_) => Err(ElicitationError::Protocol(
                    "elicitation response content is not an object".to_string(),
                )),
            },
            "decline" => Ok(Self::Decline),
            "cancel" => Ok(Self::Cancel),
            other => Err(ElicitationError::Protocol(format!(
                "unexpected elicitation response action: {other}"
            ))),
        }
    }
}

// ============================================================================
// SECTION: Capability
// ============================================================================

/// Capability to request structured input from the caller mid-call.
#[async_trait]
pub trait Elicitor: Send + Sync {
    /// Sends a request and waits for the caller's answer.
    ///
    /// # Errors
    ///
    /// Returns [`ElicitationError`] when the request cannot be delivered or
    /// answered.
    async fn elicit(
        &self,
        context: &CallContext,
        request: ElicitationRequest,
    ) -> Result<ElicitationResponse, ElicitationError>;
}

/// Routes elicitation requests to the peer of the calling session.
#[derive(Default)]
pub struct SessionElicitors {
    /// Peers keyed by session.
    peers: RwLock<HashMap<SessionId, Arc<dyn Elicitor>>>,
}

impl SessionElicitors {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the peer for a session.
    pub fn attach(&self, session: SessionId, peer: Arc<dyn Elicitor>) {
        self.peers.write().unwrap_or_else(PoisonError::into_inner).insert(session, peer);
    }

    /// Removes the peer for a session.
    pub fn detach(&self, session: &SessionId) {
        self.peers.write().unwrap_or_else(PoisonError::into_inner).remove(session);
    }

    fn peer(&self, session: &SessionId) -> Option<Arc<dyn Elicitor>> {
        self.peers.read().unwrap_or_else(PoisonError::into_inner).get(session).cloned()
    }
}

#[async_trait]
impl Elicitor for SessionElicitors {
    async fn elicit(
        &self,
        context: &CallContext,
        request: ElicitationRequest,
    ) -> Result<ElicitationResponse, ElicitationError> {
        let session = context.session.as_ref().ok_or(ElicitationError::Unsupported)?;
        let peer = self.peer(session).ok_or(ElicitationError::Unsupported)?;
        peer.elicit(context, request).await
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Elicitation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ElicitationError {
    /// The calling client cannot answer elicitation requests.
    #[error("the client does not support elicitation")]
    Unsupported,
    /// The connection closed before an answer arrived.
    #[error("elicitation channel closed")]
    Closed,
    /// The client answered with an error or a malformed payload.
    #[error("elicitation protocol error: {0}")]
    Protocol(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
