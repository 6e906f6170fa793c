// crates/terraform-mcp/src/lifecycle.rs
// ============================================================================
// Module: Session Lifecycle
// Description: Session start/end hooks and per-call client resolution.
// Purpose: Bind TFE clients to sessions and keep authorization in step.
// Dependencies: tracing, crate::session, crate::tfe
// ============================================================================

//! ## Overview
//! On session start a client handle is built from the request context and
//! stored whether or not it is usable; the session is authorized only when
//! the handle is valid. On session end the client is removed first and the
//! session unauthorized second, so a concurrent gate promotion either sees
//! the client and is undone, or misses it and leaves the session out.
//!
//! [`SessionClients`] resolves the client for a single tool call, building
//! one on demand for sessions that never went through the start hook.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::context::CallContext;
use crate::session::SessionClientStore;
use crate::session::SessionId;
use crate::tfe::CredentialOverrides;
use crate::tfe::TfeClient;
use crate::tfe::TfeClientBuilder;
use crate::tools::ToolError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Guidance returned when a session has no usable client.
const MISSING_CLIENT_GUIDANCE: &str = "no valid Terraform Cloud/Enterprise client for this \
                                       session; set TFE_TOKEN and TFE_ADDRESS or pass them as \
                                       request headers";

// ============================================================================
// SECTION: Authorization Seam
// ============================================================================

/// Receiver of session authorization changes.
pub trait SessionAuthorizationSink: Send + Sync {
    /// Marks a session as authorized.
    fn register_session(&self, session: &SessionId);

    /// Removes a session's authorization.
    fn unregister_session(&self, session: &SessionId);
}

// ============================================================================
// SECTION: Session Clients
// ============================================================================

/// Store-backed client source for tool calls.
#[derive(Debug)]
pub struct SessionClients {
    /// Session-to-client bindings.
    store: Arc<SessionClientStore>,
    /// Client construction.
    builder: TfeClientBuilder,
}

impl SessionClients {
    /// Creates a client source over a shared store.
    #[must_use]
    pub const fn new(store: Arc<SessionClientStore>, builder: TfeClientBuilder) -> Self {
        Self {
            store,
            builder,
        }
    }

    /// Returns the shared store.
    #[must_use]
    pub const fn store(&self) -> &Arc<SessionClientStore> {
        &self.store
    }

    /// Returns the client builder.
    #[must_use]
    pub const fn builder(&self) -> &TfeClientBuilder {
        &self.builder
    }

    /// Resolves the TFE client for a tool call.
    ///
    /// A stored valid client is reused. With no stored entry, or an invalid
    /// one while the call carries a token, a handle is built from the call
    /// context and stored.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Unauthenticated`] when the call has no session or
    /// no valid client can be produced.
    pub fn client_for_call(&self, context: &CallContext) -> Result<TfeClient, ToolError> {
        let session = context.session.as_ref().ok_or_else(|| {
            ToolError::Unauthenticated("no active session for this call".to_string())
        })?;
        let handle = match self.store.get(session) {
            Some(handle) if handle.is_valid() || !context.credentials.has_token() => handle,
            _ => {
                let handle = self.builder.build_from(&context.credentials);
                debug!(session_id = %session, valid = handle.is_valid(), "built client on demand");
                self.store.put(session.clone(), handle.clone());
                Arc::new(handle)
            }
        };
        handle.client().cloned().ok_or_else(|| {
            let reason = handle.failure().unwrap_or("client unavailable");
            ToolError::Unauthenticated(format!("{MISSING_CLIENT_GUIDANCE} ({reason})"))
        })
    }
}

// ============================================================================
// SECTION: Lifecycle Hooks
// ============================================================================

/// Session start/end hooks.
pub struct SessionLifecycle {
    /// Client source and store.
    clients: Arc<SessionClients>,
    /// Authorization receiver.
    sink: Arc<dyn SessionAuthorizationSink>,
}

impl SessionLifecycle {
    /// Creates lifecycle hooks.
    #[must_use]
    pub fn new(clients: Arc<SessionClients>, sink: Arc<dyn SessionAuthorizationSink>) -> Self {
        Self {
            clients,
            sink,
        }
    }

    /// Returns the client source.
    #[must_use]
    pub const fn clients(&self) -> &Arc<SessionClients> {
        &self.clients
    }

    /// Handles session registration.
    ///
    /// Always stores the built handle; authorizes only when it is valid.
    pub fn on_session_start(&self, credentials: &CredentialOverrides, session: &SessionId) {
        let handle = self.clients.builder().build_from(credentials);
        let valid = handle.is_valid();
        let failure = handle.failure().map(ToString::to_string);
        self.clients.store().put(session.clone(), handle);
        if valid {
            self.sink.register_session(session);
            info!(session_id = %session, "session started with valid TFE client");
        } else {
            warn!(
                session_id = %session,
                reason = failure.as_deref().unwrap_or("unknown"),
                "session started without a valid TFE client; TFE tools unavailable"
            );
        }
    }

    /// Handles session unregistration.
    pub fn on_session_end(&self, session: &SessionId) {
        self.clients.store().delete(session);
        self.sink.unregister_session(session);
        info!(session_id = %session, "session ended");
    }

    /// Rebuilds a session's client from call credentials.
    ///
    /// Applies only when the call carries a token and the session has no
    /// valid stored client. Returns true when the session became authorized.
    pub fn refresh_from_context(&self, context: &CallContext) -> bool {
        let Some(session) = context.session.as_ref() else {
            return false;
        };
        if !context.credentials.has_token() || self.clients.store().has_valid_client(session) {
            return false;
        }
        let handle = self.clients.builder().build_from(&context.credentials);
        if !handle.is_valid() {
            debug!(session_id = %session, "request credentials did not produce a valid client");
            return false;
        }
        self.clients.store().put(session.clone(), handle);
        self.sink.register_session(session);
        info!(session_id = %session, "session authorized from request credentials");
        true
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
