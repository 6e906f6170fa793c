// crates/terraform-mcp/src/context.rs
// ============================================================================
// Module: Call Context
// Description: Per-call context handed to tool handlers.
// Purpose: Carry session attribution and credential overrides to tools.
// Dependencies: crate::session, crate::tfe
// ============================================================================

//! ## Overview
//! Every tool call receives a [`CallContext`]. The session is absent when the
//! call arrived without session attribution; authenticated tools reject such
//! calls.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::session::SessionId;
use crate::tfe::CredentialOverrides;

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Transport a call arrived on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallTransport {
    /// JSON-RPC over stdio.
    #[default]
    Stdio,
    /// JSON-RPC over HTTP.
    Http,
}

impl CallTransport {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

// ============================================================================
// SECTION: Call Context
// ============================================================================

/// Per-call context.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Calling session, when attributed.
    pub session: Option<SessionId>,
    /// Credential values supplied with the request.
    pub credentials: CredentialOverrides,
    /// Transport the call arrived on.
    pub transport: CallTransport,
    /// JSON-RPC request identifier for logging.
    pub request_id: Option<String>,
}

impl CallContext {
    /// Context with no session attached.
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    /// Context for a session.
    #[must_use]
    pub fn for_session(session: SessionId) -> Self {
        Self {
            session: Some(session),
            ..Self::default()
        }
    }

    /// Returns a copy with credential overrides set.
    #[must_use]
    pub fn with_credentials(mut self, credentials: CredentialOverrides) -> Self {
        self.credentials = credentials;
        self
    }

    /// Returns a copy with the transport set.
    #[must_use]
    pub const fn with_transport(mut self, transport: CallTransport) -> Self {
        self.transport = transport;
        self
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}
