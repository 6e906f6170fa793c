// crates/terraform-mcp/src/audit.rs
// ============================================================================
// Module: Gate Audit
// Description: Audit events for per-call authorization gate decisions.
// Purpose: Record every allow/deny decision of authenticated tool calls.
// Dependencies: serde, tracing
// ============================================================================

//! ## Overview
//! The per-call gate reports each decision as a [`GateAuditEvent`]. The
//! default sink emits structured `tracing` events; tests swap in a recording
//! or no-op sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::context::CallContext;

// ============================================================================
// SECTION: Decision Path
// ============================================================================

/// How the gate reached its decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePath {
    /// Session was already in the authorized set.
    AuthorizedSet,
    /// Session was promoted after the store held a valid client.
    StoreFallback,
    /// Call carried no session.
    NoSession,
    /// Session had no valid client.
    NoClient,
    /// Registry was dropped while the tool was still registered.
    RegistryUnavailable,
}

impl GatePath {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizedSet => "authorized_set",
            Self::StoreFallback => "store_fallback",
            Self::NoSession => "no_session",
            Self::NoClient => "no_client",
            Self::RegistryUnavailable => "registry_unavailable",
        }
    }

    /// Returns true when the path allows the call.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::AuthorizedSet | Self::StoreFallback)
    }
}

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Gate audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Decision outcome.
    pub decision: &'static str,
    /// Decision path.
    pub path: GatePath,
    /// Tool name.
    pub tool: String,
    /// Calling session.
    pub session_id: Option<String>,
    /// Transport label.
    pub transport: &'static str,
    /// Request identifier (if provided).
    pub request_id: Option<String>,
}

impl GateAuditEvent {
    /// Builds an event for a gate decision.
    #[must_use]
    pub fn new(context: &CallContext, tool: &str, path: GatePath) -> Self {
        Self {
            event: "mcp_tool_gate",
            decision: if path.is_allowed() { "allow" } else { "deny" },
            path,
            tool: tool.to_string(),
            session_id: context.session.as_ref().map(ToString::to_string),
            transport: context.transport.as_str(),
            request_id: context.request_id.clone(),
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for gate decisions.
pub trait GateAuditSink: Send + Sync {
    /// Record a gate audit event.
    fn record(&self, event: &GateAuditEvent);
}

/// Audit sink that emits `tracing` events.
pub struct TracingGateAuditSink;

impl GateAuditSink for TracingGateAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        if event.path.is_allowed() {
            info!(
                event = event.event,
                decision = event.decision,
                path = event.path.as_str(),
                tool = %event.tool,
                session_id = event.session_id.as_deref(),
                transport = event.transport,
                request_id = event.request_id.as_deref(),
                "tool gate decision"
            );
        } else {
            warn!(
                event = event.event,
                decision = event.decision,
                path = event.path.as_str(),
                tool = %event.tool,
                session_id = event.session_id.as_deref(),
                transport = event.transport,
                request_id = event.request_id.as_deref(),
                "tool gate decision"
            );
        }
    }
}

/// No-op audit sink.
pub struct NoopGateAuditSink;

impl GateAuditSink for NoopGateAuditSink {
    fn record(&self, _event: &GateAuditEvent) {}
}
