// crates/terraform-mcp/src/dynamic.rs
// ============================================================================
// Module: Dynamic Tool Registry
// Description: Session authorization set and one-shot authenticated tool registration.
// Purpose: Expose TFE tools once any session is authorized and gate every call.
// Dependencies: async-trait, tracing, crate::catalog, crate::session
// ============================================================================

//! ## Overview
//! The registry tracks which sessions are authorized. The first authorized
//! session triggers a single registration pass that adds every enabled
//! authenticated tool to the runtime. Registered tools are visible to all
//! sessions, so each one is wrapped in a [`GatedToolHandler`] that re-checks
//! the calling session on every call.
//!
//! The authorized set and the registration flag share one lock; registration
//! happens under the write lock so concurrent first sessions cannot race into
//! a second pass. Gate promotion re-reads the client store under that same
//! lock, which pairs with the lifecycle removing the client before the
//! session leaves the set. Tools are never removed.
//!
//! Security posture: the tool list is process wide, the gate is the only
//! per-session boundary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::Weak;

use async_trait::async_trait;
use serde_json::Value;
use terraform_mcp_config::ToolsetSelection;
use tracing::error;
use tracing::info;

use crate::audit::GateAuditEvent;
use crate::audit::GateAuditSink;
use crate::audit::GatePath;
use crate::catalog::CallToolResult;
use crate::catalog::ServerTool;
use crate::catalog::ToolHandler;
use crate::catalog::ToolRuntime;
use crate::context::CallContext;
use crate::elicitation::Elicitor;
use crate::lifecycle::SessionAuthorizationSink;
use crate::session::SessionClientStore;
use crate::session::SessionId;
use crate::tools::ToolError;
use crate::tools::ToolName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Result text for calls without a session.
pub const NO_SESSION_MESSAGE: &str = "no active session: this tool requires an active session \
                                      with valid Terraform Cloud/Enterprise configuration";

/// Result text for sessions without a valid client.
pub const UNAUTHORIZED_MESSAGE: &str = "This tool is not available. This tool requires a valid \
                                        Terraform Cloud/Enterprise token and configuration. \
                                        Please ensure TFE_TOKEN and TFE_ADDRESS environment \
                                        variables are properly set.";

/// Result text when the registry is gone.
const REGISTRY_UNAVAILABLE_MESSAGE: &str = "tool registry is no longer available";

// ============================================================================
// SECTION: Tool Factories
// ============================================================================

/// Builds a tool that needs no extra capability.
pub type PlainFactory = Box<dyn Fn() -> ServerTool + Send + Sync>;

/// Builds a tool that asks the caller for input mid-call.
pub type ElicitationFactory = Box<dyn Fn(Arc<dyn Elicitor>) -> ServerTool + Send + Sync>;

/// Tool construction variants.
pub enum ToolFactory {
    /// Plain tool.
    Plain(PlainFactory),
    /// Tool requiring the elicitation capability.
    Elicitation(ElicitationFactory),
}

/// Authenticated tool known ahead of registration.
pub struct AuthenticatedTool {
    /// Tool name, also used for toolset filtering.
    name: ToolName,
    /// Construction.
    factory: ToolFactory,
}

impl AuthenticatedTool {
    /// Declares a plain tool.
    #[must_use]
    pub fn plain(name: ToolName, factory: impl Fn() -> ServerTool + Send + Sync + 'static) -> Self {
        Self {
            name,
            factory: ToolFactory::Plain(Box::new(factory)),
        }
    }

    /// Declares a tool that requires the elicitation capability.
    #[must_use]
    pub fn with_elicitation(
        name: ToolName,
        factory: impl Fn(Arc<dyn Elicitor>) -> ServerTool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            factory: ToolFactory::Elicitation(Box::new(factory)),
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub const fn name(&self) -> ToolName {
        self.name
    }

    /// Returns true when the tool needs the elicitation capability.
    #[must_use]
    pub const fn requires_elicitation(&self) -> bool {
        matches!(self.factory, ToolFactory::Elicitation(_))
    }

    fn build(&self, elicitor: &Arc<dyn Elicitor>) -> ServerTool {
        match &self.factory {
            ToolFactory::Plain(factory) => factory(),
            ToolFactory::Elicitation(factory) => factory(Arc::clone(elicitor)),
        }
    }
}

impl fmt::Debug for AuthenticatedTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedTool")
            .field("name", &self.name)
            .field("requires_elicitation", &self.requires_elicitation())
            .finish()
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry construction inputs.
pub struct RegistryDeps {
    /// Registration target.
    pub runtime: Arc<dyn ToolRuntime>,
    /// Store consulted by the gate fallback.
    pub store: Arc<SessionClientStore>,
    /// Enabled toolsets.
    pub toolsets: ToolsetSelection,
    /// Elicitation capability handed to elicitation tools.
    pub elicitor: Arc<dyn Elicitor>,
    /// Gate decision sink.
    pub audit: Arc<dyn GateAuditSink>,
    /// Authenticated tools, already filtered by the operations switch.
    pub tools: Vec<AuthenticatedTool>,
}

/// Authorization state guarded by one lock.
#[derive(Debug, Default)]
struct RegistryState {
    /// Authorized sessions.
    authorized: HashSet<SessionId>,
    /// Set once the registration pass has run.
    tools_registered: bool,
}

/// Tracks authorized sessions and registers authenticated tools once.
pub struct DynamicToolRegistry {
    /// Authorized set and registration flag.
    state: RwLock<RegistryState>,
    /// Registration target.
    runtime: Arc<dyn ToolRuntime>,
    /// Store consulted by the gate fallback.
    store: Arc<SessionClientStore>,
    /// Enabled toolsets.
    toolsets: ToolsetSelection,
    /// Elicitation capability.
    elicitor: Arc<dyn Elicitor>,
    /// Gate decision sink.
    audit: Arc<dyn GateAuditSink>,
    /// Authenticated tool factories.
    tools: Vec<AuthenticatedTool>,
    /// Handle given to gated handlers.
    this: Weak<Self>,
}

impl DynamicToolRegistry {
    /// Creates a registry.
    #[must_use]
    pub fn new(deps: RegistryDeps) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            state: RwLock::new(RegistryState::default()),
            runtime: deps.runtime,
            store: deps.store,
            toolsets: deps.toolsets,
            elicitor: deps.elicitor,
            audit: deps.audit,
            tools: deps.tools,
            this: Weak::clone(this),
        })
    }

    /// Authorizes a session, registering tools on the first call.
    pub fn register_session(&self, session: &SessionId) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        self.authorize_locked(&mut state, session);
    }

    /// Authorizes a session only if the store still holds a valid client.
    ///
    /// The store is checked under the write lock, so a session whose client
    /// was removed by a concurrent session end is not re-admitted.
    #[must_use]
    pub fn promote_session(&self, session: &SessionId) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !self.store.has_valid_client(session) {
            return false;
        }
        self.authorize_locked(&mut state, session);
        true
    }

    /// Removes a session's authorization; registered tools stay.
    pub fn unregister_session(&self, session: &SessionId) {
        self.state.write().unwrap_or_else(PoisonError::into_inner).authorized.remove(session);
    }

    /// Returns true when the session is authorized.
    #[must_use]
    pub fn is_session_authorized(&self, session: &SessionId) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).authorized.contains(session)
    }

    /// Returns true when at least one session is authorized.
    #[must_use]
    pub fn has_any_authorized_session(&self) -> bool {
        !self.state.read().unwrap_or_else(PoisonError::into_inner).authorized.is_empty()
    }

    /// Returns true once the registration pass has run.
    #[must_use]
    pub fn tools_registered(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).tools_registered
    }

    /// Returns the names this registry would register.
    #[must_use]
    pub fn enabled_tools(&self) -> Vec<ToolName> {
        self.tools
            .iter()
            .map(AuthenticatedTool::name)
            .filter(|name| self.toolsets.is_enabled(name.toolset()))
            .collect()
    }

    /// Inserts a session and runs the registration pass once.
    fn authorize_locked(&self, state: &mut RegistryState, session: &SessionId) {
        state.authorized.insert(session.clone());
        if state.tools_registered {
            return;
        }
        let registered = self.register_tools();
        state.tools_registered = true;
        info!(session_id = %session, tools = registered, "registered authenticated tools");
    }

    /// Runs the registration pass; caller holds the write lock.
    fn register_tools(&self) -> usize {
        let mut registered = 0;
        for tool in &self.tools {
            if !self.toolsets.is_enabled(tool.name().toolset()) {
                continue;
            }
            let inner = tool.build(&self.elicitor);
            let gated = GatedToolHandler {
                tool: tool.name(),
                inner: Arc::clone(&inner.handler),
                registry: Weak::clone(&self.this),
                audit: Arc::clone(&self.audit),
            };
            let server_tool = ServerTool::new(inner.definition, Arc::new(gated));
            match self.runtime.add_tool(server_tool) {
                Ok(()) => registered += 1,
                Err(err) => error!(tool = %tool.name(), error = %err, "tool registration rejected"),
            }
        }
        registered
    }

    /// Resolves the gate path for a session.
    fn authorize_call(&self, session: &SessionId) -> GatePath {
        if self.is_session_authorized(session) {
            return GatePath::AuthorizedSet;
        }
        if self.promote_session(session) {
            return GatePath::StoreFallback;
        }
        GatePath::NoClient
    }
}

impl SessionAuthorizationSink for DynamicToolRegistry {
    fn register_session(&self, session: &SessionId) {
        Self::register_session(self, session);
    }

    fn unregister_session(&self, session: &SessionId) {
        Self::unregister_session(self, session);
    }
}

// ============================================================================
// SECTION: Gated Handler
// ============================================================================

/// Per-call authorization wrapper around an authenticated tool handler.
pub struct GatedToolHandler {
    /// Wrapped tool name.
    tool: ToolName,
    /// Wrapped handler.
    inner: Arc<dyn ToolHandler>,
    /// Owning registry.
    registry: Weak<DynamicToolRegistry>,
    /// Gate decision sink.
    audit: Arc<dyn GateAuditSink>,
}

impl GatedToolHandler {
    fn deny(&self, context: &CallContext, path: GatePath, message: &str) -> CallToolResult {
        self.audit.record(&GateAuditEvent::new(context, self.tool.as_str(), path));
        CallToolResult::error(message)
    }
}

#[async_trait]
impl ToolHandler for GatedToolHandler {
    async fn call(
        &self,
        context: &CallContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let Some(session) = context.session.as_ref() else {
            return Ok(self.deny(context, GatePath::NoSession, NO_SESSION_MESSAGE));
        };
        let path = match self.registry.upgrade() {
            Some(registry) => registry.authorize_call(session),
            None => GatePath::RegistryUnavailable,
        };
        if !path.is_allowed() {
            let message = if path == GatePath::RegistryUnavailable {
                REGISTRY_UNAVAILABLE_MESSAGE
            } else {
                UNAUTHORIZED_MESSAGE
            };
            return Ok(self.deny(context, path, message));
        }
        self.audit.record(&GateAuditEvent::new(context, self.tool.as_str(), path));
        self.inner.call(context, arguments).await
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
