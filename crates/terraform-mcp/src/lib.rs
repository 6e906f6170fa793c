// crates/terraform-mcp/src/lib.rs
// ============================================================================
// Module: Terraform MCP
// Description: MCP server core for Terraform Cloud/Enterprise and the registry.
// Purpose: Session-scoped TFE clients, dynamic tool registration, and gating.
// Dependencies: terraform-mcp-config, axum, reqwest, tokio, tracing
// ============================================================================

//! ## Overview
//! Terraform MCP exposes Terraform Cloud/Enterprise and the public Terraform
//! registry as MCP tools. Each session owns one TFE client built from its
//! credentials ([`session`], [`lifecycle`]). Authenticated tools are
//! registered once, when the first session with a valid client appears, and
//! every call to them is re-checked against the calling session
//! ([`dynamic`]). Security posture: the tool list is shared by all sessions;
//! the per-call gate is the only per-session boundary.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod catalog;
pub mod context;
pub mod dynamic;
pub mod elicitation;
pub mod lifecycle;
pub mod registry_client;
pub mod server;
pub mod session;
pub mod tfe;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::GateAuditEvent;
pub use audit::GateAuditSink;
pub use audit::GatePath;
pub use audit::NoopGateAuditSink;
pub use audit::TracingGateAuditSink;
pub use catalog::CallToolResult;
pub use catalog::ServerTool;
pub use catalog::ToolCatalog;
pub use catalog::ToolDefinition;
pub use catalog::ToolHandler;
pub use catalog::ToolRuntime;
pub use context::CallContext;
pub use context::CallTransport;
pub use dynamic::AuthenticatedTool;
pub use dynamic::DynamicToolRegistry;
pub use dynamic::GatedToolHandler;
pub use dynamic::RegistryDeps;
pub use elicitation::Elicitor;
pub use elicitation::SessionElicitors;
pub use lifecycle::SessionAuthorizationSink;
pub use lifecycle::SessionClients;
pub use lifecycle::SessionLifecycle;
pub use registry_client::RegistryClient;
pub use server::McpServer;
pub use server::McpServerError;
pub use session::SessionClientStore;
pub use session::SessionId;
pub use tfe::CredentialOverrides;
pub use tfe::EnvLookup;
pub use tfe::TfeClient;
pub use tfe::TfeClientBuilder;
pub use tfe::TfeClientHandle;
pub use tfe::TfeSettings;
pub use tools::ToolError;
pub use tools::ToolName;
