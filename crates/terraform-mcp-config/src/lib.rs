// crates/terraform-mcp-config/src/lib.rs
// ============================================================================
// Module: Terraform MCP Config Library
// Description: Canonical config model, env overrides, and toolset selection.
// Purpose: Single source of truth for server configuration semantics.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `terraform-mcp-config` defines the configuration model for the Terraform
//! MCP server. Values come from an optional TOML file, are overridden by
//! environment variables, and are validated fail-closed before the server
//! starts. Toolset selection (which tool groups are exposed) lives here too so
//! the CLI and the server agree on its semantics.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod toolsets;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use toolsets::Toolset;
pub use toolsets::ToolsetSelection;
pub use toolsets::split_list;
