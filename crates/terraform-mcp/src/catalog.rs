// crates/terraform-mcp/src/catalog.rs
// ============================================================================
// Module: Tool Catalog
// Description: Tool definitions, handlers, and the name-indexed tool catalog.
// Purpose: Provide the registration target and dispatch table for tools.
// Dependencies: async-trait, serde, serde_json, tokio
// ============================================================================

//! ## Overview
//! [`ToolCatalog`] is the serving runtime's view of callable tools. Tools are
//! only ever added, never removed; each addition bumps a change counter that
//! transports watch to emit `notifications/tools/list_changed`.
//! [`ToolRuntime`] is the narrow registration seam used by the dynamic
//! registry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;

use crate::context::CallContext;
use crate::tools::ToolError;

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// Behavior hints advertised with a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    /// Human-readable title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Tool does not modify state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    /// Tool may destroy state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    /// Repeating the call has no further effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    /// Tool talks to external systems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

/// Tool definition returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description for clients.
    pub description: String,
    /// JSON schema for tool input.
    pub input_schema: Value,
    /// Behavior hints.
    #[serde(default)]
    pub annotations: ToolAnnotations,
}

impl ToolDefinition {
    /// Creates a definition with an empty object schema.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
            annotations: ToolAnnotations::default(),
        }
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Sets the title annotation.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.annotations.title = Some(title.into());
        self
    }

    /// Marks the tool read-only and non-destructive.
    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.annotations.read_only_hint = Some(true);
        self.annotations.destructive_hint = Some(false);
        self
    }

    /// Marks the tool as mutating, with the given destructive hint.
    #[must_use]
    pub const fn mutating(mut self, destructive: bool) -> Self {
        self.annotations.read_only_hint = Some(false);
        self.annotations.destructive_hint = Some(destructive);
        self
    }

    /// Sets the open-world hint.
    #[must_use]
    pub const fn open_world(mut self) -> Self {
        self.annotations.open_world_hint = Some(true);
        self
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Tool output content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    /// Plain text output.
    Text {
        /// Text payload.
        text: String,
    },
}

/// Result of a tool call.
///
/// Caller-facing failures (such as missing credentials) are carried here with
/// `is_error` set instead of becoming JSON-RPC errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Output content.
    pub content: Vec<ToolContent>,
    /// True when the result describes a failure.
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: text.into(),
            }],
            is_error: false,
        }
    }

    /// Error result carrying a readable message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Successful result rendering a JSON value as pretty text.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Serialization`] when rendering fails.
    pub fn json(value: &Value) -> Result<Self, ToolError> {
        serde_json::to_string_pretty(value).map(Self::text).map_err(|_| ToolError::Serialization)
    }

    /// Returns all text content joined by newlines.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|content| match content {
                ToolContent::Text {
                    text,
                } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Executes a tool call.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs the tool with decoded context and raw arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] for invalid arguments or backend failures.
    async fn call(&self, context: &CallContext, arguments: Value)
    -> Result<CallToolResult, ToolError>;
}

/// Tool definition paired with its handler.
#[derive(Clone)]
pub struct ServerTool {
    /// Definition advertised to clients.
    pub definition: ToolDefinition,
    /// Handler invoked on call.
    pub handler: Arc<dyn ToolHandler>,
}

impl ServerTool {
    /// Pairs a definition with a handler.
    #[must_use]
    pub fn new(definition: ToolDefinition, handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            definition,
            handler,
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

impl fmt::Debug for ServerTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerTool").field("definition", &self.definition).finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Runtime Seam
// ============================================================================

/// Registration seam of the serving runtime.
pub trait ToolRuntime: Send + Sync {
    /// Registers a tool so later calls dispatch to its handler.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Duplicate`] when the name is already taken.
    fn add_tool(&self, tool: ServerTool) -> Result<(), CatalogError>;
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Name-indexed catalog of callable tools.
pub struct ToolCatalog {
    /// Registered tools.
    state: RwLock<CatalogState>,
    /// Change counter observed by transports.
    changes: watch::Sender<u64>,
}

/// Catalog contents in registration order.
#[derive(Default)]
struct CatalogState {
    /// Names in registration order.
    order: Vec<String>,
    /// Tools keyed by name.
    tools: HashMap<String, ServerTool>,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            state: RwLock::new(CatalogState::default()),
            changes,
        }
    }

    /// Returns definitions in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDefinition> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .order
            .iter()
            .filter_map(|name| state.tools.get(name))
            .map(|tool| tool.definition.clone())
            .collect()
    }

    /// Returns true when a tool with the name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).tools.contains_key(name)
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).order.len()
    }

    /// Returns true when no tool is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribes to catalog changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Dispatches a call to the named tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] for unregistered names, or the
    /// handler's error.
    pub async fn call(
        &self,
        context: &CallContext,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        let handler = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            state.tools.get(name).map(|tool| Arc::clone(&tool.handler))
        };
        let handler = handler.ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        handler.call(context, arguments).await
    }
}

impl ToolRuntime for ToolCatalog {
    fn add_tool(&self, tool: ServerTool) -> Result<(), CatalogError> {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.tools.contains_key(tool.name()) {
                return Err(CatalogError::Duplicate(tool.name().to_string()));
            }
            state.order.push(tool.name().to_string());
            state.tools.insert(tool.name().to_string(), tool);
        }
        self.changes.send_modify(|version| *version += 1);
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Catalog registration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A tool with the same name is already registered.
    #[error("tool already registered: {0}")]
    Duplicate(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
