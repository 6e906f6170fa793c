// crates/terraform-mcp/src/catalog/tests.rs
// ============================================================================
// Module: Tool Catalog Unit Tests
// Description: Tool registration, listing, dispatch, and result encoding.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use serde_json::json;

use super::*;

struct Echo;

#[async_trait]
impl ToolHandler for Echo {
    async fn call(
        &self,
        _context: &CallContext,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        CallToolResult::json(&arguments)
    }
}

fn echo(name: &str) -> ServerTool {
    ServerTool::new(ToolDefinition::new(name, "echo"), Arc::new(Echo))
}

#[tokio::test]
async fn dispatches_to_registered_handler() {
    let catalog = ToolCatalog::new();
    catalog.add_tool(echo("echo")).unwrap();
    let result =
        catalog.call(&CallContext::detached(), "echo", json!({"a": 1})).await.unwrap();
    assert!(!result.is_error);
    assert!(result.text_content().contains("\"a\": 1"));
    let missing = catalog.call(&CallContext::detached(), "nope", Value::Null).await;
    assert_eq!(missing.unwrap_err(), ToolError::UnknownTool("nope".to_string()));
}

#[test]
fn duplicate_names_are_rejected_and_order_is_kept() {
    let catalog = ToolCatalog::new();
    catalog.add_tool(echo("b")).unwrap();
    catalog.add_tool(echo("a")).unwrap();
    assert_eq!(catalog.add_tool(echo("b")), Err(CatalogError::Duplicate("b".to_string())));
    let names: Vec<String> = catalog.list().into_iter().map(|tool| tool.name).collect();
    assert_eq!(names, vec!["b", "a"]);
}

#[test]
fn additions_bump_the_change_counter() {
    let catalog = ToolCatalog::new();
    let receiver = catalog.subscribe();
    catalog.add_tool(echo("one")).unwrap();
    catalog.add_tool(echo("two")).unwrap();
    assert_eq!(*receiver.borrow(), 2);
}

#[test]
fn definitions_serialize_with_mcp_field_names() {
    let definition = ToolDefinition::new("t", "d").with_title("T").mutating(true).open_world();
    let value = serde_json::to_value(&definition).unwrap();
    assert_eq!(value["inputSchema"]["type"], "object");
    assert_eq!(value["annotations"]["destructiveHint"], true);
    assert_eq!(value["annotations"]["readOnlyHint"], false);
    assert_eq!(value["annotations"]["openWorldHint"], true);
    let error = serde_json::to_value(CallToolResult::error("bad")).unwrap();
    assert_eq!(error["isError"], true);
    assert_eq!(error["content"][0]["type"], "text");
}
