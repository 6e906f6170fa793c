// crates/terraform-mcp/src/tools/organizations.rs
// ============================================================================
// Module: Organization Tools
// Description: Organization and project listing.
// Purpose: Entry points for discovering where workspaces live.
// Dependencies: serde, crate::tfe
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;

use super::InputSchema;
use super::Pagination;
use super::ToolError;
use super::ToolName;
use super::list_result;
use super::require_non_empty;
use super::tfe_tool;
use crate::catalog::CallToolResult;
use crate::catalog::ServerTool;
use crate::catalog::ToolDefinition;
use crate::lifecycle::SessionClients;
use crate::tfe::TfeClient;

// ============================================================================
// SECTION: list_terraform_orgs
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListOrgsArgs {
    #[serde(flatten)]
    pagination: Pagination,
}

pub(crate) fn list_terraform_orgs(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::ListTerraformOrgs.as_str(),
        "List the Terraform Cloud/Enterprise organizations the token can access.",
    )
    .with_title("List Terraform organizations")
    .with_schema(InputSchema::new().pagination().build())
    .read_only()
    .open_world();
    tfe_tool(definition, clients, run_list_orgs)
}

async fn run_list_orgs(client: TfeClient, args: ListOrgsArgs) -> Result<CallToolResult, ToolError> {
    let query = args.pagination.query()?;
    let body = client.get(&["api", "v2", "organizations"], &query).await?;
    list_result(&body)
}

// ============================================================================
// SECTION: list_terraform_projects
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListProjectsArgs {
    terraform_org_name: String,
    #[serde(flatten)]
    pagination: Pagination,
}

pub(crate) fn list_terraform_projects(clients: Arc<SessionClients>) -> ServerTool {
    let definition = ToolDefinition::new(
        ToolName::ListTerraformProjects.as_str(),
        "List the projects of a Terraform organization.",
    )
    .with_title("List Terraform projects")
    .with_schema(
        InputSchema::new()
            .required_string("terraform_org_name", "Terraform organization name")
            .pagination()
            .build(),
    )
    .read_only()
    .open_world();
    tfe_tool(definition, clients, run_list_projects)
}

async fn run_list_projects(
    client: TfeClient,
    args: ListProjectsArgs,
) -> Result<CallToolResult, ToolError> {
    let organization = require_non_empty("terraform_org_name", &args.terraform_org_name)?;
    let query = args.pagination.query()?;
    let body =
        client.get(&["api", "v2", "organizations", organization, "projects"], &query).await?;
    list_result(&body)
}
