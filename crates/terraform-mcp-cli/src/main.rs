// crates/terraform-mcp-cli/src/main.rs
// ============================================================================
// Module: Terraform MCP CLI Entry Point
// Description: Command-line launcher for the Terraform MCP server.
// Purpose: Resolve configuration, install logging, and run the chosen transport.
// Dependencies: clap, terraform-mcp, terraform-mcp-config, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! `terraform-mcp-server` runs over stdio unless the `http` subcommand is
//! given. Configuration is loaded from the optional TOML file and the
//! environment, then command-line flags are applied on top. Logs go to
//! stderr (or `--log-file`) because stdout carries the stdio protocol.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use terraform_mcp::McpServer;
use terraform_mcp::McpServerError;
use terraform_mcp_config::ConfigError;
use terraform_mcp_config::ServerTransport;
use terraform_mcp_config::SessionMode;
use terraform_mcp_config::TerraformMcpConfig;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "terraform-mcp-server", version, about = "Terraform MCP server")]
struct Cli {
    /// Optional config file path (overrides `TERRAFORM_MCP_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Comma-separated toolsets to enable (`registry`, `registry-private`,
    /// `terraform`, `default`, `all`).
    #[arg(long, value_name = "LIST", global = true)]
    toolsets: Option<String>,
    /// Write logs to this file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,
    /// Transport to serve; stdio when omitted.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported transports.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve MCP over stdin/stdout.
    Stdio,
    /// Serve MCP over HTTP.
    Http(HttpCommand),
}

/// Options for the `http` subcommand.
#[derive(Args, Debug)]
struct HttpCommand {
    /// Bind host.
    #[arg(long, value_name = "HOST")]
    host: Option<String>,
    /// Bind port.
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,
    /// Endpoint path, e.g. `/mcp`.
    #[arg(long, value_name = "PATH")]
    endpoint: Option<String>,
    /// Start and end a session around every request.
    #[arg(long, action = ArgAction::SetTrue)]
    stateless: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI failures reported on stderr.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration could not be loaded.
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),
    /// Log file could not be opened.
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        /// Requested log path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Subscriber installation failed.
    #[error("failed to install logger: {0}")]
    Logging(String),
    /// Server initialization or transport failure.
    #[error(transparent)]
    Server(#[from] McpServerError),
}

/// Result alias for CLI operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mut stderr = std::io::stderr();
            let _ = writeln!(&mut stderr, "terraform-mcp-server: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration and serves until the transport closes.
async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let mut config = TerraformMcpConfig::load(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    init_logging(cli.log_file.as_deref())?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = config.server.transport.as_str(),
        "starting terraform-mcp-server"
    );
    let server = McpServer::from_config(config)?;
    server.serve().await?;
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Applies command-line flags on top of file and environment settings.
fn apply_overrides(config: &mut TerraformMcpConfig, cli: &Cli) {
    if let Some(toolsets) = cli.toolsets.as_deref().filter(|value| !value.trim().is_empty()) {
        config.toolsets = vec![toolsets.to_string()];
    }
    match &cli.command {
        Some(Commands::Stdio) => config.server.transport = ServerTransport::Stdio,
        Some(Commands::Http(http)) => {
            config.server.transport = ServerTransport::Http;
            if let Some(host) = &http.host {
                config.server.host.clone_from(host);
            }
            if let Some(port) = http.port {
                config.server.port = port;
            }
            if let Some(endpoint) = &http.endpoint {
                config.server.endpoint.clone_from(endpoint);
            }
            if http.stateless {
                config.server.session_mode = SessionMode::Stateless;
            }
        }
        None => {}
    }
}

/// Installs the fmt subscriber writing to stderr or `log_file`.
fn init_logging(log_file: Option<&Path>) -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder =
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_ansi(false);
    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path).map_err(
                |source| CliError::LogFile {
                    path: path.display().to_string(),
                    source,
                },
            )?;
            builder.with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|err| CliError::Logging(err.to_string()))
}
