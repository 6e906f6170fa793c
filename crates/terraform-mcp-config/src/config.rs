// crates/terraform-mcp-config/src/config.rs
// ============================================================================
// Module: Terraform MCP Configuration
// Description: Configuration loading, env overrides, and validation.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from an optional TOML file with strict size and
//! path limits, then overridden by environment variables, then validated.
//! Environment access goes through an injectable lookup so tests never touch
//! the process environment.
//!
//! The TFE API token is never read from the config file. It is resolved per
//! session from request context or `TFE_TOKEN`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::toolsets::ToolsetSelection;
use crate::toolsets::split_list;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable used to point at a config file.
pub const CONFIG_ENV_VAR: &str = "TERRAFORM_MCP_CONFIG";
/// Environment variable selecting the transport (`stdio` or `http`).
pub const TRANSPORT_MODE_ENV: &str = "TRANSPORT_MODE";
/// Environment variable overriding the HTTP bind host.
pub const TRANSPORT_HOST_ENV: &str = "TRANSPORT_HOST";
/// Environment variable overriding the HTTP bind port.
pub const TRANSPORT_PORT_ENV: &str = "TRANSPORT_PORT";
/// Environment variable overriding the HTTP endpoint path.
pub const MCP_ENDPOINT_ENV: &str = "MCP_ENDPOINT";
/// Environment variable selecting stateful or stateless HTTP sessions.
pub const MCP_SESSION_MODE_ENV: &str = "MCP_SESSION_MODE";
/// Environment variable enabling destructive TFE operations.
pub const ENABLE_TF_OPERATIONS_ENV: &str = "ENABLE_TF_OPERATIONS";
/// Environment variable carrying the TFE address.
pub const TFE_ADDRESS_ENV: &str = "TFE_ADDRESS";
/// Environment variable carrying the TFE API token.
pub const TFE_TOKEN_ENV: &str = "TFE_TOKEN";
/// Environment variable disabling TLS verification for TFE.
pub const TFE_SKIP_VERIFY_ENV: &str = "TFE_SKIP_VERIFY";
/// Environment variable overriding the public registry base URL.
pub const TERRAFORM_REGISTRY_URL_ENV: &str = "TERRAFORM_REGISTRY_URL";

/// Default TFE address.
pub const DEFAULT_TFE_ADDRESS: &str = "https://app.terraform.io";
/// Default public registry base URL.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.terraform.io";
/// Default HTTP bind host.
const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
/// Default HTTP bind port.
const DEFAULT_HTTP_PORT: u16 = 8080;
/// Default HTTP endpoint path.
const DEFAULT_ENDPOINT: &str = "/mcp";
/// Default maximum request body size.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Upper bound on the request body size.
const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Default outbound request timeout.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Upper bound on outbound request timeouts.
const MAX_REQUEST_TIMEOUT_MS: u64 = 5 * 60 * 1000;
/// Default retry count for retryable TFE responses.
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Upper bound on retry count.
const MAX_RETRIES_LIMIT: u32 = 10;
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Root server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerraformMcpConfig {
    /// Transport and session settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Terraform Cloud/Enterprise settings.
    #[serde(default)]
    pub tfe: TfeConfig,
    /// Public registry settings.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Enabled toolset names.
    #[serde(default = "default_toolsets")]
    pub toolsets: Vec<String>,
}

impl Default for TerraformMcpConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            tfe: TfeConfig::default(),
            registry: RegistryConfig::default(),
            toolsets: default_toolsets(),
        }
    }
}

/// Transport selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerTransport {
    /// JSON-RPC over stdin/stdout.
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST.
    Http,
}

impl ServerTransport {
    /// Parses a transport name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stdio" => Some(Self::Stdio),
            "http" | "streamable-http" => Some(Self::Http),
            _ => None,
        }
    }

    /// Returns the canonical transport name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

/// HTTP session handling mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Sessions are created by `initialize` and tracked by header.
    #[default]
    Stateful,
    /// Every request runs in its own short-lived session.
    Stateless,
}

impl SessionMode {
    /// Parses a session mode name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stateful" => Some(Self::Stateful),
            "stateless" => Some(Self::Stateless),
            _ => None,
        }
    }
}

/// Transport and session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Transport to serve.
    #[serde(default)]
    pub transport: ServerTransport,
    /// HTTP bind host.
    #[serde(default = "default_host")]
    pub host: String,
    /// HTTP bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// HTTP endpoint path.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// HTTP session mode.
    #[serde(default)]
    pub session_mode: SessionMode,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::default(),
            host: default_host(),
            port: default_port(),
            endpoint: default_endpoint(),
            session_mode: SessionMode::default(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Returns the bind address string for HTTP mode.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        if self.host.parse::<IpAddr>().is_ok_and(|ip| ip.is_ipv6()) {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host must be non-empty".to_string()));
        }
        if self.transport == ServerTransport::Http && self.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero for http".to_string()));
        }
        if !self.endpoint.starts_with('/') {
            return Err(ConfigError::Invalid("server.endpoint must start with '/'".to_string()));
        }
        if self.endpoint.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(
                "server.endpoint must not contain whitespace".to_string(),
            ));
        }
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Terraform Cloud/Enterprise settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TfeConfig {
    /// Default TFE address used when neither request context nor
    /// `TFE_ADDRESS` provide one.
    #[serde(default = "default_tfe_address")]
    pub address: String,
    /// Skip TLS verification by default.
    #[serde(default)]
    pub skip_tls_verify: bool,
    /// Register destructive operations (`action_run`, workspace deletion,
    /// full `create_run`).
    #[serde(default)]
    pub enable_operations: bool,
    /// Outbound request timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Retries for 429/5xx responses.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for TfeConfig {
    fn default() -> Self {
        Self {
            address: default_tfe_address(),
            skip_tls_verify: false,
            enable_operations: false,
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl TfeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("tfe.address", &self.address)?;
        validate_timeout("tfe.request_timeout_ms", self.request_timeout_ms)?;
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "tfe.max_retries must be at most {MAX_RETRIES_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Public registry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Registry base URL.
    #[serde(default = "default_registry_url")]
    pub base_url: String,
    /// Outbound request timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl RegistryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("registry.base_url", &self.base_url)?;
        validate_timeout("registry.request_timeout_ms", self.request_timeout_ms)
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl TerraformMcpConfig {
    /// Loads configuration using the process environment.
    ///
    /// With no explicit path and no `TERRAFORM_MCP_CONFIG`, defaults are used
    /// and no file is read.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, overriding, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, &|key| env::var(key).ok())
    }

    /// Loads configuration using the supplied environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, overriding, or validation fails.
    pub fn load_with_env(
        path: Option<&Path>,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match resolve_path(path, lookup)? {
            Some(resolved) => Self::from_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a config file without applying overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override value cannot be parsed.
    pub fn apply_env_overrides(
        &mut self,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = non_empty(lookup(TRANSPORT_MODE_ENV)) {
            self.server.transport = ServerTransport::parse(&value).ok_or_else(|| {
                ConfigError::Invalid(format!("{TRANSPORT_MODE_ENV} must be stdio or http"))
            })?;
        }
        if let Some(value) = non_empty(lookup(TRANSPORT_HOST_ENV)) {
            self.server.host = value;
        }
        if let Some(value) = non_empty(lookup(TRANSPORT_PORT_ENV)) {
            self.server.port = value.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{TRANSPORT_PORT_ENV} must be a valid port"))
            })?;
        }
        if let Some(value) = non_empty(lookup(MCP_ENDPOINT_ENV)) {
            self.server.endpoint = value;
        }
        if let Some(value) = non_empty(lookup(MCP_SESSION_MODE_ENV)) {
            self.server.session_mode = SessionMode::parse(&value).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "{MCP_SESSION_MODE_ENV} must be stateful or stateless"
                ))
            })?;
        }
        if let Some(value) = lookup(ENABLE_TF_OPERATIONS_ENV) {
            self.tfe.enable_operations = env_flag_enabled(Some(&value));
        }
        if let Some(value) = non_empty(lookup(TFE_ADDRESS_ENV)) {
            self.tfe.address = value;
        }
        if let Some(value) = lookup(TFE_SKIP_VERIFY_ENV) {
            self.tfe.skip_tls_verify = env_flag_enabled(Some(&value));
        }
        if let Some(value) = non_empty(lookup(TERRAFORM_REGISTRY_URL_ENV)) {
            self.registry.base_url = value;
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.tfe.validate()?;
        self.registry.validate()?;
        let (selection, invalid) = self.toolset_selection();
        if let Some(name) = invalid.first() {
            return Err(ConfigError::Invalid(format!("unknown toolset: {name}")));
        }
        if selection.is_empty() {
            return Err(ConfigError::Invalid(
                "toolsets must enable at least one toolset".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolves the configured toolset names.
    #[must_use]
    pub fn toolset_selection(&self) -> (ToolsetSelection, Vec<String>) {
        ToolsetSelection::from_names(self.toolsets.iter().flat_map(|entry| split_list(entry)))
    }
}

/// Returns true when an on/off environment value means "on".
///
/// Only the literal `true` (any case) enables a flag.
#[must_use]
pub fn env_flag_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment.
fn resolve_path(
    path: Option<&Path>,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(env_path) = non_empty(lookup(CONFIG_ENV_VAR)) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    Ok(None)
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|_| ConfigError::Invalid(format!("{field} must be a valid url")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!("{field} must use http or https")));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::Invalid(format!("{field} must include a host")));
    }
    Ok(())
}

fn validate_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_REQUEST_TIMEOUT_MS {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between 1 and {MAX_REQUEST_TIMEOUT_MS}"
        )));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn default_toolsets() -> Vec<String> {
    vec![crate::toolsets::DEFAULT_TOOLSETS.to_string()]
}

fn default_host() -> String {
    DEFAULT_HTTP_HOST.to_string()
}

const fn default_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_tfe_address() -> String {
    DEFAULT_TFE_ADDRESS.to_string()
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.to_string()
}

const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
