// crates/terraform-mcp/src/tfe.rs
// ============================================================================
// Module: TFE Client
// Description: Credential resolution and the Terraform Cloud/Enterprise client.
// Purpose: Build per-session API clients without touching the network.
// Dependencies: reqwest, serde_json, tokio, tracing, url
// ============================================================================

//! ## Overview
//! Credentials resolve per field from request context first, then the
//! process environment, then configured defaults. Building a [`TfeClient`]
//! only configures an HTTP client; no request is issued until a tool runs.
//! A missing token or a malformed address yields an invalid
//! [`TfeClientHandle`] rather than an error so the session can still be
//! tracked.
//!
//! Requests speak JSON:API and retry on 429 and 5xx responses with
//! exponential backoff.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use terraform_mcp_config::TFE_ADDRESS_ENV;
use terraform_mcp_config::TFE_SKIP_VERIFY_ENV;
use terraform_mcp_config::TFE_TOKEN_ENV;
use terraform_mcp_config::TfeConfig;
use thiserror::Error;
use tracing::debug;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON:API media type used by the TFE API.
const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";
/// Initial retry delay.
const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
/// Retry delay ceiling.
const MAX_BACKOFF: Duration = Duration::from_secs(5);
/// Maximum error detail length surfaced to callers.
const MAX_ERROR_DETAIL_CHARS: usize = 512;

/// User agent sent on outbound requests.
pub(crate) fn user_agent() -> String {
    format!("terraform-mcp-server/{}", env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// SECTION: Environment
// ============================================================================

/// Environment variable lookup.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Returns a lookup backed by the process environment.
#[must_use]
pub fn process_env() -> EnvLookup {
    Arc::new(|key: &str| std::env::var(key).ok())
}

/// Parses a boolean in the lenient form accepted for TLS skip flags.
#[must_use]
pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Per-request credential values supplied by the caller.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialOverrides {
    /// TFE address.
    pub address: Option<String>,
    /// TFE API token.
    pub token: Option<String>,
    /// TLS skip flag in its raw string form.
    pub skip_tls_verify: Option<String>,
}

impl CredentialOverrides {
    /// Returns true when a non-empty token was supplied.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|token| !token.trim().is_empty())
    }
}

impl fmt::Debug for CredentialOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialOverrides")
            .field("address", &self.address)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("skip_tls_verify", &self.skip_tls_verify)
            .finish()
    }
}

/// Fully resolved connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct TfeCredentials {
    /// TFE address.
    pub address: String,
    /// TFE API token; empty when none was found.
    pub token: String,
    /// Skip TLS certificate verification.
    pub skip_tls_verify: bool,
}

impl fmt::Debug for TfeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TfeCredentials")
            .field("address", &self.address)
            .field("token", &if self.token.is_empty() { "<empty>" } else { "<redacted>" })
            .field("skip_tls_verify", &self.skip_tls_verify)
            .finish()
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Retry policy for retryable responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on the delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }

    /// Returns the delay before retry number `attempt` (zero based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Returns true when a response status is worth retrying.
    #[must_use]
    pub fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }
}

/// Client construction settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TfeSettings {
    /// Address used when neither context nor environment provide one.
    pub default_address: String,
    /// TLS skip flag used when neither context nor environment provide one.
    pub default_skip_tls_verify: bool,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Retry policy.
    pub retry: RetryPolicy,
}

impl TfeSettings {
    /// Builds settings from configuration.
    #[must_use]
    pub fn from_config(config: &TfeConfig) -> Self {
        Self {
            default_address: config.address.clone(),
            default_skip_tls_verify: config.skip_tls_verify,
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                ..RetryPolicy::default()
            },
        }
    }
}

impl Default for TfeSettings {
    fn default() -> Self {
        Self::from_config(&TfeConfig::default())
    }
}

// ============================================================================
// SECTION: Client Builder
// ============================================================================

/// Resolves credentials and builds client handles.
#[derive(Clone)]
pub struct TfeClientBuilder {
    /// Construction settings.
    settings: TfeSettings,
    /// Environment lookup.
    env: EnvLookup,
}

impl TfeClientBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(settings: TfeSettings, env: EnvLookup) -> Self {
        Self {
            settings,
            env,
        }
    }

    /// Resolves credentials: request context, then environment, then defaults.
    #[must_use]
    pub fn resolve(&self, overrides: &CredentialOverrides) -> TfeCredentials {
        let address = first_non_empty(overrides.address.clone(), (self.env)(TFE_ADDRESS_ENV))
            .unwrap_or_else(|| self.settings.default_address.clone());
        let token = first_non_empty(overrides.token.clone(), (self.env)(TFE_TOKEN_ENV))
            .unwrap_or_default();
        let skip_tls_verify =
            first_non_empty(overrides.skip_tls_verify.clone(), (self.env)(TFE_SKIP_VERIFY_ENV))
                .map_or(self.settings.default_skip_tls_verify, |value| {
                    parse_bool_flag(&value).unwrap_or(false)
                });
        TfeCredentials {
            address,
            token,
            skip_tls_verify,
        }
    }

    /// Builds a handle from resolved credentials; never performs I/O.
    #[must_use]
    pub fn build(&self, credentials: &TfeCredentials) -> TfeClientHandle {
        match TfeClient::new(credentials, self.settings.request_timeout, self.settings.retry) {
            Ok(client) => TfeClientHandle::valid(client),
            Err(err) => TfeClientHandle::invalid(err.to_string()),
        }
    }

    /// Resolves credentials and builds a handle.
    #[must_use]
    pub fn build_from(&self, overrides: &CredentialOverrides) -> TfeClientHandle {
        self.build(&self.resolve(overrides))
    }
}

impl fmt::Debug for TfeClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TfeClientBuilder").field("settings", &self.settings).finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Client Handle
// ============================================================================

/// Per-session client handle; may hold no client when construction failed.
#[derive(Debug, Clone)]
pub struct TfeClientHandle {
    /// Configured client.
    client: Option<TfeClient>,
    /// Construction failure reason when no client is present.
    failure: Option<String>,
}

impl TfeClientHandle {
    /// Wraps a configured client.
    #[must_use]
    pub const fn valid(client: TfeClient) -> Self {
        Self {
            client: Some(client),
            failure: None,
        }
    }

    /// Records a failed construction attempt.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            client: None,
            failure: Some(reason.into()),
        }
    }

    /// Returns the client when present.
    #[must_use]
    pub const fn client(&self) -> Option<&TfeClient> {
        self.client.as_ref()
    }

    /// Returns true when a client is present.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.client.is_some()
    }

    /// Returns the construction failure reason, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Terraform Cloud/Enterprise API client.
#[derive(Clone)]
pub struct TfeClient {
    /// Underlying HTTP transport.
    http: reqwest::Client,
    /// Base address.
    base: Url,
    /// API token.
    token: String,
    /// Retry policy.
    retry: RetryPolicy,
}

impl fmt::Debug for TfeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TfeClient")
            .field("base", &self.base.as_str())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl TfeClient {
    /// Configures a client without issuing any request.
    ///
    /// # Errors
    ///
    /// Returns [`TfeError::InvalidCredentials`] when the token is empty or the
    /// address is malformed, and [`TfeError::Transport`] when the HTTP client
    /// cannot be configured.
    pub fn new(
        credentials: &TfeCredentials,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, TfeError> {
        let token = credentials.token.trim();
        if token.is_empty() {
            return Err(TfeError::InvalidCredentials("TFE token is not set".to_string()));
        }
        let base = Url::parse(credentials.address.trim()).map_err(|_| {
            TfeError::InvalidCredentials(format!("invalid TFE address: {}", credentials.address))
        })?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(TfeError::InvalidCredentials(format!(
                "TFE address must be an http(s) url: {}",
                credentials.address
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .danger_accept_invalid_certs(credentials.skip_tls_verify)
            .build()
            .map_err(|err| TfeError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            base,
            token: token.to_string(),
            retry,
        })
    }

    /// Returns the base address.
    #[must_use]
    pub const fn address(&self) -> &Url {
        &self.base
    }

    /// Builds a URL from path segments, percent-encoding each segment.
    ///
    /// # Errors
    ///
    /// Returns [`TfeError::InvalidRequest`] when the base cannot take a path.
    pub fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, TfeError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| TfeError::InvalidRequest("address cannot take a path".to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Issues a GET and returns the decoded body.
    ///
    /// # Errors
    ///
    /// Returns [`TfeError`] on transport, status, or decode failures.
    pub async fn get(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Value, TfeError> {
        self.send(Method::GET, self.url(segments, query)?, None).await
    }

    /// Issues a POST with a JSON:API body; `null` sends no body.
    ///
    /// # Errors
    ///
    /// Returns [`TfeError`] on transport, status, or decode failures.
    pub async fn post(&self, segments: &[&str], body: &Value) -> Result<Value, TfeError> {
        self.send(Method::POST, self.url(segments, &[])?, Some(body)).await
    }

    /// Issues a PATCH with a JSON:API body.
    ///
    /// # Errors
    ///
    /// Returns [`TfeError`] on transport, status, or decode failures.
    pub async fn patch(&self, segments: &[&str], body: &Value) -> Result<Value, TfeError> {
        self.send(Method::PATCH, self.url(segments, &[])?, Some(body)).await
    }

    /// Issues a DELETE with an optional JSON:API body.
    ///
    /// # Errors
    ///
    /// Returns [`TfeError`] on transport or status failures.
    pub async fn delete(&self, segments: &[&str], body: Option<&Value>) -> Result<(), TfeError> {
        self.send(Method::DELETE, self.url(segments, &[])?, body).await.map(|_| ())
    }

    /// Sends a request, retrying retryable statuses.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value, TfeError> {
        let payload = body
            .filter(|value| !value.is_null())
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|err| TfeError::InvalidRequest(err.to_string()))?;
        let mut attempt = 0u32;
        loop {
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .bearer_auth(&self.token)
                .header(ACCEPT, JSON_API_CONTENT_TYPE);
            if let Some(bytes) = &payload {
                request = request.header(CONTENT_TYPE, JSON_API_CONTENT_TYPE).body(bytes.clone());
            }
            debug!(method = %method, path = url.path(), attempt, "tfe request");
            let response =
                request.send().await.map_err(|err| TfeError::Transport(err.to_string()))?;
            let status = response.status();
            let bytes =
                response.bytes().await.map_err(|err| TfeError::Transport(err.to_string()))?;
            if status.is_success() {
                if bytes.is_empty() {
                    return Ok(Value::Null);
                }
                return serde_json::from_slice(&bytes)
                    .map_err(|err| TfeError::Decode(err.to_string()));
            }
            if RetryPolicy::is_retryable(status) && attempt < self.retry.max_retries {
                let delay = self.retry.backoff(attempt);
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                debug!(status = status.as_u16(), delay_ms, "retrying tfe request");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }
            return Err(TfeError::Status {
                status: status.as_u16(),
                message: error_detail(&bytes),
            });
        }
    }
}

/// Extracts a readable message from a JSON:API error body.
fn error_detail(bytes: &[u8]) -> String {
    let parsed: Option<Value> = serde_json::from_slice(bytes).ok();
    let from_errors = parsed.as_ref().and_then(|value| value.get("errors")).and_then(|errors| {
        let messages: Vec<String> = errors
            .as_array()?
            .iter()
            .filter_map(|error| match error {
                Value::String(text) => Some(text.clone()),
                Value::Object(map) => {
                    let title = map.get("title").and_then(Value::as_str);
                    let detail = map.get("detail").and_then(Value::as_str);
                    match (title, detail) {
                        (Some(title), Some(detail)) => Some(format!("{title}: {detail}")),
                        (Some(text), None) | (None, Some(text)) => Some(text.to_string()),
                        (None, None) => None,
                    }
                }
                _ => None,
            })
            .collect();
        (!messages.is_empty()).then(|| messages.join("; "))
    });
    let message = from_errors.unwrap_or_else(|| String::from_utf8_lossy(bytes).trim().to_string());
    message.chars().take(MAX_ERROR_DETAIL_CHARS).collect()
}

fn first_non_empty(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    let trimmed = |value: String| {
        let value = value.trim().to_string();
        (!value.is_empty()).then_some(value)
    };
    primary.and_then(trimmed).or_else(|| fallback.and_then(trimmed))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// TFE client errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TfeError {
    /// Credentials cannot produce a client.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    /// Request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Network or TLS failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// Non-success HTTP status.
    #[error("TFE API returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error detail from the response body.
        message: String,
    },
    /// Response body was not valid JSON.
    #[error("decode error: {0}")]
    Decode(String),
}

impl TfeError {
    /// Returns true for 404 responses.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
