// crates/terraform-mcp/src/registry_client.rs
// ============================================================================
// Module: Public Registry Client
// Description: Unauthenticated client for the public Terraform registry.
// Purpose: Back the registry toolset, which needs no TFE credentials.
// Dependencies: reqwest, serde_json, tracing, url
// ============================================================================

//! ## Overview
//! The public registry serves provider, module, and policy metadata over
//! versioned JSON endpoints (`/v1/...`, `/v2/...`). Responses are returned as
//! raw JSON values; tools pick the fields they need.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use terraform_mcp_config::RegistryConfig;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::tfe::user_agent;

// ============================================================================
// SECTION: Client
// ============================================================================

/// Public registry client.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Underlying HTTP transport.
    http: reqwest::Client,
    /// Registry base address.
    base: Url,
}

impl RegistryClient {
    /// Creates a client for the configured registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidUrl`] for malformed base addresses and
    /// [`RegistryError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let base = Url::parse(&config.base_url)
            .map_err(|_| RegistryError::InvalidUrl(config.base_url.clone()))?;
        if base.cannot_be_a_base() {
            return Err(RegistryError::InvalidUrl(config.base_url.clone()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(user_agent())
            .build()
            .map_err(|err| RegistryError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            base,
        })
    }

    /// Returns the base address.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Builds a URL under the base from path segments and query pairs.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidUrl`] when the base cannot take a path.
    pub fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, RegistryError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| RegistryError::InvalidUrl(self.base.to_string()))?;
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

    /// Issues a GET and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] on transport, status, or decode failures.
    pub async fn get_json(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Value, RegistryError> {
        let url = self.url(segments, query)?;
        debug!(path = url.path(), "registry request");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|err| RegistryError::Transport(err.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|err| RegistryError::Transport(err.to_string()))?;
        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(url.path().to_string()));
        }
        if !status.is_success() {
            return Err(RegistryError::Status {
                status: status.as_u16(),
                path: url.path().to_string(),
            });
        }
        serde_json::from_str(&body).map_err(|err| RegistryError::Decode(err.to_string()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Public registry errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Base URL is malformed.
    #[error("invalid registry url: {0}")]
    InvalidUrl(String),
    /// Network failure.
    #[error("registry transport error: {0}")]
    Transport(String),
    /// Resource does not exist.
    #[error("registry resource not found: {0}")]
    NotFound(String),
    /// Non-success status.
    #[error("registry returned {status} for {path}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request path.
        path: String,
    },
    /// Body was not valid JSON.
    #[error("registry decode error: {0}")]
    Decode(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
