// crates/terraform-mcp/src/session.rs
// ============================================================================
// Module: Session Client Store
// Description: Session identifiers and the per-session TFE client map.
// Purpose: Own exactly one TFE client handle per live session.
// Dependencies: rand, serde
// ============================================================================

//! ## Overview
//! Sessions are identified by opaque strings assigned by the serving runtime.
//! [`SessionClientStore`] maps each live session to its
//! [`TfeClientHandle`]; entries are inserted when a session starts (even when
//! client construction failed) and removed when it ends. All operations are
//! internally synchronized.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use rand::RngCore;
use serde::Deserialize;
use serde::Serialize;

use crate::tfe::TfeClientHandle;

// ============================================================================
// SECTION: Session Identifier
// ============================================================================

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps an existing identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        let mut value = String::from("mcp-session-");
        for byte in bytes {
            value.push_str(&format!("{byte:02x}"));
        }
        Self(value)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Session Client Store
// ============================================================================

/// Concurrent map of session identifier to TFE client handle.
#[derive(Debug, Default)]
pub struct SessionClientStore {
    /// Handles keyed by session.
    clients: RwLock<HashMap<SessionId, Arc<TfeClientHandle>>>,
}

impl SessionClientStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the handle for a session.
    pub fn put(&self, session: SessionId, handle: TfeClientHandle) {
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session, Arc::new(handle));
    }

    /// Returns the handle for a session, if any.
    #[must_use]
    pub fn get(&self, session: &SessionId) -> Option<Arc<TfeClientHandle>> {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).get(session).cloned()
    }

    /// Removes the handle for a session; no-op when absent.
    pub fn delete(&self, session: &SessionId) {
        self.clients.write().unwrap_or_else(PoisonError::into_inner).remove(session);
    }

    /// Returns true when the session has a handle with a usable client.
    #[must_use]
    pub fn has_valid_client(&self, session: &SessionId) -> bool {
        self.get(session).is_some_and(|handle| handle.is_valid())
    }

    /// Returns the number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true when no session is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
