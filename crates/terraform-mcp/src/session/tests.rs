// crates/terraform-mcp/src/session/tests.rs
// ============================================================================
// Module: Session Store Unit Tests
// Description: Session ids and concurrent client store access.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::thread;

use super::*;
use crate::tfe::TfeClientHandle;

#[test]
fn put_get_delete_round_trip() {
    let store = SessionClientStore::new();
    let session = SessionId::from("s1");
    assert!(store.get(&session).is_none());
    store.put(session.clone(), TfeClientHandle::invalid("no token"));
    assert!(store.get(&session).is_some());
    assert!(!store.has_valid_client(&session));
    store.delete(&session);
    assert!(store.get(&session).is_none());
    store.delete(&session);
    assert!(store.is_empty());
}

#[test]
fn put_replaces_existing_handle() {
    let store = SessionClientStore::new();
    let session = SessionId::from("s1");
    store.put(session.clone(), TfeClientHandle::invalid("first"));
    store.put(session.clone(), TfeClientHandle::invalid("second"));
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(&session).unwrap().failure(), Some("second"));
}

#[test]
fn generated_ids_are_unique() {
    let first = SessionId::generate();
    let second = SessionId::generate();
    assert_ne!(first, second);
    assert!(first.as_str().starts_with("mcp-session-"));
}

#[test]
fn concurrent_writers_do_not_lose_entries() {
    let store = Arc::new(SessionClientStore::new());
    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for index in 0..50 {
                    let session = SessionId::new(format!("w{worker}-{index}"));
                    store.put(session.clone(), TfeClientHandle::invalid("none"));
                    assert!(store.get(&session).is_some());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.len(), 400);
}
