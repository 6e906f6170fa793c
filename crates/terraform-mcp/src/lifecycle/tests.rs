// crates/terraform-mcp/src/lifecycle/tests.rs
// ============================================================================
// Module: Session Lifecycle Unit Tests
// Description: Start/end hook ordering and per-call client resolution.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::sync::Arc;
use std::sync::Mutex;

use super::SessionAuthorizationSink;
use super::SessionClients;
use super::SessionLifecycle;
use crate::context::CallContext;
use crate::session::SessionClientStore;
use crate::session::SessionId;
use crate::tfe::CredentialOverrides;
use crate::tfe::TfeClientBuilder;
use crate::tfe::TfeSettings;
use crate::tools::ToolError;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum SinkEvent {
    Register(String),
    Unregister {
        session: String,
        client_still_stored: bool,
    },
}

struct RecordingSink {
    store: Arc<SessionClientStore>,
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl SessionAuthorizationSink for RecordingSink {
    fn register_session(&self, session: &SessionId) {
        self.events.lock().unwrap().push(SinkEvent::Register(session.to_string()));
    }

    fn unregister_session(&self, session: &SessionId) {
        let client_still_stored = self.store.get(session).is_some();
        self.events.lock().unwrap().push(SinkEvent::Unregister {
            session: session.to_string(),
            client_still_stored,
        });
    }
}

struct Harness {
    store: Arc<SessionClientStore>,
    clients: Arc<SessionClients>,
    sink: Arc<RecordingSink>,
    lifecycle: SessionLifecycle,
}

fn harness() -> Harness {
    let store = Arc::new(SessionClientStore::new());
    let builder = TfeClientBuilder::new(TfeSettings::default(), Arc::new(|_: &str| None::<String>));
    let clients = Arc::new(SessionClients::new(Arc::clone(&store), builder));
    let sink = Arc::new(RecordingSink {
        store: Arc::clone(&store),
        events: Mutex::new(Vec::new()),
    });
    let lifecycle = SessionLifecycle::new(Arc::clone(&clients), sink.clone());
    Harness {
        store,
        clients,
        sink,
        lifecycle,
    }
}

fn with_token(token: &str) -> CredentialOverrides {
    CredentialOverrides {
        address: Some("https://tfe.example.com".to_string()),
        token: Some(token.to_string()),
        skip_tls_verify: None,
    }
}

// ============================================================================
// SECTION: Session Start/End
// ============================================================================

#[test]
fn start_with_token_stores_valid_client_and_authorizes() {
    let h = harness();
    let session = SessionId::from("s1");
    h.lifecycle.on_session_start(&with_token("t-1"), &session);
    assert!(h.store.has_valid_client(&session));
    assert_eq!(h.sink.events(), vec![SinkEvent::Register("s1".to_string())]);
}

#[test]
fn start_without_token_stores_invalid_client_and_does_not_authorize() {
    let h = harness();
    let session = SessionId::from("s1");
    h.lifecycle.on_session_start(&CredentialOverrides::default(), &session);
    let handle = h.store.get(&session).expect("handle stored");
    assert!(!handle.is_valid());
    assert!(h.sink.events().is_empty());
}

#[test]
fn end_removes_client_before_unauthorizing() {
    let h = harness();
    let session = SessionId::from("s1");
    h.lifecycle.on_session_start(&with_token("t-1"), &session);
    h.lifecycle.on_session_end(&session);
    assert!(h.store.get(&session).is_none());
    assert_eq!(
        h.sink.events(),
        vec![
            SinkEvent::Register("s1".to_string()),
            SinkEvent::Unregister {
                session: "s1".to_string(),
                client_still_stored: false,
            },
        ]
    );
}

#[test]
fn end_of_unknown_session_is_harmless() {
    let h = harness();
    h.lifecycle.on_session_end(&SessionId::from("ghost"));
    assert!(h.store.is_empty());
}

// ============================================================================
// SECTION: Per-Call Resolution
// ============================================================================

#[test]
fn client_for_call_reuses_stored_client() {
    let h = harness();
    let session = SessionId::from("s1");
    h.lifecycle.on_session_start(&with_token("t-1"), &session);
    let client = h.clients.client_for_call(&CallContext::for_session(session)).unwrap();
    assert_eq!(client.address().as_str(), "https://tfe.example.com/");
}

#[test]
fn client_for_call_builds_and_stores_on_demand() {
    let h = harness();
    let session = SessionId::from("fresh");
    let context = CallContext::for_session(session.clone()).with_credentials(with_token("t-2"));
    h.clients.client_for_call(&context).unwrap();
    assert!(h.store.has_valid_client(&session));
}

#[test]
fn client_for_call_rejects_invalid_and_missing_sessions() {
    let h = harness();
    let session = SessionId::from("s1");
    h.lifecycle.on_session_start(&CredentialOverrides::default(), &session);
    let err = h.clients.client_for_call(&CallContext::for_session(session)).unwrap_err();
    match err {
        ToolError::Unauthenticated(message) => assert!(message.contains("TFE_TOKEN")),
        other => panic!("unexpected error: {other}"),
    }
    let detached = h.clients.client_for_call(&CallContext::detached()).unwrap_err();
    assert!(matches!(detached, ToolError::Unauthenticated(_)));
}

#[test]
fn client_for_call_rebuilds_invalid_entry_when_call_has_token() {
    let h = harness();
    let session = SessionId::from("s1");
    h.lifecycle.on_session_start(&CredentialOverrides::default(), &session);
    assert!(!h.store.has_valid_client(&session));

    let context = CallContext::for_session(session.clone()).with_credentials(with_token("t-4"));
    let client = h.clients.client_for_call(&context).unwrap();
    assert_eq!(client.address().as_str(), "https://tfe.example.com/");
    assert!(h.store.has_valid_client(&session));
}

#[test]
fn client_for_call_keeps_valid_entry_over_call_token() {
    let h = harness();
    let session = SessionId::from("s1");
    h.lifecycle.on_session_start(&with_token("t-1"), &session);
    let stored = h.store.get(&session).unwrap();

    let mut other = with_token("t-5");
    other.address = Some("https://other.example.com".to_string());
    let context = CallContext::for_session(session.clone()).with_credentials(other);
    let client = h.clients.client_for_call(&context).unwrap();
    assert_eq!(client.address().as_str(), "https://tfe.example.com/");
    assert!(Arc::ptr_eq(&stored, &h.store.get(&session).unwrap()));
}

#[test]
fn refresh_from_context_authorizes_session_with_request_token() {
    let h = harness();
    let session = SessionId::from("s1");
    h.lifecycle.on_session_start(&CredentialOverrides::default(), &session);
    let bare = CallContext::for_session(session.clone());
    assert!(!h.lifecycle.refresh_from_context(&bare));

    let context = bare.with_credentials(with_token("t-3"));
    assert!(h.lifecycle.refresh_from_context(&context));
    assert!(h.store.has_valid_client(&session));
    assert_eq!(h.sink.events(), vec![SinkEvent::Register("s1".to_string())]);

    assert!(!h.lifecycle.refresh_from_context(&context), "already valid sessions are left alone");
}
