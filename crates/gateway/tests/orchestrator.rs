//! End-to-end turns through the orchestrator with a scripted hotel tenant
//! and a recording live-chat bridge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use pa_domain::config::{Config, LiveChatConfig};
use pa_domain::dialog::{DialogEvent, LifecycleEvent, OutboundMessage};
use pa_domain::error::{Error, Result};
use pa_gateway::runtime::{InboundTurn, Orchestrator, SessionLockMap, TenantRegistry};
use pa_livechat::{ChatMessage, EndChat, LiveChatBridge};
use pa_sessions::{ExpiryPolicy, SessionKey, SessionStore};

const CONFIG: &str = r#"
[sessions]
default_expiry_ms = 60000

[live_chat]
endpoint = "http://bridge.invalid"

[[tenants]]
id = "hotel"
live_chat = true

[[tenants.intents]]
intent = "agent"
keywords = ["agent", "human", "reception"]

[[tenants.states]]
name = "MAIN_MENU"
prompt = "Welcome to Seaview."
choices = [
  { label = "Book a room", action = "book", next = "BOOK_DATES" },
  { label = "Talk to reception", action = "agent", next = "LIVE_CHAT_CONNECTING" },
  { label = "Goodbye", action = "bye", reply = "See you soon!", end_session = true },
]

[[tenants.states]]
name = "BOOK_DATES"
prompt = "Which dates?"

[[tenants]]
id = "bank"
expiry_ms = 1000

[[tenants.states]]
name = "MAIN_MENU"
prompt = "Acme Bank."
"#;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Start(ChatMessage),
    Message(String, ChatMessage),
    End(EndChat),
}

#[derive(Default)]
struct RecordingBridge {
    calls: Mutex<Vec<Call>>,
    fail_start: AtomicBool,
    hang_start: AtomicBool,
}

#[async_trait]
impl LiveChatBridge for RecordingBridge {
    async fn start(&self, req: &ChatMessage) -> Result<Option<Value>> {
        self.calls.lock().push(Call::Start(req.clone()));
        if self.hang_start.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(Error::Bridge("no agents online".into()));
        }
        Ok(None)
    }

    async fn send_message(&self, tenant_id: &str, req: &ChatMessage) -> Result<()> {
        self.calls
            .lock()
            .push(Call::Message(tenant_id.to_owned(), req.clone()));
        Ok(())
    }

    async fn end(&self, req: &EndChat) -> Result<()> {
        self.calls.lock().push(Call::End(req.clone()));
        Ok(())
    }
}

struct Harness {
    orchestrator: Orchestrator,
    sessions: Arc<SessionStore>,
    bridge: Arc<RecordingBridge>,
}

fn harness() -> Harness {
    let config: Config = toml::from_str(CONFIG).unwrap();
    let bridge = Arc::new(RecordingBridge::default());
    let dyn_bridge: Arc<dyn LiveChatBridge> = bridge.clone();
    let tenants = TenantRegistry::from_config(&config, Some(dyn_bridge)).unwrap();
    let sessions = Arc::new(SessionStore::new(ExpiryPolicy::from_config(
        &config.sessions,
        config.expiry_overrides(),
    )));
    let orchestrator = Orchestrator::new(
        sessions.clone(),
        Arc::new(tenants),
        Arc::new(SessionLockMap::new()),
    );
    Harness {
        orchestrator,
        sessions,
        bridge,
    }
}

fn hotel(event: DialogEvent) -> InboundTurn {
    InboundTurn::new("hotel", "g1", event)
        .display_name("Asha")
        .channel("line")
}

fn key() -> SessionKey {
    SessionKey::new("hotel", "g1")
}

fn texts(messages: &[OutboundMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|m| match m {
            OutboundMessage::Text { text } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn first_event_creates_session_and_shows_prompt() {
    let h = harness();
    let out = h.orchestrator.handle(hotel(DialogEvent::text("hello"))).await.unwrap();

    assert_eq!(out.state.as_deref(), Some("MAIN_MENU"));
    assert!(matches!(&out.messages[..], [OutboundMessage::Choice { text, .. }] if text == "Welcome to Seaview."));
    let session = h.sessions.peek(&key()).unwrap();
    assert_eq!(Some(session.session_id), out.session_id);
}

#[tokio::test]
async fn action_advances_state() {
    let h = harness();
    h.orchestrator.handle(hotel(DialogEvent::text("hello"))).await.unwrap();
    let out = h.orchestrator.handle(hotel(DialogEvent::action("book"))).await.unwrap();

    assert_eq!(out.state.as_deref(), Some("BOOK_DATES"));
    assert_eq!(texts(&out.messages), vec!["Which dates?"]);
    assert_eq!(h.sessions.peek(&key()).unwrap().dialog_state, "BOOK_DATES");
}

#[tokio::test]
async fn unknown_tenant_is_rejected() {
    let h = harness();
    let err = h
        .orchestrator
        .handle(InboundTurn::new("airline", "u1", DialogEvent::text("hi")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TenantNotFound(t) if t == "airline"));
    assert!(h.sessions.is_empty());
}

#[tokio::test]
async fn handoff_forward_and_exit() {
    let h = harness();
    let defaults = LiveChatConfig::default();

    let out = h
        .orchestrator
        .handle(hotel(DialogEvent::text("I need a human")))
        .await
        .unwrap();
    assert_eq!(out.state.as_deref(), Some("LIVE_CHAT_ACTIVE"));
    assert_eq!(texts(&out.messages), vec![defaults.messages.connected.clone()]);

    let out = h
        .orchestrator
        .handle(hotel(DialogEvent::text("Is the pool open?")))
        .await
        .unwrap();
    assert!(out.messages.is_empty(), "agent replies out of band");
    assert_eq!(out.state.as_deref(), Some("LIVE_CHAT_ACTIVE"));

    let out = h.orchestrator.handle(hotel(DialogEvent::text("menu"))).await.unwrap();
    assert_eq!(out.state.as_deref(), Some("MAIN_MENU"));
    assert_eq!(texts(&out.messages), vec![defaults.messages.left]);

    let calls = h.bridge.calls.lock();
    assert_eq!(
        *calls,
        vec![
            Call::Start(ChatMessage::new("g1", "Asha", "line", "I need a human")),
            Call::Message(
                "hotel".into(),
                ChatMessage::new("g1", "Asha", "line", "Is the pool open?")
            ),
            Call::End(EndChat {
                user_id: "g1".into(),
                channel: "line".into()
            }),
        ]
    );
}

#[tokio::test]
async fn failed_connect_still_enters_live_chat() {
    let h = harness();
    h.bridge.fail_start.store(true, Ordering::SeqCst);
    let out = h
        .orchestrator
        .handle(hotel(DialogEvent::action("agent")))
        .await
        .unwrap();
    assert_eq!(out.state.as_deref(), Some("LIVE_CHAT_ACTIVE"));
    assert_eq!(
        texts(&out.messages),
        vec![LiveChatConfig::default().messages.connect_failed]
    );

    let out = h.orchestrator.handle(hotel(DialogEvent::text("menu"))).await.unwrap();
    assert_eq!(out.state.as_deref(), Some("MAIN_MENU"));
}

#[tokio::test(start_paused = true)]
async fn hung_bridge_does_not_wedge_the_user() {
    let h = harness();
    h.bridge.hang_start.store(true, Ordering::SeqCst);

    let out = tokio::time::timeout(
        Duration::from_secs(3600),
        h.orchestrator.handle(hotel(DialogEvent::action("agent"))),
    )
    .await
    .expect("turn bounded by the turn timeout")
    .unwrap();
    assert_eq!(out.state.as_deref(), Some("LIVE_CHAT_ACTIVE"));

    // The key's lock was released: the next turn runs.
    let out = h.orchestrator.handle(hotel(DialogEvent::text("menu"))).await.unwrap();
    assert_eq!(out.state.as_deref(), Some("MAIN_MENU"));
}

#[tokio::test]
async fn end_session_phrase_clears_and_restarts() {
    let h = harness();
    h.orchestrator.handle(hotel(DialogEvent::action("agent"))).await.unwrap();

    let out = h
        .orchestrator
        .handle(hotel(DialogEvent::text("please end session now")))
        .await
        .unwrap();
    assert_eq!(out.state.as_deref(), Some("SESSION_CLOSED"));
    assert_eq!(
        texts(&out.messages),
        vec![LiveChatConfig::default().messages.goodbye]
    );
    assert!(h.sessions.peek(&key()).unwrap().attributes.is_empty());

    let out = h.orchestrator.handle(hotel(DialogEvent::text("hi again"))).await.unwrap();
    assert_eq!(out.state.as_deref(), Some("MAIN_MENU"));
    assert!(matches!(out.messages[0], OutboundMessage::Choice { .. }));
}

#[tokio::test]
async fn end_session_choice_deletes_session() {
    let h = harness();
    let out = h.orchestrator.handle(hotel(DialogEvent::action("bye"))).await.unwrap();
    assert_eq!(texts(&out.messages), vec!["See you soon!"]);
    assert!(out.state.is_none());
    assert!(h.sessions.peek(&key()).is_none());
}

#[tokio::test]
async fn unfollow_deletes_and_ends_live_chat() {
    let h = harness();
    h.orchestrator.handle(hotel(DialogEvent::action("agent"))).await.unwrap();

    let out = h
        .orchestrator
        .handle(hotel(DialogEvent::Lifecycle(LifecycleEvent::Unfollow)))
        .await
        .unwrap();
    assert!(out.messages.is_empty());
    assert!(out.session_id.is_none());
    assert!(h.sessions.peek(&key()).is_none());
    assert!(matches!(h.bridge.calls.lock().last(), Some(Call::End(_))));
}

#[tokio::test]
async fn unfollow_without_session_is_a_no_op() {
    let h = harness();
    let out = h
        .orchestrator
        .handle(hotel(DialogEvent::Lifecycle(LifecycleEvent::Unfollow)))
        .await
        .unwrap();
    assert!(out.messages.is_empty());
    assert!(h.sessions.is_empty());
    assert!(h.bridge.calls.lock().is_empty());
}

#[tokio::test]
async fn follow_recreates_session_at_start() {
    let h = harness();
    let first = h.orchestrator.handle(hotel(DialogEvent::action("book"))).await.unwrap();
    assert_eq!(first.state.as_deref(), Some("BOOK_DATES"));

    let out = h
        .orchestrator
        .handle(hotel(DialogEvent::Lifecycle(LifecycleEvent::Follow)))
        .await
        .unwrap();
    assert_eq!(out.state.as_deref(), Some("MAIN_MENU"));
    assert_ne!(out.session_id, first.session_id);
}

#[tokio::test]
async fn operator_delete_ends_live_chat() {
    let h = harness();
    h.orchestrator.handle(hotel(DialogEvent::action("agent"))).await.unwrap();

    assert!(h.orchestrator.end_session(&key()).await);
    assert!(!h.orchestrator.end_session(&key()).await, "second delete is a no-op");
    let ends = h
        .bridge
        .calls
        .lock()
        .iter()
        .filter(|c| matches!(c, Call::End(_)))
        .count();
    assert_eq!(ends, 1);
}

#[tokio::test]
async fn concurrent_events_for_one_user_are_serialized() {
    let h = Arc::new(harness());
    h.orchestrator.handle(hotel(DialogEvent::text("hello"))).await.unwrap();

    let a = {
        let h = h.clone();
        tokio::spawn(async move { h.orchestrator.handle(hotel(DialogEvent::action("book"))).await })
    };
    let b = {
        let h = h.clone();
        tokio::spawn(async move { h.orchestrator.handle(hotel(DialogEvent::text("anything"))).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    // Whichever ran first, the second saw its result: BOOK_DATES re-prompts
    // on unmatched text, MAIN_MENU follows "book".
    assert_eq!(h.sessions.peek(&key()).unwrap().dialog_state, "BOOK_DATES");
}

#[tokio::test(start_paused = true)]
async fn expired_session_restarts_at_start() {
    let h = harness();
    let bank = |text: &str| InboundTurn::new("bank", "u9", DialogEvent::text(text));

    let first = h.orchestrator.handle(bank("hi")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert!(h.sessions.peek(&SessionKey::new("bank", "u9")).is_none());

    let second = h.orchestrator.handle(bank("hi")).await.unwrap();
    assert_ne!(first.session_id, second.session_id);
    assert_eq!(second.state.as_deref(), Some("MAIN_MENU"));
}
