//! Turn orchestration — the only place that touches both the session store
//! and a tenant's dialog.
//!
//! Per inbound event, under the key's run lock:
//!
//! 1. `unfollow` deletes the session (ending any live chat) and replies
//!    with nothing.
//! 2. `follow` / `start` recreate the session at the start state.
//! 3. Anything else loads the session, creating it when absent.
//! 4. The live-chat pass-through state goes to the relay, every other
//!    state to the dialog engine.
//! 5. A transition into the connecting state opens the agent chat in the
//!    same turn.
//! 6. The response's state/attribute patch is applied; `end_session`
//!    deletes the session instead.

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;

use pa_dialog::TurnContext;
use pa_domain::dialog::{Attributes, DialogEvent, DialogResponse, LifecycleEvent, OutboundMessage};
use pa_domain::error::{Error, Result};
use pa_sessions::{Session, SessionKey, SessionPatch, SessionStore};

use super::session_lock::SessionLockMap;
use super::tenants::{TenantRegistry, TenantRuntime};

/// One normalized event from a channel adapter.
#[derive(Debug, Clone)]
pub struct InboundTurn {
    pub tenant_id: String,
    pub user_id: String,
    pub event: DialogEvent,
    pub display_name: Option<String>,
    pub channel: Option<String>,
}

impl InboundTurn {
    pub fn new(
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        event: DialogEvent,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            event,
            display_name: None,
            channel: None,
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

/// What the adapter should deliver, plus where the session ended up.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TurnOutcome {
    /// The session that handled the turn; `None` after `unfollow`.
    pub session_id: Option<String>,
    /// The session's state after the turn; `None` once it is gone.
    pub state: Option<String>,
    /// Ordered messages; empty means nothing is sent.
    pub messages: Vec<OutboundMessage>,
}

pub struct Orchestrator {
    sessions: Arc<SessionStore>,
    tenants: Arc<TenantRegistry>,
    locks: Arc<SessionLockMap>,
}

impl Orchestrator {
    pub fn new(
        sessions: Arc<SessionStore>,
        tenants: Arc<TenantRegistry>,
        locks: Arc<SessionLockMap>,
    ) -> Self {
        Self {
            sessions,
            tenants,
            locks,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Run one turn.  Only an unknown tenant is an error; every dialog or
    /// bridge failure has already become a user-facing message.
    pub async fn handle(&self, turn: InboundTurn) -> Result<TurnOutcome> {
        let tenant = self
            .tenants
            .get(&turn.tenant_id)
            .ok_or_else(|| Error::TenantNotFound(turn.tenant_id.clone()))?;
        let key = SessionKey::new(&turn.tenant_id, &turn.user_id);
        let span = tracing::info_span!("turn", session_key = %key, kind = turn.event.kind());

        async {
            let _permit = self.locks.acquire(&key).await;
            Ok(self.run(&tenant, &key, turn).await)
        }
        .instrument(span)
        .await
    }

    /// Delete a session on behalf of an operator, ending any live chat.
    /// Returns whether a session existed.
    pub async fn end_session(&self, key: &SessionKey) -> bool {
        let _permit = self.locks.acquire(key).await;
        if let Some(tenant) = self.tenants.get(&key.tenant_id) {
            let event = DialogEvent::Lifecycle(LifecycleEvent::Unfollow);
            self.leave_live_chat(&tenant, key, &event, None).await;
        }
        self.sessions.delete(key)
    }

    async fn run(
        &self,
        tenant: &TenantRuntime,
        key: &SessionKey,
        turn: InboundTurn,
    ) -> TurnOutcome {
        let InboundTurn {
            event,
            display_name,
            channel,
            ..
        } = turn;

        if event.is_lifecycle(LifecycleEvent::Unfollow) {
            self.leave_live_chat(tenant, key, &event, channel).await;
            self.sessions.delete(key);
            tracing::info!(session_key = %key, "user unfollowed; session removed");
            return TurnOutcome::default();
        }

        let restart =
            event.is_lifecycle(LifecycleEvent::Follow) || event.is_lifecycle(LifecycleEvent::Start);
        let session = if restart {
            self.leave_live_chat(tenant, key, &event, channel.clone()).await;
            self.fresh_session(tenant, key)
        } else {
            match self.sessions.get(key) {
                Some(session) => session,
                None => self.fresh_session(tenant, key),
            }
        };

        let ctx = TurnContext::new(
            key.tenant_id.clone(),
            key.user_id.clone(),
            session.dialog_state.clone(),
            event,
            session.attributes.clone(),
        )
        .with_display_name(display_name)
        .with_channel(channel);

        let response = self.respond(tenant, &session, ctx).await;
        self.persist(key, session, response)
    }

    fn fresh_session(&self, tenant: &TenantRuntime, key: &SessionKey) -> Session {
        self.sessions
            .create(key, tenant.engine.start_state(), Attributes::new())
    }

    async fn respond(
        &self,
        tenant: &TenantRuntime,
        session: &Session,
        ctx: TurnContext,
    ) -> DialogResponse {
        let start = tenant.engine.start_state();
        let Some(relay) = &tenant.relay else {
            return tenant.engine.route(ctx).await;
        };

        if tenant.is_live(&session.dialog_state) {
            return relay.relay(&ctx, start).await;
        }

        let mut response = tenant.engine.route(ctx.clone()).await;
        if response.next_state.as_deref() == Some(relay.connecting_state()) {
            let connect = relay.connect(&ctx).await;
            response.messages.extend(connect.messages);
            response.next_state = connect.next_state;
        }
        response
    }

    fn persist(&self, key: &SessionKey, session: Session, response: DialogResponse) -> TurnOutcome {
        if response.end_session {
            self.sessions.delete(key);
            return TurnOutcome {
                session_id: Some(session.session_id),
                state: None,
                messages: response.messages,
            };
        }

        // `None` when the session expired mid-turn; the turn still replies.
        let updated = self
            .sessions
            .update(key, SessionPatch::from_response(&response));
        TurnOutcome {
            session_id: Some(session.session_id),
            state: updated.map(|s| s.dialog_state),
            messages: response.messages,
        }
    }

    /// End the bridge conversation when the key's session is live.
    async fn leave_live_chat(
        &self,
        tenant: &TenantRuntime,
        key: &SessionKey,
        event: &DialogEvent,
        channel: Option<String>,
    ) {
        let Some(relay) = &tenant.relay else {
            return;
        };
        let Some(session) = self.sessions.peek(key) else {
            return;
        };
        if !tenant.is_live(&session.dialog_state) {
            return;
        }
        let ctx = TurnContext::new(
            key.tenant_id.clone(),
            key.user_id.clone(),
            session.dialog_state,
            event.clone(),
            Attributes::new(),
        )
        .with_channel(channel);
        relay.end(&ctx).await;
    }
}
