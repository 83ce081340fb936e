//! Gateway-owned session store with per-session expiry timers.
//!
//! One live session per [`SessionKey`].  Every session owns a tokio timer
//! task; touching the session moves its deadline, replacing or deleting
//! it aborts the timer.  A timer that wakes for a session it no longer
//! owns (different `session_id`) does nothing.
//!
//! When opened with a state path the store snapshots itself to
//! `sessions.json` on [`SessionStore::flush`] and re-arms timers on load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use pa_domain::dialog::{merge_attributes, Attributes, DialogResponse};
use pa_domain::error::{Error, Result};
use pa_domain::trace::TraceEvent;

use crate::lifecycle::{ExpiryPolicy, RemovalReason};
use crate::session_key::SessionKey;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A single conversation tracked by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub tenant_id: String,
    pub user_id: String,
    /// Minted on every create; identifies this incarnation of the key.
    pub session_id: String,
    pub dialog_state: String,
    #[serde(default)]
    pub attributes: Attributes,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Inactivity window applied to this session.
    pub expiry_ms: u64,
}

impl Session {
    pub fn key(&self) -> SessionKey {
        SessionKey::new(&self.tenant_id, &self.user_id)
    }

    /// Attribute lookup as a string, if present and a string.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(|v| v.as_str())
    }
}

/// Partial update applied by [`SessionStore::update`].
///
/// An empty patch still refreshes the session's activity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub dialog_state: Option<String>,
    /// Shallow-merged into the existing attributes.
    pub attributes: Option<Attributes>,
    /// Clear attributes before merging.
    pub reset_attributes: bool,
}

impl SessionPatch {
    pub fn touch() -> Self {
        Self::default()
    }

    pub fn state(dialog_state: impl Into<String>) -> Self {
        Self {
            dialog_state: Some(dialog_state.into()),
            ..Self::default()
        }
    }

    /// The state/attribute part of a handler response.
    pub fn from_response(response: &DialogResponse) -> Self {
        Self {
            dialog_state: response.next_state.clone(),
            attributes: response.attributes.clone(),
            reset_attributes: response.reset_attributes,
        }
    }

    fn apply(self, session: &mut Session) {
        if let Some(state) = self.dialog_state {
            session.dialog_state = state;
        }
        if self.reset_attributes {
            session.attributes.clear();
        }
        if let Some(patch) = self.attributes {
            merge_attributes(&mut session.attributes, patch);
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slots and timers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Slot {
    session: Session,
    /// Monotonic last-activity instant; drives expiry.
    touched: Instant,
    timer: Option<JoinHandle<()>>,
}

impl Slot {
    fn window(&self) -> Duration {
        Duration::from_millis(self.session.expiry_ms)
    }

    fn deadline(&self) -> Instant {
        self.touched + self.window()
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline()
    }

    fn idle_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.touched).as_millis() as u64
    }

    fn touch(&mut self) {
        self.touched = Instant::now();
        self.session.last_activity = Utc::now();
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

type SlotMap = RwLock<HashMap<SessionKey, Slot>>;

enum Wake {
    Gone,
    Rearm(Instant),
    Expired,
}

/// Spawn the expiry timer for one session incarnation.  Returns `None`
/// outside a tokio runtime; lazy expiry in `get` still applies then.
fn arm(
    slots: &Arc<SlotMap>,
    key: SessionKey,
    session_id: String,
    deadline: Instant,
) -> Option<JoinHandle<()>> {
    let handle = tokio::runtime::Handle::try_current().ok()?;
    let weak: Weak<SlotMap> = Arc::downgrade(slots);

    Some(handle.spawn(async move {
        let mut deadline = deadline;
        loop {
            tokio::time::sleep_until(deadline).await;

            let Some(slots) = weak.upgrade() else { return };
            let wake = {
                let map = slots.read();
                match map.get(&key) {
                    Some(slot) if slot.session.session_id == session_id => {
                        let now = Instant::now();
                        if slot.is_expired(now) {
                            Wake::Expired
                        } else {
                            Wake::Rearm(slot.deadline())
                        }
                    }
                    // Deleted, or replaced by a newer incarnation.
                    _ => Wake::Gone,
                }
            };

            match wake {
                Wake::Gone => return,
                Wake::Rearm(next) => deadline = next,
                Wake::Expired => {
                    expire_if_current(&slots, &key, &session_id);
                    return;
                }
            }
        }
    }))
}

/// Remove `key` only if it is still the `session_id` incarnation and its
/// window has elapsed.
fn expire_if_current(slots: &SlotMap, key: &SessionKey, session_id: &str) -> bool {
    let mut map = slots.write();
    let now = Instant::now();
    let current = map
        .get(key)
        .is_some_and(|s| s.session.session_id == session_id && s.is_expired(now));
    if !current {
        return false;
    }
    if let Some(slot) = map.remove(key) {
        let idle_ms = slot.idle_ms(now);
        tracing::debug!(session_key = %key, reason = %RemovalReason::IdleTimeout { idle_ms }, "session removed");
        TraceEvent::SessionExpired {
            session_key: key.to_string(),
            session_id: slot.session.session_id.clone(),
            idle_ms,
        }
        .emit();
    }
    true
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// In-memory session store, optionally snapshotted to `sessions.json`.
pub struct SessionStore {
    slots: Arc<SlotMap>,
    policy: ExpiryPolicy,
    sessions_path: Option<PathBuf>,
}

impl SessionStore {
    /// Memory-only store.
    pub fn new(policy: ExpiryPolicy) -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            policy,
            sessions_path: None,
        }
    }

    /// Load or create the store at `state_path/sessions.json`.
    ///
    /// Sessions whose window elapsed while the process was down are
    /// dropped; the rest get timers for their remaining time.
    pub fn open(state_path: &Path, policy: ExpiryPolicy) -> Result<Self> {
        std::fs::create_dir_all(state_path)?;
        let sessions_path = state_path.join("sessions.json");

        let loaded: HashMap<String, Session> = if sessions_path.exists() {
            let raw = std::fs::read_to_string(&sessions_path)?;
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, path = %sessions_path.display(), "unreadable session snapshot, starting empty");
                HashMap::new()
            })
        } else {
            HashMap::new()
        };

        let store = Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            policy,
            sessions_path: Some(sessions_path),
        };

        let wall_now = Utc::now();
        let now = Instant::now();
        let mut restored = 0usize;
        {
            let mut map = store.slots.write();
            for (raw_key, mut session) in loaded {
                if SessionKey::parse(&raw_key).as_ref() != Some(&session.key()) {
                    tracing::warn!(key = %raw_key, "snapshot entry does not match its session, skipped");
                    continue;
                }
                if store
                    .policy
                    .is_expired(&session.tenant_id, session.last_activity, wall_now)
                {
                    continue;
                }
                let idle = (wall_now - session.last_activity)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                session.expiry_ms = store.policy.window_for(&session.tenant_id).as_millis() as u64;
                let key = session.key();
                let touched = now.checked_sub(idle).unwrap_or(now);
                let mut slot = Slot {
                    session,
                    touched,
                    timer: None,
                };
                slot.timer = arm(
                    &store.slots,
                    key.clone(),
                    slot.session.session_id.clone(),
                    slot.deadline(),
                );
                map.insert(key, slot);
                restored += 1;
            }
        }

        tracing::info!(
            sessions = restored,
            path = %store.sessions_path.as_deref().unwrap_or(Path::new("")).display(),
            "session store loaded"
        );
        Ok(store)
    }

    /// Create (or replace) the session for `key`.
    ///
    /// Any previous session for the key is discarded along with its timer.
    pub fn create(
        &self,
        key: &SessionKey,
        dialog_state: impl Into<String>,
        attributes: Attributes,
    ) -> Session {
        let now = Utc::now();
        let window = self.policy.window_for(&key.tenant_id);
        let session = Session {
            tenant_id: key.tenant_id.clone(),
            user_id: key.user_id.clone(),
            session_id: uuid::Uuid::new_v4().to_string(),
            dialog_state: dialog_state.into(),
            attributes,
            created_at: now,
            last_activity: now,
            expiry_ms: window.as_millis() as u64,
        };

        let touched = Instant::now();
        let timer = arm(
            &self.slots,
            key.clone(),
            session.session_id.clone(),
            touched + window,
        );
        let slot = Slot {
            session: session.clone(),
            touched,
            timer,
        };

        let replaced = self.slots.write().insert(key.clone(), slot);
        if let Some(old) = &replaced {
            tracing::debug!(
                session_key = %key,
                old_session_id = %old.session.session_id,
                reason = %RemovalReason::Replaced,
                "session removed"
            );
        }

        TraceEvent::SessionCreated {
            session_key: key.to_string(),
            session_id: session.session_id.clone(),
            dialog_state: session.dialog_state.clone(),
            replaced: replaced.is_some(),
        }
        .emit();

        session
    }

    /// Fetch the live session for `key`, refreshing its activity.
    ///
    /// A session whose window has elapsed is removed and reported absent.
    pub fn get(&self, key: &SessionKey) -> Option<Session> {
        let mut map = self.slots.write();
        let now = Instant::now();
        let slot = map.get_mut(key)?;
        if slot.is_expired(now) {
            let session_id = slot.session.session_id.clone();
            drop(map);
            expire_if_current(&self.slots, key, &session_id);
            return None;
        }
        slot.touch();
        Some(slot.session.clone())
    }

    /// Read a session without refreshing it.
    pub fn peek(&self, key: &SessionKey) -> Option<Session> {
        let map = self.slots.read();
        map.get(key)
            .filter(|slot| !slot.is_expired(Instant::now()))
            .map(|slot| slot.session.clone())
    }

    /// Apply `patch` and refresh activity.  No-op when the key is absent
    /// or expired.
    pub fn update(&self, key: &SessionKey, patch: SessionPatch) -> Option<Session> {
        let mut map = self.slots.write();
        let slot = map.get_mut(key)?;
        if slot.is_expired(Instant::now()) {
            return None;
        }
        patch.apply(&mut slot.session);
        slot.touch();
        Some(slot.session.clone())
    }

    /// Delete the session and cancel its timer.  Returns whether a session
    /// was removed.
    pub fn delete(&self, key: &SessionKey) -> bool {
        let removed = self.slots.write().remove(key);
        match removed {
            Some(slot) => {
                TraceEvent::SessionDeleted {
                    session_key: key.to_string(),
                    session_id: slot.session.session_id.clone(),
                    reason: RemovalReason::Deleted.to_string(),
                }
                .emit();
                true
            }
            None => false,
        }
    }

    /// Live sessions of one tenant, oldest first.
    pub fn list_by_tenant(&self, tenant_id: &str) -> Vec<Session> {
        let now = Instant::now();
        let map = self.slots.read();
        let mut sessions: Vec<Session> = map
            .iter()
            .filter(|(key, slot)| key.tenant_id == tenant_id && !slot.is_expired(now))
            .map(|(_, slot)| slot.session.clone())
            .collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        sessions
    }

    /// Number of tracked sessions, including any not yet reaped.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist the current sessions to disk.  No-op for memory-only stores.
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.sessions_path else {
            return Ok(());
        };
        let snapshot: HashMap<String, Session> = {
            let now = Instant::now();
            let map = self.slots.read();
            map.iter()
                .filter(|(_, slot)| !slot.is_expired(now))
                .map(|(key, slot)| (key.to_string(), slot.session.clone()))
                .collect()
        };
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| Error::Other(format!("serializing sessions: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
