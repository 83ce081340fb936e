//! Per-session turn serialization.
//!
//! Only one turn runs per `(tenant, user)` at a time.  A second event for
//! the same key waits for the first turn to finish; waiters are served in
//! arrival order (tokio semaphores are fair).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use pa_sessions::SessionKey;

/// Manages per-session run locks.
///
/// Each session key maps to a `Semaphore(1)`.  Holding the permit grants
/// exclusive access to the key's session for one turn.
pub struct SessionLockMap {
    locks: Mutex<HashMap<SessionKey, Arc<Semaphore>>>,
}

impl Default for SessionLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for the run lock of `key`.  The permit releases on drop.
    pub async fn acquire(&self, key: &SessionKey) -> OwnedSemaphorePermit {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        if let Ok(permit) = sem.clone().try_acquire_owned() {
            return permit;
        }
        tracing::debug!(session_key = %key, "turn queued behind in-flight turn");

        loop {
            // Fails only on a closed semaphore; these are never closed.
            if let Ok(permit) = sem.clone().acquire_owned().await {
                return permit;
            }
        }
    }

    /// Number of tracked keys (for monitoring).
    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop locks nobody holds or waits on.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| Arc::strong_count(sem) > 1 || sem.available_permits() == 0);
    }
}
