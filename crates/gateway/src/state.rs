use std::sync::Arc;

use pa_domain::config::Config;
use pa_sessions::SessionStore;

use crate::runtime::session_lock::SessionLockMap;
use crate::runtime::{Orchestrator, TenantRegistry};

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
    pub tenants: Arc<TenantRegistry>,
    /// Per-session turn serialization.
    pub session_locks: Arc<SessionLockMap>,
    pub orchestrator: Arc<Orchestrator>,
    /// SHA-256 of the API bearer token; `None` disables auth (dev mode).
    pub api_token_hash: Option<Vec<u8>>,
}
