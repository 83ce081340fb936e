use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Inactivity window after which a session is deleted.  Tenants may
    /// override it with `tenants[].expiry_ms`.
    #[serde(default = "d_expiry_ms")]
    pub default_expiry_ms: u64,

    /// Directory for the `sessions.json` snapshot.  `None` keeps sessions
    /// in memory only.
    #[serde(default)]
    pub state_path: Option<PathBuf>,

    /// How often the snapshot is flushed, in seconds.
    #[serde(default = "d_flush_interval")]
    pub flush_interval_sec: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            default_expiry_ms: d_expiry_ms(),
            state_path: None,
            flush_interval_sec: d_flush_interval(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_expiry_ms() -> u64 {
    5 * 60 * 1000
}
fn d_flush_interval() -> u64 {
    30
}
