//! Session expiry lifecycle — per-tenant inactivity windows.
//!
//! A session untouched for its tenant's window is removed by its expiry
//! timer, and `get` refuses it even if the timer has not fired yet.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pa_domain::config::SessionsConfig;

/// Why a session left the store.
#[derive(Debug, Clone)]
pub enum RemovalReason {
    IdleTimeout { idle_ms: u64 },
    Deleted,
    Replaced,
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdleTimeout { idle_ms } => write!(f, "idle timeout ({idle_ms}ms)"),
            Self::Deleted => write!(f, "deleted"),
            Self::Replaced => write!(f, "replaced by a new session"),
        }
    }
}

/// Resolves the expiry window for a tenant: tenant override, then the
/// global default.
#[derive(Debug, Clone)]
pub struct ExpiryPolicy {
    default: Duration,
    by_tenant: HashMap<String, Duration>,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(SessionsConfig::default().default_expiry_ms))
    }
}

impl ExpiryPolicy {
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            by_tenant: HashMap::new(),
        }
    }

    /// Build from the sessions config plus per-tenant overrides in ms.
    pub fn from_config(config: &SessionsConfig, overrides: HashMap<String, u64>) -> Self {
        Self {
            default: Duration::from_millis(config.default_expiry_ms),
            by_tenant: overrides
                .into_iter()
                .map(|(tenant, ms)| (tenant, Duration::from_millis(ms)))
                .collect(),
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>, window: Duration) -> Self {
        self.by_tenant.insert(tenant_id.into(), window);
        self
    }

    pub fn window_for(&self, tenant_id: &str) -> Duration {
        self.by_tenant
            .get(tenant_id)
            .copied()
            .unwrap_or(self.default)
    }

    /// Whether a session of `tenant_id` last active at `last_activity` is
    /// past its window at `now`.
    pub fn is_expired(
        &self,
        tenant_id: &str,
        last_activity: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        let idle = (now - last_activity).to_std().unwrap_or(Duration::ZERO);
        idle >= self.window_for(tenant_id)
    }
}
