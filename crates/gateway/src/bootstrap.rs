//! AppState construction and background-task spawning extracted from `main.rs`.
//!
//! `serve` and the one-shot `send` command share [`build_app_state`] so a
//! CLI turn runs through exactly the same orchestrator as an HTTP turn.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use pa_domain::config::{Config, ConfigSeverity};
use pa_sessions::{ExpiryPolicy, SessionStore};

use crate::api::auth;
use crate::runtime::{Orchestrator, SessionLockMap, TenantRegistry};
use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }

    // ── Session store ────────────────────────────────────────────────
    let policy = ExpiryPolicy::from_config(&config.sessions, config.expiry_overrides());
    let sessions = Arc::new(match &config.sessions.state_path {
        Some(path) => SessionStore::open(path, policy)
            .with_context(|| format!("loading session snapshot from {}", path.display()))?,
        None => {
            tracing::info!("sessions.state_path not set; sessions are memory-only");
            SessionStore::new(policy)
        }
    });
    tracing::info!(
        default_expiry_ms = config.sessions.default_expiry_ms,
        restored = sessions.len(),
        "session store ready"
    );

    // ── Live-chat bridge ─────────────────────────────────────────────
    let bridge =
        pa_livechat::create_bridge(&config.live_chat).context("creating live-chat bridge")?;

    // ── Tenant dialogs ───────────────────────────────────────────────
    let tenants = Arc::new(
        TenantRegistry::from_config(&config, bridge).context("building tenant dialogs")?,
    );
    tracing::info!(tenants = tenants.len(), "tenant registry ready");

    // ── Orchestrator ─────────────────────────────────────────────────
    let session_locks = Arc::new(SessionLockMap::new());
    let orchestrator = Arc::new(Orchestrator::new(
        sessions.clone(),
        tenants.clone(),
        session_locks.clone(),
    ));

    // ── API token (read once, hash for constant-time comparison) ────
    // Priority: config.server.api_token > env var (config.server.api_token_env)
    let api_token_hash = {
        let env_var = &config.server.api_token_env;
        let from_config = config.server.api_token.as_deref().filter(|t| !t.is_empty());
        let from_env = std::env::var(env_var).ok().filter(|t| !t.is_empty());
        let source = if from_config.is_some() {
            "config".to_string()
        } else {
            format!("env:{env_var}")
        };
        match auth::token_hash(from_config.or(from_env.as_deref())) {
            Some(hash) => {
                tracing::info!(source = %source, "API bearer-token auth enabled");
                Some(hash)
            }
            None => {
                tracing::warn!(
                    "API bearer-token auth DISABLED — set server.api_token in config.toml or {env_var} env var"
                );
                None
            }
        }
    };

    Ok(AppState {
        config,
        sessions,
        tenants,
        session_locks,
        orchestrator,
        api_token_hash,
    })
}

/// Spawn the long-running background tasks (snapshot flush, lock pruning).
///
/// Call this **after** [`build_app_state`] when running the HTTP server.
/// The one-shot `send` command skips it.
pub fn spawn_background_tasks(state: &AppState) {
    // ── Periodic session flush ───────────────────────────────────────
    if state.config.sessions.state_path.is_some() {
        let sessions = state.sessions.clone();
        let every = Duration::from_secs(state.config.sessions.flush_interval_sec.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = sessions.flush() {
                    tracing::warn!(error = %e, "session store flush failed");
                }
            }
        });
    }

    // ── Periodic session lock pruning ────────────────────────────────
    {
        let session_locks = state.session_locks.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                session_locks.prune_idle();
            }
        });
    }
}
