//! Per-tenant dialog runtimes built from `[[tenants]]`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pa_dialog::{DialogEngine, LiveChatRelay, ScriptedDialog};
use pa_domain::config::{Config, LiveChatConfig, TenantConfig, TurnConfig};
use pa_domain::error::{Error, Result};
use pa_livechat::LiveChatBridge;

/// One bot integration: its dialog engine plus the optional live-agent
/// relay.
pub struct TenantRuntime {
    pub id: String,
    pub engine: DialogEngine,
    pub relay: Option<LiveChatRelay>,
}

impl TenantRuntime {
    pub fn new(engine: DialogEngine) -> Self {
        Self {
            id: engine.name().to_owned(),
            engine,
            relay: None,
        }
    }

    pub fn with_relay(mut self, relay: LiveChatRelay) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Build a scripted tenant.  Live chat needs a bridge.
    pub fn from_config(
        tenant: &TenantConfig,
        live_chat: &LiveChatConfig,
        turn: &TurnConfig,
        bridge: Option<&Arc<dyn LiveChatBridge>>,
    ) -> Result<Self> {
        let mut script = ScriptedDialog::from_config(tenant)?;
        if !tenant.live_chat {
            return Ok(Self::new(script.into_engine(turn.clone())?));
        }

        let bridge = bridge.ok_or_else(|| {
            Error::Config(format!(
                "tenant '{}' enables live chat but no bridge is configured",
                tenant.id
            ))
        })?;
        script = script.with_live_chat(live_chat);
        let relay = LiveChatRelay::new(bridge.clone(), live_chat)?.with_keywords(
            tenant.exit_keywords.as_deref(),
            tenant.close_keywords.as_deref(),
        )?
        .with_timeout(Duration::from_millis(turn.timeout_ms));
        Ok(Self::new(script.into_engine(turn.clone())?).with_relay(relay))
    }

    /// Whether `state` is the pass-through state of this tenant's relay.
    pub fn is_live(&self, state: &str) -> bool {
        self.relay.as_ref().is_some_and(|r| r.is_active(state))
    }
}

/// Tenant id → runtime.
#[derive(Default)]
pub struct TenantRegistry {
    tenants: HashMap<String, Arc<TenantRuntime>>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config, bridge: Option<Arc<dyn LiveChatBridge>>) -> Result<Self> {
        let mut registry = Self::new();
        for tenant in &config.tenants {
            let runtime =
                TenantRuntime::from_config(tenant, &config.live_chat, &config.turn, bridge.as_ref())?;
            tracing::info!(
                tenant_id = %tenant.id,
                name = tenant.name.as_deref().unwrap_or(&tenant.id),
                states = runtime.engine.state_names().len(),
                intents = runtime.engine.intents().len(),
                live_chat = runtime.relay.is_some(),
                "tenant dialog ready"
            );
            registry.insert(runtime);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, runtime: TenantRuntime) {
        self.tenants.insert(runtime.id.clone(), Arc::new(runtime));
    }

    pub fn get(&self, tenant_id: &str) -> Option<Arc<TenantRuntime>> {
        self.tenants.get(tenant_id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tenants.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}
