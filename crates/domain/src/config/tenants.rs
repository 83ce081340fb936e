use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tenants (one bot integration each)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A bot integration served by this gateway.
///
/// ```toml
/// [[tenants]]
/// id = "acme-bank"
/// start_state = "MAIN_MENU"
/// expiry_ms = 900000
/// live_chat = true
///
/// [[tenants.intents]]
/// intent = "agent"
/// keywords = ["agent", "human", "talk to someone"]
///
/// [[tenants.states]]
/// name = "MAIN_MENU"
/// prompt = "How can I help you today?"
/// choices = [
///   { label = "Talk to an agent", action = "agent", next = "LIVE_CHAT_CONNECTING" },
/// ]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub id: String,

    /// Human-readable bot name (logs, dashboards).
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "d_start_state")]
    pub start_state: String,

    /// Overrides `sessions.default_expiry_ms` for this tenant.
    #[serde(default)]
    pub expiry_ms: Option<u64>,

    /// Enable the live-agent handoff (requires `live_chat.endpoint`).
    #[serde(default)]
    pub live_chat: bool,

    /// Overrides `live_chat.exit_keywords` for this tenant.
    #[serde(default)]
    pub exit_keywords: Option<Vec<String>>,

    /// Overrides `live_chat.close_keywords` for this tenant.
    #[serde(default)]
    pub close_keywords: Option<Vec<String>>,

    /// Ordered free-text intent rules; first match wins.
    #[serde(default)]
    pub intents: Vec<IntentRuleConfig>,

    /// Scripted dialog states.
    #[serde(default)]
    pub states: Vec<StateConfig>,
}

/// One `(pattern, intent)` rule.  `keywords` match as whole words or
/// phrases; `pattern` is a raw regex applied to the normalized text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRuleConfig {
    pub intent: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub pattern: Option<String>,
}

/// A scripted dialog state: a prompt plus the choices leading out of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    pub name: String,
    pub prompt: String,
    /// Optional image shown before the prompt.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChoiceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceConfig {
    pub label: String,
    /// Action / intent name that selects this choice.
    pub action: String,
    /// Target state.  `None` stays in the current state.
    #[serde(default)]
    pub next: Option<String>,
    /// Reply shown before the next prompt.
    #[serde(default)]
    pub reply: Option<String>,
    /// Selecting this choice ends the session.
    #[serde(default)]
    pub end_session: bool,
}

fn d_start_state() -> String {
    "MAIN_MENU".into()
}
