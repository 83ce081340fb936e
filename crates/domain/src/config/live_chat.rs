use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Live-chat bridge
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// External live-agent bridge and the pass-through dialog mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveChatConfig {
    /// Base URL of the agent bridge (e.g. `https://bridge.internal`).
    /// When `None`, tenants cannot hand off to a live agent.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-request timeout for bridge calls.
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries for `start` / `end` on 5xx or transport errors.  Message
    /// forwarding is never retried.
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,

    /// Transient state a handler transitions to in order to request an agent.
    #[serde(default = "d_connecting_state")]
    pub connecting_state: String,

    /// Pass-through state: inbound events bypass the dialog engine.
    #[serde(default = "d_active_state")]
    pub active_state: String,

    /// Terminal state entered on an explicit "end session".
    #[serde(default = "d_closed_state")]
    pub closed_state: String,

    /// Text that leaves live chat and returns to the dialog.
    #[serde(default = "d_exit_keywords")]
    pub exit_keywords: Vec<String>,

    /// Text that leaves live chat and closes the session.  Checked before
    /// `exit_keywords`.
    #[serde(default = "d_close_keywords")]
    pub close_keywords: Vec<String>,

    /// Display name used when the channel adapter sends no hint.
    #[serde(default = "d_display_name")]
    pub default_display_name: String,

    /// Channel tag used when the channel adapter sends none.
    #[serde(default = "d_channel")]
    pub default_channel: String,

    #[serde(default)]
    pub messages: LiveChatMessages,
}

impl Default for LiveChatConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: d_timeout_ms(),
            max_retries: d_max_retries(),
            connecting_state: d_connecting_state(),
            active_state: d_active_state(),
            closed_state: d_closed_state(),
            exit_keywords: d_exit_keywords(),
            close_keywords: d_close_keywords(),
            default_display_name: d_display_name(),
            default_channel: d_channel(),
            messages: LiveChatMessages::default(),
        }
    }
}

/// User-facing copy for live-chat transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveChatMessages {
    #[serde(default = "d_connected")]
    pub connected: String,
    #[serde(default = "d_connect_failed")]
    pub connect_failed: String,
    #[serde(default = "d_undeliverable")]
    pub undeliverable: String,
    #[serde(default = "d_left")]
    pub left: String,
    #[serde(default = "d_goodbye")]
    pub goodbye: String,
    /// Opening message sent to the agent with the `start` call.
    #[serde(default = "d_handoff_note")]
    pub handoff_note: String,
}

impl Default for LiveChatMessages {
    fn default() -> Self {
        Self {
            connected: d_connected(),
            connect_failed: d_connect_failed(),
            undeliverable: d_undeliverable(),
            left: d_left(),
            goodbye: d_goodbye(),
            handoff_note: d_handoff_note(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_max_retries() -> u32 {
    1
}

fn d_timeout_ms() -> u64 {
    10_000
}
fn d_connecting_state() -> String {
    "LIVE_CHAT_CONNECTING".into()
}
fn d_active_state() -> String {
    "LIVE_CHAT_ACTIVE".into()
}
fn d_closed_state() -> String {
    "SESSION_CLOSED".into()
}
fn d_exit_keywords() -> Vec<String> {
    [
        "exit",
        "quit",
        "end chat",
        "menu",
        "disconnect",
        "close session",
        "stop chat",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn d_close_keywords() -> Vec<String> {
    vec!["end session".into()]
}
fn d_display_name() -> String {
    "User".into()
}
fn d_channel() -> String {
    "web".into()
}
fn d_connected() -> String {
    "You are now connected to a live agent. Type 'exit' to return to the menu.".into()
}
fn d_connect_failed() -> String {
    "Sorry, we could not reach a live agent right now. Type 'menu' to go back.".into()
}
fn d_undeliverable() -> String {
    "Your message could not be delivered to the agent. Type 'menu' to exit live chat.".into()
}
fn d_left() -> String {
    "You have left the live chat.".into()
}
fn d_goodbye() -> String {
    "Your session has ended. Thank you for chatting with us. Goodbye!".into()
}
fn d_handoff_note() -> String {
    "User requested a live agent.".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keyword_sets() {
        let cfg = LiveChatConfig::default();
        assert!(cfg.exit_keywords.iter().any(|k| k == "menu"));
        assert_eq!(cfg.close_keywords, vec!["end session".to_string()]);
        assert!(cfg.endpoint.is_none());
    }

    #[test]
    fn partial_messages_keep_other_defaults() {
        let toml_str = r#"
            endpoint = "http://bridge:9000"

            [messages]
            goodbye = "Bye!"
        "#;
        let cfg: LiveChatConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.messages.goodbye, "Bye!");
        assert!(cfg.messages.undeliverable.contains("menu"));
        assert_eq!(cfg.active_state, "LIVE_CHAT_ACTIVE");
    }
}
