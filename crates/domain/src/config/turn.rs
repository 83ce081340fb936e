use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn execution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Dialog turn execution limits and recovery copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Upper bound on one handler invocation, including its backend calls.
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,

    /// Shown when a handler fails; the session returns to the start state.
    #[serde(default = "d_error_text")]
    pub error_text: String,

    /// Shown when a session sits in a state no handler is registered for.
    #[serde(default = "d_unknown_state_text")]
    pub unknown_state_text: String,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            timeout_ms: d_timeout_ms(),
            error_text: d_error_text(),
            unknown_state_text: d_unknown_state_text(),
        }
    }
}

fn d_timeout_ms() -> u64 {
    20_000
}
fn d_error_text() -> String {
    "Sorry, an error occurred. Let's start again from the main menu.".into()
}
fn d_unknown_state_text() -> String {
    "Sorry, I lost track of our conversation. Let's start again.".into()
}
