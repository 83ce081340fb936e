use serde::Serialize;

/// Structured trace events emitted across all Parley crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        session_key: String,
        session_id: String,
        dialog_state: String,
        replaced: bool,
    },
    SessionDeleted {
        session_key: String,
        session_id: String,
        reason: String,
    },
    SessionExpired {
        session_key: String,
        session_id: String,
        idle_ms: u64,
    },
    DialogRouted {
        dialog: String,
        state: String,
        handler_state: String,
        next_state: Option<String>,
        messages: usize,
        duration_ms: u64,
    },
    HandlerFailed {
        dialog: String,
        state: String,
        reason: String,
    },
    LiveChatCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    LiveChatTransition {
        session_key: String,
        from: String,
        to: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "pa_event");
    }
}
