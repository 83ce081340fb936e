//! Channel-agnostic dialog value types shared by the session store, the
//! dialog engine and the gateway.
//!
//! Channel adapters normalize their wire events into [`DialogEvent`] and
//! render [`OutboundMessage`] back into their platform's format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form per-session attributes (phone numbers, auth flags, cached
/// lookups, selected ids).  Updates merge shallowly by key.
pub type Attributes = serde_json::Map<String, Value>;

/// Shallow-merge `patch` into `target`: keys in `patch` overwrite, all
/// other keys persist.
pub fn merge_attributes(target: &mut Attributes, patch: Attributes) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A normalized inbound event.
///
/// Wire shape: `{"kind": "text", "payload": "hi"}`,
/// `{"kind": "action", "payload": {"action": "balance"}}`,
/// `{"kind": "raw", "payload": {...}}`, `{"kind": "lifecycle", "payload": "follow"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum DialogEvent {
    /// Free text typed by the user.
    Text(String),
    /// A button click or postback.
    #[serde(alias = "postback")]
    Action(ActionPayload),
    /// An untyped channel payload (attachments, stickers, locations, …).
    Raw(Value),
    /// Channel-level lifecycle signal.
    Lifecycle(LifecycleEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The user added / followed the bot.
    Follow,
    /// Explicit "start" (e.g. `/start` or a get-started button).
    Start,
    /// The user removed / blocked the bot.  Terminal.
    Unfollow,
}

impl DialogEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn action(action: impl Into<String>) -> Self {
        Self::Action(ActionPayload {
            action: action.into(),
            data: None,
        })
    }

    /// The text body, for text events only.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    /// The action name, for action/postback events only.
    pub fn as_action(&self) -> Option<&str> {
        match self {
            Self::Action(a) => Some(a.action.as_str()),
            _ => None,
        }
    }

    pub fn is_lifecycle(&self, event: LifecycleEvent) -> bool {
        matches!(self, Self::Lifecycle(e) if *e == event)
    }

    /// The payload as forwarded verbatim to an external agent.
    pub fn raw_payload(&self) -> Value {
        match self {
            Self::Text(t) => Value::String(t.clone()),
            Self::Action(a) => serde_json::to_value(a).unwrap_or(Value::Null),
            Self::Raw(v) => v.clone(),
            Self::Lifecycle(e) => serde_json::to_value(e).unwrap_or(Value::Null),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Action(_) => "action",
            Self::Raw(_) => "raw",
            Self::Lifecycle(_) => "lifecycle",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outbound
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A channel-agnostic outbound message descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Text {
        text: String,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },
    /// A prompt with a fixed set of buttons / quick replies.
    Choice {
        text: String,
        options: Vec<ChoiceOption>,
    },
    /// Pre-rendered platform payload, passed through by the adapter.
    Custom {
        payload: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub label: String,
    pub action: String,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::Image {
            url: url.into(),
            alt: None,
        }
    }

    pub fn choice(text: impl Into<String>, options: Vec<ChoiceOption>) -> Self {
        Self::Choice {
            text: text.into(),
            options,
        }
    }
}

impl ChoiceOption {
    pub fn new(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: action.into(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handler result
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What a dialog handler returns for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DialogResponse {
    /// Ordered outbound messages.  Empty means nothing is sent.
    pub messages: Vec<OutboundMessage>,
    /// Next dialog state; `None` stays in the current state.
    pub next_state: Option<String>,
    /// Attribute patch, shallow-merged into the session.
    pub attributes: Option<Attributes>,
    /// Clear all attributes before applying the patch.
    pub reset_attributes: bool,
    /// Delete the session once the messages have been handed off.
    pub end_session: bool,
}

impl DialogResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// A response with no messages and no transition.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: OutboundMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.message(OutboundMessage::text(text))
    }

    pub fn goto(mut self, state: impl Into<String>) -> Self {
        self.next_state = Some(state.into());
        self
    }

    /// Set one attribute in the patch.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes
            .get_or_insert_with(Attributes::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn reset_attributes(mut self) -> Self {
        self.reset_attributes = true;
        self
    }

    pub fn end_session(mut self) -> Self {
        self.end_session = true;
        self
    }
}
