//! Wire DTOs for the live-agent bridge.
//!
//! Field names are `camelCase` on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `start` and `message` calls.
///
/// `message` is the user's raw inbound payload, forwarded verbatim: a
/// string for text, the channel's JSON otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub user_id: String,
    pub display_name: String,
    pub channel: String,
    pub message: Value,
}

impl ChatMessage {
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        channel: impl Into<String>,
        message: impl Into<Value>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            channel: channel.into(),
            message: message.into(),
        }
    }
}

/// Body of the `end` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndChat {
    pub user_id: String,
    pub channel: String,
}

/// Envelope every bridge endpoint answers with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_message_is_camel_case() {
        let msg = ChatMessage::new("U1", "Asha", "line", "hello");
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            v,
            json!({"userId": "U1", "displayName": "Asha", "channel": "line", "message": "hello"})
        );
    }

    #[test]
    fn raw_payload_is_forwarded_as_json() {
        let raw = json!({"type": "sticker", "id": 42});
        let msg = ChatMessage::new("U1", "Asha", "line", raw.clone());
        assert_eq!(serde_json::to_value(&msg).unwrap()["message"], raw);
    }

    #[test]
    fn bridge_response_tolerates_missing_fields() {
        let r: BridgeResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(r.success);
        assert!(r.data.is_none());
        let r: BridgeResponse = serde_json::from_str("{}").unwrap();
        assert!(!r.success);
    }
}
