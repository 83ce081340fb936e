//! The `LiveChatBridge` trait: the three calls the live-agent handoff
//! needs from an external agent desk.

use async_trait::async_trait;
use pa_domain::error::Result;

use crate::types::{ChatMessage, EndChat};

/// Abstraction over the live-agent bridge.
///
/// Implementations may talk to the real REST bridge or be a test double.
/// A `success: false` answer from the bridge surfaces as `Err`.
#[async_trait]
pub trait LiveChatBridge: Send + Sync {
    /// Open an agent conversation (POST /live-chat/start).
    async fn start(&self, req: &ChatMessage) -> Result<Option<serde_json::Value>>;

    /// Forward one user payload to the agent (POST /live-chat/message/{tenantId}).
    async fn send_message(&self, tenant_id: &str, req: &ChatMessage) -> Result<()>;

    /// Close the agent conversation (POST /live-chat/end).
    async fn end(&self, req: &EndChat) -> Result<()>;
}
