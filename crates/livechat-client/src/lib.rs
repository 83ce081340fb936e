//! `pa-livechat` — client for the external live-agent bridge.
//!
//! Provides the [`LiveChatBridge`] trait the dialog relay talks to, a
//! production REST implementation ([`RestLiveChatBridge`]) and the
//! camelCase wire DTOs.
//!
//! ```rust,no_run
//! use pa_domain::config::LiveChatConfig;
//! use pa_livechat::{ChatMessage, LiveChatBridge, RestLiveChatBridge};
//!
//! # async fn example() -> pa_domain::error::Result<()> {
//! let cfg = LiveChatConfig {
//!     endpoint: Some("http://127.0.0.1:8088".into()),
//!     ..Default::default()
//! };
//! let bridge = RestLiveChatBridge::new(&cfg)?;
//! bridge
//!     .start(&ChatMessage::new("U1", "Asha", "whatsapp", "I need help"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod rest;
pub mod types;

pub use bridge::LiveChatBridge;
pub use rest::{from_reqwest, RestLiveChatBridge};
pub use types::{BridgeResponse, ChatMessage, EndChat};

use std::sync::Arc;

use pa_domain::config::LiveChatConfig;
use pa_domain::error::Result;

/// Build the REST bridge when `live_chat.endpoint` is configured.
pub fn create_bridge(cfg: &LiveChatConfig) -> Result<Option<Arc<dyn LiveChatBridge>>> {
    if cfg.endpoint.is_none() {
        tracing::info!("live_chat.endpoint not set; live-agent handoff disabled");
        return Ok(None);
    }
    let bridge = RestLiveChatBridge::new(cfg)?;
    tracing::info!(endpoint = %bridge.base_url(), "live-chat bridge configured");
    Ok(Some(Arc::new(bridge)))
}
