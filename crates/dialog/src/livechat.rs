//! Live-agent pass-through mode.
//!
//! ```text
//! NORMAL --agent--> CONNECTING --always--> ACTIVE   (bridge start)
//! ACTIVE --exit keyword--> NORMAL            (bridge end)
//! ACTIVE --close keyword--> SESSION_CLOSED   (bridge end, attributes cleared)
//! ACTIVE --anything else--> ACTIVE           (forwarded verbatim)
//! ```
//!
//! While ACTIVE the dialog engine is bypassed.  Bridge calls never steer
//! the conversation: each is bounded by the turn timeout, and a failed or
//! elapsed call degrades into a notice (or nothing, for `end`).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pa_domain::config::{LiveChatConfig, TurnConfig};
use pa_domain::dialog::{DialogEvent, DialogResponse};
use pa_domain::error::{Error, Result};
use pa_domain::trace::TraceEvent;
use pa_livechat::{ChatMessage, EndChat, LiveChatBridge};

use crate::handler::TurnContext;
use crate::intent::KeywordSet;

pub struct LiveChatRelay {
    bridge: Arc<dyn LiveChatBridge>,
    config: LiveChatConfig,
    exit: KeywordSet,
    close: KeywordSet,
    timeout: Duration,
}

impl LiveChatRelay {
    pub fn new(bridge: Arc<dyn LiveChatBridge>, config: &LiveChatConfig) -> Result<Self> {
        Ok(Self {
            bridge,
            exit: KeywordSet::new(&config.exit_keywords)?,
            close: KeywordSet::new(&config.close_keywords)?,
            config: config.clone(),
            timeout: Duration::from_millis(TurnConfig::default().timeout_ms),
        })
    }

    /// Upper bound on each bridge call made during a turn.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the keyword sets (per-tenant overrides).
    pub fn with_keywords(
        mut self,
        exit: Option<&[String]>,
        close: Option<&[String]>,
    ) -> Result<Self> {
        if let Some(exit) = exit {
            self.exit = KeywordSet::new(exit)?;
        }
        if let Some(close) = close {
            self.close = KeywordSet::new(close)?;
        }
        Ok(self)
    }

    pub fn connecting_state(&self) -> &str {
        &self.config.connecting_state
    }

    pub fn active_state(&self) -> &str {
        &self.config.active_state
    }

    pub fn closed_state(&self) -> &str {
        &self.config.closed_state
    }

    pub fn is_active(&self, state: &str) -> bool {
        state == self.config.active_state
    }

    fn display_name(&self, ctx: &TurnContext) -> String {
        ctx.display_name
            .clone()
            .unwrap_or_else(|| self.config.default_display_name.clone())
    }

    fn channel(&self, ctx: &TurnContext) -> String {
        ctx.channel
            .clone()
            .unwrap_or_else(|| self.config.default_channel.clone())
    }

    fn transition(&self, ctx: &TurnContext, from: &str, to: &str) {
        TraceEvent::LiveChatTransition {
            session_key: format!("{}:{}", ctx.tenant_id, ctx.user_id),
            from: from.to_owned(),
            to: to.to_owned(),
        }
        .emit();
    }

    /// CONNECTING: open the agent conversation and advance to ACTIVE.
    ///
    /// A failed `start` does not hold the user back; they get a soft notice
    /// and can leave with an exit keyword.
    pub async fn connect(&self, ctx: &TurnContext) -> DialogResponse {
        let opening = match &ctx.event {
            DialogEvent::Text(text) => text.clone(),
            _ => self.config.messages.handoff_note.clone(),
        };
        let req = ChatMessage::new(
            ctx.user_id.clone(),
            self.display_name(ctx),
            self.channel(ctx),
            opening,
        );

        let notice = match self.bounded("start", self.bridge.start(&req)).await {
            Ok(_) => self.config.messages.connected.clone(),
            Err(e) => {
                tracing::warn!(
                    tenant_id = %ctx.tenant_id,
                    user_id = %ctx.user_id,
                    error = %e,
                    "live-chat start failed"
                );
                self.config.messages.connect_failed.clone()
            }
        };
        self.transition(ctx, self.connecting_state(), self.active_state());
        DialogResponse::new().text(notice).goto(self.active_state())
    }

    /// ACTIVE: scan for exit/close keywords, otherwise forward verbatim.
    pub async fn relay(&self, ctx: &TurnContext, return_state: &str) -> DialogResponse {
        if let Some(text) = ctx.event.as_text() {
            if let Some(keyword) = self.close.find(text) {
                tracing::info!(user_id = %ctx.user_id, keyword = %keyword, "live chat closed by user");
                self.end(ctx).await;
                self.transition(ctx, self.active_state(), self.closed_state());
                return DialogResponse::new()
                    .text(self.config.messages.goodbye.clone())
                    .goto(self.closed_state())
                    .reset_attributes();
            }
            if let Some(keyword) = self.exit.find(text) {
                tracing::info!(user_id = %ctx.user_id, keyword = %keyword, "user left live chat");
                self.end(ctx).await;
                self.transition(ctx, self.active_state(), return_state);
                return DialogResponse::new()
                    .text(self.config.messages.left.clone())
                    .goto(return_state);
            }
        }

        let req = ChatMessage::new(
            ctx.user_id.clone(),
            self.display_name(ctx),
            self.channel(ctx),
            ctx.event.raw_payload(),
        );
        match self
            .bounded("message", self.bridge.send_message(&ctx.tenant_id, &req))
            .await
        {
            Ok(()) => DialogResponse::silent(),
            Err(e) => {
                tracing::warn!(
                    tenant_id = %ctx.tenant_id,
                    user_id = %ctx.user_id,
                    error = %e,
                    "live-chat message not delivered"
                );
                DialogResponse::new().text(self.config.messages.undeliverable.clone())
            }
        }
    }

    /// Close the agent conversation.  Failures are logged and swallowed.
    pub async fn end(&self, ctx: &TurnContext) {
        let req = EndChat {
            user_id: ctx.user_id.clone(),
            channel: self.channel(ctx),
        };
        if let Err(e) = self.bounded("end", self.bridge.end(&req)).await {
            tracing::warn!(
                tenant_id = %ctx.tenant_id,
                user_id = %ctx.user_id,
                error = %e,
                "live-chat end failed (ignored)"
            );
        }
    }

    async fn bounded<T>(&self, call: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_elapsed) => Err(Error::Timeout(format!(
                "live-chat {call} exceeded {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}
