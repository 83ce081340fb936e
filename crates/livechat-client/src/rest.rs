//! REST implementation of [`LiveChatBridge`].
//!
//! `RestLiveChatBridge` wraps a `reqwest::Client` and maps each trait
//! method onto the bridge's HTTP API.  `start` and `end` are retried with
//! exponential back-off on transient (5xx / transport) failures; message
//! forwarding is sent once.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use uuid::Uuid;

use pa_domain::config::LiveChatConfig;
use pa_domain::error::{Error, Result};
use pa_domain::trace::TraceEvent;

use crate::bridge::LiveChatBridge;
use crate::types::{BridgeResponse, ChatMessage, EndChat};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST client for the live-agent bridge.
///
/// Created once at bootstrap; the underlying `reqwest::Client` keeps a
/// connection pool.
#[derive(Debug, Clone)]
pub struct RestLiveChatBridge {
    http: Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
}

impl RestLiveChatBridge {
    /// Build from `[live_chat]`.  Fails when no endpoint is configured.
    pub fn new(cfg: &LiveChatConfig) -> Result<Self> {
        let endpoint = cfg
            .endpoint
            .as_deref()
            .ok_or_else(|| Error::Config("live_chat.endpoint is not set".into()))?;

        let timeout = Duration::from_millis(cfg.timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: endpoint.trim_end_matches('/').to_owned(),
            timeout,
            max_retries: cfg.max_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── request helpers ──────────────────────────────────────────────

    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("X-Client-Type", "parley")
            .header("X-Trace-Id", Uuid::new_v4().to_string())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── retry engine ─────────────────────────────────────────────────

    /// Send a request, retrying up to `retries` times on 5xx and
    /// transport errors.  4xx and `success: false` are permanent.
    ///
    /// Emits a `TraceEvent::LiveChatCall` after every attempt.
    async fn execute_with_retry(
        &self,
        endpoint: &str,
        retries: u32,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<BridgeResponse> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }

            let start = Instant::now();
            let result = self.decorate(build_request()).send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    TraceEvent::LiveChatCall {
                        endpoint: endpoint.to_owned(),
                        status: status.as_u16(),
                        duration_ms,
                    }
                    .emit();

                    let body = resp.text().await.map_err(from_reqwest)?;

                    if status.is_server_error() {
                        last_err = Some(Error::Bridge(format!(
                            "{endpoint} returned {status}: {body}"
                        )));
                        continue;
                    }
                    if !status.is_success() {
                        return Err(Error::Bridge(format!(
                            "{endpoint} returned {status}: {body}"
                        )));
                    }

                    return parse_envelope(endpoint, &body);
                }
                Err(e) => {
                    TraceEvent::LiveChatCall {
                        endpoint: endpoint.to_owned(),
                        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                        duration_ms,
                    }
                    .emit();
                    last_err = Some(from_reqwest(e));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Bridge(format!("{endpoint}: all retries exhausted"))))
    }
}

/// Decode the `{success, data|error}` envelope.  An empty 2xx body counts
/// as success.
fn parse_envelope(endpoint: &str, body: &str) -> Result<BridgeResponse> {
    if body.trim().is_empty() {
        return Ok(BridgeResponse {
            success: true,
            ..Default::default()
        });
    }
    let envelope: BridgeResponse = serde_json::from_str(body)
        .map_err(|e| Error::Bridge(format!("{endpoint}: unparseable response: {e}: {body}")))?;
    if !envelope.success {
        let reason = envelope.error.as_deref().unwrap_or("unspecified error");
        return Err(Error::Bridge(format!("{endpoint} refused: {reason}")));
    }
    Ok(envelope)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl LiveChatBridge for RestLiveChatBridge {
    async fn start(&self, req: &ChatMessage) -> Result<Option<serde_json::Value>> {
        let url = self.url("/live-chat/start");
        let envelope = self
            .execute_with_retry("POST /live-chat/start", self.max_retries, || {
                self.http.post(&url).json(req)
            })
            .await?;
        Ok(envelope.data)
    }

    async fn send_message(&self, tenant_id: &str, req: &ChatMessage) -> Result<()> {
        let url = self.url(&format!("/live-chat/message/{tenant_id}"));
        self.execute_with_retry("POST /live-chat/message", 0, || {
            self.http.post(&url).json(req)
        })
        .await?;
        Ok(())
    }

    async fn end(&self, req: &EndChat) -> Result<()> {
        let url = self.url("/live-chat/end");
        self.execute_with_retry("POST /live-chat/end", self.max_retries, || {
            self.http.post(&url).json(req)
        })
        .await?;
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_endpoint() {
        let err = RestLiveChatBridge::new(&LiveChatConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let cfg = LiveChatConfig {
            endpoint: Some("http://bridge.local/".into()),
            ..Default::default()
        };
        let bridge = RestLiveChatBridge::new(&cfg).unwrap();
        assert_eq!(bridge.url("/live-chat/end"), "http://bridge.local/live-chat/end");
    }

    #[test]
    fn envelope_success_false_is_an_error() {
        let err = parse_envelope("POST /x", r#"{"success":false,"error":"agent desk closed"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("agent desk closed"));
    }

    #[test]
    fn empty_body_is_success() {
        assert!(parse_envelope("POST /x", "").unwrap().success);
    }

    #[test]
    fn data_is_kept() {
        let env = parse_envelope("POST /x", r#"{"success":true,"data":{"ticket":"T-9"}}"#).unwrap();
        assert_eq!(env.data.unwrap()["ticket"], "T-9");
    }
}
