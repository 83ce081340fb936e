//! `parley send` — one text turn through the in-process orchestrator.
//!
//! With `sessions.state_path` set the session survives between
//! invocations, so a dialog can be walked step by step from a shell.

use std::sync::Arc;

use pa_domain::config::Config;
use pa_domain::dialog::{DialogEvent, OutboundMessage};

use crate::bootstrap;
use crate::runtime::InboundTurn;

pub async fn send(
    config: Arc<Config>,
    tenant: String,
    user: String,
    text: String,
    json: bool,
) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config).await?;

    let turn = InboundTurn::new(tenant, user, DialogEvent::text(text)).channel("cli");
    let outcome = state.orchestrator.handle(turn).await?;
    state.sessions.flush()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    for message in &outcome.messages {
        println!("{}", render(message));
    }
    if let Some(next) = &outcome.state {
        eprintln!("[state: {next}]");
    }
    Ok(())
}

/// Plain-text rendering for a terminal.
fn render(message: &OutboundMessage) -> String {
    match message {
        OutboundMessage::Text { text } => text.clone(),
        OutboundMessage::Image { url, .. } => format!("[image] {url}"),
        OutboundMessage::Choice { text, options } => {
            let mut out = text.clone();
            for (i, option) in options.iter().enumerate() {
                out.push_str(&format!("\n  {}. {} ({})", i + 1, option.label, option.action));
            }
            out
        }
        OutboundMessage::Custom { payload } => format!("[custom] {payload}"),
    }
}
