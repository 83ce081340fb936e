//! Dialogs scripted in config: prompts plus choices between states.
//!
//! Each `[[tenants.states]]` entry becomes one handler.  A handler shows
//! its prompt on lifecycle events and on unmatched input, and follows a
//! matching choice (by action, intent or typed label) to its target.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use pa_domain::config::{ChoiceConfig, LiveChatConfig, StateConfig, TenantConfig, TurnConfig};
use pa_domain::dialog::{ChoiceOption, DialogResponse, OutboundMessage};
use pa_domain::error::{Error, Result};

use crate::engine::DialogEngine;
use crate::handler::{Command, DialogHandler, TurnContext};
use crate::intent::{normalize_text, IntentRules};

type Script = Arc<HashMap<String, StateConfig>>;

fn render(state: &StateConfig) -> Vec<OutboundMessage> {
    let mut out = Vec::new();
    if let Some(url) = &state.image {
        out.push(OutboundMessage::image(url.clone()));
    }
    if state.choices.is_empty() {
        out.push(OutboundMessage::text(state.prompt.clone()));
    } else {
        let options = state
            .choices
            .iter()
            .map(|c| ChoiceOption::new(c.label.clone(), c.action.clone()))
            .collect();
        out.push(OutboundMessage::choice(state.prompt.clone(), options));
    }
    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// State handler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct ScriptedState {
    name: String,
    script: Script,
}

impl ScriptedState {
    fn current(&self) -> Result<&StateConfig> {
        self.script
            .get(&self.name)
            .ok_or_else(|| Error::Dialog(format!("script lost state '{}'", self.name)))
    }

    fn pick<'a>(&self, state: &'a StateConfig, ctx: &TurnContext) -> Option<&'a ChoiceConfig> {
        match ctx.command() {
            Command::Action(name) | Command::Intent(name) => state
                .choices
                .iter()
                .find(|c| c.action.eq_ignore_ascii_case(name)),
            Command::Text(text) => {
                let typed = normalize_text(text);
                state
                    .choices
                    .iter()
                    .find(|c| normalize_text(&c.label) == typed)
            }
            Command::Lifecycle(_) | Command::Raw(_) => None,
        }
    }

    fn follow(&self, state: &StateConfig, choice: &ChoiceConfig) -> DialogResponse {
        let mut response = DialogResponse::new();
        if let Some(reply) = &choice.reply {
            response = response.text(reply.clone());
        }
        if choice.end_session {
            return response.end_session();
        }
        match &choice.next {
            Some(next) => match self.script.get(next) {
                Some(target) => {
                    let mut response = response.goto(next.clone());
                    response.messages.extend(render(target));
                    response
                }
                // Owned outside the script (live chat).
                None => response.goto(next.clone()),
            },
            None => {
                response.messages.extend(render(state));
                response
            }
        }
    }
}

#[async_trait]
impl DialogHandler for ScriptedState {
    async fn handle(&self, ctx: &TurnContext) -> Result<DialogResponse> {
        let state = self.current()?;
        match self.pick(state, ctx) {
            Some(choice) => Ok(self.follow(state, choice)),
            None => Ok(DialogResponse {
                messages: render(state),
                ..Default::default()
            }),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scripted dialog
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A tenant's dialog defined entirely by `[[tenants.states]]`.
pub struct ScriptedDialog {
    name: String,
    start_state: String,
    script: Script,
    order: Vec<String>,
    intents: IntentRules,
    terminal: Vec<String>,
    external: Vec<String>,
}

impl ScriptedDialog {
    pub fn from_config(tenant: &TenantConfig) -> Result<Self> {
        let mut script = HashMap::new();
        let mut order = Vec::new();
        for state in &tenant.states {
            if script.insert(state.name.clone(), state.clone()).is_some() {
                return Err(Error::Dialog(format!(
                    "{}: state '{}' declared twice",
                    tenant.id, state.name
                )));
            }
            order.push(state.name.clone());
        }

        Ok(Self {
            name: tenant.id.clone(),
            start_state: tenant.start_state.clone(),
            script: Arc::new(script),
            order,
            intents: IntentRules::from_config(&tenant.intents)?,
            terminal: Vec::new(),
            external: Vec::new(),
        })
    }

    /// Declare the live-chat states: connecting/active are handled by the
    /// relay, the closed state is terminal unless the script defines it.
    pub fn with_live_chat(mut self, cfg: &LiveChatConfig) -> Self {
        self.external.push(cfg.connecting_state.clone());
        self.external.push(cfg.active_state.clone());
        if !self.script.contains_key(&cfg.closed_state) {
            self.terminal.push(cfg.closed_state.clone());
        }
        self
    }

    pub fn into_engine(self, turn: TurnConfig) -> Result<DialogEngine> {
        let mut builder = DialogEngine::builder(self.name, self.start_state)
            .intents(self.intents)
            .turn_config(turn);
        for name in self.order {
            let handler = ScriptedState {
                name: name.clone(),
                script: self.script.clone(),
            };
            builder = builder.state(name, handler);
        }
        for state in self.terminal {
            builder = builder.terminal(state);
        }
        for state in self.external {
            builder = builder.external(state);
        }
        builder.build()
    }
}
