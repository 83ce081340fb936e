//! The dialog engine: a state → handler registry plus failure recovery.
//!
//! `route` is total.  Whatever a handler does (error, panic, overrun
//! the turn timeout, jump to an undeclared state) the caller gets a
//! response with a user-facing message and a valid next state.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;

use pa_domain::config::TurnConfig;
use pa_domain::dialog::DialogResponse;
use pa_domain::error::{Error, Result};
use pa_domain::trace::TraceEvent;

use crate::handler::{DialogHandler, TurnContext};
use crate::intent::IntentRules;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Builder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Builds a [`DialogEngine`].
///
/// ```rust,no_run
/// # use pa_dialog::{from_fn, DialogEngine, TurnContext};
/// # use pa_domain::dialog::DialogResponse;
/// # fn build() -> pa_domain::error::Result<DialogEngine> {
/// DialogEngine::builder("acme-bank", "MAIN_MENU")
///     .state("MAIN_MENU", from_fn(|_ctx: TurnContext| async {
///         Ok(DialogResponse::new().text("Welcome!"))
///     }))
///     .terminal("SESSION_CLOSED")
///     .build()
/// # }
/// ```
pub struct DialogEngineBuilder {
    name: String,
    start_state: String,
    handlers: HashMap<String, Arc<dyn DialogHandler>>,
    duplicates: Vec<String>,
    fallback: Option<Arc<dyn DialogHandler>>,
    terminal: HashSet<String>,
    external: HashSet<String>,
    intents: IntentRules,
    turn: TurnConfig,
}

impl DialogEngineBuilder {
    /// Register the handler for `state`.  Registering a state twice makes
    /// `build` fail.
    pub fn state<H: DialogHandler>(self, state: impl Into<String>, handler: H) -> Self {
        self.state_arc(state, Arc::new(handler))
    }

    pub fn state_arc(mut self, state: impl Into<String>, handler: Arc<dyn DialogHandler>) -> Self {
        let state = state.into();
        if self.handlers.insert(state.clone(), handler).is_some() {
            self.duplicates.push(state);
        }
        self
    }

    /// Handler for sessions in a state nothing is registered for.  Its
    /// response always returns to the start state.
    pub fn fallback<H: DialogHandler>(mut self, handler: H) -> Self {
        self.fallback = Some(Arc::new(handler));
        self
    }

    /// A state that ends the conversation.  Events arriving in it are
    /// routed to the start state's handler.
    pub fn terminal(mut self, state: impl Into<String>) -> Self {
        self.terminal.insert(state.into());
        self
    }

    /// A state owned outside the engine (the live-chat states).  Handlers
    /// may transition to it; the engine never routes it.
    pub fn external(mut self, state: impl Into<String>) -> Self {
        self.external.insert(state.into());
        self
    }

    pub fn intents(mut self, intents: IntentRules) -> Self {
        self.intents = intents;
        self
    }

    /// Turn timeout and recovery copy.
    pub fn turn_config(mut self, turn: TurnConfig) -> Self {
        self.turn = turn;
        self
    }

    pub fn build(self) -> Result<DialogEngine> {
        if !self.duplicates.is_empty() {
            return Err(Error::Dialog(format!(
                "{}: more than one handler for state(s) {}",
                self.name,
                self.duplicates.join(", ")
            )));
        }
        if !self.handlers.contains_key(&self.start_state) {
            return Err(Error::Dialog(format!(
                "{}: start state '{}' has no handler",
                self.name, self.start_state
            )));
        }
        if self.turn.timeout_ms == 0 {
            return Err(Error::Dialog(format!("{}: turn timeout must be > 0", self.name)));
        }

        Ok(DialogEngine {
            name: self.name,
            start_state: self.start_state,
            handlers: self.handlers,
            fallback: self.fallback,
            terminal: self.terminal,
            external: self.external,
            intents: self.intents,
            timeout: Duration::from_millis(self.turn.timeout_ms),
            error_text: self.turn.error_text,
            unknown_state_text: self.turn.unknown_state_text,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One dialog: its states, intent rules and recovery behavior.
pub struct DialogEngine {
    name: String,
    start_state: String,
    handlers: HashMap<String, Arc<dyn DialogHandler>>,
    fallback: Option<Arc<dyn DialogHandler>>,
    terminal: HashSet<String>,
    external: HashSet<String>,
    intents: IntentRules,
    timeout: Duration,
    error_text: String,
    unknown_state_text: String,
}

impl std::fmt::Debug for DialogEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogEngine")
            .field("name", &self.name)
            .field("start_state", &self.start_state)
            .field("states", &self.state_names())
            .finish_non_exhaustive()
    }
}

enum Route {
    Registered(Arc<dyn DialogHandler>),
    Fallback(Option<Arc<dyn DialogHandler>>),
}

impl DialogEngine {
    pub fn builder(name: impl Into<String>, start_state: impl Into<String>) -> DialogEngineBuilder {
        DialogEngineBuilder {
            name: name.into(),
            start_state: start_state.into(),
            handlers: HashMap::new(),
            duplicates: Vec::new(),
            fallback: None,
            terminal: HashSet::new(),
            external: HashSet::new(),
            intents: IntentRules::new(),
            turn: TurnConfig::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_state(&self) -> &str {
        &self.start_state
    }

    pub fn intents(&self) -> &IntentRules {
        &self.intents
    }

    pub fn is_terminal(&self, state: &str) -> bool {
        self.terminal.contains(state)
    }

    /// Registered, terminal or external.
    pub fn is_declared(&self, state: &str) -> bool {
        self.handlers.contains_key(state)
            || self.terminal.contains(state)
            || self.external.contains(state)
    }

    /// Registered state names, sorted.
    pub fn state_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    fn resolve(&self, state: &str) -> Route {
        match self.handlers.get(state) {
            Some(h) => Route::Registered(h.clone()),
            None => Route::Fallback(self.fallback.clone()),
        }
    }

    /// Route one turn.  Never fails.
    ///
    /// `ctx.state` is the session's current state; the engine fills in
    /// `ctx.intent` for text events.
    pub async fn route(&self, mut ctx: TurnContext) -> DialogResponse {
        let start = Instant::now();
        let session_state = ctx.state.clone();

        let restarted = self.terminal.contains(&ctx.state);
        if restarted {
            ctx.state = self.start_state.clone();
        }
        if let Some(text) = ctx.event.as_text() {
            ctx.intent = self.intents.classify(text).map(str::to_owned);
        }

        let mut response = match self.resolve(&ctx.state) {
            Route::Registered(handler) => self.invoke(handler.as_ref(), &ctx).await,
            Route::Fallback(handler) => {
                tracing::warn!(
                    dialog = %self.name,
                    state = %ctx.state,
                    user_id = %ctx.user_id,
                    "no handler for state, routing to fallback"
                );
                self.unknown_state(handler, &ctx).await
            }
        };
        // Leave the terminal state even when the start handler stays put.
        if restarted && response.next_state.is_none() {
            response.next_state = Some(self.start_state.clone());
        }

        TraceEvent::DialogRouted {
            dialog: self.name.clone(),
            state: session_state,
            handler_state: ctx.state.clone(),
            next_state: response.next_state.clone(),
            messages: response.messages.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();

        response
    }

    /// Run a handler under the turn timeout, catching errors and panics.
    async fn invoke(&self, handler: &dyn DialogHandler, ctx: &TurnContext) -> DialogResponse {
        let outcome = tokio::time::timeout(
            self.timeout,
            AssertUnwindSafe(handler.handle(ctx)).catch_unwind(),
        )
        .await;

        let failure = match outcome {
            Ok(Ok(Ok(response))) => match &response.next_state {
                Some(next) if !self.is_declared(next) => {
                    format!("transition to undeclared state '{next}'")
                }
                _ => return response,
            },
            Ok(Ok(Err(e))) => e.to_string(),
            Ok(Err(_panic)) => "handler panicked".to_string(),
            Err(_elapsed) => format!("handler exceeded {}ms", self.timeout.as_millis()),
        };

        self.recover(ctx, failure)
    }

    /// Generic error message, back to start, attributes untouched.
    fn recover(&self, ctx: &TurnContext, reason: String) -> DialogResponse {
        tracing::error!(
            dialog = %self.name,
            state = %ctx.state,
            user_id = %ctx.user_id,
            error = %reason,
            "dialog handler failed"
        );
        TraceEvent::HandlerFailed {
            dialog: self.name.clone(),
            state: ctx.state.clone(),
            reason,
        }
        .emit();

        DialogResponse::new()
            .text(self.error_text.clone())
            .goto(self.start_state.clone())
    }

    async fn unknown_state(
        &self,
        handler: Option<Arc<dyn DialogHandler>>,
        ctx: &TurnContext,
    ) -> DialogResponse {
        let mut response = match handler {
            Some(h) => self.invoke(h.as_ref(), ctx).await,
            None => DialogResponse::new().text(self.unknown_state_text.clone()),
        };
        response.next_state = Some(self.start_state.clone());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::from_fn;
    use pa_domain::dialog::{Attributes, DialogEvent};

    fn ctx(state: &str, event: DialogEvent) -> TurnContext {
        TurnContext::new("bank", "u1", state, event, Attributes::new())
    }

    fn echo_state() -> impl DialogHandler {
        from_fn(|ctx: TurnContext| async move {
            Ok(DialogResponse::new().text(format!("in {}", ctx.state)))
        })
    }

    #[test]
    fn duplicate_handler_is_rejected() {
        let err = DialogEngine::builder("d", "A")
            .state("A", echo_state())
            .state("A", echo_state())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("more than one handler"));
    }

    #[test]
    fn start_state_must_be_registered() {
        let err = DialogEngine::builder("d", "A")
            .state("B", echo_state())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("start state 'A'"));
    }

    #[tokio::test]
    async fn unknown_state_routes_to_start_without_panicking() {
        let engine = DialogEngine::builder("d", "A").state("A", echo_state()).build().unwrap();
        let resp = engine.route(ctx("GONE", DialogEvent::text("hi"))).await;
        assert_eq!(resp.next_state.as_deref(), Some("A"));
        assert_eq!(resp.messages.len(), 1);
        assert!(resp.attributes.is_none());
    }

    #[tokio::test]
    async fn configured_fallback_is_forced_back_to_start() {
        let engine = DialogEngine::builder("d", "A")
            .state("A", echo_state())
            .state("B", echo_state())
            .fallback(from_fn(|_ctx: TurnContext| async {
                Ok(DialogResponse::new().text("lost").goto("B"))
            }))
            .build()
            .unwrap();
        let resp = engine.route(ctx("GONE", DialogEvent::text("hi"))).await;
        assert_eq!(resp.next_state.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn terminal_state_routes_as_start() {
        let engine = DialogEngine::builder("d", "A")
            .state("A", echo_state())
            .terminal("CLOSED")
            .build()
            .unwrap();
        let resp = engine.route(ctx("CLOSED", DialogEvent::text("hi"))).await;
        assert_eq!(
            resp.messages,
            DialogResponse::new().text("in A").messages
        );
        assert_eq!(resp.next_state.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn undeclared_transition_is_a_failure() {
        let engine = DialogEngine::builder("d", "A")
            .state("A", from_fn(|_ctx: TurnContext| async {
                Ok(DialogResponse::new().text("x").goto("NOWHERE"))
            }))
            .build()
            .unwrap();
        let resp = engine.route(ctx("A", DialogEvent::text("hi"))).await;
        assert_eq!(resp.next_state.as_deref(), Some("A"));
        assert_eq!(resp.messages, DialogResponse::new().text(TurnConfig::default().error_text).messages);
    }

    #[tokio::test]
    async fn external_states_are_valid_targets() {
        let engine = DialogEngine::builder("d", "A")
            .state("A", from_fn(|_ctx: TurnContext| async {
                Ok(DialogResponse::silent().goto("LIVE_CHAT_CONNECTING"))
            }))
            .external("LIVE_CHAT_CONNECTING")
            .build()
            .unwrap();
        let resp = engine.route(ctx("A", DialogEvent::action("agent"))).await;
        assert_eq!(resp.next_state.as_deref(), Some("LIVE_CHAT_CONNECTING"));
    }

    #[tokio::test]
    async fn intent_is_classified_before_dispatch() {
        let engine = DialogEngine::builder("d", "A")
            .state("A", from_fn(|ctx: TurnContext| async move {
                Ok(DialogResponse::new().text(ctx.intent.unwrap_or_default()))
            }))
            .intents(IntentRules::new().keywords("agent", &["human"]).unwrap())
            .build()
            .unwrap();
        let resp = engine.route(ctx("A", DialogEvent::text("A HUMAN please!"))).await;
        assert_eq!(resp.messages, DialogResponse::new().text("agent").messages);
    }
}
