//! Per-state dialog handlers and the context they receive.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use pa_domain::dialog::{Attributes, DialogEvent, DialogResponse, LifecycleEvent};
use pa_domain::error::Result;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything a handler may look at for one turn.
///
/// Handlers never see the session store; attribute changes go back in the
/// returned [`DialogResponse`].
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub tenant_id: String,
    pub user_id: String,
    /// The state being handled.  For terminal states this is the start
    /// state the engine routed to.
    pub state: String,
    pub event: DialogEvent,
    pub attributes: Attributes,
    pub display_name: Option<String>,
    pub channel: Option<String>,
    /// Intent matched from free text; filled in by the engine.
    pub intent: Option<String>,
}

/// What the user did this turn, as a handler usually wants to match it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command<'a> {
    /// Button / postback.
    Action(&'a str),
    /// Free text matched by an intent rule.
    Intent(&'a str),
    /// Free text no rule matched.
    Text(&'a str),
    Lifecycle(LifecycleEvent),
    Raw(&'a Value),
}

impl TurnContext {
    pub fn new(
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        state: impl Into<String>,
        event: DialogEvent,
        attributes: Attributes,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            state: state.into(),
            event,
            attributes,
            display_name: None,
            channel: None,
            intent: None,
        }
    }

    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }

    pub fn with_channel(mut self, channel: Option<String>) -> Self {
        self.channel = channel;
        self
    }

    pub fn command(&self) -> Command<'_> {
        match &self.event {
            DialogEvent::Action(a) => Command::Action(&a.action),
            DialogEvent::Text(text) => match &self.intent {
                Some(intent) => Command::Intent(intent),
                None => Command::Text(text),
            },
            DialogEvent::Lifecycle(event) => Command::Lifecycle(*event),
            DialogEvent::Raw(payload) => Command::Raw(payload),
        }
    }

    /// Action name or matched intent, whichever applies.
    pub fn choice(&self) -> Option<&str> {
        match self.command() {
            Command::Action(name) | Command::Intent(name) => Some(name),
            _ => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(Value::as_str)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handler trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Handles every event arriving in one dialog state.
///
/// A handler's only side effects are the backend calls it was built
/// with.  Errors are caught by the engine and never reach the user raw.
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use pa_dialog::{DialogHandler, TurnContext};
/// use pa_domain::dialog::DialogResponse;
/// use pa_domain::error::Result;
///
/// struct Greeting;
///
/// #[async_trait]
/// impl DialogHandler for Greeting {
///     async fn handle(&self, _ctx: &TurnContext) -> Result<DialogResponse> {
///         Ok(DialogResponse::new().text("Hello!"))
///     }
/// }
/// ```
#[async_trait]
pub trait DialogHandler: Send + Sync + 'static {
    async fn handle(&self, ctx: &TurnContext) -> Result<DialogResponse>;
}

/// Handler backed by an async closure over an owned context.
pub struct FnHandler<F> {
    f: F,
}

/// Wrap an async closure as a [`DialogHandler`].
pub fn from_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(TurnContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<DialogResponse>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> DialogHandler for FnHandler<F>
where
    F: Fn(TurnContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<DialogResponse>> + Send + 'static,
{
    async fn handle(&self, ctx: &TurnContext) -> Result<DialogResponse> {
        (self.f)(ctx.clone()).await
    }
}
