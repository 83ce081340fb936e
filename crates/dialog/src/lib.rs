//! Dialog routing for Parley.
//!
//! A [`DialogEngine`] maps each dialog state to one [`DialogHandler`] and
//! routes a turn `(state, event, attributes)` to a [`DialogResponse`].
//! Routing never fails: unknown states, handler errors, panics and
//! timeouts all degrade into a user-facing message and a return to the
//! start state.
//!
//! Also here: ordered intent rules for free text, input validators,
//! the live-agent relay and dialogs scripted from config.
//!
//! [`DialogResponse`]: pa_domain::dialog::DialogResponse

pub mod engine;
pub mod handler;
pub mod intent;
pub mod livechat;
pub mod script;
pub mod validate;

pub use engine::{DialogEngine, DialogEngineBuilder};
pub use handler::{from_fn, Command, DialogHandler, TurnContext};
pub use intent::{normalize_text, IntentRules, KeywordSet};
pub use livechat::LiveChatRelay;
pub use script::ScriptedDialog;
