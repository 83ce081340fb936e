//! `pa-gateway` — the Parley HTTP gateway.
//!
//! Wires the session store, per-tenant dialog engines and the live-chat
//! relay into one [`runtime::Orchestrator`], and exposes it to channel
//! adapters over HTTP.  The `parley` binary in `main.rs` is a thin shell
//! around [`bootstrap`] and [`api::router`].

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
