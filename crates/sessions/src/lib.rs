//! Session management for Parley.
//!
//! One live session per `(tenant, user)` key, each with its own expiry
//! timer.  The store is the only place session state lives; the gateway
//! orchestrator serializes turns per key before touching it.

pub mod lifecycle;
pub mod session_key;
pub mod store;

pub use lifecycle::{ExpiryPolicy, RemovalReason};
pub use session_key::SessionKey;
pub use store::{Session, SessionPatch, SessionStore};
