//! Gateway runtime — tenant dialogs, per-key turn serialization and the
//! orchestrator that runs one turn against the session store.

pub mod session_lock;
pub mod tenants;
pub mod turn;

pub use session_lock::SessionLockMap;
pub use tenants::{TenantRegistry, TenantRuntime};
pub use turn::{InboundTurn, Orchestrator, TurnOutcome};
