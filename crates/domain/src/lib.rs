//! Shared domain types for Parley: configuration, the common error type,
//! structured trace events and the channel-agnostic dialog values.

pub mod config;
pub mod dialog;
pub mod error;
pub mod trace;
