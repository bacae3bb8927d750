//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod dispatch;
pub mod replay_history;
pub mod run_invocation;
pub mod tool_adapter;
