//! Conversation persistence model.
//!
//! Threads hold messages; assistant messages embed the lifecycle records of
//! the tool calls the planner made while producing them.

pub mod entities;
pub mod invocation;

pub use entities::{ConversationMessage, ConversationThread, Role, ThreadError};
pub use invocation::{
    InvocationState, InvocationUpdate, LifecycleError, ToolCallId, ToolInvocationRecord,
};
