//! Domain layer for action-dispatch
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Actions
//!
//! An action is a named, described, schema-validated capability that a
//! planner may invoke by name or alias:
//!
//! - **Descriptor**: name, aliases, input schema, examples, confirmation flag
//! - **Registry**: built once at startup, rejects authoring mistakes
//! - **Envelope**: every invocation ends as `success`, `error` or `cancelled`
//!
//! ## Conversations
//!
//! Threads of messages, where assistant messages embed the lifecycle of each
//! tool call (`partial-call → call → result`).

pub mod action;
pub mod config;
pub mod conversation;
pub mod core;

// Re-export commonly used types
pub use action::{
    Action, ActionContext, ActionDescriptor, ActionExample, ActionFailure, ActionHandler,
    ActionRegistry, ActionSuccess, CallerIdentity, FieldSpec, FieldType, InputSchema,
    InvocationError, InvocationResult, InvocationStatus, PathSegment, Refinement, RegistryError,
    TypedHandler, ValidationError, ValidationIssue, codes,
};
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, RunMode, Severity};
pub use conversation::{
    ConversationMessage, ConversationThread, InvocationState, InvocationUpdate, LifecycleError,
    Role, ThreadError, ToolCallId, ToolInvocationRecord,
};
