//! Application layer for action-dispatch
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{DispatchPolicy, GENERIC_EXECUTION_MESSAGE};
pub use ports::{
    audit_logger::{AuditEvent, AuditLogger, NoAuditLogger, events},
    confirmation::{
        AutoApproveConfirmation, AutoRejectConfirmation, ConfirmationDecision, ConfirmationError,
        ConfirmationPort, ConfirmationRequest,
    },
    conversation_repository::{ConversationRepository, StoreError},
    tool_schema::ToolSchemaPort,
};
pub use use_cases::dispatch::Dispatcher;
pub use use_cases::replay_history::{
    HistoryEntry, HistoryStats, InvocationSummary, ReplayHistoryUseCase, ThreadHistory,
};
pub use use_cases::run_invocation::{
    InvocationOutcome, InvocationScope, PlannerCall, RunInvocationError, RunInvocationUseCase,
};
pub use use_cases::tool_adapter::{PlannerTool, ToolAdapter, ToolExecute};
