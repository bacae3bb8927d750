//! Port for the structured invocation audit trail.
//!
//! Defines the [`AuditLogger`] trait for recording invocation events
//! (proposal, validated call, confirmation, completion) to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures every
//! invocation in a machine-readable format (JSONL).

use serde_json::Value;

/// Event type identifiers written by the dispatch engine.
pub mod events {
    pub const INVOCATION_PROPOSED: &str = "invocation_proposed";
    pub const INVOCATION_CALLED: &str = "invocation_called";
    pub const CONFIRMATION_REQUESTED: &str = "confirmation_requested";
    pub const CONFIRMATION_RESOLVED: &str = "confirmation_resolved";
    pub const INVOCATION_COMPLETED: &str = "invocation_completed";
}

/// A structured audit event.
///
/// The adapter stamps the time when writing.
pub struct AuditEvent {
    /// Event type identifier (see [`events`]).
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl AuditEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging audit events.
///
/// Implementations write each event as a single record (e.g., one JSONL line).
/// `log` is synchronous and non-fallible; write failures are dropped so the
/// audit trail never changes a dispatch outcome.
pub trait AuditLogger: Send + Sync {
    fn log(&self, event: AuditEvent);
}

/// No-op implementation for tests and when auditing is disabled.
pub struct NoAuditLogger;

impl AuditLogger for NoAuditLogger {
    fn log(&self, _event: AuditEvent) {}
}
