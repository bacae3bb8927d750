//! Confirmation port for fund-moving actions.
//!
//! Actions flagged `requires_confirmation` must not run until a human
//! accepts. The dispatcher asks through this port and suspends until an
//! answer arrives, the wait is cancelled, or the confirmation window closes.
//!
//! # Architecture
//!
//! Following the Ports and Adapters pattern:
//! - **Port**: [`ConfirmationPort`] - defined here in application layer
//! - **Adapter**: `ConfirmationBroker` (infrastructure), whose pending
//!   requests a UI answers; the CLI answers them with `ConsoleConfirmation`
//!
//! # Flow
//!
//! ```text
//! Dispatcher ──request_confirmation(toolCallId, message)──▶ adapter
//!     │                                                       │
//!     │ (suspended; timeout / cancel → cancelled)             ▼
//!     ◀──────────── Accept / Reject ───────────────────── human
//! ```
//!
//! # Built-in Implementations
//!
//! - [`AutoRejectConfirmation`] - Always rejects (safe default)
//! - [`AutoApproveConfirmation`] - Always accepts

use async_trait::async_trait;
use dispatch_domain::ToolCallId;
use serde::Serialize;
use serde_json::Value;

/// What the human is asked to approve.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    pub tool_call_id: ToolCallId,
    pub action: String,
    pub message: String,
    /// Validated arguments the handler would receive.
    pub args: Value,
}

impl ConfirmationRequest {
    pub fn new(
        tool_call_id: ToolCallId,
        action: impl Into<String>,
        message: impl Into<String>,
        args: Value,
    ) -> Self {
        Self {
            tool_call_id,
            action: action.into(),
            message: message.into(),
            args,
        }
    }
}

/// The human's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationDecision {
    Accept,
    Reject,
}

impl ConfirmationDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ConfirmationDecision::Accept)
    }
}

/// Failures while waiting for a decision.
///
/// These are not decisions; the dispatcher maps all of them to a
/// `cancelled` envelope.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfirmationError {
    #[error("Confirmation cancelled")]
    Cancelled,

    #[error("Confirmation timed out")]
    TimedOut,

    #[error("Confirmation channel unavailable: {0}")]
    Unavailable(String),
}

/// Port for asking a human to accept or reject an invocation.
#[async_trait]
pub trait ConfirmationPort: Send + Sync {
    /// Suspend until the human answers.
    ///
    /// Implementations may apply their own window; the dispatcher applies
    /// the configured timeout on top.
    async fn request_confirmation(
        &self,
        request: &ConfirmationRequest,
    ) -> Result<ConfirmationDecision, ConfirmationError>;

    /// Drop a pending request (thread closed, caller gone). Default: no-op.
    fn cancel(&self, _tool_call_id: &ToolCallId) {}
}

/// Always rejects.
///
/// The safest non-interactive mode: confirmation-gated actions never run.
pub struct AutoRejectConfirmation;

#[async_trait]
impl ConfirmationPort for AutoRejectConfirmation {
    async fn request_confirmation(
        &self,
        _request: &ConfirmationRequest,
    ) -> Result<ConfirmationDecision, ConfirmationError> {
        Ok(ConfirmationDecision::Reject)
    }
}

/// Always accepts.
///
/// # Warning
///
/// **Use with caution!** Fund-moving actions run without a human in the
/// loop. Only use against test networks or in-memory ledgers.
pub struct AutoApproveConfirmation;

#[async_trait]
impl ConfirmationPort for AutoApproveConfirmation {
    async fn request_confirmation(
        &self,
        _request: &ConfirmationRequest,
    ) -> Result<ConfirmationDecision, ConfirmationError> {
        Ok(ConfirmationDecision::Accept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ConfirmationRequest {
        ConfirmationRequest::new("call-1".into(), "transfer", "Send 1 S?", json!({}))
    }

    #[tokio::test]
    async fn test_auto_reject() {
        let decision = AutoRejectConfirmation
            .request_confirmation(&request())
            .await
            .unwrap();
        assert_eq!(decision, ConfirmationDecision::Reject);
        assert!(!decision.is_accepted());
    }

    #[tokio::test]
    async fn test_auto_approve() {
        let decision = AutoApproveConfirmation
            .request_confirmation(&request())
            .await
            .unwrap();
        assert!(decision.is_accepted());
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let value = serde_json::to_value(request()).unwrap();
        assert_eq!(value["toolCallId"], "call-1");
        assert_eq!(value["action"], "transfer");
    }
}
