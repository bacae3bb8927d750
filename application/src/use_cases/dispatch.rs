//! Dispatch use case.
//!
//! The [`Dispatcher`] is the single boundary through which every invocation
//! passes. Whatever happens (unknown action, bad arguments, rejected
//! confirmation, handler panic), the caller gets exactly one
//! [`InvocationResult`] and nothing propagates.
//!
//! # Flow
//!
//! ```text
//! descriptor + raw args
//!        │
//!        ├─ no handler ──────────────────────▶ error / NOT_EXECUTABLE
//!        ▼
//! InputSchema::validate
//!        ├─ issues ──────────────────────────▶ error / VALIDATION_ERROR
//!        ▼
//! requires_confirmation?
//!        ├─ reject / timeout / cancel ───────▶ cancelled
//!        ▼
//! handler (panic-guarded)
//!        ├─ Err(ActionFailure) ──────────────▶ error / <handler code>
//!        ├─ panic ───────────────────────────▶ error / EXECUTION_ERROR
//!        ▼
//! success
//! ```

use crate::config::{DispatchPolicy, GENERIC_EXECUTION_MESSAGE};
use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger, events};
use crate::ports::confirmation::{
    ConfirmationDecision, ConfirmationError, ConfirmationPort, ConfirmationRequest,
};
use dispatch_domain::core::string::truncate;
use dispatch_domain::{
    ActionContext, ActionDescriptor, ActionHandler, ActionRegistry, InvocationError,
    InvocationResult, codes,
};
use futures::FutureExt;
use serde_json::{Value, json};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Validates, confirms and executes actions.
///
/// Holds no per-call state; one instance serves every conversation.
pub struct Dispatcher {
    registry: Arc<ActionRegistry>,
    confirmation: Arc<dyn ConfirmationPort>,
    audit: Arc<dyn AuditLogger>,
    policy: DispatchPolicy,
}

impl Clone for Dispatcher {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            confirmation: self.confirmation.clone(),
            audit: self.audit.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl Dispatcher {
    pub fn new(registry: Arc<ActionRegistry>, confirmation: Arc<dyn ConfirmationPort>) -> Self {
        Self {
            registry,
            confirmation,
            audit: Arc::new(NoAuditLogger),
            policy: DispatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    pub fn confirmation(&self) -> &Arc<dyn ConfirmationPort> {
        &self.confirmation
    }

    /// Dispatch without an external cancellation signal.
    pub async fn dispatch(
        &self,
        descriptor: &ActionDescriptor,
        raw_args: &Value,
        ctx: &ActionContext,
    ) -> InvocationResult {
        self.dispatch_with_cancel(descriptor, raw_args, ctx, &CancellationToken::new())
            .await
    }

    /// Resolve `name` against the registry, then dispatch.
    ///
    /// Unknown names produce an `error / NOT_FOUND` envelope.
    pub async fn dispatch_by_name(
        &self,
        name: &str,
        raw_args: &Value,
        ctx: &ActionContext,
        cancel: &CancellationToken,
    ) -> InvocationResult {
        let descriptor = match self.registry.resolve(name) {
            Ok(descriptor) => descriptor.clone(),
            Err(_) => {
                warn!(tool_call_id = %ctx.tool_call_id, "No action matches '{}'", name);
                let result = InvocationResult::failure(InvocationError::not_found(name.trim()));
                self.log_completed(name, ctx, &result);
                return result;
            }
        };
        debug!("Resolved '{}' to action '{}'", name, descriptor.name());
        self.dispatch_with_cancel(&descriptor, raw_args, ctx, cancel)
            .await
    }

    /// Dispatch one invocation.
    ///
    /// `cancel` only interrupts a pending confirmation; a handler that has
    /// started runs to completion.
    pub async fn dispatch_with_cancel(
        &self,
        descriptor: &ActionDescriptor,
        raw_args: &Value,
        ctx: &ActionContext,
        cancel: &CancellationToken,
    ) -> InvocationResult {
        info!(
            tool_call_id = %ctx.tool_call_id,
            action = descriptor.name(),
            "Dispatching action"
        );
        let result = self.run(descriptor, raw_args, ctx, cancel).await;
        info!(
            tool_call_id = %ctx.tool_call_id,
            action = descriptor.name(),
            status = %result.status(),
            "Dispatch finished: {}",
            truncate(result.message(), 120)
        );
        self.log_completed(descriptor.name(), ctx, &result);
        result
    }

    async fn run(
        &self,
        descriptor: &ActionDescriptor,
        raw_args: &Value,
        ctx: &ActionContext,
        cancel: &CancellationToken,
    ) -> InvocationResult {
        let Some(handler) = descriptor.handler() else {
            debug!("Action '{}' has no handler", descriptor.name());
            return InvocationResult::failure(InvocationError::not_executable(descriptor.name()));
        };

        let args = match descriptor.validate(raw_args) {
            Ok(args) => args,
            Err(e) => {
                debug!(
                    "Validation failed for '{}' ({} issue(s)): {}",
                    descriptor.name(),
                    e.issues.len(),
                    e
                );
                return InvocationResult::failure(InvocationError::validation(&e));
            }
        };

        if descriptor.requires_confirmation()
            && let Some(cancelled) = self.confirm(descriptor, &args, ctx, cancel).await
        {
            return cancelled;
        }

        let result = self.execute_guarded(handler, &args, ctx, descriptor.name()).await;
        self.redact(result)
    }

    /// Ask for confirmation. Returns `Some(cancelled envelope)` unless the
    /// human accepted.
    async fn confirm(
        &self,
        descriptor: &ActionDescriptor,
        args: &Value,
        ctx: &ActionContext,
        cancel: &CancellationToken,
    ) -> Option<InvocationResult> {
        let request = ConfirmationRequest::new(
            ctx.tool_call_id.clone(),
            descriptor.name(),
            confirmation_message(descriptor, args),
            args.clone(),
        );
        self.audit.log(AuditEvent::new(
            events::CONFIRMATION_REQUESTED,
            json!({
                "tool_call_id": ctx.tool_call_id,
                "action": descriptor.name(),
                "args": args,
            }),
        ));

        let timeout = self.policy.confirmation_timeout;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ConfirmationError::Cancelled),
            answer = tokio::time::timeout(timeout, self.confirmation.request_confirmation(&request)) => {
                answer.unwrap_or(Err(ConfirmationError::TimedOut))
            }
        };

        if matches!(
            outcome,
            Err(ConfirmationError::Cancelled | ConfirmationError::TimedOut)
        ) {
            self.confirmation.cancel(&ctx.tool_call_id);
        }

        let (decision, result) = match outcome {
            Ok(ConfirmationDecision::Accept) => ("accepted", None),
            Ok(ConfirmationDecision::Reject) => {
                warn!(tool_call_id = %ctx.tool_call_id, "Confirmation rejected for '{}'", descriptor.name());
                (
                    "rejected",
                    Some(InvocationResult::cancelled(format!(
                        "'{}' was rejected by the user",
                        descriptor.name()
                    ))),
                )
            }
            Err(ConfirmationError::TimedOut) => {
                warn!(
                    tool_call_id = %ctx.tool_call_id,
                    "Confirmation for '{}' timed out after {}s",
                    descriptor.name(),
                    timeout.as_secs()
                );
                (
                    "timed_out",
                    Some(InvocationResult::cancelled(format!(
                        "'{}' was not confirmed in time",
                        descriptor.name()
                    ))),
                )
            }
            Err(e) => {
                warn!(tool_call_id = %ctx.tool_call_id, "Confirmation for '{}' failed: {}", descriptor.name(), e);
                (
                    "cancelled",
                    Some(InvocationResult::cancelled(format!(
                        "'{}' was cancelled: {}",
                        descriptor.name(),
                        e
                    ))),
                )
            }
        };

        self.audit.log(AuditEvent::new(
            events::CONFIRMATION_RESOLVED,
            json!({
                "tool_call_id": ctx.tool_call_id,
                "action": descriptor.name(),
                "decision": decision,
            }),
        ));
        result
    }

    async fn execute_guarded(
        &self,
        handler: &Arc<dyn ActionHandler>,
        args: &Value,
        ctx: &ActionContext,
        action: &str,
    ) -> InvocationResult {
        // The handler call sits inside the guarded future so a panic while
        // building the future is caught too.
        let guarded = AssertUnwindSafe(async { handler.handle(ctx, args.clone()).await });
        match guarded.catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let panic_msg = panic_payload_to_string(&payload);
                error!(
                    tool_call_id = %ctx.tool_call_id,
                    "Action '{}' panicked: {}",
                    action,
                    panic_msg
                );
                InvocationResult::failure(
                    InvocationError::execution(format!("Action '{}' failed: {}", action, panic_msg))
                        .with_details(json!({ "panic": panic_msg })),
                )
            }
        }
    }

    /// Strip the cause from unexpected failures in production mode.
    fn redact(&self, result: InvocationResult) -> InvocationResult {
        if self.policy.redacts_execution_errors()
            && result.error_code() == Some(codes::EXECUTION_ERROR)
        {
            return InvocationResult::failure(InvocationError::execution(
                GENERIC_EXECUTION_MESSAGE,
            ));
        }
        result
    }

    fn log_completed(&self, action: &str, ctx: &ActionContext, result: &InvocationResult) {
        self.audit.log(AuditEvent::new(
            events::INVOCATION_COMPLETED,
            json!({
                "tool_call_id": ctx.tool_call_id,
                "action": action,
                "user_id": ctx.caller.user_id,
                "network": ctx.network,
                "status": result.status(),
                "error_code": result.error_code(),
                "message": result.message(),
            }),
        ));
    }
}

fn confirmation_message(descriptor: &ActionDescriptor, args: &Value) -> String {
    let args = serde_json::to_string(args).unwrap_or_default();
    format!(
        "{} ({}) with {}",
        descriptor.description(),
        descriptor.name(),
        truncate(&args, 200)
    )
}

fn panic_payload_to_string(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::confirmation::{AutoApproveConfirmation, AutoRejectConfirmation};
    use async_trait::async_trait;
    use dispatch_domain::{
        Action, ActionFailure, ActionSuccess, CallerIdentity, FieldSpec, InputSchema,
        InvocationStatus, Refinement, RunMode,
    };
    use serde::Deserialize;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // ==================== Fakes ====================

    #[derive(Deserialize)]
    struct TransferInput {
        to: String,
        amount: String,
    }

    struct CountingTransfer {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Action for CountingTransfer {
        type Input = TransferInput;
        type Output = Value;

        async fn execute(
            &self,
            _ctx: &ActionContext,
            input: TransferInput,
        ) -> Result<ActionSuccess<Value>, ActionFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if input.amount == "1000000" {
                return Err(ActionFailure::new("TRANSFER_ERROR", "Insufficient balance"));
            }
            Ok(ActionSuccess::new(
                format!("Sent {} S to {}", input.amount, input.to),
                json!({"hash": "0xfeed"}),
            ))
        }
    }

    struct Panicking;

    #[async_trait]
    impl ActionHandler for Panicking {
        async fn handle(&self, _ctx: &ActionContext, _args: Value) -> InvocationResult {
            panic!("ledger exploded");
        }
    }

    /// Records requests and answers with a fixed decision.
    struct Scripted {
        decision: ConfirmationDecision,
        requests: Mutex<Vec<ConfirmationRequest>>,
    }

    impl Scripted {
        fn new(decision: ConfirmationDecision) -> Self {
            Self {
                decision,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ConfirmationPort for Scripted {
        async fn request_confirmation(
            &self,
            request: &ConfirmationRequest,
        ) -> Result<ConfirmationDecision, ConfirmationError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.decision)
        }
    }

    /// Never answers; counts cancellations.
    struct Silent {
        cancelled: AtomicUsize,
    }

    #[async_trait]
    impl ConfirmationPort for Silent {
        async fn request_confirmation(
            &self,
            _request: &ConfirmationRequest,
        ) -> Result<ConfirmationDecision, ConfirmationError> {
            std::future::pending().await
        }

        fn cancel(&self, _tool_call_id: &dispatch_domain::ToolCallId) {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }

    const ADDR: &str = "0x1111111111111111111111111111111111111111";

    fn transfer(calls: Arc<AtomicUsize>) -> ActionDescriptor {
        ActionDescriptor::new("transfer", "Transfer native tokens")
            .with_alias("send sonic")
            .with_schema(
                InputSchema::new()
                    .with_field(FieldSpec::string("to", "Recipient").with_refinement(Refinement::evm_address()))
                    .with_field(
                        FieldSpec::string("amount", "Amount").with_refinement(Refinement::PositiveDecimal),
                    ),
            )
            .requiring_confirmation()
            .with_action(CountingTransfer { calls })
    }

    fn ctx() -> ActionContext {
        ActionContext::new("call-1", CallerIdentity::new("user-1"), "sonic-testnet")
    }

    fn dispatcher(confirmation: Arc<dyn ConfirmationPort>, calls: Arc<AtomicUsize>) -> Dispatcher {
        let registry = ActionRegistry::from_descriptors([
            transfer(calls),
            ActionDescriptor::new("show_portfolio_chart", "Rendered by the client"),
            ActionDescriptor::new("explode", "Always panics").with_handler(Arc::new(Panicking)),
        ])
        .unwrap();
        Dispatcher::new(Arc::new(registry), confirmation)
    }

    async fn dispatch_transfer(d: &Dispatcher, args: Value) -> InvocationResult {
        let descriptor = d.registry().get("transfer").unwrap().clone();
        d.dispatch(&descriptor, &args, &ctx()).await
    }

    // ==================== Scenarios ====================

    #[tokio::test]
    async fn test_transfer_negative_amount_is_validation_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let confirm = Arc::new(Scripted::new(ConfirmationDecision::Accept));
        let d = dispatcher(confirm.clone(), calls.clone());

        let result = dispatch_transfer(&d, json!({"to": ADDR, "amount": "-1"})).await;

        assert_eq!(result.error_code(), Some(codes::VALIDATION_ERROR));
        let details = &result.error().unwrap().details;
        assert_eq!(details.as_ref().unwrap()[0]["path"], json!(["amount"]));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        // validation happens before confirmation
        assert!(confirm.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_issue_per_violated_field() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = dispatcher(Arc::new(AutoApproveConfirmation), calls.clone());

        let result = dispatch_transfer(&d, json!({"to": "bob", "amount": "0"})).await;

        let details = result.error().unwrap().details.clone().unwrap();
        assert_eq!(details.as_array().unwrap().len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transfer_rejected_is_cancelled_without_handler_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = dispatcher(Arc::new(AutoRejectConfirmation), calls.clone());

        let result = dispatch_transfer(&d, json!({"to": ADDR, "amount": "1"})).await;

        assert_eq!(result.status(), InvocationStatus::Cancelled);
        assert!(result.error().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transfer_accepted_runs_handler_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let confirm = Arc::new(Scripted::new(ConfirmationDecision::Accept));
        let d = dispatcher(confirm.clone(), calls.clone());

        let result = dispatch_transfer(&d, json!({"to": ADDR, "amount": "1.5"})).await;

        assert!(result.is_success());
        assert_eq!(result.data(), Some(&json!({"hash": "0xfeed"})));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let requests = confirm.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tool_call_id.as_str(), "call-1");
        assert_eq!(requests[0].args, json!({"to": ADDR, "amount": "1.5"}));
    }

    #[tokio::test]
    async fn test_handler_domain_code_passes_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = dispatcher(Arc::new(AutoApproveConfirmation), calls.clone());

        let result = dispatch_transfer(&d, json!({"to": ADDR, "amount": "1000000"})).await;

        assert_eq!(result.error_code(), Some("TRANSFER_ERROR"));
        assert_eq!(result.message(), "Insufficient balance");
    }

    #[tokio::test]
    async fn test_panicking_handler_becomes_execution_error() {
        let d = dispatcher(Arc::new(AutoApproveConfirmation), Arc::new(AtomicUsize::new(0)));
        let descriptor = d.registry().get("explode").unwrap().clone();

        let result = d.dispatch(&descriptor, &json!({}), &ctx()).await;

        assert_eq!(result.error_code(), Some(codes::EXECUTION_ERROR));
        assert!(result.message().contains("ledger exploded"));
        assert_eq!(
            result.error().unwrap().details,
            Some(json!({"panic": "ledger exploded"}))
        );
    }

    #[tokio::test]
    async fn test_production_mode_hides_panic_cause() {
        let d = dispatcher(Arc::new(AutoApproveConfirmation), Arc::new(AtomicUsize::new(0)))
            .with_policy(DispatchPolicy::default().with_mode(RunMode::Production));
        let descriptor = d.registry().get("explode").unwrap().clone();

        let result = d.dispatch(&descriptor, &json!({}), &ctx()).await;

        assert_eq!(result.error_code(), Some(codes::EXECUTION_ERROR));
        assert_eq!(result.message(), GENERIC_EXECUTION_MESSAGE);
        assert!(result.error().unwrap().details.is_none());
    }

    #[tokio::test]
    async fn test_descriptor_without_handler_is_not_executable() {
        let d = dispatcher(Arc::new(AutoApproveConfirmation), Arc::new(AtomicUsize::new(0)));
        let descriptor = d.registry().get("show_portfolio_chart").unwrap().clone();

        let result = d.dispatch(&descriptor, &json!({}), &ctx()).await;

        assert_eq!(result.error_code(), Some(codes::NOT_EXECUTABLE));
    }

    #[tokio::test]
    async fn test_dispatch_by_name_resolves_alias() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = dispatcher(Arc::new(AutoApproveConfirmation), calls.clone());

        let result = d
            .dispatch_by_name(
                "  Send   Sonic ",
                &json!({"to": ADDR, "amount": "2"}),
                &ctx(),
                &CancellationToken::new(),
            )
            .await;

        assert!(result.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_by_unknown_name_is_not_found() {
        let d = dispatcher(Arc::new(AutoApproveConfirmation), Arc::new(AtomicUsize::new(0)));

        let result = d
            .dispatch_by_name("teleport", &json!({}), &ctx(), &CancellationToken::new())
            .await;

        assert_eq!(result.error_code(), Some(codes::NOT_FOUND));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_timeout_is_cancelled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let silent = Arc::new(Silent {
            cancelled: AtomicUsize::new(0),
        });
        let d = dispatcher(silent.clone(), calls.clone()).with_policy(
            DispatchPolicy::default().with_confirmation_timeout(Duration::from_secs(30)),
        );

        let result = dispatch_transfer(&d, json!({"to": ADDR, "amount": "1"})).await;

        assert!(result.is_cancelled());
        assert!(result.message().contains("not confirmed in time"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(silent.cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_token_resolves_pending_confirmation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = dispatcher(
            Arc::new(Silent {
                cancelled: AtomicUsize::new(0),
            }),
            calls.clone(),
        );
        let descriptor = d.registry().get("transfer").unwrap().clone();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = d
            .dispatch_with_cancel(&descriptor, &json!({"to": ADDR, "amount": "1"}), &ctx(), &cancel)
            .await;

        assert!(result.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_audit_events_for_confirmed_dispatch() {
        struct Collect(Mutex<Vec<&'static str>>);
        impl AuditLogger for Collect {
            fn log(&self, event: AuditEvent) {
                self.0.lock().unwrap().push(event.event_type);
            }
        }

        let audit = Arc::new(Collect(Mutex::new(Vec::new())));
        let d = dispatcher(Arc::new(AutoApproveConfirmation), Arc::new(AtomicUsize::new(0)))
            .with_audit_logger(audit.clone());

        dispatch_transfer(&d, json!({"to": ADDR, "amount": "1"})).await;

        assert_eq!(
            *audit.0.lock().unwrap(),
            vec![
                events::CONFIRMATION_REQUESTED,
                events::CONFIRMATION_RESOLVED,
                events::INVOCATION_COMPLETED,
            ]
        );
    }
}
