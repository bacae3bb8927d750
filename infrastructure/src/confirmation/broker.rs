//! UI-driven confirmation broker.
//!
//! The dispatcher's request is parked in a pending map keyed by
//! `toolCallId`; whichever UI holds the broker answers it with
//! [`respond`](ConfirmationBroker::respond). Dropping the pending entry
//! (cancel, thread close) wakes the dispatcher with
//! [`ConfirmationError::Cancelled`].

use async_trait::async_trait;
use dispatch_application::ports::confirmation::{
    ConfirmationDecision, ConfirmationError, ConfirmationPort, ConfirmationRequest,
};
use dispatch_domain::ToolCallId;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrokerError {
    #[error("No pending confirmation for tool call {0}")]
    NotPending(ToolCallId),

    #[error("Confirmation for tool call {0} is already pending")]
    AlreadyPending(ToolCallId),
}

/// Pending confirmations, answered out-of-band.
#[derive(Default)]
pub struct ConfirmationBroker {
    pending: Mutex<HashMap<ToolCallId, oneshot::Sender<ConfirmationDecision>>>,
    /// Receives a copy of each request so a UI can render it.
    notifier: Option<mpsc::UnboundedSender<ConfirmationRequest>>,
}

impl ConfirmationBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broker plus the stream of requests it will park.
    pub fn with_notifier() -> (Self, mpsc::UnboundedReceiver<ConfirmationRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let broker = Self {
            pending: Mutex::default(),
            notifier: Some(tx),
        };
        (broker, rx)
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<ToolCallId, oneshot::Sender<ConfirmationDecision>>>
    {
        // A panic while holding the lock cannot leave the map half-updated.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answer a pending request.
    pub fn respond(
        &self,
        tool_call_id: &ToolCallId,
        decision: ConfirmationDecision,
    ) -> Result<(), BrokerError> {
        let sender = self
            .lock()
            .remove(tool_call_id)
            .ok_or_else(|| BrokerError::NotPending(tool_call_id.clone()))?;

        // The waiter may have timed out between the remove and the send.
        sender
            .send(decision)
            .map_err(|_| BrokerError::NotPending(tool_call_id.clone()))
    }

    /// Tool call ids currently awaiting an answer, sorted.
    pub fn pending(&self) -> Vec<ToolCallId> {
        let mut ids: Vec<_> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_pending(&self, tool_call_id: &ToolCallId) -> bool {
        self.lock().contains_key(tool_call_id)
    }
}

#[async_trait]
impl ConfirmationPort for ConfirmationBroker {
    async fn request_confirmation(
        &self,
        request: &ConfirmationRequest,
    ) -> Result<ConfirmationDecision, ConfirmationError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.lock();
            if pending.contains_key(&request.tool_call_id) {
                return Err(ConfirmationError::Unavailable(
                    BrokerError::AlreadyPending(request.tool_call_id.clone()).to_string(),
                ));
            }
            pending.insert(request.tool_call_id.clone(), tx);
        }
        debug!(tool_call_id = %request.tool_call_id, action = %request.action, "Confirmation parked");

        if let Some(notifier) = &self.notifier
            && notifier.send(request.clone()).is_err()
        {
            self.lock().remove(&request.tool_call_id);
            return Err(ConfirmationError::Unavailable(
                "no confirmation UI attached".to_string(),
            ));
        }

        rx.await.map_err(|_| ConfirmationError::Cancelled)
    }

    fn cancel(&self, tool_call_id: &ToolCallId) {
        if self.lock().remove(tool_call_id).is_some() {
            warn!(tool_call_id = %tool_call_id, "Pending confirmation withdrawn");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn request(id: &str) -> ConfirmationRequest {
        ConfirmationRequest::new(ToolCallId::new(id), "transfer", "Send 1 S?", json!({"amount": "1"}))
    }

    async fn wait_until_pending(broker: &ConfirmationBroker, id: &ToolCallId) {
        while !broker.is_pending(id) {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_respond_resolves_waiter() {
        let broker = Arc::new(ConfirmationBroker::new());
        let id = ToolCallId::new("call_1");

        let waiter = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move { broker.request_confirmation(&request("call_1")).await })
        };
        wait_until_pending(&broker, &id).await;
        assert_eq!(broker.pending(), vec![id.clone()]);

        broker.respond(&id, ConfirmationDecision::Accept).unwrap();
        assert_eq!(waiter.await.unwrap(), Ok(ConfirmationDecision::Accept));
        assert!(broker.pending().is_empty());
    }

    #[tokio::test]
    async fn test_respond_to_unknown_id_fails() {
        let broker = ConfirmationBroker::new();
        let id = ToolCallId::new("nope");
        assert_eq!(
            broker.respond(&id, ConfirmationDecision::Reject),
            Err(BrokerError::NotPending(id))
        );
    }

    #[tokio::test]
    async fn test_cancel_wakes_waiter_as_cancelled() {
        let broker = Arc::new(ConfirmationBroker::new());
        let id = ToolCallId::new("call_2");

        let waiter = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move { broker.request_confirmation(&request("call_2")).await })
        };
        wait_until_pending(&broker, &id).await;

        broker.cancel(&id);
        assert_eq!(waiter.await.unwrap(), Err(ConfirmationError::Cancelled));
    }

    #[tokio::test]
    async fn test_duplicate_id_is_refused() {
        let broker = Arc::new(ConfirmationBroker::new());
        let first = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move { broker.request_confirmation(&request("dup")).await })
        };
        wait_until_pending(&broker, &ToolCallId::new("dup")).await;

        // A second request with the same id is refused, the first stays parked.
        let second = broker.request_confirmation(&request("dup")).await;
        assert!(matches!(second, Err(ConfirmationError::Unavailable(_))));
        assert_eq!(broker.pending().len(), 1);

        broker.cancel(&ToolCallId::new("dup"));
        assert_eq!(first.await.unwrap(), Err(ConfirmationError::Cancelled));
    }

    #[tokio::test]
    async fn test_notifier_receives_requests() {
        let (broker, mut requests) = ConfirmationBroker::with_notifier();
        let broker = Arc::new(broker);

        let waiter = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move { broker.request_confirmation(&request("call_3")).await })
        };

        let seen = requests.recv().await.unwrap();
        assert_eq!(seen.tool_call_id.as_str(), "call_3");
        assert_eq!(seen.action, "transfer");

        broker.respond(&seen.tool_call_id, ConfirmationDecision::Reject).unwrap();
        assert_eq!(waiter.await.unwrap(), Ok(ConfirmationDecision::Reject));
    }

    #[tokio::test]
    async fn test_dropped_notifier_is_unavailable() {
        let (broker, requests) = ConfirmationBroker::with_notifier();
        drop(requests);

        let result = broker.request_confirmation(&request("call_4")).await;
        assert!(matches!(result, Err(ConfirmationError::Unavailable(_))));
        assert!(broker.pending().is_empty());
    }

    #[tokio::test]
    async fn test_closing_thread_withdraws_parked_request() {
        use crate::actions::{InMemoryLedger, builtin_registry};
        use crate::persistence::InMemoryConversationRepository;
        use dispatch_application::{
            ConversationRepository, Dispatcher, InvocationScope, PlannerCall, RunInvocationUseCase,
        };
        use dispatch_domain::{CallerIdentity, ConversationThread, InvocationState};

        let (broker, mut requests) = ConfirmationBroker::with_notifier();
        let broker = Arc::new(broker);
        let registry = builtin_registry(Arc::new(InMemoryLedger::new())).unwrap();
        let repository = Arc::new(InMemoryConversationRepository::new());
        repository
            .create_thread(ConversationThread::with_id("t-1", "alice"))
            .await
            .unwrap();

        let use_case = Arc::new(RunInvocationUseCase::new(
            Dispatcher::new(Arc::new(registry), broker.clone()),
            repository.clone(),
        ));
        let message_id = use_case.start_assistant_message("t-1", "").await.unwrap();
        let scope = InvocationScope {
            thread_id: "t-1".into(),
            message_id,
            caller: CallerIdentity::new("alice"),
            network: "sonic-testnet".into(),
        };

        let runner = {
            let use_case = Arc::clone(&use_case);
            tokio::spawn(async move {
                let call = PlannerCall::new(
                    "call_9",
                    "send sonic",
                    json!({"to": "0x4444444444444444444444444444444444444444", "amount": "1"}),
                );
                use_case.run(&scope, call).await
            })
        };

        let parked = requests.recv().await.unwrap();
        assert!(broker.is_pending(&parked.tool_call_id));

        use_case.close_thread("t-1").await.unwrap();
        let outcome = runner.await.unwrap().unwrap();

        assert!(outcome.result.is_cancelled());
        assert!(broker.pending().is_empty());
        let thread = repository.load_thread("t-1").await.unwrap();
        assert!(!thread.is_active);
        assert_eq!(
            thread.find_invocation(&parked.tool_call_id).unwrap().state(),
            InvocationState::Result
        );
    }
}
