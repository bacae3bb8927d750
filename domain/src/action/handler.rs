//! Handler contract between the dispatch engine and action implementations.
//!
//! Integrations implement the typed [`Action`] trait: validated arguments are
//! deserialized into `Action::Input`, and the handler returns an explicit
//! `Result` instead of raising. The dispatcher only ever sees the erased
//! [`ActionHandler`] form, produced by [`TypedHandler`].
//!
//! ```text
//! normalized JSON ──▶ TypedHandler<A> ──▶ A::Input ──▶ A::execute()
//!                                                         │
//!                    InvocationResult ◀── Ok(ActionSuccess<A::Output>)
//!                                     ◀── Err(ActionFailure)
//! ```

use super::value_objects::{InvocationError, InvocationResult};
use crate::conversation::invocation::ToolCallId;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Who is invoking an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: String,
    /// Connected wallet, when the caller has one.
    pub wallet_address: Option<String>,
}

impl CallerIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            wallet_address: None,
        }
    }

    pub fn with_wallet(mut self, address: impl Into<String>) -> Self {
        self.wallet_address = Some(address.into());
        self
    }
}

/// Per-invocation context handed to every handler.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub tool_call_id: ToolCallId,
    pub caller: CallerIdentity,
    /// Network / cluster selection (e.g. `sonic-mainnet`).
    pub network: String,
}

impl ActionContext {
    pub fn new(
        tool_call_id: impl Into<ToolCallId>,
        caller: CallerIdentity,
        network: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            caller,
            network: network.into(),
        }
    }
}

/// Successful handler output.
#[derive(Debug, Clone)]
pub struct ActionSuccess<T> {
    pub message: String,
    pub data: T,
}

impl<T> ActionSuccess<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// Expected, domain-level failure reported by a handler (`TRANSFER_ERROR`, ...).
///
/// The code is passed through the dispatcher unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionFailure {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

impl ActionFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<ActionFailure> for InvocationError {
    fn from(failure: ActionFailure) -> Self {
        InvocationError {
            code: failure.code,
            message: failure.message,
            details: failure.details,
        }
    }
}

/// A typed action implementation.
///
/// `Input` is only ever built from arguments that already passed the
/// descriptor's input schema.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    type Input: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    async fn execute(
        &self,
        ctx: &ActionContext,
        input: Self::Input,
    ) -> Result<ActionSuccess<Self::Output>, ActionFailure>;
}

/// Type-erased handler stored on a descriptor.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Run the action on validated arguments.
    async fn handle(&self, ctx: &ActionContext, args: Value) -> InvocationResult;
}

/// Adapter from a typed [`Action`] to [`ActionHandler`].
pub struct TypedHandler<A> {
    action: A,
}

impl<A: Action> TypedHandler<A> {
    pub fn new(action: A) -> Self {
        Self { action }
    }
}

#[async_trait]
impl<A: Action> ActionHandler for TypedHandler<A> {
    async fn handle(&self, ctx: &ActionContext, args: Value) -> InvocationResult {
        // Schema and Input disagreeing is an authoring bug, reported as such.
        let input: A::Input = match serde_json::from_value(args) {
            Ok(input) => input,
            Err(e) => {
                return InvocationResult::failure(InvocationError::execution(format!(
                    "Validated arguments do not match the action input type: {}",
                    e
                )));
            }
        };

        match self.action.execute(ctx, input).await {
            Ok(success) => match serde_json::to_value(&success.data) {
                Ok(data) => InvocationResult::success(success.message, data),
                Err(e) => InvocationResult::failure(InvocationError::execution(format!(
                    "Failed to serialize action output: {}",
                    e
                ))),
            },
            Err(failure) => InvocationResult::failure(failure.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct EchoInput {
        text: String,
    }

    struct Echo;

    #[async_trait]
    impl Action for Echo {
        type Input = EchoInput;
        type Output = Value;

        async fn execute(
            &self,
            ctx: &ActionContext,
            input: EchoInput,
        ) -> Result<ActionSuccess<Value>, ActionFailure> {
            if input.text.is_empty() {
                return Err(ActionFailure::new("ECHO_ERROR", "Nothing to echo"));
            }
            Ok(ActionSuccess::new(
                "Echoed",
                json!({"text": input.text, "network": ctx.network}),
            ))
        }
    }

    fn ctx() -> ActionContext {
        ActionContext::new("call-1", CallerIdentity::new("user-1"), "sonic-testnet")
    }

    #[tokio::test]
    async fn test_typed_handler_success() {
        let handler = TypedHandler::new(Echo);
        let result = handler.handle(&ctx(), json!({"text": "hi"})).await;
        assert!(result.is_success());
        assert_eq!(
            result.data(),
            Some(&json!({"text": "hi", "network": "sonic-testnet"}))
        );
    }

    #[tokio::test]
    async fn test_typed_handler_domain_failure_passes_code() {
        let handler = TypedHandler::new(Echo);
        let result = handler.handle(&ctx(), json!({"text": ""})).await;
        assert_eq!(result.error_code(), Some("ECHO_ERROR"));
        assert_eq!(result.message(), "Nothing to echo");
    }

    #[tokio::test]
    async fn test_typed_handler_input_mismatch() {
        let handler = TypedHandler::new(Echo);
        let result = handler.handle(&ctx(), json!({"other": 1})).await;
        assert_eq!(result.error_code(), Some("EXECUTION_ERROR"));
    }

    #[test]
    fn test_caller_identity_builder() {
        let caller = CallerIdentity::new("u").with_wallet("0xabc");
        assert_eq!(caller.wallet_address.as_deref(), Some("0xabc"));
    }
}
