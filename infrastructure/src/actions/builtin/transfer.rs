//! `transfer`: send native S from the caller's wallet.
//!
//! Moves funds, so the descriptor requires human confirmation before the
//! handler ever runs.

use super::ledger::{InMemoryLedger, LedgerError, SYMBOL, TransferReceipt};
use async_trait::async_trait;
use dispatch_domain::{
    Action, ActionContext, ActionDescriptor, ActionExample, ActionFailure, ActionSuccess,
    FieldSpec, InputSchema, Refinement,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub const TRANSFER: &str = "transfer";

pub const TRANSFER_ERROR: &str = "TRANSFER_ERROR";
pub const INSUFFICIENT_FUNDS: &str = "INSUFFICIENT_FUNDS";

#[derive(Debug, Deserialize)]
pub struct TransferInput {
    pub to: String,
    /// Decimal string, already checked to be `> 0`.
    pub amount: String,
}

pub struct Transfer {
    ledger: Arc<InMemoryLedger>,
}

impl Transfer {
    pub fn new(ledger: Arc<InMemoryLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Action for Transfer {
    type Input = TransferInput;
    type Output = TransferReceipt;

    async fn execute(
        &self,
        ctx: &ActionContext,
        input: TransferInput,
    ) -> Result<ActionSuccess<TransferReceipt>, ActionFailure> {
        let Some(from) = ctx.caller.wallet_address.as_deref() else {
            return Err(ActionFailure::new(TRANSFER_ERROR, "No wallet connected"));
        };
        if from.eq_ignore_ascii_case(&input.to) {
            return Err(ActionFailure::new(
                TRANSFER_ERROR,
                "Cannot transfer to the sending wallet",
            ));
        }

        let receipt = self
            .ledger
            .transfer(from, &input.to, &input.amount)
            .map_err(|e| match e {
                LedgerError::InsufficientFunds {
                    available,
                    requested,
                } => ActionFailure::new(
                    INSUFFICIENT_FUNDS,
                    format!("Insufficient funds: {} {} available", available, SYMBOL),
                )
                .with_details(json!({"available": available, "requested": requested})),
                other => ActionFailure::new(TRANSFER_ERROR, other.to_string()),
            })?;

        info!(
            tool_call_id = %ctx.tool_call_id,
            network = %ctx.network,
            tx_hash = %receipt.tx_hash,
            "Transfer settled"
        );

        Ok(ActionSuccess::new(
            format!("Sent {} {} to {}", receipt.amount, SYMBOL, receipt.to),
            receipt,
        ))
    }
}

pub fn transfer_descriptor(ledger: Arc<InMemoryLedger>) -> ActionDescriptor {
    ActionDescriptor::new(
        TRANSFER,
        "Transfer native S from the connected wallet to another address. Requires the user's confirmation.",
    )
    .with_aliases(["send sonic", "send s", "send tokens"])
    .with_schema(
        InputSchema::new()
            .with_field(
                FieldSpec::string("to", "Recipient wallet address")
                    .with_refinement(Refinement::evm_address()),
            )
            .with_field(
                FieldSpec::string("amount", "Amount of S to send, as a decimal string")
                    .with_refinement(Refinement::PositiveDecimal),
            ),
    )
    .with_example(ActionExample::new(
        json!({"to": "0x1111111111111111111111111111111111111111", "amount": "1.5"}),
        json!({"status": "success", "message": "Sent 1.5 S to 0x1111…1111"}),
        "Send 1.5 S after the user confirms",
    ))
    .requiring_confirmation()
    .with_action(Transfer::new(ledger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_domain::{ActionHandler, CallerIdentity, InvocationStatus};

    const SENDER: &str = "0x3333333333333333333333333333333333333333";
    const RECIPIENT: &str = "0x4444444444444444444444444444444444444444";

    fn ctx() -> ActionContext {
        ActionContext::new(
            "call_7",
            CallerIdentity::new("u").with_wallet(SENDER),
            "sonic-testnet",
        )
    }

    fn descriptor(balance: &str) -> ActionDescriptor {
        transfer_descriptor(Arc::new(
            InMemoryLedger::new().with_balance(SENDER, balance).unwrap(),
        ))
    }

    #[test]
    fn test_requires_confirmation() {
        assert!(descriptor("1").requires_confirmation());
    }

    #[tokio::test]
    async fn test_successful_transfer() {
        let result = descriptor("5")
            .handler()
            .unwrap()
            .handle(&ctx(), json!({"to": RECIPIENT, "amount": "1.25"}))
            .await;

        assert!(result.is_success());
        assert_eq!(result.data().unwrap()["remainingBalance"], "3.75");
        assert!(result.message().contains("1.25 S"));
    }

    #[tokio::test]
    async fn test_insufficient_funds_code_and_details() {
        let result = descriptor("1")
            .handler()
            .unwrap()
            .handle(&ctx(), json!({"to": RECIPIENT, "amount": "2"}))
            .await;

        assert_eq!(result.status(), InvocationStatus::Error);
        let error = result.error().unwrap();
        assert_eq!(error.code, INSUFFICIENT_FUNDS);
        assert_eq!(error.details.as_ref().unwrap()["requested"], "2");
    }

    #[tokio::test]
    async fn test_without_wallet_is_a_transfer_error() {
        let ctx = ActionContext::new("call_8", CallerIdentity::new("u"), "sonic-testnet");
        let result = descriptor("1")
            .handler()
            .unwrap()
            .handle(&ctx, json!({"to": RECIPIENT, "amount": "1"}))
            .await;
        assert_eq!(result.error_code(), Some(TRANSFER_ERROR));
    }

    #[tokio::test]
    async fn test_self_transfer_is_rejected() {
        let result = descriptor("1")
            .handler()
            .unwrap()
            .handle(&ctx(), json!({"to": SENDER.to_uppercase().replace("0X", "0x"), "amount": "1"}))
            .await;
        assert_eq!(result.error_code(), Some(TRANSFER_ERROR));
    }

    #[test]
    fn test_schema_rejects_bad_amounts() {
        let d = descriptor("1");
        for amount in ["0", "-1", "1e3", "abc"] {
            assert!(
                d.validate(&json!({"to": RECIPIENT, "amount": amount})).is_err(),
                "{} should be rejected",
                amount
            );
        }
        assert!(d.validate(&json!({"to": RECIPIENT})).is_err());
    }
}
