//! `get_balance`: read the native-token balance of an address.

use super::ledger::{InMemoryLedger, SYMBOL, format_amount};
use async_trait::async_trait;
use dispatch_domain::{
    Action, ActionContext, ActionDescriptor, ActionExample, ActionFailure, ActionSuccess,
    FieldSpec, InputSchema, Refinement,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const GET_BALANCE: &str = "get_balance";

/// No address given and no wallet connected.
pub const NO_WALLET: &str = "NO_WALLET";
pub const BALANCE_ERROR: &str = "BALANCE_ERROR";

#[derive(Debug, Deserialize)]
pub struct BalanceInput {
    /// Defaults to the caller's wallet.
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BalanceOutput {
    pub address: String,
    pub balance: String,
    pub symbol: &'static str,
    pub network: String,
}

pub struct GetBalance {
    ledger: Arc<InMemoryLedger>,
}

impl GetBalance {
    pub fn new(ledger: Arc<InMemoryLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Action for GetBalance {
    type Input = BalanceInput;
    type Output = BalanceOutput;

    async fn execute(
        &self,
        ctx: &ActionContext,
        input: BalanceInput,
    ) -> Result<ActionSuccess<BalanceOutput>, ActionFailure> {
        let Some(address) = input.address.or_else(|| ctx.caller.wallet_address.clone()) else {
            return Err(ActionFailure::new(
                NO_WALLET,
                "No address given and no wallet connected",
            ));
        };

        let balance = self
            .ledger
            .balance(&address)
            .map_err(|e| ActionFailure::new(BALANCE_ERROR, e.to_string()))?;
        let balance = format_amount(balance);

        Ok(ActionSuccess::new(
            format!("Balance of {}: {} {}", address, balance, SYMBOL),
            BalanceOutput {
                address,
                balance,
                symbol: SYMBOL,
                network: ctx.network.clone(),
            },
        ))
    }
}

pub fn get_balance_descriptor(ledger: Arc<InMemoryLedger>) -> ActionDescriptor {
    ActionDescriptor::new(
        GET_BALANCE,
        "Get the native S balance of a wallet. Uses the connected wallet when no address is given.",
    )
    .with_aliases(["check balance", "wallet balance", "show balance"])
    .with_schema(
        InputSchema::new().with_field(
            FieldSpec::string("address", "Wallet address to inspect")
                .optional()
                .with_refinement(Refinement::evm_address()),
        ),
    )
    .with_example(ActionExample::new(
        json!({}),
        json!({"status": "success", "message": "Balance of 0x…: 12.5 S"}),
        "Balance of the connected wallet",
    ))
    .with_example(ActionExample::new(
        json!({"address": "0x1111111111111111111111111111111111111111"}),
        json!({"status": "success", "message": "Balance of 0x1111…1111: 0 S"}),
        "Balance of another wallet",
    ))
    .with_action(GetBalance::new(ledger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_domain::{ActionHandler, CallerIdentity, InvocationStatus};

    const WALLET: &str = "0x2222222222222222222222222222222222222222";

    fn ctx(wallet: Option<&str>) -> ActionContext {
        let caller = match wallet {
            Some(w) => CallerIdentity::new("u").with_wallet(w),
            None => CallerIdentity::new("u"),
        };
        ActionContext::new("call_1", caller, "sonic-testnet")
    }

    #[tokio::test]
    async fn test_defaults_to_connected_wallet() {
        let ledger = Arc::new(InMemoryLedger::new().with_balance(WALLET, "12.5").unwrap());
        let descriptor = get_balance_descriptor(ledger);

        let result = descriptor
            .handler()
            .unwrap()
            .handle(&ctx(Some(WALLET)), json!({}))
            .await;

        assert!(result.is_success());
        let data = result.data().unwrap();
        assert_eq!(data["balance"], "12.5");
        assert_eq!(data["symbol"], "S");
        assert_eq!(data["network"], "sonic-testnet");
    }

    #[tokio::test]
    async fn test_without_wallet_or_address_fails() {
        let descriptor = get_balance_descriptor(Arc::new(InMemoryLedger::new()));
        let result = descriptor.handler().unwrap().handle(&ctx(None), json!({})).await;

        assert_eq!(result.status(), InvocationStatus::Error);
        assert_eq!(result.error_code(), Some(NO_WALLET));
    }

    #[test]
    fn test_rejects_malformed_address() {
        let descriptor = get_balance_descriptor(Arc::new(InMemoryLedger::new()));
        let err = descriptor.validate(&json!({"address": "0x12"})).unwrap_err();
        assert_eq!(err.issues[0].path_string(), "address");
    }
}
