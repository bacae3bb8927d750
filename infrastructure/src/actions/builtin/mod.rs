//! Built-in demo actions
//!
//! A small closed set of wallet capabilities backed by [`InMemoryLedger`]:
//! - `get_balance`: read-only
//! - `transfer`: moves funds, confirmation required
//! - `show_portfolio_chart`: advertised to the planner, rendered client-side

mod balance;
mod chart;
mod ledger;
mod transfer;

pub use balance::{BALANCE_ERROR, GET_BALANCE, GetBalance, NO_WALLET, get_balance_descriptor};
pub use chart::{SHOW_PORTFOLIO_CHART, portfolio_chart_descriptor};
pub use ledger::{
    DECIMALS, InMemoryLedger, LedgerError, SYMBOL, TransferReceipt, format_amount, parse_amount,
};
pub use transfer::{INSUFFICIENT_FUNDS, TRANSFER, TRANSFER_ERROR, Transfer, transfer_descriptor};

use dispatch_domain::{ActionRegistry, RegistryError};
use std::sync::Arc;

/// Registry holding every built-in action, sharing one ledger.
pub fn builtin_registry(ledger: Arc<InMemoryLedger>) -> Result<ActionRegistry, RegistryError> {
    ActionRegistry::from_descriptors([
        get_balance_descriptor(Arc::clone(&ledger)),
        transfer_descriptor(ledger),
        portfolio_chart_descriptor(),
    ])
}
