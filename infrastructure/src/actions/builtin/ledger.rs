//! In-memory balance ledger backing the built-in demo actions.
//!
//! Amounts cross the API as decimal strings (`"1.5"`) and are stored as
//! integer base units with [`DECIMALS`] fractional digits, so no float
//! rounding ever touches a balance.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Fractional digits of the native token.
pub const DECIMALS: usize = 18;

/// Native token symbol.
pub const SYMBOL: &str = "S";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds: available {available} {SYMBOL}, requested {requested} {SYMBOL}")]
    InsufficientFunds { available: String, requested: String },

    #[error("Ledger unavailable")]
    Unavailable,
}

/// Record of a completed transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    pub amount: String,
    pub remaining_balance: String,
}

/// Parse a decimal string into base units.
pub fn parse_amount(s: &str) -> Result<u128, LedgerError> {
    let invalid = || LedgerError::InvalidAmount(s.to_string());
    let (int, frac) = s.split_once('.').unwrap_or((s, ""));
    if int.is_empty() || frac.len() > DECIMALS {
        return Err(invalid());
    }
    if !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let digits = format!("{}{:0<width$}", int, frac, width = DECIMALS);
    digits.parse::<u128>().map_err(|_| invalid())
}

/// Render base units as the shortest decimal string.
pub fn format_amount(units: u128) -> String {
    let scale = 10u128.pow(DECIMALS as u32);
    let int = units / scale;
    let frac = units % scale;
    if frac == 0 {
        return int.to_string();
    }
    let frac = format!("{:0>width$}", frac, width = DECIMALS);
    format!("{}.{}", int, frac.trim_end_matches('0'))
}

/// Address-keyed balances. Addresses compare case-insensitively.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: Mutex<HashMap<String, u128>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account.
    pub fn with_balance(self, address: &str, amount: &str) -> Result<Self, LedgerError> {
        let units = parse_amount(amount)?;
        self.balances
            .lock()
            .map_err(|_| LedgerError::Unavailable)?
            .insert(address.to_lowercase(), units);
        Ok(self)
    }

    /// Balance in base units; unknown accounts hold zero.
    pub fn balance(&self, address: &str) -> Result<u128, LedgerError> {
        let balances = self.balances.lock().map_err(|_| LedgerError::Unavailable)?;
        Ok(balances.get(&address.to_lowercase()).copied().unwrap_or(0))
    }

    /// Move `amount` from `from` to `to` atomically.
    pub fn transfer(&self, from: &str, to: &str, amount: &str) -> Result<TransferReceipt, LedgerError> {
        let units = parse_amount(amount)?;
        let from_key = from.to_lowercase();
        let to_key = to.to_lowercase();

        let mut balances = self.balances.lock().map_err(|_| LedgerError::Unavailable)?;
        let available = balances.get(&from_key).copied().unwrap_or(0);
        let Some(remaining) = available.checked_sub(units) else {
            return Err(LedgerError::InsufficientFunds {
                available: format_amount(available),
                requested: format_amount(units),
            });
        };

        balances.insert(from_key, remaining);
        let credited = balances.entry(to_key).or_insert(0);
        *credited = credited.saturating_add(units);

        Ok(TransferReceipt {
            tx_hash: format!("0x{}", uuid::Uuid::new_v4().simple()),
            from: from.to_string(),
            to: to.to_string(),
            amount: format_amount(units),
            remaining_balance: format_amount(remaining),
        })
    }
}
