//! Confirmation adapters
//!
//! [`ConfirmationBroker`] parks each confirmation request until a UI answers
//! it by `toolCallId`.

mod broker;

pub use broker::{BrokerError, ConfirmationBroker};
