//! Terminal confirmation adapter

mod console;

pub use console::{ConsoleConfirmation, parse_decision};
