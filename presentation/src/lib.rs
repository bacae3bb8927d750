//! Presentation layer for action-dispatch
//!
//! This crate contains CLI definitions, the terminal confirmation prompt,
//! and output formatters.

pub mod cli;
pub mod confirmation;
pub mod output;

// Re-export commonly used types
pub use cli::commands::{Cli, Command, FormatArg};
pub use confirmation::ConsoleConfirmation;
pub use output::{
    ConsoleFormatter, JsonFormatter, OutputFormatter, ThreadSummary, formatter_for,
    set_color_enabled,
};
