//! Configuration value objects for the domain layer
//!
//! These are domain concepts related to configuration that are
//! used across multiple layers.

mod output_format;
mod run_mode;
pub mod validation;

pub use output_format::OutputFormat;
pub use run_mode::RunMode;
pub use validation::{ConfigIssue, ConfigIssueCode, Severity};
