//! Output formatting for command results

pub mod console;
pub mod formatter;
pub mod json;

pub use console::ConsoleFormatter;
pub use formatter::{OutputFormatter, ThreadSummary, formatter_for};
pub use json::JsonFormatter;

/// Force colored output on or off for the whole process.
pub fn set_color_enabled(enabled: bool) {
    if !enabled {
        colored::control::set_override(false);
    }
}
