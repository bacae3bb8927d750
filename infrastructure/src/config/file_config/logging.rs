//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL audit trail of every invocation
    pub audit_log: Option<PathBuf>,
    /// Diagnostic (tracing) log file; stderr when unset
    pub file: Option<PathBuf>,
}
