//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod context;
mod dispatch;
mod logging;
mod output;
mod storage;

pub use context::FileContextConfig;
pub use dispatch::FileDispatchConfig;
pub use logging::FileLoggingConfig;
pub use output::FileOutputConfig;
pub use storage::FileStorageConfig;

use dispatch_application::DispatchPolicy;
use dispatch_domain::{ConfigIssue, Severity};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration that cannot be used.
#[derive(Error, Debug)]
pub enum ConfigValidationError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ConfigIssue>),
}

fn join_errors(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Confirmation window and deployment mode
    pub dispatch: FileDispatchConfig,
    /// Caller identity and network
    pub context: FileContextConfig,
    /// Conversation storage
    pub storage: FileStorageConfig,
    /// Audit trail and diagnostic log files
    pub logging: FileLoggingConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.dispatch.validate());
        issues.extend(self.context.validate());
        issues
    }

    /// Build the dispatcher policy, failing on any error-level issue.
    pub fn dispatch_policy(&self) -> Result<DispatchPolicy, ConfigValidationError> {
        let issues = self.validate();
        if ConfigIssue::has_errors(&issues) {
            return Err(ConfigValidationError::Invalid(issues));
        }
        Ok(DispatchPolicy::default()
            .with_confirmation_timeout(Duration::from_secs(self.dispatch.confirmation_timeout_secs))
            .with_mode(self.dispatch.parse_mode().0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_domain::{OutputFormat, RunMode};
    use std::path::PathBuf;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[dispatch]
confirmation_timeout_secs = 30
mode = "production"

[context]
network = "sonic-testnet"
wallet_address = "0x4444444444444444444444444444444444444444"
user_id = "alice"

[storage]
threads_dir = "/var/lib/action-dispatch/threads"

[logging]
audit_log = "audit.jsonl"

[output]
format = "json"
color = false
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.dispatch.confirmation_timeout_secs, 30);
        assert_eq!(config.context.network, "sonic-testnet");
        assert_eq!(
            config.storage.threads_dir,
            Some(PathBuf::from("/var/lib/action-dispatch/threads"))
        );
        assert_eq!(config.logging.audit_log, Some(PathBuf::from("audit.jsonl")));
        assert!(config.logging.file.is_none());
        assert_eq!(config.output.format, Some(OutputFormat::Json));
        assert!(!config.output.color);

        let policy = config.dispatch_policy().unwrap();
        assert_eq!(policy.confirmation_timeout, Duration::from_secs(30));
        assert_eq!(policy.mode, RunMode::Production);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[context]
user_id = "bob"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.context.user_id, "bob");
        // Defaults should apply
        assert_eq!(config.context.network, "sonic-mainnet");
        assert_eq!(config.dispatch, FileDispatchConfig::default());
        assert!(config.output.color);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.dispatch_policy().unwrap(), DispatchPolicy::default());
    }

    #[test]
    fn test_dispatch_policy_collects_every_error() {
        let toml_str = r#"
[dispatch]
confirmation_timeout_secs = 0
mode = "prod-ish"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.validate().len(), 2);

        let err = config.dispatch_policy().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("dispatch.mode"));
        assert!(message.contains("confirmation_timeout_secs"));
    }
}
