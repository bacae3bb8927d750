//! Dispatch configuration from TOML (`[dispatch]` section)

use dispatch_domain::{ConfigIssue, ConfigIssueCode, RunMode};
use serde::{Deserialize, Serialize};

const VALID_MODES: [&str; 2] = ["development", "production"];

/// Raw dispatch configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDispatchConfig {
    /// Seconds a confirmation may stay pending before it counts as rejected
    pub confirmation_timeout_secs: u64,
    /// "development" or "production"
    pub mode: String,
}

impl Default for FileDispatchConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: 120,
            mode: "development".to_string(),
        }
    }
}

impl FileDispatchConfig {
    /// Parse `mode`. Unknown values are an error and fall back to
    /// production so a typo never exposes failure details.
    pub fn parse_mode(&self) -> (RunMode, Vec<ConfigIssue>) {
        match self.mode.parse::<RunMode>() {
            Ok(mode) => (mode, Vec::new()),
            Err(_) => (
                RunMode::Production,
                vec![ConfigIssue::error(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "dispatch.mode".to_string(),
                        value: self.mode.clone(),
                        valid_values: VALID_MODES.iter().map(|s| s.to_string()).collect(),
                    },
                    format!(
                        "dispatch.mode: unknown value '{}' (expected {})",
                        self.mode,
                        VALID_MODES.join(" or ")
                    ),
                )],
            ),
        }
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = self.parse_mode().1;
        if self.confirmation_timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroTimeout {
                    field: "dispatch.confirmation_timeout_secs".to_string(),
                },
                "dispatch.confirmation_timeout_secs cannot be 0",
            ));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FileDispatchConfig::default();
        assert_eq!(config.parse_mode().0, RunMode::Development);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_unknown_mode_is_error_and_falls_back_to_production() {
        let config = FileDispatchConfig {
            mode: "staging".into(),
            ..Default::default()
        };
        let (mode, issues) = config.parse_mode();
        assert_eq!(mode, RunMode::Production);
        assert_eq!(issues.len(), 1);
        assert!(ConfigIssue::has_errors(&issues));
    }

    #[test]
    fn test_zero_timeout_is_error() {
        let config = FileDispatchConfig {
            confirmation_timeout_secs: 0,
            ..Default::default()
        };
        let issues = config.validate();
        assert!(matches!(issues[0].code, ConfigIssueCode::ZeroTimeout { .. }));
    }
}
