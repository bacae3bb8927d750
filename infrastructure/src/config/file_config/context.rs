//! Invocation context configuration from TOML (`[context]` section)

use dispatch_domain::action::schema::is_evm_address;
use dispatch_domain::{CallerIdentity, ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

/// Raw context configuration from TOML
///
/// Identifies who local invocations run as and against which network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileContextConfig {
    /// Network / cluster selection handed to every handler
    pub network: String,
    /// Connected wallet of the local caller
    pub wallet_address: Option<String>,
    /// User id recorded on threads
    pub user_id: String,
}

impl Default for FileContextConfig {
    fn default() -> Self {
        Self {
            network: "sonic-mainnet".to_string(),
            wallet_address: None,
            user_id: "local".to_string(),
        }
    }
}

impl FileContextConfig {
    pub fn to_caller(&self) -> CallerIdentity {
        let caller = CallerIdentity::new(self.user_id.trim());
        match &self.wallet_address {
            Some(address) => caller.with_wallet(address.trim()),
            None => caller,
        }
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        for (field, value) in [("context.network", &self.network), ("context.user_id", &self.user_id)] {
            if value.trim().is_empty() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::EmptyValue {
                        field: field.to_string(),
                    },
                    format!("{} cannot be empty", field),
                ));
            }
        }
        if let Some(address) = &self.wallet_address
            && !is_evm_address(address.trim())
        {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidAddress {
                    field: "context.wallet_address".to_string(),
                    value: address.clone(),
                },
                format!("context.wallet_address: '{}' is not an EVM address", address),
            ));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_caller() {
        let caller = FileContextConfig::default().to_caller();
        assert_eq!(caller.user_id, "local");
        assert!(caller.wallet_address.is_none());
    }

    #[test]
    fn test_wallet_address_is_checked() {
        let config = FileContextConfig {
            wallet_address: Some("0xnothex".into()),
            ..Default::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0].code, ConfigIssueCode::InvalidAddress { .. }));

        let config = FileContextConfig {
            wallet_address: Some("0x3333333333333333333333333333333333333333".into()),
            ..Default::default()
        };
        assert!(config.validate().is_empty());
        assert!(config.to_caller().wallet_address.is_some());
    }

    #[test]
    fn test_blank_network_is_error() {
        let config = FileContextConfig {
            network: "  ".into(),
            ..Default::default()
        };
        assert!(ConfigIssue::has_errors(&config.validate()));
    }
}
