//! Deployment mode value object

use serde::{Deserialize, Serialize};

/// Deployment mode of the dispatch engine.
///
/// In [`RunMode::Production`], unexpected handler failures are reported to
/// the planner with a generic message and no details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Development,
    Production,
}

impl RunMode {
    pub fn as_str(&self) -> &str {
        match self {
            RunMode::Development => "development",
            RunMode::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, RunMode::Production)
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(RunMode::Development),
            "production" | "prod" => Ok(RunMode::Production),
            other => Err(format!(
                "unknown mode '{}' (expected development or production)",
                other
            )),
        }
    }
}
