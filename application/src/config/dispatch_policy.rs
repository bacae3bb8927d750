//! Dispatch policy: runtime knobs for the dispatcher.
//!
//! [`DispatchPolicy`] is built by the infrastructure config layer from the
//! `[dispatch]` section and handed to the
//! [`Dispatcher`](crate::use_cases::dispatch::Dispatcher).

use dispatch_domain::RunMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Message used for `EXECUTION_ERROR` envelopes in production mode.
pub const GENERIC_EXECUTION_MESSAGE: &str = "The action failed unexpectedly. Please try again later.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchPolicy {
    /// How long a confirmation may stay pending before it counts as rejected.
    pub confirmation_timeout: Duration,
    pub mode: RunMode,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            confirmation_timeout: Duration::from_secs(120),
            mode: RunMode::Development,
        }
    }
}

impl DispatchPolicy {
    // ==================== Builder Methods ====================

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Whether unexpected failures should hide their cause from the planner.
    pub fn redacts_execution_errors(&self) -> bool {
        self.mode.is_production()
    }
}
