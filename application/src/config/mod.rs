//! Application-level configuration.
//!
//! - [`DispatchPolicy`]: confirmation window and deployment mode

pub mod dispatch_policy;

pub use dispatch_policy::{DispatchPolicy, GENERIC_EXECUTION_MESSAGE};
