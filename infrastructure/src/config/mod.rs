//! Configuration file loading for action-dispatch
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `ACTION_DISPATCH_<SECTION>__<KEY>` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./action-dispatch.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/action-dispatch/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileContextConfig, FileDispatchConfig, FileLoggingConfig,
    FileOutputConfig, FileStorageConfig,
};
pub use loader::{ConfigLoader, ConfigSource};
