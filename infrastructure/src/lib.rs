//! Infrastructure layer for action-dispatch
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod actions;
pub mod config;
pub mod confirmation;
pub mod logging;
pub mod persistence;

// Re-export commonly used types
pub use actions::{InMemoryLedger, JsonSchemaConverter, builtin_registry};
pub use config::{
    ConfigLoader, ConfigSource, ConfigValidationError, FileConfig, FileContextConfig,
    FileDispatchConfig, FileLoggingConfig, FileOutputConfig, FileStorageConfig,
};
pub use confirmation::{BrokerError, ConfirmationBroker};
pub use logging::JsonlAuditLogger;
pub use persistence::{InMemoryConversationRepository, JsonDirConversationRepository};
