//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod audit_logger;
pub mod confirmation;
pub mod conversation_repository;
pub mod tool_schema;
