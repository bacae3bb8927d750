//! Structured audit logging
//!
//! Provides [`JsonlAuditLogger`], the JSONL adapter for the
//! [`AuditLogger`](dispatch_application::AuditLogger) port.

mod jsonl_logger;

pub use jsonl_logger::JsonlAuditLogger;
