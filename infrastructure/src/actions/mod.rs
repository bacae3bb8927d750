//! Action implementations and planner-facing schema export
//!
//! - `builtin`: demo wallet actions over an in-memory ledger
//! - `schema`: JSON Schema rendering of input schemas

pub mod builtin;
mod schema;

pub use builtin::{InMemoryLedger, builtin_registry};
pub use schema::JsonSchemaConverter;
