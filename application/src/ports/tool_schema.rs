//! Tool schema conversion port.
//!
//! Separates "what an action accepts" (domain [`InputSchema`]) from "how to
//! serialize it for a planner" (infrastructure). The tool adapter asks this
//! port for the JSON Schema of every descriptor it exposes.

use dispatch_domain::{ActionDescriptor, InputSchema};
use serde_json::Value;

/// Port for converting input schemas to planner format (JSON Schema).
pub trait ToolSchemaPort: Send + Sync {
    /// JSON Schema (`type: object`) for an input schema.
    fn input_schema(&self, schema: &InputSchema) -> Value;

    /// Full planner-facing definition of one action.
    fn action_schema(&self, descriptor: &ActionDescriptor) -> Value;
}
