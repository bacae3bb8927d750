//! JSON output formatter

use super::formatter::{OutputFormatter, ThreadSummary};
use dispatch_application::{InvocationOutcome, PlannerTool, ThreadHistory};
use serde::Serialize;
use serde_json::{Value, json};

/// Pretty-printed JSON, one document per command.
pub struct JsonFormatter;

impl JsonFormatter {
    fn render(value: &impl Serialize) -> String {
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| json!({"error": format!("serialization failed: {}", e)}).to_string())
    }
}

impl OutputFormatter for JsonFormatter {
    fn tools(&self, tools: &[PlannerTool], schema: bool) -> String {
        if schema {
            return Self::render(&tools);
        }
        let listing: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "id": t.id,
                    "description": t.description,
                    "requires_confirmation": t.requires_confirmation,
                    "executable": t.is_executable(),
                })
            })
            .collect();
        Self::render(&listing)
    }

    fn call(&self, thread_id: &str, outcome: &InvocationOutcome) -> String {
        Self::render(&json!({
            "threadId": thread_id,
            "invocation": outcome.record,
        }))
    }

    fn history(&self, history: &ThreadHistory) -> String {
        Self::render(history)
    }

    fn threads(&self, threads: &[ThreadSummary]) -> String {
        Self::render(&threads)
    }
}
