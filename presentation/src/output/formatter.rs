//! Output formatter trait

use super::{console::ConsoleFormatter, json::JsonFormatter};
use dispatch_application::{InvocationOutcome, PlannerTool, ThreadHistory};
use dispatch_domain::{ConversationThread, OutputFormat};
use serde::Serialize;

/// One line of the `threads` listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub thread_id: String,
    pub user_id: String,
    pub is_active: bool,
    pub messages: usize,
    pub invocations: usize,
}

impl From<&ConversationThread> for ThreadSummary {
    fn from(thread: &ConversationThread) -> Self {
        Self {
            thread_id: thread.thread_id.clone(),
            user_id: thread.user_id.clone(),
            is_active: thread.is_active,
            messages: thread.messages.len(),
            invocations: thread.invocations().count(),
        }
    }
}

/// Trait for rendering command results
pub trait OutputFormatter {
    /// The planner tool surface; `schema` includes full parameter schemas.
    fn tools(&self, tools: &[PlannerTool], schema: bool) -> String;

    /// One dispatched call and where it was recorded.
    fn call(&self, thread_id: &str, outcome: &InvocationOutcome) -> String;

    fn history(&self, history: &ThreadHistory) -> String;

    fn threads(&self, threads: &[ThreadSummary]) -> String;
}

pub fn formatter_for(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(ConsoleFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}
