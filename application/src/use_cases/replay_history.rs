//! Replay History use case.
//!
//! Rebuilds a per-message timeline from a persisted thread, with one
//! summary per tool invocation, for audit and for showing past activity.

use crate::ports::conversation_repository::{ConversationRepository, StoreError};
use chrono::{DateTime, Utc};
use dispatch_domain::{
    ConversationThread, InvocationState, InvocationStatus, Role, ToolCallId, ToolInvocationRecord,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Outcome of one invocation as it stands in history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationSummary {
    pub tool_call_id: ToolCallId,
    pub tool_name: String,
    pub state: InvocationState,
    pub args: Value,
    /// `None` until the invocation reaches `result`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InvocationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&ToolInvocationRecord> for InvocationSummary {
    fn from(record: &ToolInvocationRecord) -> Self {
        let result = record.result();
        Self {
            tool_call_id: record.tool_call_id().clone(),
            tool_name: record.tool_name().to_string(),
            state: record.state(),
            args: record.args().clone(),
            status: result.map(|r| r.status()),
            error_code: result.and_then(|r| r.error_code()).map(str::to_string),
            message: result.map(|r| r.message().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub message_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invocations: Vec<InvocationSummary>,
}

/// Invocation counts over a whole thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Still in `partial-call` or `call`.
    pub open: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadHistory {
    pub thread_id: String,
    pub user_id: String,
    pub is_active: bool,
    pub entries: Vec<HistoryEntry>,
    pub stats: HistoryStats,
}

impl ThreadHistory {
    pub fn from_thread(thread: &ConversationThread) -> Self {
        let entries: Vec<HistoryEntry> = thread
            .messages
            .iter()
            .map(|m| HistoryEntry {
                message_id: m.id.clone(),
                role: m.role,
                content: m.content.clone(),
                created_at: m.created_at,
                invocations: m.tool_invocations.iter().map(InvocationSummary::from).collect(),
            })
            .collect();

        let mut stats = HistoryStats::default();
        for summary in entries.iter().flat_map(|e| &e.invocations) {
            stats.total += 1;
            match summary.status {
                Some(InvocationStatus::Success) => stats.succeeded += 1,
                Some(InvocationStatus::Error) => stats.failed += 1,
                Some(InvocationStatus::Cancelled) => stats.cancelled += 1,
                None => stats.open += 1,
            }
        }

        Self {
            thread_id: thread.thread_id.clone(),
            user_id: thread.user_id.clone(),
            is_active: thread.is_active,
            entries,
            stats,
        }
    }

    /// Every invocation summary, in message order.
    pub fn invocations(&self) -> impl Iterator<Item = &InvocationSummary> {
        self.entries.iter().flat_map(|e| e.invocations.iter())
    }
}

pub struct ReplayHistoryUseCase {
    repository: Arc<dyn ConversationRepository>,
}

impl ReplayHistoryUseCase {
    pub fn new(repository: Arc<dyn ConversationRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, thread_id: &str) -> Result<ThreadHistory, StoreError> {
        let thread = self.repository.load_thread(thread_id).await?;
        Ok(ThreadHistory::from_thread(&thread))
    }
}
