//! Port for persisting conversation threads.
//!
//! The repository is the persistence boundary for invocation lifecycles:
//! every tail upsert goes through
//! [`ConversationThread::upsert_tail_invocation`], so transition rules are
//! enforced no matter which adapter stores the data.
//!
//! Writes are append-only from the engine's point of view: new messages are
//! appended, and only the tail message's invocations change.

use async_trait::async_trait;
use dispatch_domain::{
    ConversationMessage, ConversationThread, InvocationUpdate, ThreadError, ToolInvocationRecord,
};
use thiserror::Error;

/// Errors from conversation storage.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Thread not found: {0}")]
    NotFound(String),

    #[error("Thread already exists: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    Thread(#[from] ThreadError),

    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether the error is a rejected lifecycle or history rule rather than
    /// a storage failure.
    pub fn is_rule_violation(&self) -> bool {
        matches!(self, StoreError::Thread(_))
    }
}

/// Port for loading and mutating conversation threads.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Persist a new, empty thread.
    async fn create_thread(&self, thread: ConversationThread) -> Result<(), StoreError>;

    async fn load_thread(&self, thread_id: &str) -> Result<ConversationThread, StoreError>;

    /// All threads, optionally filtered by owner.
    async fn list_threads(&self, user_id: Option<&str>)
    -> Result<Vec<ConversationThread>, StoreError>;

    /// Append a message at the end of an active thread.
    async fn append_message(
        &self,
        thread_id: &str,
        message: ConversationMessage,
    ) -> Result<(), StoreError>;

    /// Apply an invocation update to the tail message; returns the record as
    /// persisted.
    async fn upsert_tail_invocation(
        &self,
        thread_id: &str,
        message_id: &str,
        update: InvocationUpdate,
    ) -> Result<ToolInvocationRecord, StoreError>;

    /// Mark a thread inactive. Further writes are rejected.
    async fn deactivate_thread(&self, thread_id: &str) -> Result<(), StoreError>;
}
