//! In-memory conversation store (tests, and the default when no
//! `threads_dir` is configured).

use async_trait::async_trait;
use dispatch_application::ports::conversation_repository::{ConversationRepository, StoreError};
use dispatch_domain::{
    ConversationMessage, ConversationThread, InvocationUpdate, ToolInvocationRecord,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryConversationRepository {
    threads: RwLock<HashMap<String, ConversationThread>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn with_thread<T>(
        &self,
        thread_id: &str,
        f: impl FnOnce(&mut ConversationThread) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut threads = self.threads.write().await;
        let thread = threads
            .get_mut(thread_id)
            .ok_or_else(|| StoreError::NotFound(thread_id.to_string()))?;

        // Mutate a copy so a rejected update leaves the stored thread untouched.
        let mut draft = thread.clone();
        let value = f(&mut draft)?;
        *thread = draft;
        Ok(value)
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn create_thread(&self, thread: ConversationThread) -> Result<(), StoreError> {
        let mut threads = self.threads.write().await;
        if threads.contains_key(&thread.thread_id) {
            return Err(StoreError::AlreadyExists(thread.thread_id));
        }
        threads.insert(thread.thread_id.clone(), thread);
        Ok(())
    }

    async fn load_thread(&self, thread_id: &str) -> Result<ConversationThread, StoreError> {
        self.threads
            .read()
            .await
            .get(thread_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(thread_id.to_string()))
    }

    async fn list_threads(
        &self,
        user_id: Option<&str>,
    ) -> Result<Vec<ConversationThread>, StoreError> {
        let mut threads: Vec<_> = self
            .threads
            .read()
            .await
            .values()
            .filter(|t| user_id.is_none_or(|u| t.user_id == u))
            .cloned()
            .collect();
        threads.sort_by(|a, b| a.thread_id.cmp(&b.thread_id));
        Ok(threads)
    }

    async fn append_message(
        &self,
        thread_id: &str,
        message: ConversationMessage,
    ) -> Result<(), StoreError> {
        self.with_thread(thread_id, |thread| Ok(thread.append(message)?))
            .await
    }

    async fn upsert_tail_invocation(
        &self,
        thread_id: &str,
        message_id: &str,
        update: InvocationUpdate,
    ) -> Result<ToolInvocationRecord, StoreError> {
        self.with_thread(thread_id, |thread| {
            Ok(thread.upsert_tail_invocation(message_id, update)?.clone())
        })
        .await
    }

    async fn deactivate_thread(&self, thread_id: &str) -> Result<(), StoreError> {
        self.with_thread(thread_id, |thread| {
            thread.deactivate();
            Ok(())
        })
        .await
    }
}
