//! JSON directory conversation store.
//!
//! One `<threadId>.json` file per thread. Every write serializes the whole
//! thread to a sibling temp file and renames it over the target, so readers
//! never observe a half-written thread.

use async_trait::async_trait;
use dispatch_application::ports::conversation_repository::{ConversationRepository, StoreError};
use dispatch_domain::{
    ConversationMessage, ConversationThread, InvocationUpdate, ToolInvocationRecord,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const EXTENSION: &str = "json";

pub struct JsonDirConversationRepository {
    dir: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl JsonDirConversationRepository {
    /// Open (and create if needed) the store directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StoreError::Io(format!("Could not create {}: {}", dir.display(), e))
        })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, thread_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !thread_id.is_empty()
            && thread_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::NotFound(thread_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", thread_id, EXTENSION)))
    }

    async fn read(&self, thread_id: &str) -> Result<ConversationThread, StoreError> {
        let path = self.path_for(thread_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(thread_id.to_string()));
            }
            Err(e) => {
                return Err(StoreError::Io(format!("{}: {}", path.display(), e)));
            }
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Serialization(format!("{}: {}", path.display(), e)))
    }

    async fn write(&self, thread: &ConversationThread) -> Result<(), StoreError> {
        let path = self.path_for(&thread.thread_id)?;
        let json = serde_json::to_vec_pretty(thread)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp = self.dir.join(format!(
            ".{}.{}.tmp",
            thread.thread_id,
            uuid::Uuid::new_v4().simple()
        ));
        if let Err(e) = tokio::fs::write(&tmp, &json).await {
            return Err(StoreError::Io(format!("{}: {}", tmp.display(), e)));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::Io(format!("{}: {}", path.display(), e)));
        }
        debug!("Wrote thread {} ({} bytes)", thread.thread_id, json.len());
        Ok(())
    }

    async fn modify<T>(
        &self,
        thread_id: &str,
        f: impl FnOnce(&mut ConversationThread) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut thread = self.read(thread_id).await?;
        let value = f(&mut thread)?;
        self.write(&thread).await?;
        Ok(value)
    }
}

#[async_trait]
impl ConversationRepository for JsonDirConversationRepository {
    async fn create_thread(&self, thread: ConversationThread) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(&thread.thread_id)?;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StoreError::AlreadyExists(thread.thread_id));
        }
        self.write(&thread).await
    }

    async fn load_thread(&self, thread_id: &str) -> Result<ConversationThread, StoreError> {
        self.read(thread_id).await
    }

    async fn list_threads(
        &self,
        user_id: Option<&str>,
    ) -> Result<Vec<ConversationThread>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| StoreError::Io(format!("{}: {}", self.dir.display(), e)))?;

        let mut threads = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(thread_id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.read(thread_id).await {
                Ok(thread) if user_id.is_none_or(|u| thread.user_id == u) => threads.push(thread),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable thread file {}: {}", path.display(), e),
            }
        }

        threads.sort_by(|a, b| a.thread_id.cmp(&b.thread_id));
        Ok(threads)
    }

    async fn append_message(
        &self,
        thread_id: &str,
        message: ConversationMessage,
    ) -> Result<(), StoreError> {
        self.modify(thread_id, |thread| Ok(thread.append(message)?))
            .await
    }

    async fn upsert_tail_invocation(
        &self,
        thread_id: &str,
        message_id: &str,
        update: InvocationUpdate,
    ) -> Result<ToolInvocationRecord, StoreError> {
        self.modify(thread_id, |thread| {
            Ok(thread.upsert_tail_invocation(message_id, update)?.clone())
        })
        .await
    }

    async fn deactivate_thread(&self, thread_id: &str) -> Result<(), StoreError> {
        self.modify(thread_id, |thread| {
            thread.deactivate();
            Ok(())
        })
        .await
    }
}
