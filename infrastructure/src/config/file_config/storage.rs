//! Storage configuration from TOML (`[storage]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw storage configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Directory holding one `<threadId>.json` per thread.
    pub threads_dir: Option<PathBuf>,
    /// Keep threads in memory only (nothing survives the process).
    pub in_memory: bool,
}

impl FileStorageConfig {
    /// Where threads are persisted, or `None` for the in-memory store.
    ///
    /// Falls back to `$XDG_DATA_HOME/action-dispatch/threads`.
    pub fn resolved_threads_dir(&self) -> Option<PathBuf> {
        if self.in_memory {
            return None;
        }
        self.threads_dir
            .clone()
            .or_else(|| dirs::data_local_dir().map(|d| d.join("action-dispatch").join("threads")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dir_wins() {
        let config = FileStorageConfig {
            threads_dir: Some(PathBuf::from("/tmp/threads")),
            in_memory: false,
        };
        assert_eq!(config.resolved_threads_dir(), Some(PathBuf::from("/tmp/threads")));
    }

    #[test]
    fn test_in_memory_overrides_dir() {
        let config = FileStorageConfig {
            threads_dir: Some(PathBuf::from("/tmp/threads")),
            in_memory: true,
        };
        assert!(config.resolved_threads_dir().is_none());
    }
}
