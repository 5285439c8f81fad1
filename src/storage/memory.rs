use super::{KeyValueStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory key-value store.
///
/// Optionally bounded by entry count; a full store refuses new keys with
/// [`StorageError::QuotaExceeded`].
#[derive(Default, Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
    max_entries: Option<usize>,
}

impl MemoryStore {
    /// Creates a new, empty, unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that rejects new keys once `max_entries` is reached.
    pub fn with_capacity_limit(max_entries: usize) -> Self {
        Self {
            entries: Arc::default(),
            max_entries: Some(max_entries),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        if let Some(limit) = self.max_entries {
            if !entries.contains_key(key) && entries.len() >= limit {
                return Err(StorageError::QuotaExceeded(format!(
                    "store holds {} entries",
                    entries.len()
                )));
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        entries.clear();
        Ok(())
    }
}
