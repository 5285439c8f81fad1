//! Durable key-value storage for client-persisted state
//!
//! The session (token, agent record, selected service type) and the failure
//! reason ledger both sit on top of [`KeyValueStore`]. Two backends exist:
//! an in-memory map and a JSON file that is rewritten atomically on every
//! mutation.

pub mod error;
pub mod file;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    async fn remove(&self, key: &str) -> StorageResult<()>;

    async fn clear(&self) -> StorageResult<()>;
}
