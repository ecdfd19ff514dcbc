//! Persistent key-value store collaborator.
//!
//! The cache and the endpoint stats tracker persist through this trait so
//! results and learned timeouts survive restarts. Every caller treats a store
//! failure as "in-memory only for this operation": errors are logged and the
//! in-memory state stays authoritative.

mod memory;
mod sqlite;

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors reported by a [`PersistentStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A stored value plus the time (unix ms) it was last written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub value: Vec<u8>,
    pub stored_at: u64,
}

/// Key-value persistence consumed by the cache and stats tracker.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<StoredRecord>, StoreError>;

    /// Insert or overwrite `key`, stamping it with the current time.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn count_entries(&self) -> Result<u64, StoreError>;

    /// Keys starting with `prefix`, sorted.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Keys starting with `prefix` whose last write is older than `cutoff_ms` (unix ms).
    async fn keys_older_than(&self, prefix: &str, cutoff_ms: u64) -> Result<Vec<String>, StoreError>;

    /// Re-create the backing schema/handle after a storage failure.
    async fn reinitialize(&self) -> Result<(), StoreError>;
}

/// Current time as unix milliseconds.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
