//! In-process store used when no database is available and in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{unix_millis, PersistentStore, StoreError, StoredRecord};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, StoredRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with an explicit write time (unix ms).
    pub fn put_at(&self, key: &str, value: Vec<u8>, stored_at: u64) {
        self.records
            .lock()
            .insert(key.to_string(), StoredRecord { value, stored_at });
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.lock().contains_key(key)
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self.records.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.put_at(key, value, unix_millis());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.records.lock().remove(key);
        Ok(())
    }

    async fn count_entries(&self) -> Result<u64, StoreError> {
        Ok(self.records.lock().len() as u64)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .records
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn keys_older_than(&self, prefix: &str, cutoff_ms: u64) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .records
            .lock()
            .iter()
            .filter(|(k, r)| k.starts_with(prefix) && r.stored_at < cutoff_ms)
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn reinitialize(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
