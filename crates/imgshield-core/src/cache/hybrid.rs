//! The cache itself: in-memory index plus optional write-through store.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::store::{unix_millis, PersistentStore, StoreError};

use super::entry::{CacheEntry, StoredEntry};
use super::score::{entry_score, keep_count, EvictionSettings};

/// Prefix for cache records in the shared persistent store.
pub const CACHE_KEY_PREFIX: &str = "cache:";

fn store_key(key: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{key}")
}

fn encode<V: Serialize>(entry: &CacheEntry<V>) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&entry.stored())
}

fn decode<V: DeserializeOwned>(bytes: &[u8]) -> Result<StoredEntry<V>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Result cache keyed by content identifier.
///
/// Map guards are never held across an `.await`; store I/O happens after the
/// in-memory update, and its failures are logged without undoing that update.
pub struct HybridEvictionCache<V> {
    pub(super) entries: Mutex<HashMap<String, CacheEntry<V>>>,
    store: Option<Arc<dyn PersistentStore>>,
    settings: EvictionSettings,
}

impl<V> HybridEvictionCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// Memory-only cache.
    pub fn new(settings: EvictionSettings) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            store: None,
            settings,
        }
    }

    /// Cache backed by a persistent store.
    pub fn with_store(settings: EvictionSettings, store: Arc<dyn PersistentStore>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            store: Some(store),
            settings,
        }
    }

    pub fn settings(&self) -> &EvictionSettings {
        &self.settings
    }

    pub fn store(&self) -> Option<&Arc<dyn PersistentStore>> {
        self.store.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copy of the entry for `key` without counting an access.
    pub fn entry(&self, key: &str) -> Option<CacheEntry<V>> {
        self.entries.lock().get(key).cloned()
    }

    /// Look up `key`, counting an access on hit.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, unix_millis()).await
    }

    /// `get` with an explicit clock (unix ms).
    ///
    /// An in-memory miss falls back to the store; a record younger than the
    /// TTL is promoted into memory with its persisted statistics, and the
    /// read counts as an access.
    pub async fn get_at(&self, key: &str, now_ms: u64) -> Option<V> {
        let hit = self.entries.lock().get_mut(key).map(|entry| {
            entry.touch(now_ms);
            entry.value.clone()
        });
        if hit.is_some() {
            return hit;
        }

        let store = self.store.as_ref()?;
        let record = match store.get(&store_key(key)).await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache store read failed; treating as miss");
                return None;
            }
        };
        let ttl_ms = self.settings.ttl.as_millis() as u64;
        if now_ms.saturating_sub(record.stored_at) > ttl_ms {
            tracing::debug!(key, "persisted cache entry expired");
            return None;
        }
        let stored: StoredEntry<V> = match decode(&record.value) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(key, error = %e, "undecodable cache record; treating as miss");
                return None;
            }
        };

        let mut entries = self.entries.lock();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| CacheEntry::restore(key, stored));
        entry.touch(now_ms);
        Some(entry.value.clone())
    }

    /// Insert or overwrite `key`.
    pub async fn put(&self, key: &str, value: V) {
        self.put_at(key, value, unix_millis()).await
    }

    /// `put` with an explicit clock (unix ms). A first insert starts with
    /// `access_count = 1`; an overwrite replaces only the value.
    pub async fn put_at(&self, key: &str, value: V, now_ms: u64) {
        let persisted = {
            let mut entries = self.entries.lock();
            let entry = match entries.entry(key.to_string()) {
                Entry::Occupied(slot) => {
                    let entry = slot.into_mut();
                    entry.value = value;
                    entry
                }
                Entry::Vacant(slot) => slot.insert(CacheEntry::new(key, value, now_ms)),
            };
            self.store.as_ref().map(|_| {
                entry.dirty = false;
                encode(entry)
            })
        };

        let (Some(store), Some(bytes)) = (self.store.as_ref(), persisted) else {
            return;
        };
        let result = match bytes {
            Ok(bytes) => store.put(&store_key(key), bytes).await,
            Err(e) => Err(StoreError::from(e)),
        };
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "cache write-through failed; kept in memory only");
        }
    }

    /// Remove `key` from memory and the store.
    pub async fn remove(&self, key: &str) -> bool {
        let removed = self.entries.lock().remove(key).is_some();
        if let Some(store) = self.store.as_ref() {
            if let Err(e) = store.delete(&store_key(key)).await {
                tracing::warn!(key, error = %e, "cache store delete failed");
            }
        }
        removed
    }

    /// Read a persisted value ignoring the TTL (for stale fallbacks).
    pub async fn peek_stale(&self, key: &str) -> Option<V> {
        let in_memory = self.entries.lock().get(key).map(|entry| entry.value.clone());
        if in_memory.is_some() {
            return in_memory;
        }
        let store = self.store.as_ref()?;
        match store.get(&store_key(key)).await {
            Ok(Some(record)) => decode::<V>(&record.value).ok().map(|stored| stored.value),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "stale lookup failed");
                None
            }
        }
    }

    /// Evict the lowest-scoring entries. Returns how many were evicted.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(unix_millis()).await
    }

    /// `sweep` with an explicit clock (unix ms).
    ///
    /// Survivors read since their last write have their statistics written
    /// back, so the next process scores them the same way.
    pub async fn sweep_at(&self, now_ms: u64) -> usize {
        let victims = self.evict_lowest(now_ms);
        if let Some(store) = self.store.as_ref() {
            for key in &victims {
                if let Err(e) = store.delete(&store_key(key)).await {
                    tracing::warn!(key = %key, error = %e, "evicted entry not removed from store");
                }
            }
            self.flush_statistics(store.as_ref()).await;
        }
        tracing::info!(evicted = victims.len(), remaining = self.len(), "cache sweep finished");
        victims.len()
    }

    fn evict_lowest(&self, now_ms: u64) -> Vec<String> {
        let mut entries = self.entries.lock();
        let total = entries.len();
        let keep = keep_count(total, &self.settings);
        if keep >= total {
            return Vec::new();
        }
        let mut scored: Vec<(u64, &String)> = entries
            .iter()
            .map(|(k, e)| (entry_score(e, now_ms, self.settings.recency_window), k))
            .collect();
        scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        let victims: Vec<String> = scored
            .into_iter()
            .take(total - keep)
            .map(|(_, k)| k.clone())
            .collect();
        for k in &victims {
            entries.remove(k);
        }
        victims
    }

    async fn flush_statistics(&self, store: &dyn PersistentStore) {
        let pending: Vec<(String, Result<Vec<u8>, serde_json::Error>)> = self
            .entries
            .lock()
            .values_mut()
            .filter(|entry| entry.dirty)
            .map(|entry| {
                entry.dirty = false;
                (entry.key.clone(), encode(entry))
            })
            .collect();
        for (key, bytes) in pending {
            let result = match bytes {
                Ok(bytes) => store.put(&store_key(&key), bytes).await,
                Err(e) => Err(StoreError::from(e)),
            };
            if let Err(e) = result {
                tracing::warn!(key = %key, error = %e, "cache statistics not written back");
            }
        }
    }

    /// Rebuild the in-memory index from persisted records younger than the
    /// TTL. Keys already in memory are left alone. Returns how many were loaded.
    pub async fn load_from_store(&self) -> usize {
        self.load_from_store_at(unix_millis()).await
    }

    pub async fn load_from_store_at(&self, now_ms: u64) -> usize {
        let Some(store) = self.store.as_ref() else {
            return 0;
        };
        let keys = match store.keys_with_prefix(CACHE_KEY_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "listing cache records failed; starting with an empty cache");
                return 0;
            }
        };
        let ttl_ms = self.settings.ttl.as_millis() as u64;
        let mut loaded = 0;
        for full_key in keys {
            let Some(key) = full_key.strip_prefix(CACHE_KEY_PREFIX) else {
                continue;
            };
            let record = match store.get(&full_key).await {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(key, error = %e, "cache record not loaded");
                    continue;
                }
            };
            if now_ms.saturating_sub(record.stored_at) > ttl_ms {
                continue;
            }
            let stored: StoredEntry<V> = match decode(&record.value) {
                Ok(stored) => stored,
                Err(e) => {
                    tracing::warn!(key, error = %e, "undecodable cache record skipped");
                    continue;
                }
            };
            let mut entries = self.entries.lock();
            if !entries.contains_key(key) {
                entries.insert(key.to_string(), CacheEntry::restore(key, stored));
                loaded += 1;
            }
        }
        tracing::debug!(loaded, "cache index loaded from store");
        loaded
    }

    /// Delete persisted records older than the TTL, dropping them from memory
    /// as well. Returns how many were deleted.
    pub async fn trim_expired(&self) -> usize {
        self.trim_expired_at(unix_millis()).await
    }

    pub async fn trim_expired_at(&self, now_ms: u64) -> usize {
        let Some(store) = self.store.as_ref() else {
            return 0;
        };
        let cutoff = now_ms.saturating_sub(self.settings.ttl.as_millis() as u64);
        let keys = match store.keys_older_than(CACHE_KEY_PREFIX, cutoff).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "listing expired cache records failed");
                return 0;
            }
        };
        let mut deleted = 0;
        for key in keys {
            if let Some(short) = key.strip_prefix(CACHE_KEY_PREFIX) {
                self.entries.lock().remove(short);
            }
            match store.delete(&key).await {
                Ok(()) => deleted += 1,
                Err(e) => tracing::warn!(key = %key, error = %e, "expired record not deleted"),
            }
        }
        if deleted > 0 {
            tracing::debug!(deleted, "trimmed expired cache records");
        }
        deleted
    }
}
