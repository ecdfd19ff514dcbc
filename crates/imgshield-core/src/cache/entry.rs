//! Cache entry bookkeeping.

use serde::{Deserialize, Serialize};

/// One cached value with its access statistics. Times are unix ms.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub access_count: u64,
    pub last_access_at: u64,
    pub inserted_at: u64,
    /// Accessed since its statistics were last written to the store.
    pub(super) dirty: bool,
}

impl<V> CacheEntry<V> {
    pub(super) fn new(key: &str, value: V, now_ms: u64) -> Self {
        Self {
            key: key.to_string(),
            value,
            access_count: 1,
            last_access_at: now_ms,
            inserted_at: now_ms,
            dirty: false,
        }
    }

    pub(super) fn restore(key: &str, stored: StoredEntry<V>) -> Self {
        Self {
            key: key.to_string(),
            value: stored.value,
            access_count: stored.access_count.max(1),
            last_access_at: stored.last_access_at,
            inserted_at: stored.inserted_at,
            dirty: false,
        }
    }

    pub(super) fn touch(&mut self, now_ms: u64) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_access_at = self.last_access_at.max(now_ms);
        self.dirty = true;
    }

    /// Milliseconds since the last access.
    pub fn age(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_access_at)
    }

    /// Borrowed persisted form of this entry.
    pub(super) fn stored(&self) -> StoredEntry<&V> {
        StoredEntry {
            value: &self.value,
            access_count: self.access_count,
            last_access_at: self.last_access_at,
            inserted_at: self.inserted_at,
        }
    }
}

/// A cache record as written to the persistent store: the value together
/// with the statistics eviction scores it by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry<V> {
    pub value: V,
    pub access_count: u64,
    pub last_access_at: u64,
    pub inserted_at: u64,
}

impl<V> StoredEntry<V> {
    /// A record seen once, at `at_ms`.
    pub fn once(value: V, at_ms: u64) -> Self {
        Self {
            value,
            access_count: 1,
            last_access_at: at_ms,
            inserted_at: at_ms,
        }
    }
}
