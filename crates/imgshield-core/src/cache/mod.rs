//! Hybrid frequency + recency result cache.
//!
//! Entries are scored by `access_count * 1000 + max(0, window - age)`, so an
//! item that is reused often survives a quiet spell (unlike LRU) and a one-off
//! hit eventually ages out (unlike LFU). A periodic sweep keeps the best
//! `max(min_keep, ceil(80%))` entries. The in-memory index is authoritative;
//! the optional backing store is written through and cleaned best-effort.
//!
//! Store records carry the access statistics alongside the value
//! ([`StoredEntry`]). [`HybridEvictionCache::load_from_store`] rebuilds the
//! index on startup so a sweep in a fresh process scores persisted entries
//! too; the sweep writes back statistics of entries read since their last
//! write.

mod entry;
mod hybrid;
mod score;

pub use entry::{CacheEntry, StoredEntry};
pub use hybrid::{HybridEvictionCache, CACHE_KEY_PREFIX};
pub use score::{entry_score, keep_count, EvictionSettings, FREQUENCY_WEIGHT};
