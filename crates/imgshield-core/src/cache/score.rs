//! Eviction scoring and retention sizing.

use std::time::Duration;

use crate::config::CacheConfig;

use super::entry::CacheEntry;

/// Score contributed by each recorded access.
pub const FREQUENCY_WEIGHT: u64 = 1_000;

/// Parameters for sweep and persisted-entry expiry.
#[derive(Debug, Clone, Copy)]
pub struct EvictionSettings {
    pub recency_window: Duration,
    pub min_keep: usize,
    /// Percent of entries kept by a sweep, rounded up.
    pub keep_percent: u8,
    /// Persisted entries older than this are neither served nor kept.
    pub ttl: Duration,
}

impl EvictionSettings {
    pub fn from_config(cfg: &CacheConfig) -> Self {
        Self {
            recency_window: Duration::from_secs(cfg.recency_window_secs),
            min_keep: cfg.min_keep,
            keep_percent: cfg.keep_percent.clamp(1, 100),
            ttl: Duration::from_secs(cfg.ttl_secs),
        }
    }
}

impl Default for EvictionSettings {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

/// `access_count * 1000 + max(0, window - age)`.
pub fn entry_score<V>(entry: &CacheEntry<V>, now_ms: u64, recency_window: Duration) -> u64 {
    let window_ms = recency_window.as_millis() as u64;
    let frequency = entry.access_count.saturating_mul(FREQUENCY_WEIGHT);
    let recency = window_ms.saturating_sub(entry.age(now_ms));
    frequency.saturating_add(recency)
}

/// Entries a sweep keeps out of `total`: `max(min_keep, ceil(total * keep_percent / 100))`,
/// never more than `total`.
pub fn keep_count(total: usize, settings: &EvictionSettings) -> usize {
    let percent = settings.keep_percent as usize;
    let by_ratio = (total * percent).div_ceil(100);
    by_ratio.max(settings.min_keep).min(total)
}
