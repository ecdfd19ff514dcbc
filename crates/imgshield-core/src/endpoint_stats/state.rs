//! In-memory endpoint latency tracker.

mod adaptive;
mod snapshot;

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::TimeoutConfig;
use crate::store::unix_millis;

use super::history::EndpointHistory;
use adaptive::{adaptive_timeout, mean_and_stddev};

pub use snapshot::PersistedEndpointStats;

/// Bounds and defaults for adaptive timeouts.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutSettings {
    /// Used until an endpoint has `min_samples` samples.
    pub default: Duration,
    pub min: Duration,
    pub max: Duration,
    pub min_samples: usize,
    /// Samples kept per endpoint.
    pub capacity: usize,
}

impl TimeoutSettings {
    /// The default is clamped into `[min, max]` like a learned timeout.
    pub fn from_config(cfg: &TimeoutConfig) -> Self {
        let max_ms = cfg.max_ms.max(cfg.min_ms);
        Self {
            default: Duration::from_millis(cfg.default_ms.clamp(cfg.min_ms, max_ms)),
            min: Duration::from_millis(cfg.min_ms),
            max: Duration::from_millis(max_ms),
            min_samples: cfg.min_samples,
            capacity: cfg.sample_capacity.max(1),
        }
    }
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self::from_config(&TimeoutConfig::default())
    }
}

/// Snapshot of one endpoint's statistics, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSummary {
    pub endpoint: String,
    pub samples: usize,
    pub mean_ms: Option<f64>,
    pub stddev_ms: Option<f64>,
    pub timeout: Duration,
    /// False while the configured default is still in use.
    pub learned: bool,
}

/// Latency histories for all endpoints, shared by every fetcher call.
///
/// Created once per pipeline and passed in explicitly, so tests and multiple
/// pipelines in one process never share state by accident.
#[derive(Debug)]
pub struct EndpointStatsTracker {
    pub(super) histories: Mutex<HashMap<String, EndpointHistory>>,
    pub(super) settings: TimeoutSettings,
}

impl EndpointStatsTracker {
    pub fn new(settings: TimeoutSettings) -> Self {
        Self {
            histories: Mutex::new(HashMap::new()),
            settings,
        }
    }

    pub fn settings(&self) -> &TimeoutSettings {
        &self.settings
    }

    /// Record the latency of a successful call.
    pub fn record(&self, endpoint: &str, latency_ms: u64) {
        self.record_at(endpoint, latency_ms, unix_millis());
    }

    /// Record a latency with an explicit wall-clock time (unix ms).
    pub fn record_at(&self, endpoint: &str, latency_ms: u64, now_ms: u64) {
        let capacity = self.settings.capacity;
        let mut histories = self.histories.lock();
        histories
            .entry(endpoint.to_string())
            .or_insert_with(|| EndpointHistory::new(endpoint, capacity))
            .push(latency_ms, now_ms);
    }

    /// Timeout to use for the next call to `endpoint`. Always within `[min, max]`
    /// once learned; the configured default before that.
    pub fn timeout_for(&self, endpoint: &str) -> Duration {
        let histories = self.histories.lock();
        match histories.get(endpoint) {
            Some(h) => adaptive_timeout(h.samples(), &self.settings),
            None => self.settings.default,
        }
    }

    /// Current samples for `endpoint`, oldest first.
    pub fn samples(&self, endpoint: &str) -> Vec<u64> {
        self.histories
            .lock()
            .get(endpoint)
            .map(|h| h.samples().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Per-endpoint summaries sorted by endpoint name.
    pub fn summaries(&self) -> Vec<EndpointSummary> {
        let histories = self.histories.lock();
        let mut out: Vec<EndpointSummary> = histories
            .values()
            .map(|h| {
                let stats = mean_and_stddev(h.samples());
                EndpointSummary {
                    endpoint: h.endpoint.clone(),
                    samples: h.len(),
                    mean_ms: stats.map(|(m, _)| m),
                    stddev_ms: stats.map(|(_, s)| s),
                    timeout: adaptive_timeout(h.samples(), &self.settings),
                    learned: h.len() >= self.settings.min_samples,
                }
            })
            .collect();
        out.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        out
    }

    /// Drop histories with no sample for longer than `max_idle`. Returns how many were dropped.
    pub fn trim_stale(&self, max_idle: Duration) -> usize {
        self.trim_stale_at(max_idle, unix_millis())
    }

    pub fn trim_stale_at(&self, max_idle: Duration, now_ms: u64) -> usize {
        let cutoff = now_ms.saturating_sub(max_idle.as_millis() as u64);
        let mut histories = self.histories.lock();
        let before = histories.len();
        histories.retain(|_, h| h.last_recorded_at >= cutoff);
        let dropped = before - histories.len();
        if dropped > 0 {
            tracing::debug!(dropped, "trimmed stale endpoint histories");
        }
        dropped
    }

    /// Build a serializable snapshot for persistence.
    pub fn to_snapshot(&self) -> PersistedEndpointStats {
        snapshot::to_snapshot(self)
    }

    /// Restore a tracker from a snapshot. Settings come from current config.
    pub fn from_snapshot(snapshot: PersistedEndpointStats, settings: TimeoutSettings) -> Self {
        snapshot::from_snapshot(snapshot, settings)
    }
}
