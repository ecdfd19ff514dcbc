//! Two-stage classification pipeline.
//!
//! Per request: cache lookup, then a cheap fingerprint check, then (only when
//! the fingerprint score reaches `safe_max`) deep analysis, whose result
//! supersedes the fingerprint one. Backend calls go through the adaptive
//! timeout and retry layer; whatever survives it is handed to the recovery
//! registry. `classify` always returns a [`ClassificationResult`].
//!
//! When the fingerprint backend cannot be reached at all the item is reported
//! as safe with the error attached (`pipeline.fail_open = true`, the default)
//! or as caution (`fail_open = false`). Fail-open keeps pages usable during an
//! outage at the cost of letting unchecked content through.
//!
//! When deep analysis fails for good, the fingerprint verdict is returned
//! with the deep-stage error attached and is not cached.
//!
//! Concurrent requests for the same uncached identifier are not coalesced:
//! each one calls the backends.

mod batch;
mod maintenance;
mod result;
mod stage;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::backend::{ClassificationBackend, HttpBackend};
use crate::cache::{EvictionSettings, HybridEvictionCache};
use crate::config::{BackendsConfig, ShieldConfig};
use crate::endpoint_stats::{EndpointStatsTracker, TimeoutSettings};
use crate::recovery::{ErrorRecoveryRegistry, RecoverySettings};
use crate::retry::{RetryPolicy, RetryableFetcher};
use crate::store::PersistentStore;

pub use batch::BatchItem;
pub use maintenance::{MaintenanceHandle, MaintenanceReport};
pub use result::{
    ClassificationResult, FailureKind, ResultError, ResultSource, RiskStatus, Thresholds,
};

/// Pipeline-level knobs.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub thresholds: Thresholds,
    pub batch_size: usize,
    pub fail_open: bool,
    /// Endpoint histories idle longer than this are dropped by maintenance.
    pub stale_history: Duration,
    pub maintenance_interval: Duration,
}

impl PipelineSettings {
    pub fn from_config(cfg: &ShieldConfig) -> Self {
        Self {
            thresholds: Thresholds::from_config(&cfg.thresholds),
            batch_size: cfg.pipeline.batch_size.max(1),
            fail_open: cfg.pipeline.fail_open,
            stale_history: Duration::from_secs(cfg.pipeline.stale_history_secs),
            maintenance_interval: Duration::from_secs(cfg.cache.sweep_interval_secs.max(1)),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&ShieldConfig::default())
    }
}

/// Entry point for classification requests.
pub struct ClassificationPipeline {
    cache: Arc<HybridEvictionCache<ClassificationResult>>,
    stats: Arc<EndpointStatsTracker>,
    fetcher: RetryableFetcher,
    recovery: Arc<ErrorRecoveryRegistry>,
    store: Option<Arc<dyn PersistentStore>>,
    fingerprint: Option<Arc<dyn ClassificationBackend>>,
    deep: Vec<Arc<dyn ClassificationBackend>>,
    settings: PipelineSettings,
}

impl ClassificationPipeline {
    /// Pipeline with empty endpoint statistics and no backends.
    pub fn new(cfg: &ShieldConfig, store: Option<Arc<dyn PersistentStore>>) -> Self {
        let stats = EndpointStatsTracker::new(TimeoutSettings::from_config(&cfg.timeouts));
        Self::assemble(cfg, store, stats)
    }

    /// Like [`Self::new`], restoring endpoint statistics, the error history
    /// and the cache index from the store.
    pub async fn open(cfg: &ShieldConfig, store: Option<Arc<dyn PersistentStore>>) -> Self {
        let settings = TimeoutSettings::from_config(&cfg.timeouts);
        let stats = match store.as_deref() {
            Some(store) => EndpointStatsTracker::restore_from_store(store, settings).await,
            None => EndpointStatsTracker::new(settings),
        };
        let pipeline = Self::assemble(cfg, store, stats);
        if let Some(store) = pipeline.store.as_deref() {
            pipeline.recovery.restore_history(store).await;
        }
        pipeline.cache.load_from_store().await;
        pipeline
    }

    fn assemble(
        cfg: &ShieldConfig,
        store: Option<Arc<dyn PersistentStore>>,
        stats: EndpointStatsTracker,
    ) -> Self {
        let eviction = EvictionSettings::from_config(&cfg.cache);
        let cache = match &store {
            Some(store) => HybridEvictionCache::with_store(eviction, Arc::clone(store)),
            None => HybridEvictionCache::new(eviction),
        };
        let stats = Arc::new(stats);
        Self {
            cache: Arc::new(cache),
            fetcher: RetryableFetcher::new(Arc::clone(&stats), RetryPolicy::from_config(&cfg.retry)),
            stats,
            recovery: Arc::new(ErrorRecoveryRegistry::new(RecoverySettings::from_config(
                &cfg.recovery,
            ))),
            store,
            fingerprint: None,
            deep: Vec::new(),
            settings: PipelineSettings::from_config(cfg),
        }
    }

    pub fn with_fingerprint_backend(mut self, backend: Arc<dyn ClassificationBackend>) -> Self {
        self.fingerprint = Some(backend);
        self
    }

    /// Add a deep-analysis provider. Providers are tried in insertion order.
    pub fn with_deep_backend(mut self, backend: Arc<dyn ClassificationBackend>) -> Self {
        self.deep.push(backend);
        self
    }

    /// Attach HTTP backends for every configured endpoint.
    pub fn with_configured_backends(mut self, cfg: &BackendsConfig) -> Result<Self> {
        if let Some(endpoint) = &cfg.fingerprint {
            self = self.with_fingerprint_backend(Arc::new(HttpBackend::from_config(endpoint)?));
        }
        for endpoint in &cfg.deep {
            self = self.with_deep_backend(Arc::new(HttpBackend::from_config(endpoint)?));
        }
        Ok(self)
    }

    pub fn cache(&self) -> &Arc<HybridEvictionCache<ClassificationResult>> {
        &self.cache
    }

    pub fn stats(&self) -> &Arc<EndpointStatsTracker> {
        &self.stats
    }

    pub fn recovery(&self) -> &Arc<ErrorRecoveryRegistry> {
        &self.recovery
    }

    pub fn store(&self) -> Option<&Arc<dyn PersistentStore>> {
        self.store.as_ref()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn has_fingerprint_backend(&self) -> bool {
        self.fingerprint.is_some()
    }

    pub fn deep_backend_count(&self) -> usize {
        self.deep.len()
    }
}
