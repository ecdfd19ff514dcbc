//! Periodic upkeep: cache sweep, TTL trim, stale-history trim, stats persistence.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::ClassificationPipeline;

/// What one maintenance pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub evicted: usize,
    pub expired: usize,
    pub stale_histories: usize,
    pub stats_saved: bool,
}

/// Running maintenance task. Call [`MaintenanceHandle::stop`] on shutdown.
pub struct MaintenanceHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MaintenanceHandle {
    /// Signal the task to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "maintenance task ended abnormally");
        }
    }
}

impl ClassificationPipeline {
    /// One maintenance pass.
    pub async fn run_maintenance(&self) -> MaintenanceReport {
        let evicted = self.cache.sweep().await;
        let expired = self.cache.trim_expired().await;
        let stale_histories = self.stats.trim_stale(self.settings.stale_history);
        let stats_saved = self.persist_stats().await;
        let report = MaintenanceReport {
            evicted,
            expired,
            stale_histories,
            stats_saved,
        };
        tracing::info!(?report, "maintenance pass finished");
        report
    }

    /// Save endpoint statistics and the error history to the store. Returns
    /// whether both were saved.
    pub async fn persist_stats(&self) -> bool {
        let Some(store) = self.store.as_deref() else {
            return false;
        };
        let stats_saved = match self.stats.save_to_store(store).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "could not persist endpoint stats");
                false
            }
        };
        let history_saved = match self.recovery.save_history(store).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "could not persist error history");
                false
            }
        };
        stats_saved && history_saved
    }

    /// Spawn the periodic maintenance task. The first pass runs one interval
    /// after the start.
    pub fn start_maintenance(self: &Arc<Self>) -> MaintenanceHandle {
        let (shutdown, mut stop_rx) = watch::channel(false);
        let pipeline = Arc::clone(self);
        let period = self.settings.maintenance_interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        pipeline.run_maintenance().await;
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("maintenance task stopped");
        });
        MaintenanceHandle { shutdown, task }
    }
}
