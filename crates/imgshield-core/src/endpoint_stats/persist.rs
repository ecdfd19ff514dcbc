//! Persist tracker histories through the injected store so learned timeouts survive restarts.

use crate::store::{PersistentStore, StoreError};

use super::state::{EndpointStatsTracker, PersistedEndpointStats, TimeoutSettings};

/// Store key holding the JSON snapshot of all endpoint histories.
pub const STATS_STORE_KEY: &str = "stats:endpoints";

impl EndpointStatsTracker {
    /// Save current histories to the store.
    pub async fn save_to_store(&self, store: &dyn PersistentStore) -> Result<(), StoreError> {
        let json = serde_json::to_vec(&self.to_snapshot())?;
        store.put(STATS_STORE_KEY, json).await
    }

    /// Load histories from the store. Returns None when nothing was saved yet.
    pub async fn load_from_store(
        store: &dyn PersistentStore,
        settings: TimeoutSettings,
    ) -> Result<Option<Self>, StoreError> {
        let Some(record) = store.get(STATS_STORE_KEY).await? else {
            return Ok(None);
        };
        let snapshot: PersistedEndpointStats = serde_json::from_slice(&record.value)?;
        Ok(Some(Self::from_snapshot(snapshot, settings)))
    }

    /// Like `load_from_store`, but any failure yields an empty tracker.
    pub async fn restore_from_store(store: &dyn PersistentStore, settings: TimeoutSettings) -> Self {
        match Self::load_from_store(store, settings).await {
            Ok(Some(tracker)) => {
                tracing::debug!("restored endpoint stats from store");
                tracker
            }
            Ok(None) => Self::new(settings),
            Err(e) => {
                tracing::warn!(error = %e, "could not restore endpoint stats; starting empty");
                Self::new(settings)
            }
        }
    }
}
