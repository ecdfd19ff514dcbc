//! Save and restore the error history so health survives restarts.

use serde::{Deserialize, Serialize};

use crate::store::{PersistentStore, StoreError};

use super::registry::ErrorRecoveryRegistry;
use super::types::ErrorRecord;

/// Store key holding the JSON snapshot of the error history.
pub const RECOVERY_STORE_KEY: &str = "recovery:history";

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedHistory {
    version: u32,
    records: Vec<ErrorRecord>,
}

impl ErrorRecoveryRegistry {
    pub async fn save_history(&self, store: &dyn PersistentStore) -> Result<(), StoreError> {
        let snapshot = PersistedHistory {
            version: SNAPSHOT_VERSION,
            records: self.recent_records(),
        };
        store.put(RECOVERY_STORE_KEY, serde_json::to_vec(&snapshot)?).await
    }

    /// Replace the in-memory history with the saved one. A missing, corrupt
    /// or unknown-version snapshot leaves the history empty.
    pub async fn restore_history(&self, store: &dyn PersistentStore) {
        let record = match store.get(RECOVERY_STORE_KEY).await {
            Ok(Some(record)) => record,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "could not read error history");
                return;
            }
        };
        match serde_json::from_slice::<PersistedHistory>(&record.value) {
            Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => {
                self.replace_history(snapshot.records);
            }
            Ok(snapshot) => {
                tracing::warn!(version = snapshot.version, "unknown error history version; ignored");
            }
            Err(e) => tracing::warn!(error = %e, "corrupt error history; starting empty"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::store::MemoryStore;

    use crate::recovery::{ErrorType, HealthStatus, RecoveryAction};
    use super::*;

    fn record(i: usize, action: RecoveryAction) -> ErrorRecord {
        ErrorRecord {
            timestamp: i as u64,
            error_type: ErrorType::Network,
            message: "connection refused".into(),
            context_key: format!("img-{i}"),
            action,
        }
    }

    #[tokio::test]
    async fn history_and_health_survive_restart() {
        let store = MemoryStore::new();
        let first = ErrorRecoveryRegistry::default();
        first.replace_history((0..10).map(|i| record(i, RecoveryAction::Fail)).collect());
        first.save_history(&store).await.unwrap();

        let second = ErrorRecoveryRegistry::default();
        second.restore_history(&store).await;
        assert_eq!(second.recent_records(), first.recent_records());
        let health = second.health();
        assert_eq!(health.status, HealthStatus::Critical);
        assert_eq!(health.by_type.get(&ErrorType::Network), Some(&10));
    }

    #[tokio::test]
    async fn corrupt_history_is_ignored() {
        let store = MemoryStore::new();
        store.put(RECOVERY_STORE_KEY, b"[oops".to_vec()).await.unwrap();
        let registry = ErrorRecoveryRegistry::default();
        registry.restore_history(&store).await;
        assert!(registry.recent_records().is_empty());
        assert_eq!(registry.health().status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn restored_history_is_capped() {
        let store = MemoryStore::new();
        let big = PersistedHistory {
            version: SNAPSHOT_VERSION,
            records: (0..150).map(|i| record(i, RecoveryAction::Retry)).collect(),
        };
        store
            .put(RECOVERY_STORE_KEY, serde_json::to_vec(&big).unwrap())
            .await
            .unwrap();
        let registry = ErrorRecoveryRegistry::default();
        registry.restore_history(&store).await;
        let records = registry.recent_records();
        assert_eq!(records.len(), 100);
        assert_eq!(records[0].context_key, "img-50");
    }
}
