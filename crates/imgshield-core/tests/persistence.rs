//! Integration tests: results and learned timeouts survive a restart via SQLite.

mod common;

use std::sync::Arc;

use common::mock_backend::MockBackend;
use imgshield_core::config::ShieldConfig;
use imgshield_core::endpoint_stats::STATS_STORE_KEY;
use imgshield_core::pipeline::{ClassificationPipeline, RiskStatus};
use imgshield_core::retry::FetchError;
use imgshield_core::store::{PersistentStore, SqliteStore};
use tempfile::tempdir;

async fn open_store(path: &std::path::Path) -> Arc<dyn PersistentStore> {
    Arc::new(SqliteStore::open_at(path).await.unwrap())
}

#[tokio::test]
async fn cached_result_is_served_after_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("store.db");
    let cfg = ShieldConfig::default();

    let healthy = Arc::new(MockBackend::new("hashes").fingerprint_score(0.1));
    let first = ClassificationPipeline::open(&cfg, Some(open_store(&db_path).await))
        .await
        .with_fingerprint_backend(healthy.clone());
    let original = first.classify("img-1", b"bytes").await;
    assert_eq!(original.status, RiskStatus::Safe);
    drop(first);

    // Backend now refuses everything; the stored verdict still answers.
    let broken = Arc::new(
        MockBackend::new("hashes").fingerprint_error(FetchError::Upstream { status: 400 }),
    );
    let second = ClassificationPipeline::open(&cfg, Some(open_store(&db_path).await))
        .await
        .with_fingerprint_backend(broken.clone());
    let again = second.classify("img-1", b"bytes").await;
    assert_eq!(again, original);
    assert_eq!(broken.fingerprint_calls(), 0);
    // Loaded with its persisted count of 1, then read once more.
    assert_eq!(second.cache().entry("img-1").unwrap().access_count, 2);
}

#[tokio::test]
async fn endpoint_stats_survive_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("store.db");
    let cfg = ShieldConfig::default();

    let store = open_store(&db_path).await;
    let first = ClassificationPipeline::open(&cfg, Some(store.clone())).await;
    for latency in [3_000, 3_200, 2_800, 3_100, 3_000] {
        first.stats().record("vision.example.com", latency);
    }
    let report = first.run_maintenance().await;
    assert!(report.stats_saved);
    assert!(store.get(STATS_STORE_KEY).await.unwrap().is_some());

    let second = ClassificationPipeline::open(&cfg, Some(open_store(&db_path).await)).await;
    assert_eq!(
        second.stats().timeout_for("vision.example.com").as_millis(),
        3_285
    );
}

#[tokio::test]
async fn corrupt_stats_snapshot_starts_empty() {
    let dir = tempdir().unwrap();
    let store = open_store(&dir.path().join("store.db")).await;
    store.put(STATS_STORE_KEY, b"{not json".to_vec()).await.unwrap();

    let pipeline = ClassificationPipeline::open(&ShieldConfig::default(), Some(store)).await;
    assert!(pipeline.stats().summaries().is_empty());
}
