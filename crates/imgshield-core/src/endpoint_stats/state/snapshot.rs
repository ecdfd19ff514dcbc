//! Serializable snapshot types and conversion for tracker persistence.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::endpoint_stats::history::EndpointHistory;

use super::{EndpointStatsTracker, TimeoutSettings};

/// Serializable per-endpoint history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedHistory {
    pub samples: Vec<u64>,
    #[serde(default)]
    pub last_recorded_at: u64,
}

/// Snapshot of the tracker for JSON serialization, keyed by endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedEndpointStats {
    #[serde(default = "default_version")]
    pub version: u8,
    pub endpoints: HashMap<String, PersistedHistory>,
}

fn default_version() -> u8 {
    1
}

pub(super) fn to_snapshot(tracker: &EndpointStatsTracker) -> PersistedEndpointStats {
    let endpoints = tracker
        .histories
        .lock()
        .iter()
        .map(|(endpoint, h)| {
            (
                endpoint.clone(),
                PersistedHistory {
                    samples: h.samples().iter().copied().collect(),
                    last_recorded_at: h.last_recorded_at,
                },
            )
        })
        .collect();
    PersistedEndpointStats {
        version: 1,
        endpoints,
    }
}

/// Rebuild a tracker; if the configured capacity shrank, only the newest samples are kept.
pub(super) fn from_snapshot(
    snapshot: PersistedEndpointStats,
    settings: TimeoutSettings,
) -> EndpointStatsTracker {
    let tracker = EndpointStatsTracker::new(settings);
    {
        let mut histories = tracker.histories.lock();
        for (endpoint, persisted) in snapshot.endpoints {
            let mut history = EndpointHistory::new(&endpoint, settings.capacity);
            for latency in persisted.samples {
                history.push(latency, persisted.last_recorded_at);
            }
            histories.insert(endpoint, history);
        }
    }
    tracker
}
