//! Per-endpoint latency statistics and adaptive timeouts.
//!
//! The tracker keeps a bounded history of successful-call latencies for each
//! backend endpoint (host) and derives a timeout of mean + 2 standard
//! deviations, clamped to configured bounds. Until an endpoint has enough
//! samples the configured default is used. Histories can be persisted to a
//! [`crate::store::PersistentStore`] so learned timeouts survive restarts.

mod history;
mod key;
mod persist;
mod state;

pub use history::EndpointHistory;
pub use key::endpoint_key;
pub use persist::STATS_STORE_KEY;
pub use state::{EndpointStatsTracker, EndpointSummary, PersistedEndpointStats, TimeoutSettings};
