//! Adaptive-timeout, retrying wrapper around a single backend call.

use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;

use crate::endpoint_stats::EndpointStatsTracker;

use super::error::FetchError;
use super::policy::RetryPolicy;
use super::run::run_with_retry;

/// Wraps backend calls with a per-endpoint adaptive timeout and the retry loop.
///
/// Each attempt runs under the timeout the tracker currently recommends for
/// the endpoint. Expiry drops (cancels) the in-flight future and surfaces
/// [`FetchError::Timeout`]. Only successful attempts feed the tracker, so
/// failures never skew the learned timeout.
pub struct RetryableFetcher {
    stats: Arc<EndpointStatsTracker>,
    policy: RetryPolicy,
}

impl RetryableFetcher {
    pub fn new(stats: Arc<EndpointStatsTracker>, policy: RetryPolicy) -> Self {
        Self { stats, policy }
    }

    pub fn stats(&self) -> &Arc<EndpointStatsTracker> {
        &self.stats
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call `op` against `endpoint` with timeout and retries.
    ///
    /// `op` is invoked once per attempt and must build a fresh request future each time.
    pub async fn call<T, F, Fut>(&self, endpoint: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let stats = &self.stats;
        run_with_retry(&self.policy, |attempt| {
            let timeout = stats.timeout_for(endpoint);
            let request = op();
            async move {
                let started = Instant::now();
                match tokio::time::timeout(timeout, request).await {
                    Ok(Ok(value)) => {
                        stats.record(endpoint, started.elapsed().as_millis() as u64);
                        Ok(value)
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(endpoint, attempt, error = %e, "backend call failed");
                        Err(e)
                    }
                    Err(_) => {
                        tracing::warn!(
                            endpoint,
                            attempt,
                            timeout_ms = timeout.as_millis() as u64,
                            "backend call timed out"
                        );
                        Err(FetchError::Timeout(timeout))
                    }
                }
            }
        })
        .await
    }
}
