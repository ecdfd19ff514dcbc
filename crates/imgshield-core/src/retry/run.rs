//! Retry loop: run an async operation until success or the policy says stop.

use std::future::Future;

use super::classify;
use super::error::FetchError;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs `f` until it succeeds or the retry policy says to stop.
///
/// `f` receives the 0-based attempt index. On a retryable failure the loop
/// sleeps for the backoff delay and tries again; when attempts run out the
/// last error is returned.
pub async fn run_with_retry<T, F, Fut>(policy: &RetryPolicy, mut f: F) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;
    loop {
        match f(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(
                            attempt,
                            delay_ms = d.as_millis() as u64,
                            error = %e,
                            "retrying after backoff"
                        );
                        tokio::time::sleep(d).await;
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn retryable_statuses_use_all_retries() {
        let policy = RetryPolicy::default();
        for status in [500u16, 502, 503, 408, 429] {
            let calls = AtomicU32::new(0);
            let res: Result<(), _> = run_with_retry(&policy, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(FetchError::Upstream { status }) }
            })
            .await;
            assert_eq!(res.unwrap_err(), FetchError::Upstream { status });
            assert_eq!(calls.load(Ordering::SeqCst), 4, "status {status}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn client_errors_are_never_retried() {
        let policy = RetryPolicy::default();
        for status in [400u16, 401, 403, 404] {
            let calls = AtomicU32::new(0);
            let res: Result<(), _> = run_with_retry(&policy, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(FetchError::Upstream { status }) }
            })
            .await;
            assert!(res.is_err());
            assert_eq!(calls.load(Ordering::SeqCst), 1, "status {status}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::default();
        let res = run_with_retry(&policy, |attempt| async move {
            if attempt < 2 {
                Err(FetchError::Transport("connection reset".into()))
            } else {
                Ok(attempt)
            }
        })
        .await;
        assert_eq!(res.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn surfaces_last_error_after_exhaustion() {
        let policy = RetryPolicy::default();
        let res: Result<(), _> = run_with_retry(&policy, |attempt| async move {
            if attempt < 3 {
                Err(FetchError::Transport("refused".into()))
            } else {
                Err(FetchError::Timeout(Duration::from_millis(3_000)))
            }
        })
        .await;
        assert_eq!(res.unwrap_err(), FetchError::Timeout(Duration::from_millis(3_000)));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_at_least_the_backoff_between_attempts() {
        let policy = RetryPolicy::default();
        let start = tokio::time::Instant::now();
        let _: Result<(), _> = run_with_retry(&policy, |_| async {
            Err(FetchError::Upstream { status: 503 })
        })
        .await;
        // 1s + 2s + 4s minimum, each with < 1s jitter.
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(7_000), "waited {waited:?}");
        assert!(waited < Duration::from_millis(10_000), "waited {waited:?}");
    }
}
