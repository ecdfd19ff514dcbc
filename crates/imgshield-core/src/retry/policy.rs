use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Deadline exceeded (our adaptive timeout or an upstream 408).
    Timeout,
    /// Server asked us to slow down (429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// Retryable server error (500, 502).
    Http5xx(u16),
    /// Anything else; never retried.
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff with uniform jitter and a hard cap.
///
/// Delay before retry `i` (0-based) is `min(2^i * base_delay + jitter, cap_delay)`
/// with `jitter` drawn from `[0, max_jitter)`, so concurrent callers that fail
/// together do not retry in lockstep.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub cap_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            cap_delay: Duration::from_millis(cfg.cap_delay_ms),
            max_jitter: Duration::from_millis(cfg.jitter_ms),
        }
    }

    /// Decide whether to retry after a failure.
    ///
    /// `retry_index` counts retries already performed (0 after the first
    /// failed attempt). Returns `NoRetry` once `max_retries` is used up or the
    /// error is not retryable.
    pub fn decide(&self, retry_index: u32, kind: ErrorKind) -> RetryDecision {
        if retry_index >= self.max_retries {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::Http5xx(_) => RetryDecision::RetryAfter(self.backoff_delay(retry_index)),
        }
    }

    /// Backoff before retry `retry_index`, with fresh random jitter.
    pub fn backoff_delay(&self, retry_index: u32) -> Duration {
        self.backoff_delay_with_jitter(retry_index, self.sample_jitter())
    }

    /// Backoff before retry `retry_index` for a given jitter value.
    pub fn backoff_delay_with_jitter(&self, retry_index: u32, jitter: Duration) -> Duration {
        let exp = 1u32 << retry_index.min(16);
        self.base_delay
            .saturating_mul(exp)
            .saturating_add(jitter)
            .min(self.cap_delay)
    }

    fn sample_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delay(d: RetryDecision) -> Duration {
        match d {
            RetryDecision::RetryAfter(d) => d,
            RetryDecision::NoRetry => panic!("expected retry"),
        }
    }

    #[test]
    fn no_retry_for_other() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(0, ErrorKind::Other), RetryDecision::NoRetry);
    }

    #[test]
    fn backoff_ranges_with_1s_base() {
        let p = RetryPolicy::default();
        for _ in 0..200 {
            let d0 = p.backoff_delay(0).as_millis();
            assert!((1_000..2_000).contains(&d0), "retry 0 delay {d0}");
            let d3 = p.backoff_delay(3).as_millis();
            assert!((8_000..9_000).contains(&d3), "retry 3 delay {d3}");
        }
    }

    #[test]
    fn backoff_is_capped() {
        let p = RetryPolicy::default();
        assert_eq!(
            p.backoff_delay_with_jitter(3, Duration::from_millis(999)),
            Duration::from_millis(8_999)
        );
        assert_eq!(
            p.backoff_delay_with_jitter(4, Duration::ZERO),
            Duration::from_millis(10_000)
        );
        for _ in 0..50 {
            assert!(p.backoff_delay(12) <= p.cap_delay);
        }
    }

    #[test]
    fn exponential_growth_without_jitter() {
        let mut p = RetryPolicy::default();
        p.max_jitter = Duration::ZERO;
        p.max_retries = 3;
        assert_eq!(delay(p.decide(0, ErrorKind::Timeout)), Duration::from_millis(1_000));
        assert_eq!(delay(p.decide(1, ErrorKind::Connection)), Duration::from_millis(2_000));
        assert_eq!(delay(p.decide(2, ErrorKind::Throttled)), Duration::from_millis(4_000));
    }

    #[test]
    fn respects_max_retries() {
        let p = RetryPolicy::default();
        assert!(matches!(p.decide(0, ErrorKind::Http5xx(502)), RetryDecision::RetryAfter(_)));
        assert!(matches!(p.decide(2, ErrorKind::Http5xx(502)), RetryDecision::RetryAfter(_)));
        assert_eq!(p.decide(3, ErrorKind::Http5xx(502)), RetryDecision::NoRetry);
    }
}
