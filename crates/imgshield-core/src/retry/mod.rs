//! Retry and backoff for backend calls.
//!
//! Error classification (timeouts, throttling, connection failures, 5xx) and
//! the exponential backoff decision are kept apart from the async loop so the
//! policy can be tested without timers. [`RetryableFetcher`] combines the loop
//! with per-endpoint adaptive timeouts from [`crate::endpoint_stats`].

mod classify;
mod error;
mod fetcher;
mod policy;
mod run;

pub use classify::{classify, classify_http_status, RETRYABLE_STATUSES};
pub use error::FetchError;
pub use fetcher::RetryableFetcher;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
