//! Backend call error type for retry classification.

use std::time::Duration;

use thiserror::Error;

/// Error returned by a single backend call.
///
/// The layer that first detects the failure picks the variant: the fetcher
/// tags deadline expiry as `Timeout`, HTTP adapters map status codes to
/// `Upstream`. Nothing downstream re-derives the kind from message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection, DNS or TLS failure before a response arrived.
    #[error("transport: {0}")]
    Transport(String),
    /// The adaptive deadline fired and the in-flight call was cancelled.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    /// The backend answered with a non-success status.
    #[error("upstream returned HTTP {status}")]
    Upstream { status: u16 },
    /// The response arrived but could not be decoded. Not retried.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Upstream { status } => Some(*status),
            FetchError::Timeout(_) => Some(408),
            FetchError::Transport(_) | FetchError::Decode(_) => None,
        }
    }
}
