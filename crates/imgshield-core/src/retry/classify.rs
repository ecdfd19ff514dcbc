//! Classify backend failures into retry policy error kinds.

use super::error::FetchError;
use super::policy::ErrorKind;

/// HTTP statuses that are worth another attempt.
pub const RETRYABLE_STATUSES: [u16; 5] = [500, 502, 503, 408, 429];

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u16) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        408 => ErrorKind::Timeout,
        500 | 502 => ErrorKind::Http5xx(code),
        _ => ErrorKind::Other,
    }
}

/// Classify a fetch error into an ErrorKind.
pub fn classify(e: &FetchError) -> ErrorKind {
    match e {
        FetchError::Transport(_) => ErrorKind::Connection,
        FetchError::Timeout(_) => ErrorKind::Timeout,
        FetchError::Upstream { status } => classify_http_status(*status),
        FetchError::Decode(_) => ErrorKind::Other,
    }
}
