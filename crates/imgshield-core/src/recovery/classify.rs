//! Map structured errors onto the recovery taxonomy.

use crate::error::ShieldError;
use crate::retry::FetchError;

use super::types::ErrorType;

/// Classify `error`. Checks run in a fixed order and the first match wins:
/// network, timeout, auth, storage, resource exhaustion, crash, rate limit.
pub fn classify(error: &ShieldError) -> ErrorType {
    if matches!(error, ShieldError::Fetch(FetchError::Transport(_))) {
        return ErrorType::Network;
    }
    if matches!(error, ShieldError::Fetch(FetchError::Timeout(_))) || error.status() == Some(408) {
        return ErrorType::Timeout;
    }
    if matches!(error.status(), Some(401 | 403)) {
        return ErrorType::Auth;
    }
    if matches!(error, ShieldError::Store(_)) {
        return ErrorType::Storage;
    }
    if matches!(error, ShieldError::ResourceExhausted(_)) || error.status() == Some(507) {
        return ErrorType::ResourceExhaustion;
    }
    if matches!(error.status(), Some(500 | 502 | 503 | 504)) {
        return ErrorType::UpstreamCrash;
    }
    if error.status() == Some(429) {
        return ErrorType::RateLimit;
    }
    ErrorType::Unknown
}
