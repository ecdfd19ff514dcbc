//! Library-wide error type handed to the recovery registry.

use thiserror::Error;

use crate::retry::FetchError;
use crate::store::StoreError;

/// Any failure a pipeline stage can surface after transport retries.
#[derive(Debug, Error)]
pub enum ShieldError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("storage: {0}")]
    Store(#[from] StoreError),
    /// Memory or cache pressure reported by a backend or the host.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
    /// Missing or invalid configuration. Never retried.
    #[error("configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

impl ShieldError {
    /// HTTP-equivalent status, when the failure carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ShieldError::Fetch(e) => e.status(),
            _ => None,
        }
    }
}
