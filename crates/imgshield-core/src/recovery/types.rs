use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure taxonomy used to pick a recovery strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Connectivity or DNS failure.
    Network,
    /// Deadline exceeded.
    Timeout,
    /// Credentials rejected (401/403).
    Auth,
    /// Persistent store failure.
    Storage,
    /// Memory or cache pressure.
    ResourceExhaustion,
    /// The backend itself is down (5xx).
    UpstreamCrash,
    /// The backend asked us to slow down (429).
    RateLimit,
    Unknown,
}

impl ErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::Network => "network",
            ErrorType::Timeout => "timeout",
            ErrorType::Auth => "auth",
            ErrorType::Storage => "storage",
            ErrorType::ResourceExhaustion => "resource_exhaustion",
            ErrorType::UpstreamCrash => "upstream_crash",
            ErrorType::RateLimit => "rate_limit",
            ErrorType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Run the failed operation again.
    Retry,
    /// Use `data` if present; otherwise switch to an alternate backend.
    Fallback,
    /// Give up; the failure is terminal for this request.
    Fail,
    /// Restart the backend, then run the operation again.
    Restart,
}

/// Result of [`super::ErrorRecoveryRegistry::handle_error`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryOutcome<V> {
    pub action: RecoveryAction,
    pub error_type: ErrorType,
    pub data: Option<V>,
    pub message: String,
}

impl<V> RecoveryOutcome<V> {
    pub(super) fn new(action: RecoveryAction, error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            action,
            error_type,
            data: None,
            message: message.into(),
        }
    }

    pub(super) fn with_data(mut self, data: V) -> Self {
        self.data = Some(data);
        self
    }
}

/// One handled error, kept in the diagnostic ring buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Unix ms.
    pub timestamp: u64,
    pub error_type: ErrorType,
    pub message: String,
    pub context_key: String,
    pub action: RecoveryAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Critical => "critical",
        })
    }
}

/// Snapshot of recent recovery activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    /// Fraction of the most recent records that ended in `Fail`.
    pub recent_error_rate: f64,
    /// Records currently held in the ring buffer.
    pub total_records: usize,
    pub by_type: BTreeMap<ErrorType, usize>,
}
