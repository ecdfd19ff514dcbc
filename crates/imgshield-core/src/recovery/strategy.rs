use std::time::Duration;

use crate::config::RecoveryConfig;

use super::types::ErrorType;

/// Registry tunables.
#[derive(Debug, Clone, Copy)]
pub struct RecoverySettings {
    /// Strategy runs allowed per (error type, identity) before `Fail`.
    pub max_retries: u32,
    pub network_wait: Duration,
    pub rate_limit_wait: Duration,
    pub history_capacity: usize,
}

impl RecoverySettings {
    pub fn from_config(cfg: &RecoveryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            network_wait: Duration::from_millis(cfg.network_wait_ms),
            rate_limit_wait: Duration::from_millis(cfg.rate_limit_wait_ms),
            history_capacity: cfg.history_capacity.max(1),
        }
    }
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self::from_config(&RecoveryConfig::default())
    }
}

/// How the registry reacts to one error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Sleep, then `Retry`.
    WaitThenRetry(Duration),
    /// Serve the stale cached result as `Fallback`, or `Fail` if there is none.
    FallbackToStale,
    /// Reinitialize the persistent store, then `Retry`.
    ReinitializeStore,
    /// `Fallback` without data: the caller should try an alternate backend.
    AlternateBackend,
    /// Sweep the cache, then `Retry`.
    RelievePressure,
    /// Ask the caller to restart the backend.
    Restart,
    Fail,
}

impl RecoveryStrategy {
    pub fn default_for(error_type: ErrorType, settings: &RecoverySettings) -> Self {
        match error_type {
            ErrorType::Network => RecoveryStrategy::WaitThenRetry(settings.network_wait),
            ErrorType::Timeout => RecoveryStrategy::FallbackToStale,
            ErrorType::Auth => RecoveryStrategy::AlternateBackend,
            ErrorType::Storage => RecoveryStrategy::ReinitializeStore,
            ErrorType::ResourceExhaustion => RecoveryStrategy::RelievePressure,
            ErrorType::UpstreamCrash => RecoveryStrategy::Restart,
            ErrorType::RateLimit => RecoveryStrategy::WaitThenRetry(settings.rate_limit_wait),
            ErrorType::Unknown => RecoveryStrategy::Fail,
        }
    }
}
