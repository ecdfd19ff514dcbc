//! Error recovery registry.
//!
//! Errors that survive transport retries are classified into an
//! [`ErrorType`] and handled by the strategy registered for that type
//! (wait and retry, stale-result fallback, store reinitialization, alternate
//! backend, cache sweep, backend restart). Attempts are capped per
//! `(error type, request identity)`, and every handled error lands in a
//! bounded ring buffer from which [`ErrorRecoveryRegistry::health`] is derived.

mod classify;
mod persist;
mod registry;
mod resources;
mod strategy;
mod types;

pub use classify::classify;
pub use persist::RECOVERY_STORE_KEY;
pub use registry::{ErrorRecoveryRegistry, HEALTH_WINDOW};
pub use resources::{RecoveryContext, RecoveryResources};
pub use strategy::{RecoverySettings, RecoveryStrategy};
pub use types::{
    ErrorRecord, ErrorType, HealthReport, HealthStatus, RecoveryAction, RecoveryOutcome,
};
