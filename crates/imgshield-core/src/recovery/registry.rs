use std::collections::{BTreeMap, HashMap, VecDeque};

use parking_lot::Mutex;

use crate::error::ShieldError;
use crate::store::unix_millis;

use super::classify::classify;
use super::resources::{RecoveryContext, RecoveryResources};
use super::strategy::{RecoverySettings, RecoveryStrategy};
use super::types::{
    ErrorRecord, ErrorType, HealthReport, HealthStatus, RecoveryAction, RecoveryOutcome,
};

/// Records considered by [`ErrorRecoveryRegistry::health`].
pub const HEALTH_WINDOW: usize = 10;

/// Strategy-based error recovery with per-context attempt caps.
///
/// Each `(error type, identity)` pair has a counter. Every handled error
/// increments it; once it exceeds `max_retries` the answer is `Fail` no
/// matter which strategy is registered.
pub struct ErrorRecoveryRegistry {
    settings: RecoverySettings,
    overrides: Mutex<HashMap<ErrorType, RecoveryStrategy>>,
    counters: Mutex<HashMap<(ErrorType, String), u32>>,
    history: Mutex<VecDeque<ErrorRecord>>,
}

impl Default for ErrorRecoveryRegistry {
    fn default() -> Self {
        Self::new(RecoverySettings::default())
    }
}

impl ErrorRecoveryRegistry {
    pub fn new(settings: RecoverySettings) -> Self {
        Self {
            settings,
            overrides: Mutex::new(HashMap::new()),
            counters: Mutex::new(HashMap::new()),
            history: Mutex::new(VecDeque::with_capacity(settings.history_capacity)),
        }
    }

    pub fn settings(&self) -> &RecoverySettings {
        &self.settings
    }

    /// Replace the strategy used for `error_type`.
    pub fn register(&self, error_type: ErrorType, strategy: RecoveryStrategy) {
        self.overrides.lock().insert(error_type, strategy);
    }

    pub fn strategy_for(&self, error_type: ErrorType) -> RecoveryStrategy {
        self.overrides
            .lock()
            .get(&error_type)
            .copied()
            .unwrap_or_else(|| RecoveryStrategy::default_for(error_type, &self.settings))
    }

    /// Decide how to recover from `error` for the request in `ctx`.
    pub async fn handle_error<R>(
        &self,
        error: &ShieldError,
        ctx: &RecoveryContext<'_, R>,
    ) -> RecoveryOutcome<R::Value>
    where
        R: RecoveryResources + ?Sized,
    {
        let error_type = classify(error);
        let attempts = {
            let mut counters = self.counters.lock();
            let n = counters
                .entry((error_type, ctx.identity.to_string()))
                .or_insert(0);
            *n += 1;
            *n
        };

        let outcome = if attempts > self.settings.max_retries {
            RecoveryOutcome::new(
                RecoveryAction::Fail,
                error_type,
                format!("{error_type} recovery exhausted after {} attempts: {error}", attempts - 1),
            )
        } else {
            let strategy = self.strategy_for(error_type);
            self.apply(strategy, error_type, error, ctx).await
        };

        if outcome.action == RecoveryAction::Fallback && outcome.data.is_some() {
            self.record_success(error_type, ctx.identity);
        }

        tracing::debug!(
            identity = ctx.identity,
            error_type = %error_type,
            attempts,
            action = ?outcome.action,
            "handled error"
        );
        self.push_record(ErrorRecord {
            timestamp: unix_millis(),
            error_type,
            message: error.to_string(),
            context_key: ctx.identity.to_string(),
            action: outcome.action,
        });
        outcome
    }

    async fn apply<R>(
        &self,
        strategy: RecoveryStrategy,
        error_type: ErrorType,
        error: &ShieldError,
        ctx: &RecoveryContext<'_, R>,
    ) -> RecoveryOutcome<R::Value>
    where
        R: RecoveryResources + ?Sized,
    {
        match strategy {
            RecoveryStrategy::WaitThenRetry(wait) => {
                tokio::time::sleep(wait).await;
                RecoveryOutcome::new(
                    RecoveryAction::Retry,
                    error_type,
                    format!("{error_type}: retrying after {}ms", wait.as_millis()),
                )
            }
            RecoveryStrategy::FallbackToStale => match ctx.resources.stale_result(ctx.identity).await {
                Some(data) => RecoveryOutcome::new(
                    RecoveryAction::Fallback,
                    error_type,
                    "serving last known result",
                )
                .with_data(data),
                None => RecoveryOutcome::new(
                    RecoveryAction::Fail,
                    error_type,
                    format!("{error}; no cached result to fall back to"),
                ),
            },
            RecoveryStrategy::ReinitializeStore => match ctx.resources.reinitialize_store().await {
                Ok(()) => RecoveryOutcome::new(
                    RecoveryAction::Retry,
                    error_type,
                    "store reinitialized",
                ),
                Err(e) => {
                    tracing::warn!(error = %e, "store reinitialization failed");
                    RecoveryOutcome::new(
                        RecoveryAction::Fail,
                        error_type,
                        format!("store reinitialization failed: {e}"),
                    )
                }
            },
            RecoveryStrategy::AlternateBackend => RecoveryOutcome::new(
                RecoveryAction::Fallback,
                error_type,
                format!("{error}; check the backend API key or use an alternate backend"),
            ),
            RecoveryStrategy::RelievePressure => {
                let released = ctx.resources.relieve_pressure().await;
                RecoveryOutcome::new(
                    RecoveryAction::Retry,
                    error_type,
                    format!("released {released} cache entries"),
                )
            }
            RecoveryStrategy::Restart => RecoveryOutcome::new(
                RecoveryAction::Restart,
                error_type,
                format!("{error}; backend restart requested"),
            ),
            RecoveryStrategy::Fail => {
                RecoveryOutcome::new(RecoveryAction::Fail, error_type, error.to_string())
            }
        }
    }

    /// Reset the counter after the retried operation succeeded.
    pub fn record_success(&self, error_type: ErrorType, identity: &str) {
        self.counters
            .lock()
            .remove(&(error_type, identity.to_string()));
    }

    /// Drop every counter held for `identity` (request finished).
    pub fn release(&self, identity: &str) {
        self.counters.lock().retain(|(_, id), _| id != identity);
    }

    /// Current counter for `(error_type, identity)`.
    pub fn attempts(&self, error_type: ErrorType, identity: &str) -> u32 {
        self.counters
            .lock()
            .get(&(error_type, identity.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn push_record(&self, record: ErrorRecord) {
        let mut history = self.history.lock();
        while history.len() >= self.settings.history_capacity {
            history.pop_front();
        }
        history.push_back(record);
    }

    /// Replace the history, keeping the newest `history_capacity` records.
    pub(super) fn replace_history(&self, records: Vec<ErrorRecord>) {
        let skip = records.len().saturating_sub(self.settings.history_capacity);
        *self.history.lock() = records.into_iter().skip(skip).collect();
    }

    /// Oldest first.
    pub fn recent_records(&self) -> Vec<ErrorRecord> {
        self.history.lock().iter().cloned().collect()
    }

    /// Health from the last [`HEALTH_WINDOW`] records: more than half ending
    /// in `Fail` is degraded, more than 80% is critical.
    pub fn health(&self) -> HealthReport {
        let history = self.history.lock();
        let recent: Vec<&ErrorRecord> = history.iter().rev().take(HEALTH_WINDOW).collect();
        let failed = recent
            .iter()
            .filter(|r| r.action == RecoveryAction::Fail)
            .count();
        let rate = if recent.is_empty() {
            0.0
        } else {
            failed as f64 / recent.len() as f64
        };
        let status = if rate > 0.8 {
            HealthStatus::Critical
        } else if rate > 0.5 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        let mut by_type = BTreeMap::new();
        for record in history.iter() {
            *by_type.entry(record.error_type).or_insert(0) += 1;
        }
        HealthReport {
            status,
            recent_error_rate: rate,
            total_records: history.len(),
            by_type,
        }
    }
}
