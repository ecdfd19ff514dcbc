//! Per-request state machine: cache, fingerprint, deep analysis, merge.

use std::future::Future;
use std::sync::Arc;

use crate::backend::{content_fingerprint, AnalysisRequest, ClassificationBackend};
use crate::error::ShieldError;
use crate::recovery::{ErrorType, RecoveryAction, RecoveryContext};
use crate::retry::FetchError;
use crate::store::unix_millis;

use super::result::{ClassificationResult, ResultError, RiskStatus};
use super::ClassificationPipeline;

/// How a backend stage ended after retries and recovery.
enum StageOutcome<T> {
    Done(T),
    /// Recovery supplied a previously stored result.
    Recovered(ClassificationResult),
    Failed(ResultError),
}

impl ClassificationPipeline {
    /// Classify one item. Never fails: errors come back inside the result.
    pub async fn classify(&self, identifier: &str, content: &[u8]) -> ClassificationResult {
        let result = self.run(identifier, content).await;
        self.recovery.release(identifier);
        result
    }

    async fn run(&self, identifier: &str, content: &[u8]) -> ClassificationResult {
        if let Some(hit) = self.cache.get(identifier).await {
            tracing::debug!(identifier, "cache hit");
            return hit;
        }

        let Some(fingerprint_backend) = self.fingerprint.clone() else {
            return self.failed(
                identifier,
                ResultError::configuration(
                    "no fingerprint backend configured; set [backends.fingerprint] url in config.toml",
                ),
            );
        };

        let hash = content_fingerprint(content);
        let fetcher = &self.fetcher;
        let hash_ref = hash.as_str();
        let fingerprint = self
            .with_recovery(identifier, std::slice::from_ref(&fingerprint_backend), move |backend| async move {
                fetcher
                    .call(backend.endpoint(), || backend.check_fingerprint(hash_ref))
                    .await
            })
            .await;
        let fingerprint = match fingerprint {
            StageOutcome::Done(m) => ClassificationResult::from_fingerprint(
                identifier,
                &m,
                &self.settings.thresholds,
                unix_millis(),
            ),
            StageOutcome::Recovered(stale) => return stale,
            StageOutcome::Failed(error) => return self.failed(identifier, error),
        };

        if fingerprint.status == RiskStatus::Safe {
            tracing::debug!(identifier, score = fingerprint.risk_score, "fingerprint below safe_max");
            self.cache.put(identifier, fingerprint.clone()).await;
            return fingerprint;
        }
        if self.deep.is_empty() {
            self.cache.put(identifier, fingerprint.clone()).await;
            return fingerprint;
        }

        tracing::debug!(identifier, score = fingerprint.risk_score, "escalating to deep analysis");
        let request = AnalysisRequest { identifier, content };
        let deep = self
            .with_recovery(identifier, &self.deep, move |backend| async move {
                fetcher
                    .call(backend.endpoint(), || backend.analyze(request))
                    .await
            })
            .await;
        match deep {
            StageOutcome::Done(report) => {
                let merged = ClassificationResult::from_analysis(
                    identifier,
                    &report,
                    &self.settings.thresholds,
                    unix_millis(),
                );
                self.cache.put(identifier, merged.clone()).await;
                merged
            }
            StageOutcome::Recovered(stale) => stale,
            StageOutcome::Failed(error) => {
                // Not cached, so a later request gets another deep analysis.
                tracing::warn!(identifier, %error, "deep analysis failed; keeping fingerprint result");
                ClassificationResult {
                    error: Some(error),
                    ..fingerprint
                }
            }
        }
    }

    /// Run `attempt` against `backends[0]`, consulting the recovery registry
    /// on failure. An alternate-backend fallback moves to the next backend.
    async fn with_recovery<T, F, Fut>(
        &self,
        identifier: &str,
        backends: &[Arc<dyn ClassificationBackend>],
        mut attempt: F,
    ) -> StageOutcome<T>
    where
        F: FnMut(Arc<dyn ClassificationBackend>) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut index = 0;
        let mut recovered_from: Option<ErrorType> = None;
        let mut last_error: Option<ResultError> = None;
        while let Some(backend) = backends.get(index) {
            let error = match attempt(Arc::clone(backend)).await {
                Ok(value) => {
                    if let Some(error_type) = recovered_from {
                        self.recovery.record_success(error_type, identifier);
                    }
                    return StageOutcome::Done(value);
                }
                Err(e) => ShieldError::from(e),
            };

            let ctx = RecoveryContext::new(identifier, self.cache.as_ref());
            let outcome = self.recovery.handle_error(&error, &ctx).await;
            recovered_from = Some(outcome.error_type);
            match outcome.action {
                RecoveryAction::Retry => {}
                RecoveryAction::Restart => {
                    tracing::info!(backend = backend.name(), "restarting backend");
                    if let Err(e) = backend.restart().await {
                        tracing::warn!(backend = backend.name(), error = %e, "backend restart failed");
                    }
                }
                RecoveryAction::Fallback => match outcome.data {
                    Some(stale) => {
                        tracing::info!(identifier, "serving stale result after {}", outcome.error_type);
                        return StageOutcome::Recovered(stale);
                    }
                    None => {
                        tracing::warn!(backend = backend.name(), message = %outcome.message, "switching backend");
                        last_error = Some(ResultError::backend(outcome.error_type, outcome.message));
                        index += 1;
                    }
                },
                RecoveryAction::Fail => {
                    return StageOutcome::Failed(ResultError::backend(
                        outcome.error_type,
                        outcome.message,
                    ));
                }
            }
        }
        StageOutcome::Failed(last_error.unwrap_or_else(|| {
            ResultError::backend(ErrorType::Unknown, "no backend available")
        }))
    }

    fn failed(&self, identifier: &str, error: ResultError) -> ClassificationResult {
        let fail_open = self.settings.fail_open;
        tracing::warn!(identifier, %error, fail_open, "classification failed");
        ClassificationResult::failed(
            identifier,
            error,
            fail_open,
            &self.settings.thresholds,
            unix_millis(),
        )
    }
}
