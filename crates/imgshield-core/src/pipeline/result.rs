use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backend::{AnalysisReport, Category, FingerprintMatch};
use crate::config::ThresholdConfig;
use crate::recovery::ErrorType;

/// Stage that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Fingerprint,
    DeepAnalysis,
    /// No stage completed; see `ClassificationResult::error`.
    Unclassified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    Safe,
    Caution,
    Danger,
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskStatus::Safe => "safe",
            RiskStatus::Caution => "caution",
            RiskStatus::Danger => "danger",
        })
    }
}

/// Score cut-offs. `safe_max < caution_max` is enforced by config validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub safe_max: f64,
    pub caution_max: f64,
}

impl Thresholds {
    pub fn from_config(cfg: &ThresholdConfig) -> Self {
        Self {
            safe_max: cfg.safe_max,
            caution_max: cfg.caution_max,
        }
    }

    pub fn status_for(&self, risk_score: f64) -> RiskStatus {
        if risk_score < self.safe_max {
            RiskStatus::Safe
        } else if risk_score < self.caution_max {
            RiskStatus::Caution
        } else {
            RiskStatus::Danger
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from_config(&ThresholdConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Nothing to call: fix the configuration.
    Configuration,
    /// A backend failed and recovery gave up.
    Backend(ErrorType),
}

/// Structured error attached to a result when classification failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultError {
    pub kind: FailureKind,
    pub message: String,
}

impl ResultError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Configuration,
            message: message.into(),
        }
    }

    pub fn backend(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Backend(error_type),
            message: message.into(),
        }
    }
}

impl fmt::Display for ResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Configuration => write!(f, "configuration error: {}", self.message),
            FailureKind::Backend(t) => write!(f, "{t} error: {}", self.message),
        }
    }
}

/// Outcome of one classification. `status` is always
/// `thresholds.status_for(risk_score)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub identifier: String,
    pub risk_score: f64,
    pub category_scores: BTreeMap<Category, f64>,
    pub source: ResultSource,
    pub status: RiskStatus,
    /// Unix ms.
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResultError>,
}

impl ClassificationResult {
    pub fn from_fingerprint(
        identifier: &str,
        m: &FingerprintMatch,
        thresholds: &Thresholds,
        now_ms: u64,
    ) -> Self {
        let risk_score = m.risk_score();
        let mut category_scores = BTreeMap::new();
        if let (true, Some(category)) = (m.matched, m.category) {
            category_scores.insert(category, risk_score);
        }
        Self {
            identifier: identifier.to_string(),
            risk_score,
            category_scores,
            source: ResultSource::Fingerprint,
            status: thresholds.status_for(risk_score),
            timestamp: now_ms,
            error: None,
        }
    }

    pub fn from_analysis(
        identifier: &str,
        report: &AnalysisReport,
        thresholds: &Thresholds,
        now_ms: u64,
    ) -> Self {
        let risk_score = report.final_score.clamp(0.0, 1.0);
        Self {
            identifier: identifier.to_string(),
            risk_score,
            category_scores: report.category_scores.clone(),
            source: ResultSource::DeepAnalysis,
            status: thresholds.status_for(risk_score),
            timestamp: now_ms,
            error: None,
        }
    }

    /// Terminal failure. Fail-open reports score 0 (safe); fail-closed reports
    /// `safe_max` (caution).
    pub fn failed(
        identifier: &str,
        error: ResultError,
        fail_open: bool,
        thresholds: &Thresholds,
        now_ms: u64,
    ) -> Self {
        let risk_score = if fail_open { 0.0 } else { thresholds.safe_max };
        Self {
            identifier: identifier.to_string(),
            risk_score,
            category_scores: BTreeMap::new(),
            source: ResultSource::Unclassified,
            status: thresholds.status_for(risk_score),
            timestamp: now_ms,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
