use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::category::Category;

/// Answer from a fingerprint lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintMatch {
    pub matched: bool,
    /// 1..=5 when matched.
    pub severity: u8,
    pub category: Option<Category>,
    /// Risk score reported by the service itself, if it provides one.
    #[serde(default)]
    pub score: Option<f64>,
}

impl FingerprintMatch {
    pub fn no_match() -> Self {
        Self {
            matched: false,
            severity: 0,
            category: None,
            score: None,
        }
    }

    pub fn matched(severity: u8, category: Option<Category>) -> Self {
        Self {
            matched: true,
            severity: severity.clamp(1, 5),
            category,
            score: None,
        }
    }

    /// Risk in `[0, 1]`: the reported score when present, otherwise
    /// `severity / 5` for a match and `0.0` for no match.
    pub fn risk_score(&self) -> f64 {
        if !self.matched {
            return 0.0;
        }
        match self.score {
            Some(score) => score.clamp(0.0, 1.0),
            None => f64::from(self.severity.clamp(1, 5)) / 5.0,
        }
    }
}

/// Content submitted for deep analysis.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub identifier: &'a str,
    pub content: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    Block,
    Warn,
    Blur,
    Pass,
}

impl SuggestedAction {
    /// Default action for a 1..=5 severity.
    pub fn for_severity(severity: u8) -> Self {
        match severity {
            5 => SuggestedAction::Block,
            4 => SuggestedAction::Blur,
            2 | 3 => SuggestedAction::Warn,
            _ => SuggestedAction::Pass,
        }
    }
}

/// Full analysis from a vision backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub category_scores: BTreeMap<Category, f64>,
    pub final_score: f64,
    pub is_harmful: bool,
    pub suggested_severity: u8,
    pub suggested_action: SuggestedAction,
}

impl AnalysisReport {
    /// Build a report from scores alone, deriving the remaining fields.
    pub fn from_scores(category_scores: BTreeMap<Category, f64>, final_score: f64) -> Self {
        let final_score = final_score.clamp(0.0, 1.0);
        let suggested_severity = severity_for_score(final_score);
        Self {
            category_scores,
            final_score,
            is_harmful: final_score >= 0.5,
            suggested_severity,
            suggested_action: SuggestedAction::for_severity(suggested_severity),
        }
    }
}

/// `ceil(score * 5)` in `1..=5`.
pub fn severity_for_score(score: f64) -> u8 {
    ((score.clamp(0.0, 1.0) * 5.0).ceil() as u8).clamp(1, 5)
}
