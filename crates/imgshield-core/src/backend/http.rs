//! Generic JSON-over-HTTP backend.
//!
//! - `GET {base}/fingerprint/{sha256}` returns
//!   `{"matched": bool, "severity": 1..5, "category": "gore", "score": 0.7}`.
//!   A 404 means the fingerprint is unknown.
//! - `POST {base}/analyze` with the raw content returns
//!   `{"category_scores": {"gore": 0.9}, "final_score": 0.9, ...}`.
//!   Optional fields are derived from `final_score` when absent.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::config::BackendEndpoint;
use crate::endpoint_stats::endpoint_key;
use crate::retry::FetchError;

use super::category::Category;
use super::types::{AnalysisReport, AnalysisRequest, FingerprintMatch, SuggestedAction};
use super::ClassificationBackend;

const USER_AGENT: &str = concat!("imgshield/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct WireFingerprint {
    matched: bool,
    #[serde(default)]
    severity: Option<u8>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireAnalysis {
    #[serde(default)]
    category_scores: HashMap<String, f64>,
    final_score: f64,
    #[serde(default)]
    is_harmful: Option<bool>,
    #[serde(default)]
    suggested_severity: Option<u8>,
    #[serde(default)]
    suggested_action: Option<SuggestedAction>,
}

impl WireFingerprint {
    fn into_match(self) -> FingerprintMatch {
        if !self.matched {
            return FingerprintMatch::no_match();
        }
        let category = self.category.as_deref().and_then(|name| {
            let parsed = Category::from_name(name);
            if parsed.is_none() {
                tracing::debug!(category = name, "ignoring unknown fingerprint category");
            }
            parsed
        });
        FingerprintMatch {
            score: self.score,
            ..FingerprintMatch::matched(self.severity.unwrap_or(1), category)
        }
    }
}

impl WireAnalysis {
    fn into_report(self) -> AnalysisReport {
        let mut scores = BTreeMap::new();
        for (name, score) in self.category_scores {
            match Category::from_name(&name) {
                Some(category) => {
                    scores.insert(category, score.clamp(0.0, 1.0));
                }
                None => tracing::debug!(category = %name, "ignoring unknown analysis category"),
            }
        }
        let mut report = AnalysisReport::from_scores(scores, self.final_score);
        if let Some(harmful) = self.is_harmful {
            report.is_harmful = harmful;
        }
        if let Some(severity) = self.suggested_severity {
            report.suggested_severity = severity.clamp(1, 5);
            report.suggested_action = SuggestedAction::for_severity(report.suggested_severity);
        }
        if let Some(action) = self.suggested_action {
            report.suggested_action = action;
        }
        report
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if let Some(status) = e.status() {
        FetchError::Upstream {
            status: status.as_u16(),
        }
    } else if e.is_decode() || e.is_body() {
        FetchError::Decode(e.to_string())
    } else {
        FetchError::Transport(e.to_string())
    }
}

/// Backend reached over HTTP with an optional bearer token.
pub struct HttpBackend {
    name: String,
    endpoint: String,
    base_url: Url,
    api_key: Option<String>,
    client: Client,
}

impl HttpBackend {
    pub fn new(name: impl Into<String>, base_url: &str, api_key: Option<String>) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("invalid backend url: {base_url}"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let endpoint = endpoint_key(base_url.as_str())?;
        // No client-level timeout: the fetcher applies the adaptive one.
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("build http client")?;
        Ok(Self {
            name: name.into(),
            endpoint,
            base_url,
            api_key,
            client,
        })
    }

    pub fn from_config(cfg: &BackendEndpoint) -> Result<Self> {
        Self::new(cfg.name.clone(), &cfg.url, cfg.api_key.clone())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::Transport(format!("bad request url: {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, FetchError> {
        self.authorize(request)
            .send()
            .await
            .map_err(map_reqwest_error)
    }
}

fn check_status(response: &Response) -> Result<(), FetchError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(FetchError::Upstream {
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl ClassificationBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn check_fingerprint(&self, fingerprint: &str) -> Result<FingerprintMatch, FetchError> {
        let url = self.url(&format!("fingerprint/{fingerprint}"))?;
        let response = self.send(self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(FingerprintMatch::no_match());
        }
        check_status(&response)?;
        let wire: WireFingerprint = response.json().await.map_err(map_reqwest_error)?;
        Ok(wire.into_match())
    }

    async fn analyze(&self, request: AnalysisRequest<'_>) -> Result<AnalysisReport, FetchError> {
        let url = self.url("analyze")?;
        let builder = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .header("X-Content-Id", request.identifier)
            .body(request.content.to_vec());
        let response = self.send(builder).await?;
        check_status(&response)?;
        let wire: WireAnalysis = response.json().await.map_err(map_reqwest_error)?;
        Ok(wire.into_report())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash_and_endpoint_is_host() {
        let backend = HttpBackend::new("hash", "https://lookup.example.com:8443/v1", None).unwrap();
        assert_eq!(backend.base_url().as_str(), "https://lookup.example.com:8443/v1/");
        assert_eq!(backend.endpoint(), "lookup.example.com:8443");
        assert_eq!(
            backend.url("fingerprint/abc").unwrap().as_str(),
            "https://lookup.example.com:8443/v1/fingerprint/abc"
        );
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(HttpBackend::new("bad", "not a url", None).is_err());
    }

    #[test]
    fn wire_fingerprint_maps_known_category() {
        let wire: WireFingerprint =
            serde_json::from_str(r#"{"matched":true,"severity":4,"category":"Animal Cruelty"}"#)
                .unwrap();
        let m = wire.into_match();
        assert_eq!(m.category, Some(Category::AnimalCruelty));
        assert!((m.risk_score() - 0.8).abs() < 1e-9);

        let miss: WireFingerprint = serde_json::from_str(r#"{"matched":false}"#).unwrap();
        assert_eq!(miss.into_match(), FingerprintMatch::no_match());
    }

    #[test]
    fn wire_analysis_clamps_and_drops_unknown_categories() {
        let wire: WireAnalysis = serde_json::from_str(
            r#"{"category_scores":{"gore":1.7,"weather":0.9,"shock":0.2},"final_score":0.72}"#,
        )
        .unwrap();
        let report = wire.into_report();
        assert_eq!(report.category_scores.len(), 2);
        assert_eq!(report.category_scores[&Category::Gore], 1.0);
        assert_eq!(report.suggested_severity, 4);
        assert!(report.is_harmful);
    }

    #[test]
    fn wire_analysis_keeps_explicit_fields() {
        let wire: WireAnalysis = serde_json::from_str(
            r#"{"final_score":0.9,"is_harmful":false,"suggested_severity":2,"suggested_action":"blur"}"#,
        )
        .unwrap();
        let report = wire.into_report();
        assert!(!report.is_harmful);
        assert_eq!(report.suggested_severity, 2);
        assert_eq!(report.suggested_action, SuggestedAction::Blur);
    }
}
