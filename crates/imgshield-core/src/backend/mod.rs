//! Classification backends.
//!
//! The pipeline talks to every provider through [`ClassificationBackend`]: a
//! fingerprint lookup that only ever sees a content hash, and a deep analysis
//! that receives the content itself. [`HttpBackend`] is a generic
//! JSON-over-HTTP implementation; tests plug in scripted backends.

mod category;
mod fingerprint;
mod http;
mod types;

use async_trait::async_trait;

use crate::retry::FetchError;

pub use category::Category;
pub use fingerprint::content_fingerprint;
pub use http::HttpBackend;
pub use types::{
    severity_for_score, AnalysisReport, AnalysisRequest, FingerprintMatch, SuggestedAction,
};

/// A remote classification provider.
#[async_trait]
pub trait ClassificationBackend: Send + Sync {
    /// Display name used in logs and results.
    fn name(&self) -> &str;

    /// Endpoint identity used for latency statistics (see
    /// [`crate::endpoint_stats::endpoint_key`]).
    fn endpoint(&self) -> &str;

    /// Look up a content fingerprint (SHA-256 hex) in the known-bad corpus.
    async fn check_fingerprint(&self, fingerprint: &str) -> Result<FingerprintMatch, FetchError>;

    /// Run full analysis on the content.
    async fn analyze(&self, request: AnalysisRequest<'_>) -> Result<AnalysisReport, FetchError>;

    /// Bring the provider back after it crashed. No-op by default.
    async fn restart(&self) -> Result<(), FetchError> {
        Ok(())
    }
}
