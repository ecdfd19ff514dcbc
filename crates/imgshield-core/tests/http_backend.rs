//! Integration tests: HttpBackend against a local JSON server.

mod common;

use std::sync::Arc;

use common::json_server::{self, Route};
use imgshield_core::backend::{
    content_fingerprint, AnalysisRequest, Category, ClassificationBackend, HttpBackend,
    SuggestedAction,
};
use imgshield_core::config::ShieldConfig;
use imgshield_core::endpoint_stats::endpoint_key;
use imgshield_core::pipeline::{ClassificationPipeline, ResultSource, RiskStatus};
use imgshield_core::retry::FetchError;

#[tokio::test]
async fn fingerprint_match_is_parsed() {
    let hash = content_fingerprint(b"known bad");
    let (url, requests) = json_server::start(vec![Route::new(
        "GET",
        &format!("/fingerprint/{hash}"),
        200,
        r#"{"matched":true,"severity":4,"category":"gore"}"#,
    )]);
    let backend = HttpBackend::new("hashes", &url, None).unwrap();

    let m = backend.check_fingerprint(&hash).await.unwrap();
    assert!(m.matched);
    assert_eq!(m.category, Some(Category::Gore));
    assert!((m.risk_score() - 0.8).abs() < 1e-9);

    let log = requests.lock();
    assert_eq!(log.len(), 1);
    assert!(log[0].header("authorization").is_none());
}

#[tokio::test]
async fn unknown_fingerprint_is_no_match() {
    let (url, _) = json_server::start(Vec::new());
    let backend = HttpBackend::new("hashes", &url, None).unwrap();
    let m = backend.check_fingerprint("deadbeef").await.unwrap();
    assert!(!m.matched);
    assert_eq!(m.risk_score(), 0.0);
}

#[tokio::test]
async fn analyze_posts_content_with_bearer_token() {
    let (url, requests) = json_server::start(vec![Route::new(
        "POST",
        "/analyze",
        200,
        r#"{"category_scores":{"violence":0.7,"nsfw_explicit":0.1},"final_score":0.7,"suggested_action":"blur"}"#,
    )]);
    let backend = HttpBackend::new("vision", &url, Some("s3cret".into())).unwrap();
    let content = vec![7u8; 2048];

    let report = backend
        .analyze(AnalysisRequest {
            identifier: "img-42",
            content: &content,
        })
        .await
        .unwrap();
    assert_eq!(report.category_scores.get(&Category::Violence), Some(&0.7));
    assert_eq!(report.suggested_action, SuggestedAction::Blur);
    assert!(report.is_harmful);

    let log = requests.lock();
    assert_eq!(log[0].header("authorization"), Some("Bearer s3cret"));
    assert_eq!(log[0].header("x-content-id"), Some("img-42"));
    assert_eq!(log[0].body, content);
}

#[tokio::test]
async fn error_statuses_and_bodies_map_to_fetch_errors() {
    let (url, _) = json_server::start(vec![
        Route::new("POST", "/analyze", 503, r#"{"error":"overloaded"}"#),
        Route::new("GET", "/fingerprint/", 200, "not json"),
    ]);
    let backend = HttpBackend::new("flaky", &url, None).unwrap();

    let err = backend
        .analyze(AnalysisRequest {
            identifier: "img",
            content: b"x",
        })
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Upstream { status: 503 });

    let err = backend.check_fingerprint("abc").await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn refused_connection_is_transport_error() {
    let backend = HttpBackend::new("gone", &json_server::closed_port_url(), None).unwrap();
    let err = backend.check_fingerprint("abc").await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn pipeline_over_http_escalates_and_learns_latency() {
    let (fp_url, _) = json_server::start(vec![Route::new(
        "GET",
        "/fingerprint/",
        200,
        r#"{"matched":true,"severity":2,"category":"shock","score":0.45}"#,
    )]);
    let (deep_url, deep_requests) = json_server::start(vec![Route::new(
        "POST",
        "/analyze",
        200,
        r#"{"category_scores":{"shock":0.8},"final_score":0.8}"#,
    )]);
    let pipeline = ClassificationPipeline::new(&ShieldConfig::default(), None)
        .with_fingerprint_backend(Arc::new(HttpBackend::new("hashes", &fp_url, None).unwrap()))
        .with_deep_backend(Arc::new(HttpBackend::new("vision", &deep_url, None).unwrap()));

    let result = pipeline.classify("img", b"pixels").await;
    assert_eq!(result.status, RiskStatus::Danger);
    assert_eq!(result.source, ResultSource::DeepAnalysis);
    assert_eq!(deep_requests.lock().len(), 1);

    let fp_endpoint = endpoint_key(&fp_url).unwrap();
    assert_eq!(pipeline.stats().samples(&fp_endpoint).len(), 1);
}
