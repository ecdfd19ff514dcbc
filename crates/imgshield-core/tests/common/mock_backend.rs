//! Scripted in-process backend for pipeline tests.
//!
//! Each stage answers from a queue of scripted results, then from a fixed
//! fallback answer. Calls, restarts and peak concurrency are counted.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use imgshield_core::backend::{
    AnalysisReport, AnalysisRequest, Category, ClassificationBackend, FingerprintMatch,
};
use imgshield_core::retry::FetchError;
use parking_lot::Mutex;
use tokio::sync::Barrier;

struct Script<T> {
    queued: VecDeque<Result<T, FetchError>>,
    otherwise: Result<T, FetchError>,
}

impl<T: Clone> Script<T> {
    fn new(otherwise: Result<T, FetchError>) -> Self {
        Self {
            queued: VecDeque::new(),
            otherwise,
        }
    }

    fn next(&mut self) -> Result<T, FetchError> {
        self.queued
            .pop_front()
            .unwrap_or_else(|| self.otherwise.clone())
    }
}

pub fn fingerprint_with_score(score: f64) -> FingerprintMatch {
    if score <= 0.0 {
        return FingerprintMatch::no_match();
    }
    FingerprintMatch {
        score: Some(score),
        ..FingerprintMatch::matched(3, Some(Category::Gore))
    }
}

pub fn report_with_score(score: f64) -> AnalysisReport {
    let mut scores = BTreeMap::new();
    scores.insert(Category::Violence, score);
    AnalysisReport::from_scores(scores, score)
}

pub struct MockBackend {
    name: String,
    fingerprint: Mutex<Script<FingerprintMatch>>,
    analysis: Mutex<Script<AnalysisReport>>,
    barrier: Option<Arc<Barrier>>,
    fingerprint_calls: AtomicUsize,
    analyze_calls: AtomicUsize,
    restarts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fingerprint: Mutex::new(Script::new(Ok(FingerprintMatch::no_match()))),
            analysis: Mutex::new(Script::new(Ok(report_with_score(0.0)))),
            barrier: None,
            fingerprint_calls: AtomicUsize::new(0),
            analyze_calls: AtomicUsize::new(0),
            restarts: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn fingerprint_score(self, score: f64) -> Self {
        self.fingerprint.lock().otherwise = Ok(fingerprint_with_score(score));
        self
    }

    pub fn fingerprint_error(self, error: FetchError) -> Self {
        self.fingerprint.lock().otherwise = Err(error);
        self
    }

    pub fn queue_fingerprint(self, answer: Result<FingerprintMatch, FetchError>) -> Self {
        self.fingerprint.lock().queued.push_back(answer);
        self
    }

    pub fn analysis_score(self, score: f64) -> Self {
        self.analysis.lock().otherwise = Ok(report_with_score(score));
        self
    }

    pub fn analysis_error(self, error: FetchError) -> Self {
        self.analysis.lock().otherwise = Err(error);
        self
    }

    pub fn queue_analysis(self, answer: Result<AnalysisReport, FetchError>) -> Self {
        self.analysis.lock().queued.push_back(answer);
        self
    }

    /// Every fingerprint call waits on `barrier` before answering.
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn fingerprint_calls(&self) -> usize {
        self.fingerprint_calls.load(Ordering::SeqCst)
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        tokio::task::yield_now().await;
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClassificationBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn endpoint(&self) -> &str {
        &self.name
    }

    async fn check_fingerprint(&self, _fingerprint: &str) -> Result<FingerprintMatch, FetchError> {
        self.fingerprint_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let answer = self.fingerprint.lock().next();
        self.leave();
        answer
    }

    async fn analyze(&self, _request: AnalysisRequest<'_>) -> Result<AnalysisReport, FetchError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let answer = self.analysis.lock().next();
        self.leave();
        answer
    }

    async fn restart(&self) -> Result<(), FetchError> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
