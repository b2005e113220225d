//! Scripted evidence source for deterministic tests

use async_trait::async_trait;
use quarry_domain::{EvidenceSource, ServiceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Mock evidence source
///
/// Answers are matched by query substring, falling back to a default. Tracks
/// the peak number of concurrent fetches so tests can check fan-out bounds.
#[derive(Debug, Clone)]
pub struct MockEvidenceSource {
    default_answer: String,
    answers: Arc<Mutex<Vec<(String, Result<String, ServiceError>)>>>,
    queries: Arc<Mutex<Vec<String>>>,
    latency: Duration,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockEvidenceSource {
    /// Create a source answering every query with `answer`
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            default_answer: answer.into(),
            answers: Arc::new(Mutex::new(Vec::new())),
            queries: Arc::new(Mutex::new(Vec::new())),
            latency: Duration::ZERO,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulate network latency on every fetch
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Answer queries containing `marker` with `answer`
    pub fn add_answer(&self, marker: impl Into<String>, answer: impl Into<String>) {
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((marker.into(), Ok(answer.into())));
    }

    /// Fail queries containing `marker` with `error`
    pub fn add_error(&self, marker: impl Into<String>, error: ServiceError) {
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((marker.into(), Err(error)));
    }

    /// Queries received so far, in arrival order
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Highest number of fetches observed in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn answer_for(&self, query: &str) -> Result<String, ServiceError> {
        let answers = self.answers.lock().unwrap_or_else(PoisonError::into_inner);
        answers
            .iter()
            .find(|(marker, _)| query.contains(marker.as_str()))
            .map(|(_, answer)| answer.clone())
            .unwrap_or_else(|| Ok(self.default_answer.clone()))
    }
}

#[async_trait]
impl EvidenceSource for MockEvidenceSource {
    async fn fetch(&self, query: &str, cancel: &CancellationToken) -> Result<String, ServiceError> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let outcome = if self.latency.is_zero() {
            self.answer_for(query)
        } else {
            tokio::select! {
                _ = cancel.cancelled() => Err(ServiceError::Cancelled),
                _ = tokio::time::sleep(self.latency) => self.answer_for(query),
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_and_marker_answers() {
        let source = MockEvidenceSource::new("generic");
        source.add_answer("pricing", "price data");

        let token = CancellationToken::new();
        assert_eq!(source.fetch("pricing for acme", &token).await.unwrap(), "price data");
        assert_eq!(source.fetch("anything", &token).await.unwrap(), "generic");
        assert_eq!(source.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let source = MockEvidenceSource::new("generic");
        source.add_error("broken", ServiceError::Server("503".into()));

        let token = CancellationToken::new();
        assert!(source.fetch("broken query", &token).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_latency() {
        let source = MockEvidenceSource::new("slow").with_latency(Duration::from_secs(60));
        let token = CancellationToken::new();
        token.cancel();

        let result = source.fetch("q", &token).await;
        assert_eq!(result, Err(ServiceError::Cancelled));
    }
}
