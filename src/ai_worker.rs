//! AI Worker (C5)
//!
//! Sits between the Journal Handler and the AI Service. Owns the worker
//! deadline (at most 15 seconds, regardless of what the caller asks for),
//! isolates panics inside the AI Service call so one bad completion can
//! never take down the request task, and always produces a
//! `ProcessingResult` — success or failure — rather than propagating an
//! error past itself.
//!
//! The `SentimentWorker` trait is the seam spec §9 asks for: tests substitute
//! a deterministic stub instead of driving the real HTTP path.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::time::Instant;

use crate::ai_service::AiService;
use crate::types::{ProcessingResult, ProcessingStatus, SentimentResult};

/// Hard ceiling on how long a single sentiment analysis attempt may run,
/// independent of whatever a caller-supplied deadline or configured budget
/// would otherwise allow. `Config::ai_timeout_seconds` can only shorten
/// this, never extend it (spec §4.5).
const MAX_WORKER_BUDGET: Duration = Duration::from_secs(15);

#[async_trait]
pub trait SentimentWorker: Send + Sync {
    async fn process(&self, content: &str, parent_deadline: Option<Instant>) -> ProcessingResult;
    async fn health_check(&self) -> bool;
}

#[derive(Clone)]
pub struct AiWorker {
    service: AiService,
    budget: Duration,
}

impl AiWorker {
    /// `configured_timeout_secs` is `Config::ai_timeout_seconds` (the
    /// `AI_TIMEOUT_SECONDS` env var); it's capped at `MAX_WORKER_BUDGET`
    /// since operators can only tune the deadline shorter, never longer.
    pub fn new(service: AiService, configured_timeout_secs: u64) -> Self {
        let budget = Duration::from_secs(configured_timeout_secs).min(MAX_WORKER_BUDGET);
        Self { service, budget }
    }

    /// The effective deadline for one worker invocation: whichever is
    /// sooner, the caller's deadline or `now + self.budget`.
    fn effective_deadline(&self, parent_deadline: Option<Instant>) -> Instant {
        let cap = Instant::now() + self.budget;
        match parent_deadline {
            Some(parent) if parent < cap => parent,
            _ => cap,
        }
    }
}

#[async_trait]
impl SentimentWorker for AiWorker {
    async fn process(&self, content: &str, parent_deadline: Option<Instant>) -> ProcessingResult {
        let started = Instant::now();
        let deadline = self.effective_deadline(parent_deadline);

        let outcome = AssertUnwindSafe(self.service.analyze_sentiment(content, deadline))
            .catch_unwind()
            .await;

        let processing_time_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(sentiment_result)) => completed(sentiment_result, processing_time_ms),
            Ok(Err(ai_err)) => failed(ai_err.classify(), processing_time_ms),
            Err(_panic) => failed("worker_panic".to_string(), processing_time_ms),
        }
    }

    async fn health_check(&self) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        let outcome = AssertUnwindSafe(self.service.health_check(deadline)).catch_unwind().await;
        matches!(outcome, Ok(Ok(())))
    }
}

fn completed(sentiment_result: SentimentResult, processing_time_ms: u64) -> ProcessingResult {
    ProcessingResult {
        status: ProcessingStatus::Completed,
        sentiment_result: Some(sentiment_result),
        processed_at: chrono::Utc::now(),
        processing_time_ms,
        error: None,
    }
}

fn failed(error: String, processing_time_ms: u64) -> ProcessingResult {
    ProcessingResult {
        status: ProcessingStatus::Failed,
        sentiment_result: None,
        processed_at: chrono::Utc::now(),
        processing_time_ms,
        error: Some(error),
    }
}

/// Deterministic stand-in for `AiWorker` used by handler tests (spec §9):
/// returns a fixed `ProcessingResult` without ever touching the network.
/// Not `#[cfg(test)]`-gated so integration tests under `tests/`, which link
/// against a normal (non-`cfg(test)`) build of this crate, can use it too.
pub struct StubWorker {
    pub result: ProcessingResult,
    pub healthy: bool,
}

#[async_trait]
impl SentimentWorker for StubWorker {
    async fn process(&self, _content: &str, _parent_deadline: Option<Instant>) -> ProcessingResult {
        self.result.clone()
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SentimentLabel;

    fn sample_result() -> ProcessingResult {
        ProcessingResult {
            status: ProcessingStatus::Completed,
            sentiment_result: Some(SentimentResult {
                score: 0.5,
                label: SentimentLabel::Positive,
                confidence: 0.8,
                processed_at: chrono::Utc::now(),
            }),
            processed_at: chrono::Utc::now(),
            processing_time_ms: 42,
            error: None,
        }
    }

    #[tokio::test]
    async fn stub_worker_returns_fixed_result() {
        let stub = StubWorker {
            result: sample_result(),
            healthy: true,
        };
        let result = stub.process("anything", None).await;
        assert_eq!(result.status, ProcessingStatus::Completed);
        assert!(stub.health_check().await);
    }

    fn worker_with_timeout(configured_timeout_secs: u64) -> AiWorker {
        let client = crate::llm_client::LlmClient::new("http://localhost:0", "test-model", 1);
        AiWorker::new(AiService::new(client), configured_timeout_secs)
    }

    #[test]
    fn effective_deadline_caps_at_max_budget() {
        let worker = worker_with_timeout(15);
        let far_future = Instant::now() + Duration::from_secs(3600);
        let deadline = worker.effective_deadline(Some(far_future));
        assert!(deadline <= Instant::now() + MAX_WORKER_BUDGET);
    }

    #[test]
    fn effective_deadline_respects_shorter_parent() {
        let worker = worker_with_timeout(15);
        let soon = Instant::now() + Duration::from_secs(2);
        let deadline = worker.effective_deadline(Some(soon));
        assert!(deadline <= soon + Duration::from_millis(50));
    }

    #[test]
    fn configured_timeout_shortens_the_budget() {
        let worker = worker_with_timeout(3);
        let deadline = worker.effective_deadline(None);
        assert!(deadline <= Instant::now() + Duration::from_secs(3) + Duration::from_millis(50));
    }

    #[test]
    fn configured_timeout_cannot_exceed_max_worker_budget() {
        let worker = worker_with_timeout(3600);
        let deadline = worker.effective_deadline(None);
        assert!(deadline <= Instant::now() + MAX_WORKER_BUDGET + Duration::from_millis(50));
    }
}
