//! Journal Handler (C7) and the standalone AI endpoints
//!
//! `POST/GET /journals` and `GET /journals/{id}` are the core CRUD surface:
//! decode, validate, run the Worker synchronously, store, respond. The two
//! `/ai/*` endpoints reuse the same `AiService` but don't touch the Worker's
//! deadline/panic-isolation machinery, since they're standalone calls rather
//! than something attached to a stored journal (spec §6, §7: AI errors here
//! surface directly as 500s instead of being absorbed into a
//! `processing_result`).

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::ai_service::AiService;
use crate::ai_worker::SentimentWorker;
use crate::error::{AppError, ValidatedJson};
use crate::logger;
use crate::storage::Storage;
use crate::types::{CreateJournalRequest, Journal, JournalListResponse, PromptRequest, SentimentResult};
use crate::validation::{validate_create_journal, validate_prompt_request};

#[derive(Clone)]
pub struct JournalHandlerState {
    pub storage: Storage,
    pub worker: Arc<dyn SentimentWorker>,
    pub ai_service: AiService,
}

pub async fn create_journal(
    State(state): State<JournalHandlerState>,
    ValidatedJson(req): ValidatedJson<CreateJournalRequest>,
) -> Result<(StatusCode, Json<Journal>), AppError> {
    let errors = validate_create_journal(&req);
    if !errors.is_empty() {
        logger::log_validation_failure("/journals", errors.len());
        return Err(AppError::ValidationFailed(errors));
    }

    let now = chrono::Utc::now();
    let journal_id = Uuid::new_v4().to_string();

    logger::log_ai_start(&journal_id);
    let started = Instant::now();
    let processing_result = state.worker.process(&req.content, None).await;
    logger::log_ai_complete(
        &journal_id,
        &format!("{:?}", processing_result.status),
        started.elapsed().as_millis() as u64,
    );

    let journal = Journal {
        id: journal_id.clone(),
        content: req.content,
        timestamp: now,
        created_at: now,
        updated_at: now,
        metadata: req.metadata,
        processing_result: Some(processing_result),
    };

    let stored = state.storage.store(journal);
    logger::log_storage_op("store", &journal_id, "ok");

    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn list_journals(State(state): State<JournalHandlerState>) -> Json<JournalListResponse> {
    let journals = state.storage.get_all();
    Json(JournalListResponse {
        count: journals.len(),
        journals,
        retrieved_at: chrono::Utc::now(),
    })
}

pub async fn get_journal(
    State(state): State<JournalHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<Journal>, AppError> {
    state.storage.get(&id).map(Json)
}

/// Either end of a union: analyze an existing journal by ID, or score
/// standalone content without persisting anything.
#[derive(Debug, Deserialize)]
pub struct AnalyzeSentimentRequest {
    #[serde(default)]
    pub journal_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SentimentResponse {
    #[serde(flatten)]
    pub result: SentimentResult,
}

pub async fn analyze_sentiment(
    State(state): State<JournalHandlerState>,
    ValidatedJson(req): ValidatedJson<AnalyzeSentimentRequest>,
) -> Result<Json<SentimentResponse>, AppError> {
    let content = match (&req.journal_id, &req.content) {
        (Some(id), _) => state.storage.get(id)?.content,
        (None, Some(content)) => content.clone(),
        (None, None) => {
            return Err(AppError::ValidationFailed(vec![crate::types::FieldError::new(
                "content",
                "either journal_id or content is required",
                "REQUIRED",
            )]))
        }
    };

    let deadline = Instant::now() + Duration::from_secs(15);
    let result = state
        .ai_service
        .analyze_sentiment(&content, deadline)
        .await
        .map_err(AppError::from)?;

    Ok(Json(SentimentResponse { result }))
}

pub async fn generate_journal(
    State(state): State<JournalHandlerState>,
    ValidatedJson(req): ValidatedJson<PromptRequest>,
) -> Result<Json<crate::types::GeneratedJournal>, AppError> {
    let errors = validate_prompt_request(&req);
    if !errors.is_empty() {
        logger::log_validation_failure("/ai/generate-journal", errors.len());
        return Err(AppError::ValidationFailed(errors));
    }

    let deadline = Instant::now() + Duration::from_secs(15);
    let generated = state
        .ai_service
        .generate_structured_journal(&req.prompt, req.context.as_deref(), deadline)
        .await
        .map_err(AppError::from)?;

    Ok(Json(generated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_worker::StubWorker;
    use crate::llm_client::LlmClient;
    use crate::types::{ProcessingResult, ProcessingStatus};

    fn test_state(worker_result: ProcessingResult) -> JournalHandlerState {
        let client = LlmClient::new("http://localhost:0", "test-model", 1);
        JournalHandlerState {
            storage: Storage::new(),
            worker: Arc::new(StubWorker {
                result: worker_result,
                healthy: true,
            }),
            ai_service: AiService::new(client),
        }
    }

    fn pending_completed_result() -> ProcessingResult {
        ProcessingResult {
            status: ProcessingStatus::Completed,
            sentiment_result: None,
            processed_at: chrono::Utc::now(),
            processing_time_ms: 5,
            error: None,
        }
    }

    #[tokio::test]
    async fn create_journal_rejects_empty_content() {
        let state = test_state(pending_completed_result());
        let result = create_journal(
            State(state),
            ValidatedJson(CreateJournalRequest {
                content: String::new(),
                metadata: None,
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn create_journal_stores_and_returns_processing_result() {
        let state = test_state(pending_completed_result());
        let storage = state.storage.clone();
        let (status, Json(journal)) = create_journal(
            State(state),
            ValidatedJson(CreateJournalRequest {
                content: "Today was productive.".to_string(),
                metadata: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert!(journal.processing_result.is_some());
        assert_eq!(journal.created_at, journal.updated_at);
        assert_eq!(storage.count(), 1);
    }

    #[tokio::test]
    async fn get_journal_missing_returns_not_found() {
        let state = test_state(pending_completed_result());
        let result = get_journal(State(state), Path("missing".to_string())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn analyze_sentiment_requires_journal_id_or_content() {
        let state = test_state(pending_completed_result());
        let result = analyze_sentiment(
            State(state),
            ValidatedJson(AnalyzeSentimentRequest {
                journal_id: None,
                content: None,
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn analyze_sentiment_404s_on_unknown_journal_id() {
        let state = test_state(pending_completed_result());
        let result = analyze_sentiment(
            State(state),
            ValidatedJson(AnalyzeSentimentRequest {
                journal_id: Some("missing".to_string()),
                content: None,
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
