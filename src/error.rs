//! Error Handling
//!
//! Typed errors at the two seams that need them: the HTTP edge (`AppError`,
//! which knows how to render itself as the common error envelope) and the
//! AI subsystem (`AiError`, which the AI Worker absorbs and the
//! `/ai/*` handlers surface as 500s). Everything else uses `anyhow` the way
//! the teacher's `convex_service.rs` and `search_service.rs` do for internal
//! plumbing that never reaches a client directly.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::types::FieldError;

/// Errors surfaced directly to HTTP clients.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    ValidationFailed(Vec<FieldError>),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("malformed request body")]
    DecodeFailed,
    #[error("missing or invalid content-type")]
    UnsupportedMediaType,
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationFailed(_) | AppError::DecodeFailed | AppError::UnsupportedMediaType => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::ValidationFailed(_) => "validation failed".to_string(),
            AppError::NotFound(id) => format!("journal not found: {id}"),
            AppError::MethodNotAllowed => "method not allowed".to_string(),
            AppError::DecodeFailed => "invalid JSON body".to_string(),
            AppError::UnsupportedMediaType => "Content-Type: application/json is required".to_string(),
            AppError::Internal(_) => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "error": self.message(),
            "status": status.as_u16(),
            "timestamp": Utc::now().to_rfc3339(),
        });

        match &self {
            AppError::ValidationFailed(errors) => {
                body["validation_errors"] = json!(errors);
            }
            AppError::DecodeFailed => {
                body["validation_errors"] = json!([FieldError::new(
                    "body",
                    "request body is not valid JSON",
                    "INVALID_JSON",
                )]);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

/// Errors surfaced by the AI subsystem (LLM Client / AI Service).
///
/// These never escape `POST /journals` — the AI Worker always converts
/// them into a `ProcessingResult { status: failed, .. }` instead. They do
/// escape the standalone `/ai/analyze-sentiment` and `/ai/generate-journal`
/// endpoints, where they map to `AppError::Internal`.
#[derive(Debug, Error, Clone)]
pub enum AiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("upstream protocol error: {0}")]
    UpstreamProtocol(String),
    #[error("cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl AiError {
    /// A short machine-stable classification used as `processing_result.error`
    /// and in log lines, without leaking raw upstream text.
    pub fn classify(&self) -> String {
        match self {
            AiError::InvalidInput(msg) => format!("invalid_input: {msg}"),
            AiError::UpstreamUnavailable(_) => "upstream_unavailable".to_string(),
            AiError::UpstreamProtocol(_) => "upstream_protocol".to_string(),
            AiError::Cancelled => "cancelled".to_string(),
            AiError::DeadlineExceeded => "deadline_exceeded".to_string(),
        }
    }
}

/// A `Json<T>`-alike extractor that enforces the spec's content-type rule
/// itself (missing/wrong `Content-Type` -> 400, not axum's default 415) and
/// routes decode failures through the common error envelope.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false);

        if !is_json {
            return Err(AppError::UnsupportedMediaType);
        }

        let bytes = Bytes::from_request(req, state).await.map_err(|_| AppError::DecodeFailed)?;
        serde_json::from_slice(&bytes).map(ValidatedJson).map_err(|_| AppError::DecodeFailed)
    }
}

/// Fallback handler bound to every route's `MethodRouter` for methods it
/// doesn't explicitly register, so a wrong-verb request renders the common
/// error envelope instead of axum's default empty-bodied 405.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

impl From<AiError> for AppError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::InvalidInput(msg) => AppError::ValidationFailed(vec![FieldError::new(
                "content",
                msg,
                "INVALID_INPUT",
            )]),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn decode_failed_renders_invalid_json_validation_error() {
        let response = AppError::DecodeFailed.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let errors = body["validation_errors"].as_array().unwrap();
        assert!(errors.iter().any(|e| e["field"] == "body" && e["code"] == "INVALID_JSON"));
    }

    #[tokio::test]
    async fn validation_failed_does_not_gain_invalid_json_code() {
        let response = AppError::ValidationFailed(vec![FieldError::new("content", "required", "REQUIRED")])
            .into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let errors = body["validation_errors"].as_array().unwrap();
        assert!(errors.iter().all(|e| e["code"] != "INVALID_JSON"));
    }
}
