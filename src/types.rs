//! Shared Type Definitions
//!
//! Core data types that flow across module boundaries: the `Journal` entity
//! and its embedded AI processing result, plus the request/response shapes
//! the HTTP surface serializes directly.
//!
//! All types are designed to be serializable for API communication and
//! round-trip through `serde_json` without loss on their declared fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentiment label assigned to a journal entry by the AI Service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Derive a label from a score when the model's own label is missing or
    /// ambiguous. Thresholds per spec: >= 0.15 positive, <= -0.15 negative.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.15 {
            SentimentLabel::Positive
        } else if score <= -0.15 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

/// The `(score, label, confidence)` triple produced by the LLM and validated
/// by the AI Service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResult {
    /// Real number in [-1.0, 1.0].
    pub score: f64,
    pub label: SentimentLabel,
    /// Real number in [0.0, 1.0].
    pub confidence: f64,
    pub processed_at: DateTime<Utc>,
}

/// Terminal/in-flight state of AI processing attached to a journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Completed,
    Failed,
}

/// Outcome of running the AI Worker against a journal, embedded on the
/// journal record itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub status: ProcessingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_result: Option<SentimentResult>,
    pub processed_at: DateTime<Utc>,
    /// Wall-clock duration of the worker call, in milliseconds.
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A single user-authored journal entry, with optional metadata and an
/// optional AI-derived sentiment result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    pub id: String,
    pub content: String,
    /// Wall-clock instant the entry was authored. Set once alongside
    /// `created_at` on first store and never moves afterward — distinct
    /// from `created_at`/`updated_at`, which describe the storage record's
    /// own lifecycle rather than the entry's authored moment.
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_result: Option<ProcessingResult>,
}

/// Request body for `POST /journals`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJournalRequest {
    pub content: String,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Request body for `POST /ai/generate-journal`.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
    #[serde(default)]
    pub context: Option<String>,
}

/// Loosely structured result of `AiService::generate_structured_journal`.
///
/// The spec treats this endpoint's output schema as out-of-core beyond a
/// single generated text blob (see Open Questions in DESIGN.md); no further
/// structure is imposed here.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedJournal {
    pub content: String,
    pub generated_at: DateTime<Utc>,
}

/// One field-level validation failure, per the `{field, message, code}` shape.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub code: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

/// Response envelope for `GET /journals`.
#[derive(Debug, Clone, Serialize)]
pub struct JournalListResponse {
    pub journals: Vec<Journal>,
    pub count: usize,
    pub retrieved_at: DateTime<Utc>,
}
