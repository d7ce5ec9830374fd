//! AI Sentiment-Analysis Service (C4)
//!
//! Owns the two AI operations the spec defines: scoring a journal's
//! sentiment, and generating a structured journal from a prompt. Both build
//! a prompt, hand it to the `LlmClient`, and turn the completion into a
//! typed result — sentiment analysis additionally validates the parsed
//! triple against the ranges the spec fixes (`score` in [-1, 1], `confidence`
//! in [0, 1]) since the model is free to return garbage.

use serde::Deserialize;
use tokio::time::Instant;

use crate::error::AiError;
use crate::llm_client::{clean_and_parse_completion, LlmClient};
use crate::types::{GeneratedJournal, SentimentLabel, SentimentResult};

const MAX_CONTENT_CHARS: usize = 50_000;
const MAX_PROMPT_CHARS: usize = 2_000;
const MAX_CONTEXT_CHARS: usize = 5_000;

const SENTIMENT_SYSTEM_PROMPT: &str = "You are a sentiment analysis engine. Respond with a single JSON object \
and nothing else, shaped exactly like {\"score\": <float -1..1>, \"label\": \"positive|neutral|negative\", \
\"confidence\": <float 0..1>}. Do not include any explanation.";

#[derive(Debug, Deserialize)]
struct RawSentimentTriple {
    score: f64,
    #[serde(default)]
    label: Option<String>,
    confidence: f64,
}

#[derive(Clone)]
pub struct AiService {
    client: LlmClient,
}

impl AiService {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    /// Score the sentiment of `content`. Validates input length up front so
    /// an oversized journal never reaches the network.
    pub async fn analyze_sentiment(&self, content: &str, deadline: Instant) -> Result<SentimentResult, AiError> {
        if content.trim().is_empty() {
            return Err(AiError::InvalidInput("content must not be empty".to_string()));
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(AiError::InvalidInput(format!(
                "content exceeds {MAX_CONTENT_CHARS} characters"
            )));
        }

        let prompt = format!("Analyze the sentiment of this journal entry:\n\n{content}");
        let completion = self
            .client
            .complete(&prompt, self.client.default_model(), Some(SENTIMENT_SYSTEM_PROMPT), deadline)
            .await?;

        let raw: RawSentimentTriple = clean_and_parse_completion(&completion)?;
        validate_and_build_sentiment(raw)
    }

    /// Generate a journal entry from a free-form prompt, with optional
    /// supplementary context.
    pub async fn generate_structured_journal(
        &self,
        prompt: &str,
        context: Option<&str>,
        deadline: Instant,
    ) -> Result<GeneratedJournal, AiError> {
        if prompt.trim().is_empty() {
            return Err(AiError::InvalidInput("prompt must not be empty".to_string()));
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(AiError::InvalidInput(format!("prompt exceeds {MAX_PROMPT_CHARS} characters")));
        }
        if let Some(ctx) = context {
            if ctx.chars().count() > MAX_CONTEXT_CHARS {
                return Err(AiError::InvalidInput(format!("context exceeds {MAX_CONTEXT_CHARS} characters")));
            }
        }

        let full_prompt = match context {
            Some(ctx) if !ctx.trim().is_empty() => format!("{prompt}\n\nContext:\n{ctx}"),
            _ => prompt.to_string(),
        };

        let completion = self
            .client
            .complete(&full_prompt, self.client.default_model(), None, deadline)
            .await?;

        Ok(GeneratedJournal {
            content: completion.trim().to_string(),
            generated_at: chrono::Utc::now(),
        })
    }

    /// Probe the upstream LLM endpoint with a trivial completion request.
    /// Used by `GET /status/llm`; a short deadline keeps the health check
    /// itself cheap.
    pub async fn health_check(&self, deadline: Instant) -> Result<(), AiError> {
        self.client
            .complete("ping", self.client.default_model(), None, deadline)
            .await
            .map(|_| ())
    }
}

fn validate_and_build_sentiment(raw: RawSentimentTriple) -> Result<SentimentResult, AiError> {
    if !(-1.0..=1.0).contains(&raw.score) || raw.score.is_nan() {
        return Err(AiError::UpstreamProtocol(format!(
            "sentiment score out of range: {}",
            raw.score
        )));
    }
    if !(0.0..=1.0).contains(&raw.confidence) || raw.confidence.is_nan() {
        return Err(AiError::UpstreamProtocol(format!(
            "sentiment confidence out of range: {}",
            raw.confidence
        )));
    }

    let label = match raw.label.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("positive") => SentimentLabel::Positive,
        Some("neutral") => SentimentLabel::Neutral,
        Some("negative") => SentimentLabel::Negative,
        // Missing or unrecognized label: fall back to deriving it from the
        // score rather than rejecting an otherwise-valid completion.
        _ => SentimentLabel::from_score(raw.score),
    };

    Ok(SentimentResult {
        score: raw.score,
        label,
        confidence: raw.confidence,
        processed_at: chrono::Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_score_out_of_range() {
        let raw = RawSentimentTriple {
            score: 1.5,
            label: Some("positive".to_string()),
            confidence: 0.9,
        };
        let result = validate_and_build_sentiment(raw);
        assert!(matches!(result, Err(AiError::UpstreamProtocol(_))));
    }

    #[test]
    fn rejects_confidence_out_of_range() {
        let raw = RawSentimentTriple {
            score: 0.2,
            label: Some("positive".to_string()),
            confidence: 1.2,
        };
        let result = validate_and_build_sentiment(raw);
        assert!(matches!(result, Err(AiError::UpstreamProtocol(_))));
    }

    #[test]
    fn derives_label_when_missing() {
        let raw = RawSentimentTriple {
            score: 0.8,
            label: None,
            confidence: 0.9,
        };
        let result = validate_and_build_sentiment(raw).unwrap();
        assert_eq!(result.label, SentimentLabel::Positive);
    }

    #[test]
    fn accepts_well_formed_triple() {
        let raw = RawSentimentTriple {
            score: -0.4,
            label: Some("Negative".to_string()),
            confidence: 0.6,
        };
        let result = validate_and_build_sentiment(raw).unwrap();
        assert_eq!(result.label, SentimentLabel::Negative);
        assert_eq!(result.score, -0.4);
    }
}
