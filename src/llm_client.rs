//! LLM Client (C3)
//!
//! Speaks HTTP to an external text-generation endpoint (URL/model from
//! configuration). Retries transient failures with exponential backoff and
//! jitter, shares a single deadline across all attempts (the naive
//! per-attempt-timeout pitfall spec §9 calls out explicitly), and cleans up
//! completions that arrive wrapped in markdown fences or chain-of-thought
//! prose before handing them to the AI Service's parser.
//!
//! The fence-stripping / balanced-JSON-extraction approach is grounded on
//! the Cerebras client's `parse_structured_content` family of helpers.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::AiError;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    response: String,
}

#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    default_model: String,
    max_attempts: u32,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>, default_model: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            default_model: default_model.into(),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Issue a completion request, retrying transient failures within the
    /// remaining `deadline`. The attempt budget is shared: an attempt that
    /// would exceed the deadline is abandoned rather than started.
    pub async fn complete(
        &self,
        prompt: &str,
        model: &str,
        system: Option<&str>,
        deadline: Instant,
    ) -> Result<String, AiError> {
        let mut last_err: Option<AiError> = None;

        for attempt in 1..=self.max_attempts {
            if Instant::now() >= deadline {
                return Err(last_err.unwrap_or(AiError::DeadlineExceeded));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let request = CompletionRequest {
                model,
                prompt,
                system,
                stream: false,
            };

            let send_fut = self
                .http
                .post(format!("{}/api/generate", self.base_url))
                .json(&request)
                .send();

            let response = match tokio::time::timeout(remaining, send_fut).await {
                Ok(Ok(resp)) => resp,
                Ok(Err(err)) => {
                    last_err = Some(AiError::UpstreamUnavailable(err.to_string()));
                    if !err.is_timeout() && !err.is_connect() {
                        break;
                    }
                    self.backoff(attempt, deadline).await;
                    continue;
                }
                Err(_) => return Err(AiError::DeadlineExceeded),
            };

            let status = response.status();
            if status.is_client_error() {
                let text = response.text().await.unwrap_or_default();
                return Err(AiError::UpstreamProtocol(format!(
                    "upstream rejected request ({status}): {}",
                    truncate(&text, 500)
                )));
            }

            if status.is_server_error() {
                last_err = Some(AiError::UpstreamUnavailable(format!("upstream status {status}")));
                self.backoff(attempt, deadline).await;
                continue;
            }

            let text = match response.text().await {
                Ok(text) => text,
                Err(err) => {
                    last_err = Some(AiError::UpstreamUnavailable(err.to_string()));
                    self.backoff(attempt, deadline).await;
                    continue;
                }
            };

            return self.extract_completion(&text);
        }

        Err(last_err.unwrap_or(AiError::UpstreamUnavailable("retries exhausted".to_string())))
    }

    async fn backoff(&self, attempt: u32, deadline: Instant) {
        if Instant::now() >= deadline {
            return;
        }
        let base_ms = 1000u64.saturating_mul(1u64 << attempt.saturating_sub(1).min(5));
        let jitter_ms: u64 = rand::thread_rng().gen_range(0..250);
        let wait = Duration::from_millis(base_ms + jitter_ms);
        let remaining = deadline.saturating_duration_since(Instant::now());
        tokio::time::sleep(wait.min(remaining)).await;
    }

    /// Extract the text completion from a response body, tolerating either
    /// the `{"response": "..."}` shape or a raw JSON value.
    fn extract_completion(&self, text: &str) -> Result<String, AiError> {
        match serde_json::from_str::<CompletionResponse>(text) {
            Ok(parsed) => Ok(parsed.response),
            Err(_) => {
                // Some providers return the completion as a bare string.
                if !text.trim().is_empty() {
                    Ok(text.to_string())
                } else {
                    Err(AiError::UpstreamProtocol("empty completion body".to_string()))
                }
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Strip surrounding prose/markdown fences and attempt to isolate a
/// balanced JSON candidate from a model completion, then parse it.
///
/// Best-effort: cleanup failures fall through to a parse attempt against the
/// raw text, and parse failure becomes `AiError::UpstreamProtocol`.
pub fn clean_and_parse_completion<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, AiError> {
    let mut candidates = Vec::new();
    push_unique(&mut candidates, raw);

    if let Some(stripped) = strip_markdown_fences(raw) {
        push_unique(&mut candidates, &stripped);
    }

    let mut idx = 0;
    while idx < candidates.len() {
        let current = candidates[idx].clone();
        for extracted in extract_json_candidates(&current, 4) {
            push_unique(&mut candidates, &extracted);
        }
        idx += 1;
    }

    let mut last_err = None;
    for candidate in &candidates {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(err) => last_err = Some(err.to_string()),
        }
    }

    Err(AiError::UpstreamProtocol(format!(
        "could not parse a JSON sentiment triple from completion: {}",
        last_err.unwrap_or_else(|| "no candidates".to_string())
    )))
}

fn push_unique(candidates: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return;
    }
    if !candidates.iter().any(|existing| existing == trimmed) {
        candidates.push(trimmed.to_string());
    }
}

fn strip_markdown_fences(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return None;
    }
    let without_open = trimmed.strip_prefix("```")?;
    let after_header = match without_open.find('\n') {
        Some(idx) => &without_open[idx + 1..],
        None => without_open,
    };
    let end_idx = after_header.rfind("```")?;
    Some(after_header[..end_idx].trim().to_string())
}

fn extract_balanced_json_from(content: &str, start: usize) -> Option<String> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
                continue;
            }
            if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(ch) {
                    return None;
                }
                if stack.is_empty() {
                    let end = start + offset + ch.len_utf8();
                    return Some(content[start..end].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

fn extract_json_candidates(content: &str, max_candidates: usize) -> Vec<String> {
    let mut out = Vec::new();
    for (idx, ch) in content.char_indices() {
        if ch == '{' || ch == '[' {
            if let Some(candidate) = extract_balanced_json_from(content, idx) {
                out.push(candidate);
                if out.len() >= max_candidates {
                    break;
                }
            }
        }
    }
    out
}
