//! Configuration Management
//!
//! Loads all application configuration from environment variables, with
//! sensible defaults for everything. Mirrors the teacher's `env_or`/
//! `bool_env` helper pattern so a missing variable never panics at startup.

use serde::{Deserialize, Serialize};
use std::env;

/// Get environment variable value or fallback to default.
pub fn env_or(key: &str, fallback: &str) -> String {
    env::var(key).unwrap_or_else(|_| fallback.to_string())
}

/// Parse a numeric environment variable, falling back to a default on
/// missing or unparsable values.
pub fn env_parse<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(fallback)
}

/// Main application configuration, loaded once at startup and shared
/// (cheaply, via `Clone`) across every service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server bind address (host:port).
    pub bind_address: String,
    /// Base URL of the external LLM endpoint.
    pub llm_server_url: String,
    /// Model name requested from the LLM endpoint.
    pub llm_model_name: String,
    /// `debug|info|warn|error`.
    pub log_level: String,
    /// `text|json`.
    pub log_format: String,
    /// Worker budget in seconds (hard-capped at 15s regardless of this value,
    /// per spec §4.5 — this only lets operators set a *shorter* ceiling).
    pub ai_timeout_seconds: u64,
    /// Maximum LLM Client attempts per sentiment call.
    pub ai_retry_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables, applying `.env` first
    /// if present (development convenience, as the teacher does).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let port: u16 = env_parse("PORT", 8080);

        Self {
            bind_address: format!("0.0.0.0:{port}"),
            llm_server_url: env_or("LLM_SERVER_URL", "http://localhost:11434"),
            llm_model_name: env_or("LLM_MODEL_NAME", "llama3"),
            log_level: env_or("LOG_LEVEL", "info"),
            log_format: env_or("LOG_FORMAT", "json"),
            ai_timeout_seconds: env_parse("AI_TIMEOUT_SECONDS", 15),
            ai_retry_attempts: env_parse("AI_RETRY_ATTEMPTS", 3),
        }
    }
}
