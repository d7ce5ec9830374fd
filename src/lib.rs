//! Journal AI Library Module
//!
//! Re-exports the modules that make up the request-lifecycle HTTP runtime
//! and the synchronous AI sentiment-analysis pipeline, plus a small
//! `build_router` helper so integration tests (and the `main` binary) can
//! assemble the same `axum::Router` without duplicating the wiring.

pub mod ai_service;
pub mod ai_worker;
pub mod config;
pub mod error;
pub mod health_handler;
pub mod journal_handler;
pub mod llm_client;
pub mod logger;
pub mod middleware;
pub mod storage;
pub mod types;
pub mod validation;

use std::sync::Arc;
use std::time::Instant as StdInstant;

use axum::{
    middleware as axum_middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use ai_service::AiService;
use ai_worker::{AiWorker, SentimentWorker};
use config::Config;
use error::method_not_allowed;
use health_handler::HealthHandlerState;
use journal_handler::JournalHandlerState;
use llm_client::LlmClient;
use storage::Storage;

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

async fn root() -> Json<Value> {
    Json(json!({
        "service": "journal-ai",
        "version": SERVICE_VERSION,
        "endpoints": [
            "POST /journals",
            "GET /journals",
            "GET /journals/{id}",
            "POST /ai/analyze-sentiment",
            "POST /ai/generate-journal",
            "GET /ai/health",
            "GET /health",
            "GET /status",
            "GET /status/llm",
        ],
    }))
}

/// Assemble the full router from its two state slices. See `main.rs` for
/// the production wiring and the middleware ordering rationale.
pub fn build_router(journal_state: JournalHandlerState, health_state: HealthHandlerState) -> Router {
    let journal_routes = Router::new()
        .route(
            "/journals",
            post(journal_handler::create_journal)
                .get(journal_handler::list_journals)
                .fallback(method_not_allowed),
        )
        .route("/journals/:id", get(journal_handler::get_journal).fallback(method_not_allowed))
        .route(
            "/ai/analyze-sentiment",
            post(journal_handler::analyze_sentiment).fallback(method_not_allowed),
        )
        .route(
            "/ai/generate-journal",
            post(journal_handler::generate_journal).fallback(method_not_allowed),
        )
        .with_state(journal_state);

    let health_routes = Router::new()
        .route("/health", get(health_handler::health).fallback(method_not_allowed))
        .route("/status", get(health_handler::status).fallback(method_not_allowed))
        .route("/status/llm", get(health_handler::status_llm).fallback(method_not_allowed))
        .route("/ai/health", get(health_handler::ai_health).fallback(method_not_allowed))
        .with_state(health_state);

    Router::new()
        .route("/", get(root))
        .merge(journal_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(middleware::request_id_middleware))
                .layer(axum_middleware::from_fn(middleware::logging_middleware))
                .layer(CatchPanicLayer::new()),
        )
}

/// Build both state slices from configuration, wiring a real `AiWorker`
/// backed by an `LlmClient` pointed at `config.llm_server_url`.
pub fn build_state_from_config(config: &Config) -> (JournalHandlerState, HealthHandlerState) {
    let llm_client = LlmClient::new(config.llm_server_url.clone(), config.llm_model_name.clone(), config.ai_retry_attempts);
    let ai_service = AiService::new(llm_client);
    let worker: Arc<dyn SentimentWorker> = Arc::new(AiWorker::new(ai_service.clone(), config.ai_timeout_seconds));
    let storage = Storage::new();

    let journal_state = JournalHandlerState {
        storage: storage.clone(),
        worker,
        ai_service: ai_service.clone(),
    };
    let health_state = HealthHandlerState {
        storage,
        ai_service,
        started_at: Arc::new(StdInstant::now()),
    };

    (journal_state, health_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_loads_with_defaults() {
        let config = Config::from_env();
        assert!(!config.bind_address.is_empty());
        assert!(config.ai_retry_attempts > 0);
    }

    #[test]
    fn build_state_from_config_produces_empty_storage() {
        let config = Config::from_env();
        let (journal_state, health_state) = build_state_from_config(&config);
        assert_eq!(journal_state.storage.count(), 0);
        assert_eq!(health_state.storage.count(), 0);
    }
}
