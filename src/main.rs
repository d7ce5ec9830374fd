//! Journal AI Main Application Entry Point
//!
//! This module wires up the HTTP server: a request-lifecycle runtime around
//! a small set of journal CRUD routes, each optionally running a journal's
//! content through a synchronous AI sentiment-analysis pipeline before it's
//! stored. It provides:
//! - RESTful endpoints for journal CRUD, standalone AI calls, and health/status
//! - Structured request-ID/logging/panic-recovery middleware
//! - Graceful shutdown handling
//!
//! The server is built using Axum for high-performance async HTTP handling.

mod ai_service;
mod ai_worker;
mod config;
mod error;
mod health_handler;
mod journal_handler;
mod llm_client;
mod logger;
mod middleware;
mod storage;
mod types;
mod validation;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant as StdInstant;

use anyhow::Result;
use axum::{
    middleware as axum_middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use ai_service::AiService;
use ai_worker::{AiWorker, SentimentWorker};
use config::Config;
use error::method_not_allowed;
use health_handler::HealthHandlerState;
use journal_handler::JournalHandlerState;
use llm_client::LlmClient;
use storage::Storage;

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Root document: a small directory of what this service exposes.
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

/// Assemble the router: journal routes, AI routes, health/status routes,
/// each bound to the slice of state they need, wrapped in the middleware
/// chain spec §4.6 specifies (Request-ID -> Logging -> Performance ->
/// Recovery -> route). `CatchPanicLayer` implements the Recovery stage;
/// because tower layers wrap from the outside in as declared, it's listed
/// last so it's the innermost layer around the handler, catching panics
/// after the request already has its ID and has been logged as received.
fn create_router(journal_state: JournalHandlerState, health_state: HealthHandlerState) -> Router {
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
            // Outermost first: CORS and tower-http's own trace spans wrap
            // everything, then the spec's own chain in order -
            // Request-ID -> Logging/Performance -> Recovery, with Recovery
            // innermost so it wraps the route handler directly.
            ServiceBuilder::new()
                .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(middleware::request_id_middleware))
                .layer(axum_middleware::from_fn(middleware::logging_middleware))
                .layer(CatchPanicLayer::new()),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    logger::init(&config);

    info!("Starting journal-ai server...");
    info!(bind_address = %config.bind_address, "configuration loaded");

    let llm_client = LlmClient::new(
        config.llm_server_url.clone(),
        config.llm_model_name.clone(),
        config.ai_retry_attempts,
    );
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

    let app = create_router(journal_state, health_state)
        .into_make_service_with_connect_info::<SocketAddr>();

    let addr: SocketAddr = config.bind_address.parse().expect("invalid bind address format");
    info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

/// Listens for SIGINT/SIGTERM and lets `axum::serve`'s graceful-shutdown
/// machinery stop accepting new connections and drain in-flight ones.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("received SIGTERM, shutting down...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_worker::StubWorker;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use types::{ProcessingResult, ProcessingStatus};

    fn test_router() -> Router {
        let llm_client = LlmClient::new("http://localhost:0", "test-model", 1);
        let ai_service = AiService::new(llm_client);
        let storage = Storage::new();
        let worker: Arc<dyn SentimentWorker> = Arc::new(StubWorker {
            result: ProcessingResult {
                status: ProcessingStatus::Completed,
                sentiment_result: None,
                processed_at: chrono::Utc::now(),
                processing_time_ms: 1,
                error: None,
            },
            healthy: true,
        });

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

        create_router(journal_state, health_state)
    }

    #[tokio::test]
    async fn health_endpoint_returns_200() {
        let response = test_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_journal_returns_404() {
        let response = test_router()
            .oneshot(Request::builder().uri("/journals/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_journal_requires_content_type() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/journals")
                    .body(Body::from("{\"content\": \"hello\"}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_journal_succeeds_with_json_content_type() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/journals")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"content\": \"Today was productive.\"}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
