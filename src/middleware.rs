//! Request Middleware (C6)
//!
//! A small stack of `axum::middleware::from_fn` layers, applied in this
//! order (outermost first): request-ID assignment, then request/response
//! logging with the spec's latency classification (plus the query string
//! and safe, non-sensitive headers, at debug level only), with
//! `tower_http::CatchPanicLayer` wrapped around the whole router in
//! `main.rs` so a panic anywhere downstream still gets a request ID and a
//! log line before it becomes a 500.
//!
//! Grounded on the Soroban Registry `request_tracing.rs` middleware, split
//! into a request-ID layer and a logging layer so each does one thing.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use uuid::Uuid;

use crate::logger;

/// Paths excluded from the per-request log line; they're polled far more
/// often than real traffic and would drown it out.
const SKIP_LOG_PATHS: &[&str] = &["/health", "/status"];

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// A newtype wrapper stored in request extensions so handlers can read the
/// current request ID without re-parsing headers.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn from_request(req: &Request<Body>) -> Option<&str> {
        req.extensions().get::<RequestId>().map(|r| r.0.as_str())
    }
}

/// Assign a UUID request ID, store it in request extensions, and echo it
/// back as the `X-Request-ID` response header.
pub async fn request_id_middleware(mut req: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }
    response
}

/// Log the request/response pair and classify latency per spec §4.6.
/// Runs inside the span opened by `request_id_middleware` so every log
/// line this emits carries `request_id` automatically.
pub async fn logging_middleware(
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let request_id = RequestId::from_request(&req).map(|s| s.to_string()).unwrap_or_default();
    let span = logger::request_span(&request_id);
    let _entered = span.enter();

    let method = req.method().to_string();
    let path = req.uri().path().to_owned();
    let query = req.uri().query().map(|q| q.to_string());
    let remote_addr = connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()).unwrap_or_else(|| "-".to_string());
    let user_agent = req
        .headers()
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let content_length = req
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());

    let skip = SKIP_LOG_PATHS.iter().any(|p| path.starts_with(p));
    if !skip {
        logger::log_http_request(&method, &path, &remote_addr, user_agent.as_deref(), content_length);

        let safe_names = logger::filter_safe_headers(req.headers().keys().map(|name| name.as_str()));
        let safe_headers: Vec<(String, String)> = req
            .headers()
            .iter()
            .filter(|(name, _)| safe_names.contains(name.as_str()))
            .map(|(name, value)| (name.as_str().to_string(), value.to_str().unwrap_or("").to_string()))
            .collect();
        logger::log_request_detail(query.as_deref(), &safe_headers);
    }

    let start = Instant::now();
    let response = next.run(req).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    if !skip {
        logger::log_http_response(response.status().as_u16(), duration_ms);
        logger::log_performance(duration_ms, &path);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body as AxumBody;
    use axum::http::Request as HttpRequest;

    #[test]
    fn request_id_absent_without_extension() {
        let req = HttpRequest::builder().body(AxumBody::empty()).unwrap();
        assert!(RequestId::from_request(&req).is_none());
    }
}
