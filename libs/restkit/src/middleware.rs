//! Ready-made middleware for entity routes.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::problem::extract_trace_id;

/// Log one line per request with status and latency.
///
/// Attach with `axum::middleware::from_fn(log_requests)`.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let trace_id = extract_trace_id(req.headers()).unwrap_or_default();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    if status.is_server_error() {
        tracing::error!(%method, %path, %trace_id, status = status.as_u16(), latency_ms, "request failed");
    } else {
        tracing::info!(%method, %path, %trace_id, status = status.as_u16(), latency_ms, "request handled");
    }
    response
}
