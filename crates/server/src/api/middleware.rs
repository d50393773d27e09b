//! Request middleware - the server reports its own performance.

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jarvis_core::{metric_names, MetricSample};
use std::time::Instant;

/// Module name under which request metrics are recorded.
pub const HTTP_MODULE: &str = "http";

/// Record latency and success of every request.
pub async fn record_request_metrics(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let response = next.run(request).await;

    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
    let success = if response.status().is_server_error() { 0.0 } else { 1.0 };
    state.engine.metrics().record_all([
        MetricSample::new(HTTP_MODULE, metric_names::LATENCY_MS, latency_ms),
        MetricSample::new(HTTP_MODULE, metric_names::SUCCESS_RATE, success),
    ]);

    response
}
