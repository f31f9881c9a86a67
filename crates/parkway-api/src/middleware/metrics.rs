//! # Prometheus Metrics
//!
//! Request counters are recorded through the `metrics` facade, as are the
//! engine's booking and billing metrics. The binary installs a Prometheus
//! recorder once per process and hands its handle to [`AppState`], which
//! `/metrics` renders. Without an installed recorder every metric call is a
//! no-op and `/metrics` answers 404.

use axum::extract::{MatchedPath, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Install the process-wide Prometheus recorder.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Middleware that counts requests by route and status class.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = request.method().to_string();

    let response = next.run(request).await;

    let status = response.status();
    metrics::counter!(
        "parkway_http_requests_total",
        "method" => method,
        "route" => route,
        "status" => status.as_u16().to_string(),
    )
    .increment(1);
    if status.is_server_error() {
        metrics::counter!("parkway_http_server_errors_total").increment(1);
    }

    response
}

/// GET /metrics — Prometheus text exposition.
pub async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [("content-type", "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
