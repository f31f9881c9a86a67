//! # parkway-api — HTTP Service for Parkway
//!
//! JSON over HTTP in front of [`parkway_engine::ParkingService`].
//!
//! ## API Surface
//!
//! | Prefix                 | Module                     | Domain                |
//! |------------------------|----------------------------|-----------------------|
//! | `/v1/lots/*`           | [`routes::lots`]           | Lots, capacity, booking |
//! | `/v1/reservations/*`   | [`routes::reservations`]   | Release, cancellation |
//! | `/v1/users/*`          | [`routes::users`]          | Per-user views        |
//!
//! The caller's identity arrives in the `x-user-id` header, set by the
//! authentication layer in front of this service.
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros and served at `/openapi.json`.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and `/metrics` sit outside the request metrics layer so
/// scrapes do not count themselves.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::lots::router())
        .merge(routes::reservations::router())
        .merge(routes::users::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http());

    let ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(middleware::metrics::prometheus_metrics));

    Router::new().merge(ops).merge(api).with_state(state)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — 200 once the backing store can serve requests.
async fn readiness(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
    }
    Ok("ready")
}
