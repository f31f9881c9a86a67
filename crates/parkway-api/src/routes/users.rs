//! # Users API
//!
//! Read-only views of one user's reservations. These never take a lot's
//! exclusion scope.
//!
//! ## Endpoints
//!
//! - `GET /v1/users/{id}/reservations/active`
//! - `GET /v1/users/{id}/reservations/history` — newest check-in first
//! - `GET /v1/users/{id}/summary` — bookings, spend, billed hours

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use parkway_core::UserId;
use parkway_engine::pricing::round_for_display;
use parkway_engine::UserSummary;

use crate::error::AppError;
use crate::routes::reservations::ReservationResponse;
use crate::state::AppState;

/// A user's lifetime totals.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SummaryResponse {
    pub user_id: i64,
    pub total_bookings: usize,
    /// Sum over completed reservations, two decimals.
    pub total_spent: f64,
    /// Billable hours over completed reservations, two decimals.
    pub total_hours: f64,
}

impl From<UserSummary> for SummaryResponse {
    fn from(s: UserSummary) -> Self {
        Self {
            user_id: s.user_id.get(),
            total_bookings: s.total_bookings,
            total_spent: round_for_display(s.total_spent),
            total_hours: round_for_display(s.total_hours),
        }
    }
}

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/users/{id}/reservations/active", get(active_reservations))
        .route("/v1/users/{id}/reservations/history", get(reservation_history))
        .route("/v1/users/{id}/summary", get(user_summary))
}

/// GET /v1/users/{id}/reservations/active — Reservations still holding a spot.
#[utoipa::path(
    get,
    path = "/v1/users/{id}/reservations/active",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Active reservations", body = Vec<ReservationResponse>),
    ),
    tag = "users"
)]
pub(crate) async fn active_reservations(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ReservationResponse>>, AppError> {
    let reservations = state.service.user_active_reservations(UserId(id)).await?;
    Ok(Json(reservations.into_iter().map(Into::into).collect()))
}

/// GET /v1/users/{id}/reservations/history — Every reservation of a user.
#[utoipa::path(
    get,
    path = "/v1/users/{id}/reservations/history",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Reservations, newest check-in first", body = Vec<ReservationResponse>),
    ),
    tag = "users"
)]
pub(crate) async fn reservation_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ReservationResponse>>, AppError> {
    let reservations = state.service.user_history(UserId(id)).await?;
    Ok(Json(reservations.into_iter().map(Into::into).collect()))
}

/// GET /v1/users/{id}/summary — Lifetime totals.
#[utoipa::path(
    get,
    path = "/v1/users/{id}/summary",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User summary", body = SummaryResponse),
    ),
    tag = "users"
)]
pub(crate) async fn user_summary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SummaryResponse>, AppError> {
    let summary = state.service.user_summary(UserId(id)).await?;
    Ok(Json(summary.into()))
}
