//! # Reservations API
//!
//! ## Endpoints
//!
//! - `POST /v1/reservations/{id}/release` — release and bill (owner only)
//! - `POST /v1/reservations/{id}/cancel` — administrative void, no charge

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use parkway_core::ReservationId;
use parkway_engine::pricing::round_for_display;
use parkway_state::Reservation;

use crate::error::AppError;
use crate::extractors::RequestingUser;
use crate::state::AppState;

/// A reservation as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReservationResponse {
    pub id: i64,
    pub spot_id: i64,
    pub user_id: i64,
    /// `active`, `completed` or `cancelled`.
    pub status: String,
    /// RFC 3339, civil zone.
    pub check_in: String,
    pub check_out: Option<String>,
    /// Billed amount, unrounded.
    pub total_cost: Option<f64>,
    /// Billed amount rounded to two decimals.
    pub display_cost: Option<f64>,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id.get(),
            spot_id: r.spot_id.get(),
            user_id: r.user_id.get(),
            status: r.status.code().to_string(),
            check_in: r.check_in.to_rfc3339(),
            check_out: r.check_out.map(|t| t.to_rfc3339()),
            total_cost: r.total_cost,
            display_cost: r.total_cost.map(round_for_display),
        }
    }
}

/// Build the reservations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations/{id}/release", post(release_reservation))
        .route("/v1/reservations/{id}/cancel", post(cancel_reservation))
}

/// POST /v1/reservations/{id}/release — Release the caller's reservation.
#[utoipa::path(
    post,
    path = "/v1/reservations/{id}/release",
    params(
        ("id" = i64, Path, description = "Reservation id"),
        ("x-user-id" = i64, Header, description = "Requesting user"),
    ),
    responses(
        (status = 200, description = "Reservation completed and billed", body = ReservationResponse),
        (status = 403, description = "Caller does not own the reservation", body = crate::error::ErrorBody),
        (status = 404, description = "Reservation not found", body = crate::error::ErrorBody),
        (status = 409, description = "Reservation already closed", body = crate::error::ErrorBody),
    ),
    tag = "bookings"
)]
pub(crate) async fn release_reservation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    RequestingUser(user): RequestingUser,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation = state.service.release(ReservationId(id), user).await?;
    Ok(Json(reservation.into()))
}

/// POST /v1/reservations/{id}/cancel — Void a reservation without billing.
#[utoipa::path(
    post,
    path = "/v1/reservations/{id}/cancel",
    params(("id" = i64, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "Reservation cancelled", body = ReservationResponse),
        (status = 404, description = "Reservation not found", body = crate::error::ErrorBody),
        (status = 409, description = "Reservation already closed", body = crate::error::ErrorBody),
    ),
    tag = "bookings"
)]
pub(crate) async fn cancel_reservation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation = state.service.cancel(ReservationId(id)).await?;
    Ok(Json(reservation.into()))
}
