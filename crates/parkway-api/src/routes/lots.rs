//! # Lots API
//!
//! Lot administration, capacity changes, occupancy and booking.
//!
//! ## Endpoints
//!
//! - `POST /v1/lots` — create lot with its spots
//! - `GET /v1/lots?pincode_prefix=` — lots with a free spot
//! - `GET /v1/lots/{id}` — get lot
//! - `PATCH /v1/lots/{id}` — update details or price
//! - `DELETE /v1/lots/{id}` — delete lot, its spots and reservations
//! - `PUT /v1/lots/{id}/capacity` — resize
//! - `GET /v1/lots/{id}/occupancy` — free/occupied split
//! - `POST /v1/lots/{id}/bookings` — book a spot for the caller

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use parkway_core::LotId;
use parkway_engine::{LotOccupancy, ResizeResult};
use parkway_state::{LotDetailsPatch, NewLot, ParkingLot};

use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, RequestingUser, Validate};
use crate::routes::reservations::ReservationResponse;
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to create a lot.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLotRequest {
    /// Area or landmark name.
    pub location: String,
    /// Street address.
    pub address: String,
    /// Postal code, matched by prefix in searches.
    pub pincode: String,
    /// Price per hour. Must be positive.
    pub hourly_rate: f64,
    /// Number of spots to create.
    pub max_spots: u32,
    /// Per-session cap in minutes. The server default applies when absent.
    #[serde(default)]
    pub max_time_minutes: Option<u32>,
}

impl Validate for CreateLotRequest {
    fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("location", &self.location),
            ("address", &self.address),
            ("pincode", &self.pincode),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} must not be empty"));
            }
        }
        if !self.hourly_rate.is_finite() || self.hourly_rate <= 0.0 {
            return Err("hourly_rate must be a positive number".to_string());
        }
        Ok(())
    }
}

/// Partial update of a lot.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateLotRequest {
    pub location: Option<String>,
    pub address: Option<String>,
    pub pincode: Option<String>,
    pub hourly_rate: Option<f64>,
    pub max_time_minutes: Option<u32>,
    /// Remove the session cap. Ignored when `max_time_minutes` is given.
    #[serde(default)]
    pub clear_max_time: bool,
}

impl Validate for UpdateLotRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(rate) = self.hourly_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err("hourly_rate must be a positive number".to_string());
            }
        }
        Ok(())
    }
}

impl From<UpdateLotRequest> for LotDetailsPatch {
    fn from(req: UpdateLotRequest) -> Self {
        let max_time_minutes = match (req.max_time_minutes, req.clear_max_time) {
            (Some(cap), _) => Some(Some(cap)),
            (None, true) => Some(None),
            (None, false) => None,
        };
        Self {
            location: req.location,
            address: req.address,
            pincode: req.pincode,
            hourly_rate: req.hourly_rate,
            max_time_minutes,
        }
    }
}

/// Request to change a lot's capacity.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResizeRequest {
    pub max_spots: u32,
}

/// Query for the available-lots search.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailableLotsQuery {
    /// Pincode prefix. Empty or absent matches every lot.
    pub pincode_prefix: Option<String>,
}

/// A lot as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LotResponse {
    pub id: i64,
    pub location: String,
    pub address: String,
    pub pincode: String,
    pub hourly_rate: f64,
    pub max_spots: u32,
    pub max_time_minutes: Option<u32>,
    /// RFC 3339, civil zone.
    pub created_at: String,
}

impl From<ParkingLot> for LotResponse {
    fn from(lot: ParkingLot) -> Self {
        Self {
            id: lot.id.get(),
            location: lot.location,
            address: lot.address,
            pincode: lot.pincode,
            hourly_rate: lot.hourly_rate.per_hour(),
            max_spots: lot.max_spots,
            max_time_minutes: lot.max_time_minutes,
            created_at: lot.created_at.to_rfc3339(),
        }
    }
}

/// Outcome of a capacity change.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResizeResponse {
    pub lot_id: i64,
    pub previous_max_spots: u32,
    pub new_max_spots: u32,
    pub added: usize,
    pub removed: usize,
}

impl From<ResizeResult> for ResizeResponse {
    fn from(r: ResizeResult) -> Self {
        Self {
            lot_id: r.lot_id.get(),
            previous_max_spots: r.previous_max_spots,
            new_max_spots: r.new_max_spots,
            added: r.added,
            removed: r.removed,
        }
    }
}

/// Free/occupied split of a lot.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OccupancyResponse {
    pub lot_id: i64,
    pub max_spots: u32,
    pub available: usize,
    pub occupied: usize,
    /// Occupied spots as a percentage of `max_spots`, two decimals.
    pub percentage: f64,
}

impl From<LotOccupancy> for OccupancyResponse {
    fn from(o: LotOccupancy) -> Self {
        Self {
            lot_id: o.lot_id.get(),
            max_spots: o.max_spots,
            available: o.available,
            occupied: o.occupied,
            percentage: parkway_engine::pricing::round_for_display(o.percentage),
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the lots router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/lots", get(available_lots).post(create_lot))
        .route(
            "/v1/lots/{id}",
            get(get_lot).patch(update_lot).delete(delete_lot),
        )
        .route("/v1/lots/{id}/capacity", put(resize_lot))
        .route("/v1/lots/{id}/occupancy", get(lot_occupancy))
        .route("/v1/lots/{id}/bookings", post(book_spot))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/lots — Create a lot and its spots.
#[utoipa::path(
    post,
    path = "/v1/lots",
    request_body = CreateLotRequest,
    responses(
        (status = 201, description = "Lot created", body = LotResponse),
        (status = 400, description = "Malformed body", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "lots"
)]
pub(crate) async fn create_lot(
    State(state): State<AppState>,
    body: Result<Json<CreateLotRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LotResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let lot = state
        .service
        .create_lot(NewLot {
            location: req.location,
            address: req.address,
            pincode: req.pincode,
            hourly_rate: req.hourly_rate,
            max_spots: req.max_spots,
            max_time_minutes: req
                .max_time_minutes
                .or(Some(state.config.default_time_cap_minutes)),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(lot.into())))
}

/// GET /v1/lots — Lots with at least one free spot.
#[utoipa::path(
    get,
    path = "/v1/lots",
    params(AvailableLotsQuery),
    responses(
        (status = 200, description = "Matching lots, ascending by id", body = Vec<LotResponse>),
    ),
    tag = "lots"
)]
pub(crate) async fn available_lots(
    State(state): State<AppState>,
    Query(query): Query<AvailableLotsQuery>,
) -> Result<Json<Vec<LotResponse>>, AppError> {
    let prefix = query.pincode_prefix.unwrap_or_default();
    let lots = state.service.available_lots(&prefix).await?;
    Ok(Json(lots.into_iter().map(LotResponse::from).collect()))
}

/// GET /v1/lots/{id} — Get a lot.
#[utoipa::path(
    get,
    path = "/v1/lots/{id}",
    params(("id" = i64, Path, description = "Lot id")),
    responses(
        (status = 200, description = "Lot found", body = LotResponse),
        (status = 404, description = "Lot not found", body = crate::error::ErrorBody),
    ),
    tag = "lots"
)]
pub(crate) async fn get_lot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LotResponse>, AppError> {
    let lot = state.service.get_lot(LotId(id)).await?;
    Ok(Json(lot.into()))
}

/// PATCH /v1/lots/{id} — Update descriptive fields, price or session cap.
#[utoipa::path(
    patch,
    path = "/v1/lots/{id}",
    params(("id" = i64, Path, description = "Lot id")),
    request_body = UpdateLotRequest,
    responses(
        (status = 200, description = "Lot updated", body = LotResponse),
        (status = 404, description = "Lot not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "lots"
)]
pub(crate) async fn update_lot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<UpdateLotRequest>, JsonRejection>,
) -> Result<Json<LotResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let lot = state
        .service
        .update_lot_details(LotId(id), req.into())
        .await?;
    Ok(Json(lot.into()))
}

/// DELETE /v1/lots/{id} — Delete a lot with its spots and reservations.
#[utoipa::path(
    delete,
    path = "/v1/lots/{id}",
    params(("id" = i64, Path, description = "Lot id")),
    responses(
        (status = 204, description = "Lot deleted"),
        (status = 404, description = "Lot not found", body = crate::error::ErrorBody),
    ),
    tag = "lots"
)]
pub(crate) async fn delete_lot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.service.delete_lot(LotId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/lots/{id}/capacity — Change the number of spots.
#[utoipa::path(
    put,
    path = "/v1/lots/{id}/capacity",
    params(("id" = i64, Path, description = "Lot id")),
    request_body = ResizeRequest,
    responses(
        (status = 200, description = "Lot resized", body = ResizeResponse),
        (status = 404, description = "Lot not found", body = crate::error::ErrorBody),
        (status = 409, description = "Too few free spots to shrink", body = crate::error::ErrorBody),
    ),
    tag = "lots"
)]
pub(crate) async fn resize_lot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<ResizeRequest>, JsonRejection>,
) -> Result<Json<ResizeResponse>, AppError> {
    let req = extract_json(body)?;
    let result = state.service.resize_lot(LotId(id), req.max_spots).await?;
    Ok(Json(result.into()))
}

/// GET /v1/lots/{id}/occupancy — Free/occupied split.
#[utoipa::path(
    get,
    path = "/v1/lots/{id}/occupancy",
    params(("id" = i64, Path, description = "Lot id")),
    responses(
        (status = 200, description = "Occupancy snapshot", body = OccupancyResponse),
        (status = 404, description = "Lot not found", body = crate::error::ErrorBody),
    ),
    tag = "lots"
)]
pub(crate) async fn lot_occupancy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OccupancyResponse>, AppError> {
    let occupancy = state.service.lot_occupancy(LotId(id)).await?;
    Ok(Json(occupancy.into()))
}

/// POST /v1/lots/{id}/bookings — Book the lowest free spot for the caller.
#[utoipa::path(
    post,
    path = "/v1/lots/{id}/bookings",
    params(
        ("id" = i64, Path, description = "Lot id"),
        ("x-user-id" = i64, Header, description = "Requesting user"),
    ),
    responses(
        (status = 201, description = "Spot booked", body = ReservationResponse),
        (status = 404, description = "Lot not found", body = crate::error::ErrorBody),
        (status = 409, description = "Lot full", body = crate::error::ErrorBody),
    ),
    tag = "bookings"
)]
pub(crate) async fn book_spot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    RequestingUser(user): RequestingUser,
) -> Result<(StatusCode, Json<ReservationResponse>), AppError> {
    let reservation = state.service.book(LotId(id), user).await?;
    Ok((StatusCode::CREATED, Json(reservation.into())))
}
