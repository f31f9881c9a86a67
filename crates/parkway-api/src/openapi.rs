//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented route into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Parkway API",
        version = "0.1.0",
        description = "Parking lot administration, spot allocation, reservation release and billing.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Lots
        crate::routes::lots::create_lot,
        crate::routes::lots::available_lots,
        crate::routes::lots::get_lot,
        crate::routes::lots::update_lot,
        crate::routes::lots::delete_lot,
        crate::routes::lots::resize_lot,
        crate::routes::lots::lot_occupancy,
        // Bookings
        crate::routes::lots::book_spot,
        crate::routes::reservations::release_reservation,
        crate::routes::reservations::cancel_reservation,
        // Users
        crate::routes::users::active_reservations,
        crate::routes::users::reservation_history,
        crate::routes::users::user_summary,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::lots::CreateLotRequest,
        crate::routes::lots::UpdateLotRequest,
        crate::routes::lots::ResizeRequest,
        crate::routes::lots::LotResponse,
        crate::routes::lots::ResizeResponse,
        crate::routes::lots::OccupancyResponse,
        crate::routes::reservations::ReservationResponse,
        crate::routes::users::SummaryResponse,
    )),
    tags(
        (name = "lots", description = "Lot administration and capacity"),
        (name = "bookings", description = "Spot allocation and release"),
        (name = "users", description = "Per-user reservation views"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
