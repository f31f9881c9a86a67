//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps engine errors to HTTP status codes and JSON bodies. Backend detail
//! from persistence failures is logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use parkway_core::ParkingError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "LOT_FULL", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Whether repeating the request may succeed.
    pub retryable: bool,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// An engine outcome. Status and code follow the error variant.
    #[error(transparent)]
    Parking(#[from] ParkingError),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or parameters could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No requesting user identity was supplied (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and machine-readable code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Parking(err) => (parking_status(err), err.code()),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Parking(err) if err.is_retryable())
    }
}

fn parking_status(err: &ParkingError) -> StatusCode {
    match err {
        ParkingError::NotFound { .. } => StatusCode::NOT_FOUND,
        ParkingError::Forbidden { .. } => StatusCode::FORBIDDEN,
        ParkingError::LotFull { .. }
        | ParkingError::SpotUnavailable { .. }
        | ParkingError::AlreadyClosed { .. }
        | ParkingError::InsufficientFreeSpots { .. }
        | ParkingError::InvalidSpotTransition { .. } => StatusCode::CONFLICT,
        ParkingError::InvalidInterval { .. } | ParkingError::Validation(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ParkingError::PersistenceFailure { retryable: true, .. } => StatusCode::SERVICE_UNAVAILABLE,
        ParkingError::PersistenceFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let retryable = self.retryable();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Parking(ParkingError::PersistenceFailure { .. }) if retryable => {
                "The service is busy, retry the request".to_string()
            }
            Self::Parking(ParkingError::PersistenceFailure { .. }) => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                retryable,
            },
        };

        (status, Json(body)).into_response()
    }
}
