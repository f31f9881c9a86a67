//! # Error Types — Parking Error Taxonomy
//!
//! Every failure the engine can surface is a variant of [`ParkingError`].
//! Variants carry the identities involved so callers and logs can tell
//! exactly which lot, spot or reservation was affected.
//!
//! ## Retry Semantics
//!
//! - `LotFull` and `SpotUnavailable` are contention outcomes. Retrying the
//!   same request later is safe.
//! - `PersistenceFailure { retryable: true }` means the unit of work was
//!   rolled back before anything became visible.
//! - Everything else is a definite answer; retrying yields the same result.

use thiserror::Error;

use crate::identity::{LotId, ReservationId, SpotId, UserId};
use crate::temporal::Timestamp;

/// Result alias used throughout the workspace.
pub type ParkingResult<T> = Result<T, ParkingError>;

/// The kind of record a [`ParkingError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Lot,
    Spot,
    Reservation,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Lot => "lot",
            Self::Spot => "spot",
            Self::Reservation => "reservation",
        })
    }
}

/// Top-level error type for Parkway.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParkingError {
    /// The referenced record does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Which kind of record was looked up.
        kind: EntityKind,
        /// Raw identity that was looked up.
        id: i64,
    },

    /// The lot has no free spot.
    #[error("{lot} has no free spot")]
    LotFull {
        /// The lot that was full.
        lot: LotId,
    },

    /// The spot was not free when a reservation was opened on it.
    #[error("{spot} is not free")]
    SpotUnavailable {
        /// The contended spot.
        spot: SpotId,
    },

    /// The reservation is no longer active.
    #[error("{reservation} is already {status}")]
    AlreadyClosed {
        /// The reservation that was closed earlier.
        reservation: ReservationId,
        /// Its terminal status.
        status: String,
    },

    /// The requesting user does not own the reservation.
    #[error("{user} does not own {reservation}")]
    Forbidden {
        /// The reservation being released.
        reservation: ReservationId,
        /// The user who asked.
        user: UserId,
    },

    /// Check-out precedes check-in.
    #[error("check-out {check_out} precedes check-in {check_in}")]
    InvalidInterval {
        /// Start of the interval.
        check_in: Timestamp,
        /// End of the interval.
        check_out: Timestamp,
    },

    /// A shrink would have to remove occupied spots.
    #[error("{lot} has {free} free spots, cannot remove {requested}")]
    InsufficientFreeSpots {
        /// The lot being resized.
        lot: LotId,
        /// Number of spots the resize needed to remove.
        requested: usize,
        /// Number of free spots available for removal.
        free: usize,
    },

    /// A spot was asked to move into the state it is already in.
    #[error("invalid spot transition for {spot}: must be {from} to become {to}")]
    InvalidSpotTransition {
        /// The spot.
        spot: SpotId,
        /// The status the transition requires.
        from: String,
        /// The requested status.
        to: String,
    },

    /// Input failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The unit of work could not commit; nothing was applied.
    #[error("persistence failure (retryable: {retryable}): {message}")]
    PersistenceFailure {
        /// Whether repeating the operation may succeed.
        retryable: bool,
        /// Backend detail for operators. Not meant for end users.
        message: String,
    },
}

impl ParkingError {
    /// Shorthand for a missing lot.
    pub fn lot_not_found(lot: LotId) -> Self {
        Self::NotFound {
            kind: EntityKind::Lot,
            id: lot.get(),
        }
    }

    /// Shorthand for a missing spot.
    pub fn spot_not_found(spot: SpotId) -> Self {
        Self::NotFound {
            kind: EntityKind::Spot,
            id: spot.get(),
        }
    }

    /// Shorthand for a missing reservation.
    pub fn reservation_not_found(reservation: ReservationId) -> Self {
        Self::NotFound {
            kind: EntityKind::Reservation,
            id: reservation.get(),
        }
    }

    /// Build a persistence failure from any backend error.
    pub fn persistence(retryable: bool, err: impl std::fmt::Display) -> Self {
        Self::PersistenceFailure {
            retryable,
            message: err.to_string(),
        }
    }

    /// Whether the caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LotFull { .. } | Self::SpotUnavailable { .. } => true,
            Self::PersistenceFailure { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Stable machine-readable code, used by metrics labels and API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::LotFull { .. } => "LOT_FULL",
            Self::SpotUnavailable { .. } => "SPOT_UNAVAILABLE",
            Self::AlreadyClosed { .. } => "ALREADY_CLOSED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::InvalidInterval { .. } => "INVALID_INTERVAL",
            Self::InsufficientFreeSpots { .. } => "INSUFFICIENT_FREE_SPOTS",
            Self::InvalidSpotTransition { .. } => "INVALID_SPOT_TRANSITION",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::PersistenceFailure { .. } => "PERSISTENCE_FAILURE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ParkingError::LotFull { lot: LotId(1) }.is_retryable());
        assert!(ParkingError::SpotUnavailable { spot: SpotId(1) }.is_retryable());
        assert!(ParkingError::persistence(true, "timeout").is_retryable());
        assert!(!ParkingError::persistence(false, "constraint").is_retryable());
        assert!(!ParkingError::AlreadyClosed {
            reservation: ReservationId(1),
            status: "completed".into(),
        }
        .is_retryable());
    }

    #[test]
    fn display_names_the_records() {
        let err = ParkingError::Forbidden {
            reservation: ReservationId(4),
            user: UserId(9),
        };
        assert_eq!(err.to_string(), "user:9 does not own reservation:4");

        let err = ParkingError::lot_not_found(LotId(3));
        assert_eq!(err.to_string(), "lot 3 not found");

        let err = ParkingError::InsufficientFreeSpots {
            lot: LotId(2),
            requested: 3,
            free: 2,
        };
        assert!(err.to_string().contains("cannot remove 3"));
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            ParkingError::lot_not_found(LotId(1)),
            ParkingError::LotFull { lot: LotId(1) },
            ParkingError::SpotUnavailable { spot: SpotId(1) },
            ParkingError::Validation("x".into()),
            ParkingError::persistence(true, "x"),
        ];
        let mut codes: Vec<_> = errors.iter().map(ParkingError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
