//! # parkway-state — Records and Lifecycle State Machines
//!
//! Defines the three persistent records of Parkway and the transitions each
//! may go through. States are closed enums; the string codes used by storage
//! layers exist only at the edges (`code()` / `from_code()`).
//!
//! ## State Machines
//!
//! - **Spot** (`spot.rs`): `Free ⇄ Occupied`. Moving a spot into the state it
//!   is already in is an error, never a silent no-op.
//!
//! - **Reservation** (`reservation.rs`):
//!   `Active → Completed` (release, cost fixed) or `Active → Cancelled`
//!   (administrative void, no cost). Both targets are terminal; a closed
//!   reservation is immutable.
//!
//! - **Lot** (`lot.rs`): not a state machine, but owns the validated
//!   descriptive fields, the hourly rate and the configured capacity.

pub mod lot;
pub mod reservation;
pub mod spot;

use thiserror::Error;

use parkway_core::{ParkingError, ReservationId, SpotId, Timestamp};

pub use lot::{LotDetailsPatch, NewLot, ParkingLot};
pub use reservation::{Reservation, ReservationStatus};
pub use spot::{Spot, SpotStatus};

/// A rejected lifecycle transition.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    /// Tried to occupy a spot that is already occupied.
    #[error("{spot} is already occupied")]
    SpotOccupied { spot: SpotId },

    /// Tried to free a spot that is already free.
    #[error("{spot} is already free")]
    SpotAlreadyFree { spot: SpotId },

    /// Tried to close or cancel a reservation in a terminal state.
    #[error("{reservation} is in terminal state {status}")]
    ReservationClosed {
        reservation: ReservationId,
        status: ReservationStatus,
    },

    /// Tried to complete a reservation with a check-out before its check-in.
    #[error("check-out {check_out} precedes check-in {check_in}")]
    CheckOutBeforeCheckIn {
        check_in: Timestamp,
        check_out: Timestamp,
    },
}

impl From<TransitionError> for ParkingError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::SpotOccupied { spot } => ParkingError::SpotUnavailable { spot },
            TransitionError::SpotAlreadyFree { spot } => ParkingError::InvalidSpotTransition {
                spot,
                from: SpotStatus::Occupied.to_string(),
                to: SpotStatus::Free.to_string(),
            },
            TransitionError::ReservationClosed {
                reservation,
                status,
            } => ParkingError::AlreadyClosed {
                reservation,
                status: status.to_string(),
            },
            TransitionError::CheckOutBeforeCheckIn {
                check_in,
                check_out,
            } => ParkingError::InvalidInterval {
                check_in,
                check_out,
            },
        }
    }
}
