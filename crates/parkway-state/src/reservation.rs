//! # Reservation Lifecycle State Machine
//!
//! ## States
//!
//! ```text
//! Active ──complete──▶ Completed (terminal, cost fixed)
//!    │
//!    └────cancel─────▶ Cancelled (terminal, no cost)
//! ```
//!
//! A reservation is created Active as part of a successful allocation.
//! Once terminal, its check-out time and cost never change: every further
//! transition attempt returns [`TransitionError::ReservationClosed`].

use serde::{Deserialize, Serialize};

use parkway_core::{ReservationId, SpotId, Timestamp, UserId};

use crate::TransitionError;

/// Lifecycle state of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// The user holds the spot.
    Active,
    /// Released normally and billed (terminal).
    Completed,
    /// Voided administratively, never billed (terminal).
    Cancelled,
}

impl ReservationStatus {
    /// Whether this state is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Storage code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a storage code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A record binding a user to a spot for an interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub spot_id: SpotId,
    pub user_id: UserId,
    /// Set once, at allocation.
    pub check_in: Timestamp,
    /// Set when the reservation leaves Active.
    pub check_out: Option<Timestamp>,
    /// Billed amount. Only Completed reservations carry one.
    pub total_cost: Option<f64>,
    pub status: ReservationStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Reservation {
    /// Open a new Active reservation checked in at `check_in`.
    pub fn open(id: ReservationId, spot_id: SpotId, user_id: UserId, check_in: Timestamp) -> Self {
        Self {
            id,
            spot_id,
            user_id,
            check_in,
            check_out: None,
            total_cost: None,
            status: ReservationStatus::Active,
            created_at: check_in,
            updated_at: check_in,
        }
    }

    /// Whether the reservation still holds its spot.
    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    /// Active → Completed, fixing check-out time and cost.
    pub fn complete(&mut self, check_out: Timestamp, cost: f64) -> Result<(), TransitionError> {
        self.require_active()?;
        if check_out < self.check_in {
            return Err(TransitionError::CheckOutBeforeCheckIn {
                check_in: self.check_in,
                check_out,
            });
        }
        self.check_out = Some(check_out);
        self.total_cost = Some(cost);
        self.status = ReservationStatus::Completed;
        self.updated_at = check_out;
        Ok(())
    }

    /// Active → Cancelled. The cost stays unset.
    pub fn cancel(&mut self, at: Timestamp) -> Result<(), TransitionError> {
        self.require_active()?;
        self.check_out = Some(at.max(self.check_in));
        self.status = ReservationStatus::Cancelled;
        self.updated_at = at;
        Ok(())
    }

    fn require_active(&self) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::ReservationClosed {
                reservation: self.id,
                status: self.status,
            });
        }
        Ok(())
    }
}
