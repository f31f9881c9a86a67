//! Read-only reports: lot occupancy and per-user billing summaries.

use serde::{Deserialize, Serialize};

use parkway_core::{LotId, ParkingResult, UserId};
use parkway_state::{ParkingLot, Reservation, ReservationStatus};

use crate::pricing;
use crate::store::SpotCounts;

/// Snapshot of a lot's spot usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotOccupancy {
    pub lot_id: LotId,
    pub max_spots: u32,
    pub available: usize,
    pub occupied: usize,
    /// Occupied spots as a share of `max_spots`, in percent. Zero when
    /// `max_spots` is zero.
    pub percentage: f64,
}

impl LotOccupancy {
    pub fn new(lot: &ParkingLot, counts: SpotCounts) -> Self {
        let percentage = if lot.max_spots == 0 {
            0.0
        } else {
            counts.occupied as f64 * 100.0 / f64::from(lot.max_spots)
        };
        Self {
            lot_id: lot.id,
            max_spots: lot.max_spots,
            available: counts.free,
            occupied: counts.occupied,
            percentage,
        }
    }
}

/// A user's lifetime totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: UserId,
    /// Reservations ever opened, in any state.
    pub total_bookings: usize,
    /// Sum of billed amounts over Completed reservations.
    pub total_spent: f64,
    /// Billable hours over Completed reservations.
    pub total_hours: f64,
}

impl UserSummary {
    /// Fold a user's reservations into totals.
    ///
    /// Hours come from [`pricing::billable_hours`], so they always agree
    /// with what was charged.
    pub fn from_reservations(user_id: UserId, reservations: &[Reservation]) -> ParkingResult<Self> {
        let mut total_spent = 0.0;
        let mut total_hours = 0.0;
        for r in reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Completed)
        {
            total_spent += r.total_cost.unwrap_or_default();
            if let Some(check_out) = &r.check_out {
                total_hours += pricing::billable_hours(&r.check_in, check_out)?;
            }
        }
        Ok(Self {
            user_id,
            total_bookings: reservations.len(),
            total_spent,
            total_hours,
        })
    }
}
