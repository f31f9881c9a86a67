//! Row types for SQLx mapping and their conversion into engine records.
//!
//! Stored values that no longer satisfy the record invariants (an unknown
//! status code, a non-positive rate, a negative count) are reported as
//! non-retryable persistence failures rather than coerced.

use chrono::{DateTime, Utc};

use parkway_core::{
    HourlyRate, LotId, ParkingError, ParkingResult, ReservationId, SpotId, Timestamp, UserId,
};
use parkway_state::{ParkingLot, Reservation, ReservationStatus, Spot, SpotStatus};

pub(crate) const LOT_COLUMNS: &str =
    "id, location, address, pincode, hourly_rate, max_spots, max_time_minutes, created_at";

pub(crate) const SPOT_COLUMNS: &str = "id, lot_id, status, created_at, updated_at";

pub(crate) const RESERVATION_COLUMNS: &str =
    "id, spot_id, user_id, check_in, check_out, total_cost, status, created_at, updated_at";

fn corrupt(table: &str, id: i64, detail: impl std::fmt::Display) -> ParkingError {
    tracing::error!(table, id, %detail, "stored row violates record invariants");
    ParkingError::persistence(false, format!("{table} row {id}: {detail}"))
}

fn to_u32(table: &str, id: i64, field: &str, value: i32) -> ParkingResult<u32> {
    u32::try_from(value).map_err(|_| corrupt(table, id, format!("negative {field} {value}")))
}

/// Row of `parking_lots`.
#[derive(sqlx::FromRow)]
pub(crate) struct LotRow {
    id: i64,
    location: String,
    address: String,
    pincode: String,
    hourly_rate: f64,
    max_spots: i32,
    max_time_minutes: Option<i32>,
    created_at: DateTime<Utc>,
}

impl LotRow {
    pub(crate) fn into_record(self) -> ParkingResult<ParkingLot> {
        let hourly_rate = HourlyRate::new(self.hourly_rate)
            .map_err(|e| corrupt("parking_lots", self.id, e))?;
        let max_spots = to_u32("parking_lots", self.id, "max_spots", self.max_spots)?;
        let max_time_minutes = self
            .max_time_minutes
            .map(|m| to_u32("parking_lots", self.id, "max_time_minutes", m))
            .transpose()?;
        Ok(ParkingLot {
            id: LotId(self.id),
            location: self.location,
            address: self.address,
            pincode: self.pincode,
            hourly_rate,
            max_spots,
            max_time_minutes,
            created_at: Timestamp::from_utc(self.created_at),
        })
    }
}

/// Row of `parking_spots`.
#[derive(sqlx::FromRow)]
pub(crate) struct SpotRow {
    id: i64,
    lot_id: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SpotRow {
    pub(crate) fn into_record(self) -> ParkingResult<Spot> {
        let status = SpotStatus::from_code(&self.status).ok_or_else(|| {
            corrupt("parking_spots", self.id, format!("unknown status {:?}", self.status))
        })?;
        Ok(Spot {
            id: SpotId(self.id),
            lot_id: LotId(self.lot_id),
            status,
            created_at: Timestamp::from_utc(self.created_at),
            updated_at: Timestamp::from_utc(self.updated_at),
        })
    }
}

/// Row of `reservations`.
#[derive(sqlx::FromRow)]
pub(crate) struct ReservationRow {
    id: i64,
    spot_id: i64,
    user_id: i64,
    check_in: DateTime<Utc>,
    check_out: Option<DateTime<Utc>>,
    total_cost: Option<f64>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReservationRow {
    pub(crate) fn into_record(self) -> ParkingResult<Reservation> {
        let status = ReservationStatus::from_code(&self.status).ok_or_else(|| {
            corrupt("reservations", self.id, format!("unknown status {:?}", self.status))
        })?;
        Ok(Reservation {
            id: ReservationId(self.id),
            spot_id: SpotId(self.spot_id),
            user_id: UserId(self.user_id),
            check_in: Timestamp::from_utc(self.check_in),
            check_out: self.check_out.map(Timestamp::from_utc),
            total_cost: self.total_cost,
            status,
            created_at: Timestamp::from_utc(self.created_at),
            updated_at: Timestamp::from_utc(self.updated_at),
        })
    }
}

/// Collect converted rows, failing on the first corrupt one.
pub(crate) fn collect<R, T>(
    rows: Vec<R>,
    convert: impl Fn(R) -> ParkingResult<T>,
) -> ParkingResult<Vec<T>> {
    rows.into_iter().map(convert).collect()
}
