//! # Postgres Store
//!
//! [`ParkingStore`] over a `PgPool`.
//!
//! A unit of work is one database transaction. [`PgStore::begin`] locks the
//! lot row with `SELECT … FOR UPDATE`, which serializes every unit on that
//! lot until commit or rollback. Writes go straight into the transaction;
//! dropping [`PgLotTransaction`] without committing rolls them back.
//!
//! Identities come from `BIGINT GENERATED ALWAYS AS IDENTITY` sequences,
//! which never hand out a value twice, even across rollbacks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use parkway_core::{
    LotId, ParkingError, ParkingResult, ReservationId, SpotId, Timestamp, UserId,
};
use parkway_engine::{LotTransaction, ParkingStore, SpotCounts};
use parkway_state::{NewLot, ParkingLot, Reservation, ReservationStatus, Spot, SpotStatus};

use crate::db::rows::{
    collect, LotRow, ReservationRow, SpotRow, LOT_COLUMNS, RESERVATION_COLUMNS, SPOT_COLUMNS,
};

/// SQLSTATE codes worth retrying: serialization failure, deadlock, lock
/// timeout, and query cancellation.
const RETRYABLE_SQLSTATES: &[&str] = &["40001", "40P01", "55P03", "57014"];

/// Map a driver error into the engine taxonomy.
pub(crate) fn db_err(err: sqlx::Error) -> ParkingError {
    let retryable = match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => db
            .code()
            .is_some_and(|code| RETRYABLE_SQLSTATES.contains(&&*code)),
        _ => false,
    };
    if !retryable {
        tracing::error!(error = %err, "database operation failed");
    }
    ParkingError::persistence(retryable, err)
}

fn utc(ts: &Timestamp) -> DateTime<Utc> {
    ts.to_utc()
}

fn to_i32(value: u32, field: &str) -> ParkingResult<i32> {
    i32::try_from(value).map_err(|_| ParkingError::Validation(format!("{field} {value} too large")))
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn open(&self) -> ParkingResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(db_err)
    }
}

#[async_trait]
impl ParkingStore for PgStore {
    async fn begin(&self, lot: LotId) -> ParkingResult<Box<dyn LotTransaction>> {
        let mut tx = self.open().await?;
        let locked: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM parking_lots WHERE id = $1 FOR UPDATE")
                .bind(lot.get())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        if locked.is_none() {
            return Err(ParkingError::lot_not_found(lot));
        }
        Ok(Box::new(PgLotTransaction::new(tx, lot)))
    }

    async fn provision(
        &self,
        lot: NewLot,
        at: Timestamp,
    ) -> ParkingResult<Box<dyn LotTransaction>> {
        lot.validate()?;
        let max_spots = to_i32(lot.max_spots, "max_spots")?;
        let max_time = lot
            .max_time_minutes
            .map(|m| to_i32(m, "max_time_minutes"))
            .transpose()?;

        let mut tx = self.open().await?;
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO parking_lots
                 (location, address, pincode, hourly_rate, max_spots, max_time_minutes, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(lot.location.trim())
        .bind(lot.address.trim())
        .bind(lot.pincode.trim())
        .bind(lot.hourly_rate)
        .bind(max_spots)
        .bind(max_time)
        .bind(utc(&at))
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        Ok(Box::new(PgLotTransaction::new(tx, LotId(id))))
    }

    async fn lot(&self, lot: LotId) -> ParkingResult<Option<ParkingLot>> {
        let row: Option<LotRow> =
            sqlx::query_as(&format!("SELECT {LOT_COLUMNS} FROM parking_lots WHERE id = $1"))
                .bind(lot.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(LotRow::into_record).transpose()
    }

    async fn lots_with_free_spots(&self, pincode_prefix: &str) -> ParkingResult<Vec<ParkingLot>> {
        let rows: Vec<LotRow> = sqlx::query_as(&format!(
            "SELECT {LOT_COLUMNS} FROM parking_lots l
             WHERE starts_with(l.pincode, $1)
               AND EXISTS (SELECT 1 FROM parking_spots s WHERE s.lot_id = l.id AND s.status = $2)
             ORDER BY l.id"
        ))
        .bind(pincode_prefix)
        .bind(SpotStatus::Free.code())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows, LotRow::into_record)
    }

    async fn spot_counts(&self, lot: LotId) -> ParkingResult<SpotCounts> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT COUNT(s.id) FILTER (WHERE s.status = $2),
                    COUNT(s.id) FILTER (WHERE s.status = $3)
             FROM parking_lots l
             LEFT JOIN parking_spots s ON s.lot_id = l.id
             WHERE l.id = $1
             GROUP BY l.id",
        )
        .bind(lot.get())
        .bind(SpotStatus::Free.code())
        .bind(SpotStatus::Occupied.code())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        let (free, occupied) = row.ok_or_else(|| ParkingError::lot_not_found(lot))?;
        Ok(SpotCounts {
            free: usize::try_from(free).unwrap_or_default(),
            occupied: usize::try_from(occupied).unwrap_or_default(),
        })
    }

    async fn reservation(&self, id: ReservationId) -> ParkingResult<Option<Reservation>> {
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(ReservationRow::into_record).transpose()
    }

    async fn reservation_lot(&self, id: ReservationId) -> ParkingResult<Option<LotId>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT s.lot_id FROM reservations r
             JOIN parking_spots s ON s.id = r.spot_id
             WHERE r.id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(|(lot,)| LotId(lot)))
    }

    async fn reservations_for_user(
        &self,
        user: UserId,
        status: Option<ReservationStatus>,
    ) -> ParkingResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations
             WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY id"
        ))
        .bind(user.get())
        .bind(status.map(ReservationStatus::code))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows, ReservationRow::into_record)
    }
}

/// One lot-scoped database transaction.
pub struct PgLotTransaction {
    tx: Transaction<'static, Postgres>,
    lot_id: LotId,
    deleted: bool,
}

impl PgLotTransaction {
    fn new(tx: Transaction<'static, Postgres>, lot_id: LotId) -> Self {
        Self {
            tx,
            lot_id,
            deleted: false,
        }
    }

    fn ensure_live(&self) -> ParkingResult<()> {
        if self.deleted {
            return Err(ParkingError::lot_not_found(self.lot_id));
        }
        Ok(())
    }
}

#[async_trait]
impl LotTransaction for PgLotTransaction {
    fn lot_id(&self) -> LotId {
        self.lot_id
    }

    async fn lot(&mut self) -> ParkingResult<ParkingLot> {
        self.ensure_live()?;
        let row: Option<LotRow> =
            sqlx::query_as(&format!("SELECT {LOT_COLUMNS} FROM parking_lots WHERE id = $1"))
                .bind(self.lot_id.get())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(db_err)?;
        row.ok_or_else(|| ParkingError::lot_not_found(self.lot_id))?
            .into_record()
    }

    async fn put_lot(&mut self, lot: ParkingLot) -> ParkingResult<()> {
        self.ensure_live()?;
        if lot.id != self.lot_id {
            return Err(ParkingError::lot_not_found(lot.id));
        }
        let max_time = lot
            .max_time_minutes
            .map(|m| to_i32(m, "max_time_minutes"))
            .transpose()?;
        sqlx::query(
            "UPDATE parking_lots
             SET location = $2, address = $3, pincode = $4, hourly_rate = $5,
                 max_spots = $6, max_time_minutes = $7
             WHERE id = $1",
        )
        .bind(lot.id.get())
        .bind(&lot.location)
        .bind(&lot.address)
        .bind(&lot.pincode)
        .bind(lot.hourly_rate.per_hour())
        .bind(to_i32(lot.max_spots, "max_spots")?)
        .bind(max_time)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_lot(&mut self) -> ParkingResult<()> {
        self.ensure_live()?;
        sqlx::query("DELETE FROM parking_lots WHERE id = $1")
            .bind(self.lot_id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        self.deleted = true;
        Ok(())
    }

    async fn spots(&mut self) -> ParkingResult<Vec<Spot>> {
        self.ensure_live()?;
        let rows: Vec<SpotRow> = sqlx::query_as(&format!(
            "SELECT {SPOT_COLUMNS} FROM parking_spots WHERE lot_id = $1 ORDER BY id"
        ))
        .bind(self.lot_id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        collect(rows, SpotRow::into_record)
    }

    async fn first_free_spot(&mut self) -> ParkingResult<Option<Spot>> {
        self.ensure_live()?;
        let row: Option<SpotRow> = sqlx::query_as(&format!(
            "SELECT {SPOT_COLUMNS} FROM parking_spots
             WHERE lot_id = $1 AND status = $2
             ORDER BY id LIMIT 1"
        ))
        .bind(self.lot_id.get())
        .bind(SpotStatus::Free.code())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        row.map(SpotRow::into_record).transpose()
    }

    async fn spot(&mut self, id: SpotId) -> ParkingResult<Spot> {
        self.ensure_live()?;
        let row: Option<SpotRow> = sqlx::query_as(&format!(
            "SELECT {SPOT_COLUMNS} FROM parking_spots WHERE id = $1 AND lot_id = $2"
        ))
        .bind(id.get())
        .bind(self.lot_id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        row.ok_or_else(|| ParkingError::spot_not_found(id))?
            .into_record()
    }

    async fn put_spot(&mut self, spot: Spot) -> ParkingResult<()> {
        self.ensure_live()?;
        let result = sqlx::query(
            "UPDATE parking_spots SET status = $3, updated_at = $4 WHERE id = $1 AND lot_id = $2",
        )
        .bind(spot.id.get())
        .bind(self.lot_id.get())
        .bind(spot.status.code())
        .bind(utc(&spot.updated_at))
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(ParkingError::spot_not_found(spot.id));
        }
        Ok(())
    }

    async fn insert_spots(&mut self, count: usize, at: Timestamp) -> ParkingResult<Vec<Spot>> {
        self.ensure_live()?;
        if count == 0 {
            return Ok(Vec::new());
        }
        let n = i64::try_from(count)
            .map_err(|_| ParkingError::Validation(format!("cannot create {count} spots")))?;
        let rows: Vec<SpotRow> = sqlx::query_as(&format!(
            "INSERT INTO parking_spots (lot_id, status, created_at, updated_at)
             SELECT $1, $2, $3, $3 FROM generate_series(1, $4)
             RETURNING {SPOT_COLUMNS}"
        ))
        .bind(self.lot_id.get())
        .bind(SpotStatus::Free.code())
        .bind(utc(&at))
        .bind(n)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        let mut spots = collect(rows, SpotRow::into_record)?;
        spots.sort_by_key(|s| s.id);
        Ok(spots)
    }

    async fn delete_spots(&mut self, ids: &[SpotId]) -> ParkingResult<()> {
        self.ensure_live()?;
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let deleted: Vec<(i64,)> = sqlx::query_as(
            "DELETE FROM parking_spots WHERE lot_id = $1 AND id = ANY($2) RETURNING id",
        )
        .bind(self.lot_id.get())
        .bind(&raw)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        if deleted.len() != raw.len() {
            let gone: Vec<i64> = deleted.into_iter().map(|(id,)| id).collect();
            let missing = raw
                .iter()
                .find(|id| !gone.contains(id))
                .copied()
                .unwrap_or_default();
            return Err(ParkingError::spot_not_found(SpotId(missing)));
        }
        Ok(())
    }

    async fn reservation(&mut self, id: ReservationId) -> ParkingResult<Reservation> {
        self.ensure_live()?;
        let row: Option<ReservationRow> = sqlx::query_as(
            "SELECT r.id, r.spot_id, r.user_id, r.check_in, r.check_out, r.total_cost,
                    r.status, r.created_at, r.updated_at
             FROM reservations r
             JOIN parking_spots s ON s.id = r.spot_id
             WHERE r.id = $1 AND s.lot_id = $2",
        )
        .bind(id.get())
        .bind(self.lot_id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        row.ok_or_else(|| ParkingError::reservation_not_found(id))?
            .into_record()
    }

    async fn insert_reservation(
        &mut self,
        spot: SpotId,
        user: UserId,
        check_in: Timestamp,
    ) -> ParkingResult<Reservation> {
        // Confirms the spot belongs to this lot.
        self.spot(spot).await?;
        let row: ReservationRow = sqlx::query_as(&format!(
            "INSERT INTO reservations (spot_id, user_id, check_in, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $3, $3)
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(spot.get())
        .bind(user.get())
        .bind(utc(&check_in))
        .bind(ReservationStatus::Active.code())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;
        row.into_record()
    }

    async fn put_reservation(&mut self, reservation: Reservation) -> ParkingResult<()> {
        self.ensure_live()?;
        let result = sqlx::query(
            "UPDATE reservations
             SET check_out = $3, total_cost = $4, status = $5, updated_at = $6
             WHERE id = $1
               AND spot_id IN (SELECT id FROM parking_spots WHERE lot_id = $2)",
        )
        .bind(reservation.id.get())
        .bind(self.lot_id.get())
        .bind(reservation.check_out.as_ref().map(utc))
        .bind(reservation.total_cost)
        .bind(reservation.status.code())
        .bind(utc(&reservation.updated_at))
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(ParkingError::reservation_not_found(reservation.id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> ParkingResult<()> {
        self.tx.commit().await.map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeouts_are_retryable() {
        assert!(db_err(sqlx::Error::PoolTimedOut).is_retryable());
    }

    #[test]
    fn missing_rows_are_not_retryable() {
        assert!(!db_err(sqlx::Error::RowNotFound).is_retryable());
    }
}
