//! # Parking Service
//!
//! The operations exposed to adapters. Reads go straight to the store.
//! Every write runs as one unit of work with two deadlines, each
//! [`EngineConfig::unit_timeout`] long:
//!
//! - **Staging** (scope acquisition and every write). Expiry drops the
//!   transaction, so the unit is rolled back and the failure is retryable.
//! - **Commit.** Expiry leaves the outcome unknown: the backend may have
//!   applied the commit before the acknowledgement was lost. The failure is
//!   reported as not retryable, and callers must re-read before acting again.
//!
//! ## Metrics
//!
//! | Name                        | Kind      | Labels    |
//! |-----------------------------|-----------|-----------|
//! | `parkway_bookings_total`    | counter   | `outcome` |
//! | `parkway_releases_total`    | counter   | `outcome` |
//! | `parkway_resizes_total`     | counter   | `outcome` |
//! | `parkway_billed_amount`     | histogram |           |
//!
//! `outcome` is `ok` or the error code (`LOT_FULL`, `FORBIDDEN`, ...).

use std::future::Future;
use std::sync::Arc;

use parkway_core::{Clock, LotId, ParkingError, ParkingResult, ReservationId, UserId};
use parkway_state::{LotDetailsPatch, NewLot, ParkingLot, Reservation};

use crate::config::EngineConfig;
use crate::coordinator::AllocationCoordinator;
use crate::ledger;
use crate::reports::{LotOccupancy, UserSummary};
use crate::resizer::{LotResizer, ResizeResult};
use crate::store::{ParkingStore, Staged};

/// Facade over the coordinator, resizer, lot administration and reports.
#[derive(Debug, Clone)]
pub struct ParkingService {
    store: Arc<dyn ParkingStore>,
    clock: Arc<dyn Clock>,
    coordinator: AllocationCoordinator,
    resizer: LotResizer,
    config: EngineConfig,
}

impl ParkingService {
    pub fn new(store: Arc<dyn ParkingStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            coordinator: AllocationCoordinator::new(Arc::clone(&store), Arc::clone(&clock)),
            resizer: LotResizer::new(Arc::clone(&store), Arc::clone(&clock)),
            store,
            clock,
            config,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn ParkingStore> {
        &self.store
    }

    // ── Allocation ───────────────────────────────────────────────────

    /// Allocate a spot in `lot` to `user`.
    #[tracing::instrument(skip(self))]
    pub async fn book(&self, lot: LotId, user: UserId) -> ParkingResult<Reservation> {
        let result = self.unit("book", self.coordinator.stage_book(lot, user)).await;
        record_outcome("parkway_bookings_total", &result);
        match &result {
            Ok(r) => tracing::info!(reservation = %r.id, spot = %r.spot_id, "spot booked"),
            Err(e @ ParkingError::LotFull { .. }) => tracing::warn!(error = %e, "booking rejected"),
            Err(e) => tracing::debug!(error = %e, "booking failed"),
        }
        result
    }

    /// Release `user`'s reservation and bill it.
    #[tracing::instrument(skip(self))]
    pub async fn release(&self, id: ReservationId, user: UserId) -> ParkingResult<Reservation> {
        let result = self.unit("release", self.coordinator.stage_release(id, user)).await;
        record_outcome("parkway_releases_total", &result);
        if let Ok(r) = &result {
            let cost = r.total_cost.unwrap_or_default();
            metrics::histogram!("parkway_billed_amount").record(cost);
            tracing::info!(spot = %r.spot_id, cost, "reservation released");
        }
        result
    }

    /// Void a reservation without billing it.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, id: ReservationId) -> ParkingResult<Reservation> {
        let result = self.unit("cancel", self.coordinator.stage_cancel(id)).await;
        if let Ok(r) = &result {
            tracing::info!(spot = %r.spot_id, "reservation cancelled");
        }
        result
    }

    // ── Capacity ─────────────────────────────────────────────────────

    /// Change a lot's capacity.
    #[tracing::instrument(skip(self))]
    pub async fn resize_lot(&self, lot: LotId, new_max_spots: u32) -> ParkingResult<ResizeResult> {
        let result = self.unit("resize", self.resizer.stage_resize(lot, new_max_spots)).await;
        record_outcome("parkway_resizes_total", &result);
        match &result {
            Ok(r) => tracing::info!(added = r.added, removed = r.removed, "lot resized"),
            Err(e) => tracing::warn!(error = %e, "resize rejected"),
        }
        result
    }

    // ── Lot administration ───────────────────────────────────────────

    /// Create a lot with `max_spots` Free spots.
    #[tracing::instrument(skip(self, lot), fields(pincode = %lot.pincode))]
    pub async fn create_lot(&self, lot: NewLot) -> ParkingResult<ParkingLot> {
        let spots = usize::try_from(lot.max_spots)
            .map_err(|_| ParkingError::Validation("max_spots too large".to_string()))?;
        let now = self.clock.now();
        let created = self
            .unit("create_lot", async {
                let mut tx = self.store.provision(lot, now).await?;
                tx.insert_spots(spots, now).await?;
                let record = tx.lot().await?;
                Ok::<_, ParkingError>(Staged::new(tx, record))
            })
            .await?;
        tracing::info!(lot = %created.id, spots, "lot created");
        Ok(created)
    }

    /// Update descriptive fields, price or time cap.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_lot_details(
        &self,
        lot: LotId,
        patch: LotDetailsPatch,
    ) -> ParkingResult<ParkingLot> {
        let updated = self
            .unit("update_lot", async {
                let mut tx = self.store.begin(lot).await?;
                let mut record = tx.lot().await?;
                record.apply(patch)?;
                tx.put_lot(record.clone()).await?;
                Ok::<_, ParkingError>(Staged::new(tx, record))
            })
            .await?;
        tracing::info!(rate = %updated.hourly_rate, "lot updated");
        Ok(updated)
    }

    /// Delete a lot with its spots and reservations.
    #[tracing::instrument(skip(self))]
    pub async fn delete_lot(&self, lot: LotId) -> ParkingResult<()> {
        self.unit("delete_lot", async {
            let mut tx = self.store.begin(lot).await?;
            tx.delete_lot().await?;
            Ok::<_, ParkingError>(Staged::new(tx, ()))
        })
        .await?;
        tracing::info!("lot deleted");
        Ok(())
    }

    /// One lot.
    pub async fn get_lot(&self, lot: LotId) -> ParkingResult<ParkingLot> {
        self.store
            .lot(lot)
            .await?
            .ok_or_else(|| ParkingError::lot_not_found(lot))
    }

    /// Lots with at least one Free spot whose pincode starts with `pincode_prefix`.
    pub async fn available_lots(&self, pincode_prefix: &str) -> ParkingResult<Vec<ParkingLot>> {
        self.store.lots_with_free_spots(pincode_prefix.trim()).await
    }

    // ── Reports ──────────────────────────────────────────────────────

    /// Current free/occupied split of a lot.
    pub async fn lot_occupancy(&self, lot: LotId) -> ParkingResult<LotOccupancy> {
        let record = self.get_lot(lot).await?;
        let counts = self.store.spot_counts(lot).await?;
        Ok(LotOccupancy::new(&record, counts))
    }

    /// A user's Active reservations.
    pub async fn user_active_reservations(&self, user: UserId) -> ParkingResult<Vec<Reservation>> {
        ledger::active_for_user(self.store.as_ref(), user).await
    }

    /// A user's reservations, newest check-in first.
    pub async fn user_history(&self, user: UserId) -> ParkingResult<Vec<Reservation>> {
        ledger::history_for_user(self.store.as_ref(), user).await
    }

    /// A user's lifetime totals.
    pub async fn user_summary(&self, user: UserId) -> ParkingResult<UserSummary> {
        let reservations = self.store.reservations_for_user(user, None).await?;
        UserSummary::from_reservations(user, &reservations)
    }

    /// Stage one unit of work, then commit it, each under the configured
    /// deadline.
    async fn unit<T, F>(&self, operation: &'static str, work: F) -> ParkingResult<T>
    where
        F: Future<Output = ParkingResult<Staged<T>>>,
    {
        let deadline = self.config.unit_timeout;
        let result = match tokio::time::timeout(deadline, work).await {
            Ok(Ok(staged)) => match tokio::time::timeout(deadline, staged.commit()).await {
                Ok(committed) => committed,
                Err(_) => Err(ParkingError::persistence(
                    false,
                    format!("{operation} commit unacknowledged after {deadline:?}, outcome unknown"),
                )),
            },
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ParkingError::persistence(
                true,
                format!("{operation} exceeded {deadline:?}"),
            )),
        };
        if let Err(e @ ParkingError::PersistenceFailure { .. }) = &result {
            tracing::error!(operation, error = %e, "unit of work failed");
        }
        result
    }
}

fn record_outcome<T>(counter: &'static str, result: &ParkingResult<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.code(),
    };
    metrics::counter!(counter, "outcome" => outcome).increment(1);
}
