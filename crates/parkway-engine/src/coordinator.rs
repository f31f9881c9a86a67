//! # Allocation Coordinator
//!
//! Composes inventory, ledger and pricing into the booking and release
//! flows. Each flow runs as one unit of work on the affected lot:
//!
//! ```text
//! book:    begin(lot) → find free spot → open → mark occupied → commit
//! release: begin(lot) → validate → price → close → mark free → commit
//! ```
//!
//! Any error before `commit` drops the transaction, which discards every
//! staged write. The `stage_*` variants stop short of the commit and return
//! a [`Staged`] unit, so callers can bound the staging work and the commit
//! separately.

use std::sync::Arc;

use parkway_core::{Clock, LotId, ParkingError, ParkingResult, ReservationId, UserId};
use parkway_state::Reservation;

use crate::store::{ParkingStore, Staged};
use crate::{inventory, ledger, pricing};

/// Runs booking, release and cancellation as atomic units.
#[derive(Debug, Clone)]
pub struct AllocationCoordinator {
    store: Arc<dyn ParkingStore>,
    clock: Arc<dyn Clock>,
}

impl AllocationCoordinator {
    pub fn new(store: Arc<dyn ParkingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Allocate the lowest-identity Free spot of `lot` to `user`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the lot does not exist.
    /// - `LotFull` if no spot is Free. Other lots are not tried.
    pub async fn book(&self, lot: LotId, user: UserId) -> ParkingResult<Reservation> {
        self.stage_book(lot, user).await?.commit().await
    }

    /// Close `user`'s Active reservation and bill it at the lot's current
    /// hourly rate.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the reservation does not exist.
    /// - `Forbidden` if `user` does not own it.
    /// - `AlreadyClosed` if it is no longer Active.
    pub async fn release(&self, id: ReservationId, user: UserId) -> ParkingResult<Reservation> {
        self.stage_release(id, user).await?.commit().await
    }

    /// Void an Active reservation without billing it and free its spot.
    pub async fn cancel(&self, id: ReservationId) -> ParkingResult<Reservation> {
        self.stage_cancel(id).await?.commit().await
    }

    /// [`Self::book`] up to, but not including, the commit.
    pub async fn stage_book(&self, lot: LotId, user: UserId) -> ParkingResult<Staged<Reservation>> {
        let mut tx = self.store.begin(lot).await?;
        let spot = inventory::find_free_spot(tx.as_mut())
            .await?
            .ok_or(ParkingError::LotFull { lot })?;
        let now = self.clock.now();
        let reservation = ledger::open(tx.as_mut(), spot.id, user, now).await?;
        inventory::mark_occupied(tx.as_mut(), spot.id, now).await?;
        Ok(Staged::new(tx, reservation))
    }

    /// [`Self::release`] up to, but not including, the commit.
    pub async fn stage_release(
        &self,
        id: ReservationId,
        user: UserId,
    ) -> ParkingResult<Staged<Reservation>> {
        let lot = self.locate(id).await?;
        let mut tx = self.store.begin(lot).await?;

        let current = tx.reservation(id).await?;
        if current.user_id != user {
            return Err(ParkingError::Forbidden {
                reservation: id,
                user,
            });
        }
        if !current.is_active() {
            return Err(ParkingError::AlreadyClosed {
                reservation: id,
                status: current.status.to_string(),
            });
        }

        let rate = tx.lot().await?.hourly_rate;
        let check_out = self.clock.now();
        let cost = pricing::compute_cost(&current.check_in, &check_out, rate)?;
        let closed = ledger::close(tx.as_mut(), id, check_out, cost).await?;
        inventory::mark_free(tx.as_mut(), closed.spot_id, check_out).await?;
        Ok(Staged::new(tx, closed))
    }

    /// [`Self::cancel`] up to, but not including, the commit.
    pub async fn stage_cancel(&self, id: ReservationId) -> ParkingResult<Staged<Reservation>> {
        let lot = self.locate(id).await?;
        let mut tx = self.store.begin(lot).await?;
        let now = self.clock.now();
        let cancelled = ledger::cancel(tx.as_mut(), id, now).await?;
        inventory::mark_free(tx.as_mut(), cancelled.spot_id, now).await?;
        Ok(Staged::new(tx, cancelled))
    }

    /// Find the lot a reservation belongs to. Spots never move between
    /// lots, so this read does not need the lot's scope.
    async fn locate(&self, id: ReservationId) -> ParkingResult<LotId> {
        self.store
            .reservation_lot(id)
            .await?
            .ok_or_else(|| ParkingError::reservation_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::TimeDelta;
    use parkway_core::{ManualClock, Timestamp};
    use parkway_state::{NewLot, ReservationStatus};

    struct Fixture {
        store: MemoryStore,
        clock: ManualClock,
        coordinator: AllocationCoordinator,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let clock = ManualClock::new(Timestamp::parse("2026-05-01T10:00:00+05:30").unwrap());
        let coordinator =
            AllocationCoordinator::new(Arc::new(store.clone()), Arc::new(clock.clone()));
        Fixture {
            store,
            clock,
            coordinator,
        }
    }

    async fn lot(f: &Fixture, spots: usize) -> LotId {
        let mut tx = f
            .store
            .provision(
                NewLot {
                    location: "Jayanagar".to_string(),
                    address: "4th Block".to_string(),
                    pincode: "560011".to_string(),
                    hourly_rate: 10.0,
                    max_spots: spots as u32,
                    max_time_minutes: Some(60),
                },
                f.clock.now(),
            )
            .await
            .unwrap();
        let id = tx.lot_id();
        tx.insert_spots(spots, f.clock.now()).await.unwrap();
        tx.commit().await.unwrap();
        id
    }

    #[tokio::test]
    async fn book_occupies_lowest_free_spot() {
        let f = fixture();
        let lot = lot(&f, 2).await;
        let first_spot = f.store.spots_of(lot)[0].id;

        let r = f.coordinator.book(lot, UserId(1)).await.unwrap();
        assert_eq!(r.spot_id, first_spot);
        assert_eq!(r.status, ReservationStatus::Active);
        assert!(!f.store.spots_of(lot)[0].is_free());
    }

    #[tokio::test]
    async fn book_on_full_lot_is_lot_full() {
        let f = fixture();
        let lot = lot(&f, 1).await;
        f.coordinator.book(lot, UserId(1)).await.unwrap();
        let err = f.coordinator.book(lot, UserId(2)).await.unwrap_err();
        assert_eq!(err, ParkingError::LotFull { lot });
    }

    #[tokio::test]
    async fn book_on_missing_lot_is_not_found() {
        let f = fixture();
        let err = f.coordinator.book(LotId(9), UserId(1)).await.unwrap_err();
        assert_eq!(err, ParkingError::lot_not_found(LotId(9)));
    }

    #[tokio::test]
    async fn release_by_another_user_is_forbidden() {
        let f = fixture();
        let lot = lot(&f, 1).await;
        let r = f.coordinator.book(lot, UserId(1)).await.unwrap();
        let err = f.coordinator.release(r.id, UserId(2)).await.unwrap_err();
        assert_eq!(
            err,
            ParkingError::Forbidden {
                reservation: r.id,
                user: UserId(2),
            }
        );
        assert!(!f.store.spots_of(lot)[0].is_free());
    }

    #[tokio::test]
    async fn release_bills_current_rate() {
        let f = fixture();
        let lot = lot(&f, 1).await;
        let r = f.coordinator.book(lot, UserId(1)).await.unwrap();

        let mut tx = f.store.begin(lot).await.unwrap();
        let mut record = tx.lot().await.unwrap();
        record.hourly_rate = parkway_core::HourlyRate::new(40.0).unwrap();
        tx.put_lot(record).await.unwrap();
        tx.commit().await.unwrap();

        f.clock.advance(TimeDelta::minutes(90));
        let closed = f.coordinator.release(r.id, UserId(1)).await.unwrap();
        assert_eq!(closed.total_cost, Some(60.0));
        assert!(f.store.spots_of(lot)[0].is_free());
    }

    #[tokio::test]
    async fn cancel_frees_spot_without_cost() {
        let f = fixture();
        let lot = lot(&f, 1).await;
        let r = f.coordinator.book(lot, UserId(1)).await.unwrap();

        let cancelled = f.coordinator.cancel(r.id).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert!(cancelled.total_cost.is_none());
        assert!(f.store.spots_of(lot)[0].is_free());

        let err = f.coordinator.release(r.id, UserId(1)).await.unwrap_err();
        assert!(matches!(err, ParkingError::AlreadyClosed { .. }));
    }

    #[tokio::test]
    async fn staged_booking_holds_the_lot_until_committed() {
        let f = fixture();
        let lot = lot(&f, 2).await;

        let staged = f.coordinator.stage_book(lot, UserId(1)).await.unwrap();
        assert!(f.store.spots_of(lot).iter().all(|s| s.is_free()));
        assert!(f.store.reservation(staged.value().id).await.unwrap().is_none());

        let r = staged.commit().await.unwrap();
        assert_eq!(f.store.reservation(r.id).await.unwrap().unwrap(), r);
        assert!(!f.store.spots_of(lot)[0].is_free());
    }

    #[tokio::test]
    async fn dropped_stage_discards_the_release() {
        let f = fixture();
        let lot = lot(&f, 1).await;
        let r = f.coordinator.book(lot, UserId(1)).await.unwrap();

        drop(f.coordinator.stage_release(r.id, UserId(1)).await.unwrap());
        let stored = f.store.reservation(r.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Active);
        assert!(!f.store.spots_of(lot)[0].is_free());
    }

    #[tokio::test]
    async fn failed_release_commit_keeps_reservation_active() {
        let f = fixture();
        let lot = lot(&f, 1).await;
        let r = f.coordinator.book(lot, UserId(1)).await.unwrap();

        f.store.fail_next_commit();
        let err = f.coordinator.release(r.id, UserId(1)).await.unwrap_err();
        assert!(err.is_retryable());

        let stored = f.store.reservation(r.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Active);
        assert!(!f.store.spots_of(lot)[0].is_free());
    }
}
