//! # Persistence Interface
//!
//! The engine consumes persistence through two traits:
//!
//! - [`ParkingStore`] — the provider. Hands out units of work and serves
//!   committed, read-only queries.
//! - [`LotTransaction`] — one unit of work scoped to a single lot. Holding
//!   it means holding that lot's exclusion scope: no other unit on the same
//!   lot runs until this one commits or is dropped.
//!
//! ## Unit-of-Work Contract
//!
//! - Writes made through a `LotTransaction` are invisible outside it until
//!   [`LotTransaction::commit`] succeeds, and then become visible together.
//! - Dropping a transaction without committing discards every write.
//! - A failed commit applies nothing.
//! - Identities allocated inside a unit that later rolls back are skipped,
//!   never reused.
//!
//! Reads on [`ParkingStore`] never take a lot's scope, so queries do not
//! block bookings.
//!
//! Flows that want to bound the work of a unit separately from its commit
//! return a [`Staged`] value: the transaction with every write made, and
//! the result it will yield once committed.

use async_trait::async_trait;

use parkway_core::{LotId, ParkingResult, ReservationId, SpotId, Timestamp, UserId};
use parkway_state::{NewLot, ParkingLot, Reservation, ReservationStatus, Spot};

/// Free/occupied tally of one lot's spots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpotCounts {
    pub free: usize,
    pub occupied: usize,
}

impl SpotCounts {
    /// Tally a slice of spots.
    pub fn tally(spots: &[Spot]) -> Self {
        let free = spots.iter().filter(|s| s.is_free()).count();
        Self {
            free,
            occupied: spots.len() - free,
        }
    }

    /// Actual number of spots.
    pub fn total(&self) -> usize {
        self.free + self.occupied
    }
}

/// A persistence provider offering lot-scoped units of work.
#[async_trait]
pub trait ParkingStore: Send + Sync + std::fmt::Debug {
    /// Enter the exclusion scope of an existing lot.
    ///
    /// Fails with `NotFound` if the lot does not exist once the scope is held.
    async fn begin(&self, lot: LotId) -> ParkingResult<Box<dyn LotTransaction>>;

    /// Create a lot and enter its scope. The lot becomes visible only when
    /// the returned unit commits.
    async fn provision(&self, lot: NewLot, at: Timestamp)
        -> ParkingResult<Box<dyn LotTransaction>>;

    /// Committed lot record.
    async fn lot(&self, lot: LotId) -> ParkingResult<Option<ParkingLot>>;

    /// Lots whose pincode starts with `prefix` and that have a free spot,
    /// ascending by identity.
    async fn lots_with_free_spots(&self, pincode_prefix: &str) -> ParkingResult<Vec<ParkingLot>>;

    /// Committed spot tally of a lot.
    async fn spot_counts(&self, lot: LotId) -> ParkingResult<SpotCounts>;

    /// Committed reservation record.
    async fn reservation(&self, id: ReservationId) -> ParkingResult<Option<Reservation>>;

    /// The lot whose spot a reservation references.
    async fn reservation_lot(&self, id: ReservationId) -> ParkingResult<Option<LotId>>;

    /// Every reservation of a user, optionally filtered by status, in no
    /// particular order.
    async fn reservations_for_user(
        &self,
        user: UserId,
        status: Option<ReservationStatus>,
    ) -> ParkingResult<Vec<Reservation>>;
}

/// One unit of work, holding the exclusion scope of a single lot.
///
/// Every spot and reservation reachable through the transaction belongs to
/// [`LotTransaction::lot_id`]; records of other lots report `NotFound`.
#[async_trait]
pub trait LotTransaction: Send {
    /// The lot this unit is scoped to.
    fn lot_id(&self) -> LotId;

    /// The lot record as seen by this unit.
    async fn lot(&mut self) -> ParkingResult<ParkingLot>;

    /// Replace the lot record.
    async fn put_lot(&mut self, lot: ParkingLot) -> ParkingResult<()>;

    /// Delete the lot together with its spots and their reservations.
    async fn delete_lot(&mut self) -> ParkingResult<()>;

    /// All spots of the lot, ascending by identity.
    async fn spots(&mut self) -> ParkingResult<Vec<Spot>>;

    /// The lowest-identity free spot, if any.
    async fn first_free_spot(&mut self) -> ParkingResult<Option<Spot>>;

    /// One spot of the lot.
    async fn spot(&mut self, id: SpotId) -> ParkingResult<Spot>;

    /// Replace a spot record.
    async fn put_spot(&mut self, spot: Spot) -> ParkingResult<()>;

    /// Create `count` free spots.
    async fn insert_spots(&mut self, count: usize, at: Timestamp) -> ParkingResult<Vec<Spot>>;

    /// Delete spots, cascading to their reservations.
    async fn delete_spots(&mut self, ids: &[SpotId]) -> ParkingResult<()>;

    /// One reservation on a spot of this lot.
    async fn reservation(&mut self, id: ReservationId) -> ParkingResult<Reservation>;

    /// Create an Active reservation.
    async fn insert_reservation(
        &mut self,
        spot: SpotId,
        user: UserId,
        check_in: Timestamp,
    ) -> ParkingResult<Reservation>;

    /// Replace a reservation record.
    async fn put_reservation(&mut self, reservation: Reservation) -> ParkingResult<()>;

    /// Apply every write of this unit, or none of them.
    async fn commit(self: Box<Self>) -> ParkingResult<()>;
}

/// A unit of work whose writes are made but not yet committed.
///
/// Dropping it rolls the unit back.
pub struct Staged<T> {
    tx: Box<dyn LotTransaction>,
    value: T,
}

impl<T> Staged<T> {
    pub fn new(tx: Box<dyn LotTransaction>, value: T) -> Self {
        Self { tx, value }
    }

    /// The lot the staged unit is scoped to.
    pub fn lot_id(&self) -> LotId {
        self.tx.lot_id()
    }

    /// The value the unit yields on commit.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Commit the unit and hand back its value.
    pub async fn commit(self) -> ParkingResult<T> {
        self.tx.commit().await?;
        Ok(self.value)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Staged<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Staged")
            .field("lot_id", &self.tx.lot_id())
            .field("value", &self.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn staged_unit_applies_only_on_commit() {
        use crate::memory::MemoryStore;
        use parkway_state::NewLot;

        let at = Timestamp::parse("2026-01-01T00:00:00+05:30").unwrap();
        let store = MemoryStore::new();
        let mut tx = store
            .provision(
                NewLot {
                    location: "Koramangala".to_string(),
                    address: "80 Feet Road".to_string(),
                    pincode: "560034".to_string(),
                    hourly_rate: 10.0,
                    max_spots: 2,
                    max_time_minutes: None,
                },
                at,
            )
            .await
            .unwrap();
        let lot = tx.lot_id();
        let spots = tx.insert_spots(2, at).await.unwrap();

        let staged = Staged::new(tx, spots.len());
        assert_eq!(staged.lot_id(), lot);
        assert_eq!(*staged.value(), 2);
        assert!(store.lot(lot).await.unwrap().is_none());

        assert_eq!(staged.commit().await.unwrap(), 2);
        assert_eq!(store.spot_counts(lot).await.unwrap().free, 2);
    }

    #[test]
    fn tally_counts_free_and_occupied() {
        let at = Timestamp::parse("2026-01-01T00:00:00+05:30").unwrap();
        let mut spots: Vec<Spot> = (1..=5).map(|i| Spot::new(SpotId(i), LotId(1), at)).collect();
        spots[0].occupy(at).unwrap();
        spots[3].occupy(at).unwrap();

        let counts = SpotCounts::tally(&spots);
        assert_eq!(counts, SpotCounts { free: 3, occupied: 2 });
        assert_eq!(counts.total(), 5);
    }
}
