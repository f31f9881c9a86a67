//! # In-Memory Store
//!
//! Reference implementation of [`ParkingStore`]. Used by tests and by the
//! API server when no database is configured.
//!
//! ## Concurrency
//!
//! - Committed tables sit behind one `parking_lot::RwLock`. It is only held
//!   for synchronous reads and for the apply step of a commit, never across
//!   an `.await`.
//! - Each lot has its own `tokio::sync::Mutex`, acquired by
//!   [`ParkingStore::begin`] and held by the returned transaction until it
//!   commits or drops. Units on different lots never contend.
//! - A transaction stages writes in private overlay maps. Commit applies the
//!   overlay under the table write lock in one step, so readers observe
//!   either none or all of a unit's writes.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::OwnedMutexGuard;

use parkway_core::{
    LotId, ParkingError, ParkingResult, ReservationId, SpotId, Timestamp, UserId,
};
use parkway_state::{NewLot, ParkingLot, Reservation, ReservationStatus, Spot};

use crate::store::{LotTransaction, ParkingStore, SpotCounts};

#[derive(Debug, Default)]
struct Tables {
    lots: BTreeMap<LotId, ParkingLot>,
    spots: BTreeMap<SpotId, Spot>,
    reservations: BTreeMap<ReservationId, Reservation>,
}

impl Tables {
    fn lot_spots(&self, lot: LotId) -> impl Iterator<Item = &Spot> {
        self.spots.values().filter(move |s| s.lot_id == lot)
    }

    fn reservation_lot(&self, id: ReservationId) -> Option<LotId> {
        let reservation = self.reservations.get(&id)?;
        self.spots.get(&reservation.spot_id).map(|s| s.lot_id)
    }

    fn remove_spot_cascade(&mut self, spot: SpotId) {
        self.spots.remove(&spot);
        self.reservations.retain(|_, r| r.spot_id != spot);
    }
}

#[derive(Debug, Default)]
struct Sequences {
    lot: AtomicI64,
    spot: AtomicI64,
    reservation: AtomicI64,
}

fn next(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::Relaxed) + 1
}

/// Thread-safe, cloneable in-memory [`ParkingStore`].
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    scopes: Arc<Mutex<HashMap<LotId, Arc<tokio::sync::Mutex<()>>>>>,
    sequences: Arc<Sequences>,
    fail_next_commit: Arc<AtomicBool>,
    commit_ack_delay: Arc<Mutex<Option<Duration>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next commit fail with a retryable persistence failure.
    ///
    /// Lets tests observe that a failed unit leaves no partial state.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Hold back the acknowledgement of the next commit by `delay`. The
    /// commit's writes are applied and visible before the delay starts.
    pub fn delay_next_commit_ack(&self, delay: Duration) {
        *self.commit_ack_delay.lock() = Some(delay);
    }

    /// Committed spots of a lot, ascending by identity.
    pub fn spots_of(&self, lot: LotId) -> Vec<Spot> {
        self.tables.read().lot_spots(lot).cloned().collect()
    }

    fn scope(&self, lot: LotId) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.scopes.lock().entry(lot).or_default())
    }

    async fn enter(&self, lot: LotId) -> OwnedMutexGuard<()> {
        self.scope(lot).lock_owned().await
    }
}

#[async_trait]
impl ParkingStore for MemoryStore {
    async fn begin(&self, lot: LotId) -> ParkingResult<Box<dyn LotTransaction>> {
        if !self.tables.read().lots.contains_key(&lot) {
            return Err(ParkingError::lot_not_found(lot));
        }
        let guard = self.enter(lot).await;
        // The lot may have been deleted while we waited for its scope.
        if !self.tables.read().lots.contains_key(&lot) {
            return Err(ParkingError::lot_not_found(lot));
        }
        Ok(Box::new(MemoryLotTransaction::new(self.clone(), lot, guard)))
    }

    async fn provision(
        &self,
        lot: NewLot,
        at: Timestamp,
    ) -> ParkingResult<Box<dyn LotTransaction>> {
        lot.validate()?;
        let id = LotId(next(&self.sequences.lot));
        let record = lot.into_lot(id, at)?;
        let guard = self.enter(id).await;
        let mut tx = MemoryLotTransaction::new(self.clone(), id, guard);
        tx.lot = Some(record);
        Ok(Box::new(tx))
    }

    async fn lot(&self, lot: LotId) -> ParkingResult<Option<ParkingLot>> {
        Ok(self.tables.read().lots.get(&lot).cloned())
    }

    async fn lots_with_free_spots(&self, pincode_prefix: &str) -> ParkingResult<Vec<ParkingLot>> {
        let tables = self.tables.read();
        Ok(tables
            .lots
            .values()
            .filter(|lot| lot.pincode.starts_with(pincode_prefix))
            .filter(|lot| tables.lot_spots(lot.id).any(Spot::is_free))
            .cloned()
            .collect())
    }

    async fn spot_counts(&self, lot: LotId) -> ParkingResult<SpotCounts> {
        let tables = self.tables.read();
        if !tables.lots.contains_key(&lot) {
            return Err(ParkingError::lot_not_found(lot));
        }
        let spots: Vec<Spot> = tables.lot_spots(lot).cloned().collect();
        Ok(SpotCounts::tally(&spots))
    }

    async fn reservation(&self, id: ReservationId) -> ParkingResult<Option<Reservation>> {
        Ok(self.tables.read().reservations.get(&id).cloned())
    }

    async fn reservation_lot(&self, id: ReservationId) -> ParkingResult<Option<LotId>> {
        Ok(self.tables.read().reservation_lot(id))
    }

    async fn reservations_for_user(
        &self,
        user: UserId,
        status: Option<ReservationStatus>,
    ) -> ParkingResult<Vec<Reservation>> {
        Ok(self
            .tables
            .read()
            .reservations
            .values()
            .filter(|r| r.user_id == user)
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }
}

/// A staged unit of work over [`MemoryStore`].
#[derive(Debug)]
struct MemoryLotTransaction {
    store: MemoryStore,
    lot_id: LotId,
    _scope: OwnedMutexGuard<()>,
    /// Staged lot record. `None` means unchanged.
    lot: Option<ParkingLot>,
    lot_deleted: bool,
    /// Staged spots. `None` marks a deletion.
    spots: BTreeMap<SpotId, Option<Spot>>,
    reservations: BTreeMap<ReservationId, Reservation>,
}

impl MemoryLotTransaction {
    fn new(store: MemoryStore, lot_id: LotId, scope: OwnedMutexGuard<()>) -> Self {
        Self {
            store,
            lot_id,
            _scope: scope,
            lot: None,
            lot_deleted: false,
            spots: BTreeMap::new(),
            reservations: BTreeMap::new(),
        }
    }

    fn ensure_live(&self) -> ParkingResult<()> {
        if self.lot_deleted {
            return Err(ParkingError::lot_not_found(self.lot_id));
        }
        Ok(())
    }

    /// Committed spots of this lot with the staged overlay applied.
    fn visible_spots(&self) -> BTreeMap<SpotId, Spot> {
        let mut merged: BTreeMap<SpotId, Spot> = self
            .store
            .tables
            .read()
            .lot_spots(self.lot_id)
            .map(|s| (s.id, s.clone()))
            .collect();
        for (id, staged) in &self.spots {
            match staged {
                Some(spot) => {
                    merged.insert(*id, spot.clone());
                }
                None => {
                    merged.remove(id);
                }
            }
        }
        merged
    }

    /// Write the overlay into the committed tables and release the scope.
    fn apply(self) {
        let mut tables = self.store.tables.write();

        if self.lot_deleted {
            tables.lots.remove(&self.lot_id);
            let doomed: Vec<SpotId> = tables.lot_spots(self.lot_id).map(|s| s.id).collect();
            for spot in doomed {
                tables.remove_spot_cascade(spot);
            }
            drop(tables);
            self.store.scopes.lock().remove(&self.lot_id);
            return;
        }

        if let Some(lot) = self.lot {
            tables.lots.insert(lot.id, lot);
        }
        for (id, reservation) in self.reservations {
            tables.reservations.insert(id, reservation);
        }
        for (id, staged) in self.spots {
            match staged {
                Some(spot) => {
                    tables.spots.insert(id, spot);
                }
                None => tables.remove_spot_cascade(id),
            }
        }
    }
}

#[async_trait]
impl LotTransaction for MemoryLotTransaction {
    fn lot_id(&self) -> LotId {
        self.lot_id
    }

    async fn lot(&mut self) -> ParkingResult<ParkingLot> {
        self.ensure_live()?;
        if let Some(lot) = &self.lot {
            return Ok(lot.clone());
        }
        self.store
            .tables
            .read()
            .lots
            .get(&self.lot_id)
            .cloned()
            .ok_or_else(|| ParkingError::lot_not_found(self.lot_id))
    }

    async fn put_lot(&mut self, lot: ParkingLot) -> ParkingResult<()> {
        self.ensure_live()?;
        if lot.id != self.lot_id {
            return Err(ParkingError::lot_not_found(lot.id));
        }
        self.lot = Some(lot);
        Ok(())
    }

    async fn delete_lot(&mut self) -> ParkingResult<()> {
        self.ensure_live()?;
        self.lot_deleted = true;
        Ok(())
    }

    async fn spots(&mut self) -> ParkingResult<Vec<Spot>> {
        self.ensure_live()?;
        Ok(self.visible_spots().into_values().collect())
    }

    async fn first_free_spot(&mut self) -> ParkingResult<Option<Spot>> {
        self.ensure_live()?;
        Ok(self.visible_spots().into_values().find(Spot::is_free))
    }

    async fn spot(&mut self, id: SpotId) -> ParkingResult<Spot> {
        self.ensure_live()?;
        self.visible_spots()
            .remove(&id)
            .ok_or_else(|| ParkingError::spot_not_found(id))
    }

    async fn put_spot(&mut self, spot: Spot) -> ParkingResult<()> {
        self.ensure_live()?;
        if spot.lot_id != self.lot_id {
            return Err(ParkingError::spot_not_found(spot.id));
        }
        self.spots.insert(spot.id, Some(spot));
        Ok(())
    }

    async fn insert_spots(&mut self, count: usize, at: Timestamp) -> ParkingResult<Vec<Spot>> {
        self.ensure_live()?;
        let created: Vec<Spot> = (0..count)
            .map(|_| Spot::new(SpotId(next(&self.store.sequences.spot)), self.lot_id, at))
            .collect();
        for spot in &created {
            self.spots.insert(spot.id, Some(spot.clone()));
        }
        Ok(created)
    }

    async fn delete_spots(&mut self, ids: &[SpotId]) -> ParkingResult<()> {
        self.ensure_live()?;
        let visible = self.visible_spots();
        if let Some(missing) = ids.iter().find(|id| !visible.contains_key(id)) {
            return Err(ParkingError::spot_not_found(*missing));
        }
        for id in ids {
            self.spots.insert(*id, None);
            self.reservations.retain(|_, r| r.spot_id != *id);
        }
        Ok(())
    }

    async fn reservation(&mut self, id: ReservationId) -> ParkingResult<Reservation> {
        self.ensure_live()?;
        let found = match self.reservations.get(&id) {
            Some(staged) => Some(staged.clone()),
            None => self.store.tables.read().reservations.get(&id).cloned(),
        };
        match found {
            Some(r) if self.visible_spots().contains_key(&r.spot_id) => Ok(r),
            _ => Err(ParkingError::reservation_not_found(id)),
        }
    }

    async fn insert_reservation(
        &mut self,
        spot: SpotId,
        user: UserId,
        check_in: Timestamp,
    ) -> ParkingResult<Reservation> {
        self.ensure_live()?;
        if !self.visible_spots().contains_key(&spot) {
            return Err(ParkingError::spot_not_found(spot));
        }
        let id = ReservationId(next(&self.store.sequences.reservation));
        let reservation = Reservation::open(id, spot, user, check_in);
        self.reservations.insert(id, reservation.clone());
        Ok(reservation)
    }

    async fn put_reservation(&mut self, reservation: Reservation) -> ParkingResult<()> {
        self.ensure_live()?;
        if !self.visible_spots().contains_key(&reservation.spot_id) {
            return Err(ParkingError::reservation_not_found(reservation.id));
        }
        self.reservations.insert(reservation.id, reservation);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> ParkingResult<()> {
        if self.store.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(ParkingError::persistence(true, "injected commit failure"));
        }
        let store = self.store.clone();
        (*self).apply();

        let delay = store.commit_ack_delay.lock().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}
