//! # Reservation Ledger
//!
//! Creates reservations and drives them through their lifecycle. Writes run
//! inside a lot's unit of work; the per-user queries read committed state
//! from the store and never take a lot scope.

use std::cmp::Reverse;

use parkway_core::{ParkingError, ParkingResult, ReservationId, SpotId, Timestamp, UserId};
use parkway_state::{Reservation, ReservationStatus};

use crate::store::{LotTransaction, ParkingStore};

/// Open an Active reservation on a Free spot.
///
/// # Errors
///
/// [`ParkingError::SpotUnavailable`] if the spot is not Free at call time.
pub async fn open(
    tx: &mut dyn LotTransaction,
    spot: SpotId,
    user: UserId,
    check_in: Timestamp,
) -> ParkingResult<Reservation> {
    if !tx.spot(spot).await?.is_free() {
        return Err(ParkingError::SpotUnavailable { spot });
    }
    tx.insert_reservation(spot, user, check_in).await
}

/// Active → Completed with a fixed check-out time and cost.
pub async fn close(
    tx: &mut dyn LotTransaction,
    id: ReservationId,
    check_out: Timestamp,
    cost: f64,
) -> ParkingResult<Reservation> {
    let mut reservation = tx.reservation(id).await?;
    reservation.complete(check_out, cost)?;
    tx.put_reservation(reservation.clone()).await?;
    Ok(reservation)
}

/// Active → Cancelled. No cost is recorded.
pub async fn cancel(
    tx: &mut dyn LotTransaction,
    id: ReservationId,
    at: Timestamp,
) -> ParkingResult<Reservation> {
    let mut reservation = tx.reservation(id).await?;
    reservation.cancel(at)?;
    tx.put_reservation(reservation.clone()).await?;
    Ok(reservation)
}

/// A user's Active reservations, ascending by identity.
pub async fn active_for_user(
    store: &dyn ParkingStore,
    user: UserId,
) -> ParkingResult<Vec<Reservation>> {
    let mut active = store
        .reservations_for_user(user, Some(ReservationStatus::Active))
        .await?;
    active.sort_by_key(|r| r.id);
    Ok(active)
}

/// Every reservation of a user, newest check-in first.
///
/// Equal check-in times are ordered by identity, highest first.
pub async fn history_for_user(
    store: &dyn ParkingStore,
    user: UserId,
) -> ParkingResult<Vec<Reservation>> {
    let mut history = store.reservations_for_user(user, None).await?;
    history.sort_by_key(|r| Reverse((r.check_in, r.id)));
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory;
    use crate::memory::MemoryStore;
    use chrono::TimeDelta;
    use parkway_core::LotId;
    use parkway_state::NewLot;

    fn at(minutes: i64) -> Timestamp {
        Timestamp::parse("2026-04-02T09:00:00+05:30")
            .unwrap()
            .checked_add(TimeDelta::minutes(minutes))
            .unwrap()
    }

    async fn lot(store: &MemoryStore, spots: usize) -> LotId {
        let mut tx = store
            .provision(
                NewLot {
                    location: "Whitefield".to_string(),
                    address: "ITPL Main Road".to_string(),
                    pincode: "560066".to_string(),
                    hourly_rate: 10.0,
                    max_spots: spots as u32,
                    max_time_minutes: None,
                },
                at(0),
            )
            .await
            .unwrap();
        let id = tx.lot_id();
        tx.insert_spots(spots, at(0)).await.unwrap();
        tx.commit().await.unwrap();
        id
    }

    #[tokio::test]
    async fn open_requires_a_free_spot() {
        let store = MemoryStore::new();
        let lot = lot(&store, 1).await;
        let spot = store.spots_of(lot)[0].id;

        let mut tx = store.begin(lot).await.unwrap();
        inventory::mark_occupied(tx.as_mut(), spot, at(0)).await.unwrap();
        let err = open(tx.as_mut(), spot, UserId(1), at(0)).await.unwrap_err();
        assert_eq!(err, ParkingError::SpotUnavailable { spot });
    }

    #[tokio::test]
    async fn close_twice_is_already_closed() {
        let store = MemoryStore::new();
        let lot = lot(&store, 1).await;
        let spot = store.spots_of(lot)[0].id;

        let mut tx = store.begin(lot).await.unwrap();
        let r = open(tx.as_mut(), spot, UserId(1), at(0)).await.unwrap();
        close(tx.as_mut(), r.id, at(60), 10.0).await.unwrap();
        let err = close(tx.as_mut(), r.id, at(120), 20.0).await.unwrap_err();
        assert_eq!(
            err,
            ParkingError::AlreadyClosed {
                reservation: r.id,
                status: "completed".to_string(),
            }
        );
        assert_eq!(tx.reservation(r.id).await.unwrap().total_cost, Some(10.0));
    }

    #[tokio::test]
    async fn missing_reservation_is_not_found() {
        let store = MemoryStore::new();
        let lot = lot(&store, 1).await;
        let mut tx = store.begin(lot).await.unwrap();
        let err = cancel(tx.as_mut(), ReservationId(77), at(0)).await.unwrap_err();
        assert_eq!(err, ParkingError::reservation_not_found(ReservationId(77)));
    }

    #[tokio::test]
    async fn history_is_newest_first_with_identity_tiebreak() {
        let store = MemoryStore::new();
        let lot = lot(&store, 3).await;
        let spots: Vec<SpotId> = store.spots_of(lot).iter().map(|s| s.id).collect();
        let user = UserId(5);

        let mut tx = store.begin(lot).await.unwrap();
        let early = open(tx.as_mut(), spots[0], user, at(0)).await.unwrap();
        let tie_a = open(tx.as_mut(), spots[1], user, at(30)).await.unwrap();
        let tie_b = open(tx.as_mut(), spots[2], user, at(30)).await.unwrap();
        close(tx.as_mut(), early.id, at(45), 10.0).await.unwrap();
        tx.commit().await.unwrap();

        let history = history_for_user(&store, user).await.unwrap();
        let order: Vec<ReservationId> = history.iter().map(|r| r.id).collect();
        assert_eq!(order, vec![tie_b.id, tie_a.id, early.id]);

        let active = active_for_user(&store, user).await.unwrap();
        let ids: Vec<ReservationId> = active.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![tie_a.id, tie_b.id]);
    }
}
