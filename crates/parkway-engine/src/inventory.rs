//! # Spot Inventory
//!
//! Operations on the spots of one lot, always performed inside that lot's
//! unit of work. Every state change goes through the [`Spot`] state machine,
//! so occupying an occupied spot or freeing a free one is reported rather
//! than ignored.

use parkway_core::{ParkingError, ParkingResult, SpotId, Timestamp};
use parkway_state::Spot;

use crate::store::{LotTransaction, SpotCounts};

/// The lowest-identity Free spot of the unit's lot.
pub async fn find_free_spot(tx: &mut dyn LotTransaction) -> ParkingResult<Option<Spot>> {
    tx.first_free_spot().await
}

/// Free → Occupied.
///
/// # Errors
///
/// [`ParkingError::SpotUnavailable`] if the spot is already occupied.
pub async fn mark_occupied(
    tx: &mut dyn LotTransaction,
    spot: SpotId,
    at: Timestamp,
) -> ParkingResult<Spot> {
    let mut record = tx.spot(spot).await?;
    record.occupy(at)?;
    tx.put_spot(record.clone()).await?;
    Ok(record)
}

/// Occupied → Free.
///
/// # Errors
///
/// [`ParkingError::InvalidSpotTransition`] if the spot is already free.
pub async fn mark_free(
    tx: &mut dyn LotTransaction,
    spot: SpotId,
    at: Timestamp,
) -> ParkingResult<Spot> {
    let mut record = tx.spot(spot).await?;
    record.free(at)?;
    tx.put_spot(record.clone()).await?;
    Ok(record)
}

/// Create `count` Free spots.
pub async fn add_spots(
    tx: &mut dyn LotTransaction,
    count: usize,
    at: Timestamp,
) -> ParkingResult<Vec<Spot>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    tx.insert_spots(count, at).await
}

/// Remove exactly `count` Free spots, highest identity first.
///
/// # Errors
///
/// [`ParkingError::InsufficientFreeSpots`] if fewer than `count` spots are
/// Free. Nothing is removed in that case.
pub async fn remove_free_spots(
    tx: &mut dyn LotTransaction,
    count: usize,
) -> ParkingResult<Vec<SpotId>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let free: Vec<SpotId> = tx
        .spots()
        .await?
        .into_iter()
        .filter(Spot::is_free)
        .map(|s| s.id)
        .collect();
    if free.len() < count {
        return Err(ParkingError::InsufficientFreeSpots {
            lot: tx.lot_id(),
            requested: count,
            free: free.len(),
        });
    }
    let doomed: Vec<SpotId> = free.into_iter().rev().take(count).collect();
    tx.delete_spots(&doomed).await?;
    Ok(doomed)
}

/// Free/occupied tally as seen by the unit.
pub async fn spot_counts(tx: &mut dyn LotTransaction) -> ParkingResult<SpotCounts> {
    Ok(SpotCounts::tally(&tx.spots().await?))
}
