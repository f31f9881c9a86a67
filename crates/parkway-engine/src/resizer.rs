//! # Lot Resizer
//!
//! Changes a lot's capacity inside its unit of work, so a resize never
//! interleaves with a booking on the same lot.
//!
//! ## Policy
//!
//! - Growing adds Free spots.
//! - Shrinking removes only Free spots, highest identity first. If too few
//!   spots are Free the resize fails and nothing changes.
//! - `max_spots` is written after the spot changes succeed, including when
//!   the actual count already matched the target.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use parkway_core::{Clock, LotId, ParkingError, ParkingResult};

use crate::inventory;
use crate::store::{ParkingStore, Staged};

/// Outcome of a successful resize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeResult {
    pub lot_id: LotId,
    pub previous_max_spots: u32,
    pub new_max_spots: u32,
    /// Spots created.
    pub added: usize,
    /// Spots removed.
    pub removed: usize,
}

/// Applies capacity changes.
#[derive(Debug, Clone)]
pub struct LotResizer {
    store: Arc<dyn ParkingStore>,
    clock: Arc<dyn Clock>,
}

impl LotResizer {
    pub fn new(store: Arc<dyn ParkingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Bring the lot's spot count to `new_max_spots`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the lot does not exist.
    /// - `InsufficientFreeSpots` if shrinking would remove an occupied spot.
    pub async fn resize(&self, lot: LotId, new_max_spots: u32) -> ParkingResult<ResizeResult> {
        self.stage_resize(lot, new_max_spots).await?.commit().await
    }

    /// [`Self::resize`] up to, but not including, the commit.
    pub async fn stage_resize(
        &self,
        lot: LotId,
        new_max_spots: u32,
    ) -> ParkingResult<Staged<ResizeResult>> {
        let mut tx = self.store.begin(lot).await?;
        let mut record = tx.lot().await?;
        let previous_max_spots = record.max_spots;

        let current = inventory::spot_counts(tx.as_mut()).await?.total();
        let target = usize::try_from(new_max_spots)
            .map_err(|_| ParkingError::Validation(format!("capacity {new_max_spots} too large")))?;

        let (added, removed) = if target > current {
            let now = self.clock.now();
            let created = inventory::add_spots(tx.as_mut(), target - current, now).await?;
            (created.len(), 0)
        } else if target < current {
            let gone = inventory::remove_free_spots(tx.as_mut(), current - target).await?;
            (0, gone.len())
        } else {
            (0, 0)
        };

        record.max_spots = new_max_spots;
        tx.put_lot(record).await?;

        let result = ResizeResult {
            lot_id: lot,
            previous_max_spots,
            new_max_spots,
            added,
            removed,
        };
        Ok(Staged::new(tx, result))
    }
}
