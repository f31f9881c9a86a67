//! # Spot State
//!
//! ```text
//! Free ──occupy──▶ Occupied ──free──▶ Free
//! ```
//!
//! A spot is Occupied exactly while one Active reservation references it.
//! That pairing is maintained by the allocation coordinator; this module
//! only guards the binary transition.

use serde::{Deserialize, Serialize};

use parkway_core::{LotId, SpotId, Timestamp};

use crate::TransitionError;

/// Binary availability of a spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotStatus {
    /// Available for allocation.
    Free,
    /// Held by an Active reservation.
    Occupied,
}

impl SpotStatus {
    /// Single-letter storage code (`A` = available, `O` = occupied).
    pub fn code(self) -> &'static str {
        match self {
            Self::Free => "A",
            Self::Occupied => "O",
        }
    }

    /// Parse a storage code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "A" => Some(Self::Free),
            "O" => Some(Self::Occupied),
            _ => None,
        }
    }
}

impl std::fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Free => "free",
            Self::Occupied => "occupied",
        })
    }
}

/// One allocatable parking unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub id: SpotId,
    pub lot_id: LotId,
    pub status: SpotStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Spot {
    /// A newly provisioned spot. Always starts Free.
    pub fn new(id: SpotId, lot_id: LotId, at: Timestamp) -> Self {
        Self {
            id,
            lot_id,
            status: SpotStatus::Free,
            created_at: at,
            updated_at: at,
        }
    }

    /// Whether the spot can be allocated.
    pub fn is_free(&self) -> bool {
        self.status == SpotStatus::Free
    }

    /// Free → Occupied.
    pub fn occupy(&mut self, at: Timestamp) -> Result<(), TransitionError> {
        if self.status == SpotStatus::Occupied {
            return Err(TransitionError::SpotOccupied { spot: self.id });
        }
        self.status = SpotStatus::Occupied;
        self.updated_at = at;
        Ok(())
    }

    /// Occupied → Free.
    pub fn free(&mut self, at: Timestamp) -> Result<(), TransitionError> {
        if self.status == SpotStatus::Free {
            return Err(TransitionError::SpotAlreadyFree { spot: self.id });
        }
        self.status = SpotStatus::Free;
        self.updated_at = at;
        Ok(())
    }
}
