//! # Parking Lots
//!
//! A lot is a facility with descriptive fields, an hourly rate, a configured
//! spot capacity (`max_spots`) and an optional per-session time cap. The
//! cap is informational: it is stored and reported, never enforced.

use serde::{Deserialize, Serialize};

use parkway_core::{HourlyRate, LotId, ParkingError, Timestamp};

/// A persisted parking lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingLot {
    pub id: LotId,
    pub location: String,
    pub address: String,
    pub pincode: String,
    pub hourly_rate: HourlyRate,
    /// Configured capacity. Equals the actual spot count except while a
    /// resize is being applied inside its unit of work.
    pub max_spots: u32,
    /// Per-session cap in minutes.
    pub max_time_minutes: Option<u32>,
    pub created_at: Timestamp,
}

/// Input for provisioning a new lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLot {
    pub location: String,
    pub address: String,
    pub pincode: String,
    pub hourly_rate: f64,
    pub max_spots: u32,
    #[serde(default)]
    pub max_time_minutes: Option<u32>,
}

impl NewLot {
    /// Check descriptive fields and the rate.
    pub fn validate(&self) -> Result<HourlyRate, ParkingError> {
        require_text("location", &self.location)?;
        require_text("address", &self.address)?;
        require_text("pincode", &self.pincode)?;
        HourlyRate::new(self.hourly_rate)
    }

    /// Build the record once an identity has been allocated.
    pub fn into_lot(self, id: LotId, created_at: Timestamp) -> Result<ParkingLot, ParkingError> {
        let hourly_rate = self.validate()?;
        Ok(ParkingLot {
            id,
            location: self.location.trim().to_string(),
            address: self.address.trim().to_string(),
            pincode: self.pincode.trim().to_string(),
            hourly_rate,
            max_spots: self.max_spots,
            max_time_minutes: self.max_time_minutes,
            created_at,
        })
    }
}

/// Partial update of a lot's descriptive fields and price.
///
/// Capacity is not part of the patch: it changes only through the resizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LotDetailsPatch {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    /// `Some(None)` clears the cap.
    #[serde(default)]
    pub max_time_minutes: Option<Option<u32>>,
}

impl ParkingLot {
    /// Apply a patch, validating every provided field before changing any.
    pub fn apply(&mut self, patch: LotDetailsPatch) -> Result<(), ParkingError> {
        if let Some(location) = &patch.location {
            require_text("location", location)?;
        }
        if let Some(address) = &patch.address {
            require_text("address", address)?;
        }
        if let Some(pincode) = &patch.pincode {
            require_text("pincode", pincode)?;
        }
        let rate = patch.hourly_rate.map(HourlyRate::new).transpose()?;

        if let Some(location) = patch.location {
            self.location = location.trim().to_string();
        }
        if let Some(address) = patch.address {
            self.address = address.trim().to_string();
        }
        if let Some(pincode) = patch.pincode {
            self.pincode = pincode.trim().to_string();
        }
        if let Some(rate) = rate {
            self.hourly_rate = rate;
        }
        if let Some(cap) = patch.max_time_minutes {
            self.max_time_minutes = cap;
        }
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), ParkingError> {
    if value.trim().is_empty() {
        return Err(ParkingError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
