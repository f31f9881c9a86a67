//! # Hourly Rates
//!
//! A lot's price per hour. Validated on construction: finite and strictly
//! positive. Billing multiplies a rate by elapsed hours and does not round.

use serde::{Deserialize, Serialize};

use crate::error::ParkingError;

/// A validated hourly price.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct HourlyRate(f64);

impl HourlyRate {
    /// Create a rate, rejecting zero, negative, NaN and infinite values.
    pub fn new(per_hour: f64) -> Result<Self, ParkingError> {
        if !per_hour.is_finite() || per_hour <= 0.0 {
            return Err(ParkingError::Validation(format!(
                "hourly rate must be a positive finite number, got {per_hour}"
            )));
        }
        Ok(Self(per_hour))
    }

    /// The price of one hour.
    pub fn per_hour(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for HourlyRate {
    type Error = ParkingError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HourlyRate> for f64 {
    fn from(rate: HourlyRate) -> Self {
        rate.0
    }
}

impl std::fmt::Display for HourlyRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/h", self.0)
    }
}
