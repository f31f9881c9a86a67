//! Engine tuning.

use std::time::Duration;

/// Deadline applied to every unit of work when none is configured.
pub const DEFAULT_UNIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime settings for [`crate::ParkingService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on one atomic unit, including the wait for the lot's
    /// scope. On expiry the unit is rolled back and the caller receives a
    /// retryable persistence failure.
    pub unit_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unit_timeout: DEFAULT_UNIT_TIMEOUT,
        }
    }
}
