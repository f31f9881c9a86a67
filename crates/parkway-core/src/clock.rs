//! # Clock Abstraction
//!
//! The engine never reads the system time directly. It asks a [`Clock`],
//! which lets tests pin "now" and advance it deterministically.

use std::sync::Arc;

use chrono::TimeDelta;
use parking_lot::Mutex;

use crate::temporal::Timestamp;

/// Source of the current civil-zone instant.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// Reads the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A settable clock for tests and simulations.
///
/// Clones share the same instant, so a test can hand one clone to the
/// service and keep another to advance time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Replace the current instant.
    pub fn set(&self, to: Timestamp) {
        *self.now.lock() = to;
    }

    /// Move the clock forward by `delta`.
    ///
    /// Out-of-range results leave the clock unchanged.
    pub fn advance(&self, delta: TimeDelta) {
        let mut guard = self.now.lock();
        if let Some(next) = guard.checked_add(delta) {
            *guard = next;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
