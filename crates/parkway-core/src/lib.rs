//! # parkway-core — Foundational Types for Parkway
//!
//! This crate is the leaf of the Parkway dependency graph. It defines the
//! primitives every other crate builds on: typed identifiers, the civil-zone
//! [`Timestamp`], the injectable [`Clock`], validated [`HourlyRate`]s, and the
//! [`ParkingError`] taxonomy.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `LotId`, `SpotId`,
//!    `ReservationId`, `UserId` are distinct types. A spot identity cannot be
//!    passed where a reservation identity is expected.
//!
//! 2. **One civil zone.** Every `Timestamp` carries the fixed Asia/Kolkata
//!    offset (+05:30). Zone-less inputs are read as UTC and converted on
//!    construction, so arithmetic never mixes offsets.
//!
//! 3. **Time is injected.** Components ask a [`Clock`] for "now"; tests use
//!    [`ManualClock`] to make billing reproducible.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `parkway-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod clock;
pub mod error;
pub mod identity;
pub mod rate;
pub mod temporal;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{EntityKind, ParkingError, ParkingResult};
pub use identity::{LotId, ReservationId, SpotId, UserId};
pub use rate::HourlyRate;
pub use temporal::{civil_zone, Timestamp, CIVIL_ZONE_OFFSET_SECS};
