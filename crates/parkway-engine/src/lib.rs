//! # parkway-engine — Spot Allocation and Reservation Engine
//!
//! Turns the records of `parkway-state` into a consistent, concurrent
//! parking system:
//!
//! - [`pricing`] — billed amount for a stay, one-hour minimum.
//! - [`inventory`] — free/occupied bookkeeping for the spots of one lot.
//! - [`ledger`] — opening and closing reservations, per-user queries.
//! - [`coordinator`] — `book`, `release` and `cancel` as atomic units.
//! - [`resizer`] — bounded capacity changes.
//! - [`reports`] — lot occupancy and user billing summaries.
//! - [`service`] — the facade adapters call, with deadlines, logging and
//!   metrics.
//!
//! ## Persistence
//!
//! The engine talks to storage only through [`ParkingStore`] and
//! [`LotTransaction`]. A transaction holds its lot's exclusion scope from
//! `begin` until it commits or drops, which makes "find free spot, open
//! reservation, mark occupied" indivisible with respect to every other unit
//! on that lot. [`MemoryStore`] is the in-process backend; `parkway-api`
//! provides a Postgres one.
//!
//! ## Crate Policy
//!
//! - Spot and reservation state changes go through the `parkway-state`
//!   machines. Nothing here assigns a status field directly.
//! - The system time is never read directly; a [`parkway_core::Clock`] is
//!   injected.

pub mod config;
pub mod coordinator;
pub mod inventory;
pub mod ledger;
pub mod memory;
pub mod pricing;
pub mod reports;
pub mod resizer;
pub mod service;
pub mod store;

pub use config::EngineConfig;
pub use coordinator::AllocationCoordinator;
pub use memory::MemoryStore;
pub use reports::{LotOccupancy, UserSummary};
pub use resizer::{LotResizer, ResizeResult};
pub use service::ParkingService;
pub use store::{LotTransaction, ParkingStore, SpotCounts, Staged};
