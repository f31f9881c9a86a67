//! # API Route Modules
//!
//! - `lots` — lot administration, capacity, occupancy and booking.
//! - `reservations` — release and cancellation.
//! - `users` — per-user reservation views and billing summary.

pub mod lots;
pub mod reservations;
pub mod users;
