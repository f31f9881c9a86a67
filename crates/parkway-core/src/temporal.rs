//! # Temporal Types — Civil-Zone Timestamps
//!
//! Defines `Timestamp`, the only instant type used by Parkway. Every value
//! carries the fixed civil offset (Asia/Kolkata, UTC+05:30, no daylight
//! saving) and is truncated to whole seconds.
//!
//! ## Normalization Rules
//!
//! - Zone-aware inputs with any offset are converted to the civil zone.
//! - Zone-less (naive) inputs are interpreted as **UTC** and then converted.
//!   They are never assumed to already be civil time.
//! - Deserialization applies the same conversion, so a stored `+00:00`
//!   value and its `+05:30` rendering compare equal and subtract to zero.
//!
//! Because every `Timestamp` is normalized on construction, subtracting two
//! of them can never mix zones. Elapsed-time arithmetic lives here and in the
//! pricing calculator only.

use chrono::{
    DateTime, FixedOffset, NaiveDateTime, Offset, TimeDelta, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParkingError;

/// Offset of the civil zone east of UTC, in seconds (+05:30).
pub const CIVIL_ZONE_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// The fixed civil zone all timestamps are expressed in.
pub fn civil_zone() -> FixedOffset {
    FixedOffset::east_opt(CIVIL_ZONE_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// A civil-zone timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`] — current system time.
/// - [`Timestamp::from_utc()`] — from a `DateTime<Utc>`.
/// - [`Timestamp::from_naive_utc()`] — from a zone-less value read as UTC.
/// - [`Timestamp::parse()`] — from an RFC 3339 string with any offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<FixedOffset>);

impl Timestamp {
    /// Current system time in the civil zone, truncated to seconds.
    ///
    /// Engine code should go through a [`crate::Clock`] instead.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Convert a UTC instant into the civil zone.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt.with_timezone(&civil_zone())))
    }

    /// Interpret a zone-less datetime as UTC and convert it.
    pub fn from_naive_utc(naive: NaiveDateTime) -> Self {
        Self::from_utc(Utc.from_utc_datetime(&naive))
    }

    /// Convert a datetime carrying any fixed offset into the civil zone.
    pub fn from_fixed(dt: DateTime<FixedOffset>) -> Self {
        Self(truncate_to_seconds(dt.with_timezone(&civil_zone())))
    }

    /// Parse an RFC 3339 string with any offset.
    ///
    /// # Errors
    ///
    /// Returns [`ParkingError::Validation`] if the string is not RFC 3339.
    pub fn parse(s: &str) -> Result<Self, ParkingError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            ParkingError::Validation(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self::from_fixed(dt))
    }

    /// Create a timestamp from a Unix epoch value (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, ParkingError> {
        let dt = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            ParkingError::Validation(format!("invalid Unix timestamp: {secs}"))
        })?;
        Ok(Self::from_utc(dt))
    }

    /// Access the inner civil-zone datetime.
    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }

    /// The same instant expressed in UTC, for storage layers.
    pub fn to_utc(&self) -> DateTime<Utc> {
        self.0.with_timezone(&Utc)
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Signed duration from `earlier` to `self`.
    pub fn since(&self, earlier: &Timestamp) -> TimeDelta {
        self.0.signed_duration_since(earlier.0)
    }

    /// Shift by `delta`, or `None` if the result leaves chrono's range.
    pub fn checked_add(&self, delta: TimeDelta) -> Option<Self> {
        self.0.checked_add_signed(delta).map(Self::from_fixed)
    }

    /// Render as RFC 3339 with the civil offset, e.g. `2026-01-15T17:30:00+05:30`.
    pub fn to_rfc3339(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_utc(dt)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Discard sub-second precision.
fn truncate_to_seconds(dt: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
