//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier in Parkway. These prevent
//! accidental identifier confusion: you cannot pass a `SpotId` where a
//! `ReservationId` is expected.
//!
//! Identities are 64-bit integers allocated from a monotonically increasing
//! sequence per kind, so "lowest identity first" is a stable, reproducible
//! ordering for spot selection.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Access the raw sequence value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a parking lot.
    LotId,
    "lot"
);

define_id!(
    /// Unique identifier for a single allocatable spot within a lot.
    SpotId,
    "spot"
);

define_id!(
    /// Unique identifier for a reservation (the unit of billing).
    ReservationId,
    "reservation"
);

define_id!(
    /// Opaque identifier of a user, owned by the external account system.
    UserId,
    "user"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_kind_prefix() {
        assert_eq!(LotId(7).to_string(), "lot:7");
        assert_eq!(SpotId(12).to_string(), "spot:12");
        assert_eq!(ReservationId(3).to_string(), "reservation:3");
        assert_eq!(UserId(99).to_string(), "user:99");
    }

    #[test]
    fn ordering_follows_sequence() {
        let mut ids = vec![SpotId(5), SpotId(1), SpotId(3)];
        ids.sort();
        assert_eq!(ids, vec![SpotId(1), SpotId(3), SpotId(5)]);
    }

    #[test]
    fn serializes_as_bare_integer() {
        let json = serde_json::to_string(&ReservationId(42)).unwrap();
        assert_eq!(json, "42");
        let parsed: ReservationId = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, ReservationId(42));
    }
}
