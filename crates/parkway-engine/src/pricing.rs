//! # Pricing Calculator
//!
//! Pure mapping from (check-in, check-out, hourly rate) to a billed amount.
//!
//! - Elapsed time is measured in hours (`seconds / 3600`).
//! - Stays shorter than an hour are billed as one hour.
//! - The calculator never rounds. [`round_for_display`] exists for
//!   presentation layers and must not feed back into billing.
//!
//! Both endpoints are [`Timestamp`]s, which are normalized to the civil zone
//! on construction, so subtraction never mixes offsets.

use parkway_core::{HourlyRate, ParkingError, ParkingResult, Timestamp};

/// Shortest duration ever billed, in hours.
pub const MINIMUM_BILLABLE_HOURS: f64 = 1.0;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Hours billed for a stay: elapsed hours, clamped to the one-hour minimum.
///
/// # Errors
///
/// [`ParkingError::InvalidInterval`] if `check_out` precedes `check_in`.
pub fn billable_hours(check_in: &Timestamp, check_out: &Timestamp) -> ParkingResult<f64> {
    if check_out < check_in {
        return Err(ParkingError::InvalidInterval {
            check_in: *check_in,
            check_out: *check_out,
        });
    }
    let elapsed = check_out.since(check_in).num_seconds() as f64 / SECONDS_PER_HOUR;
    Ok(elapsed.max(MINIMUM_BILLABLE_HOURS))
}

/// Billed cost of a stay at `rate`.
pub fn compute_cost(
    check_in: &Timestamp,
    check_out: &Timestamp,
    rate: HourlyRate,
) -> ParkingResult<f64> {
    Ok(billable_hours(check_in, check_out)? * rate.per_hour())
}

/// Round to two decimal places for display only.
pub fn round_for_display(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use proptest::prelude::*;

    fn t0() -> Timestamp {
        Timestamp::parse("2026-01-15T09:00:00+05:30").unwrap()
    }

    fn rate(per_hour: f64) -> HourlyRate {
        HourlyRate::new(per_hour).unwrap()
    }

    fn plus_minutes(ts: Timestamp, minutes: i64) -> Timestamp {
        ts.checked_add(TimeDelta::minutes(minutes)).unwrap()
    }

    #[test]
    fn zero_elapsed_bills_one_hour() {
        assert_eq!(compute_cost(&t0(), &t0(), rate(10.0)).unwrap(), 10.0);
    }

    #[test]
    fn ninety_minutes_bills_one_and_a_half_hours() {
        let out = plus_minutes(t0(), 90);
        assert_eq!(compute_cost(&t0(), &out, rate(10.0)).unwrap(), 15.0);
    }

    #[test]
    fn two_hours_ten_minutes_is_not_rounded() {
        let out = plus_minutes(t0(), 130);
        let cost = compute_cost(&t0(), &out, rate(10.0)).unwrap();
        assert!((cost - 130.0 / 60.0 * 10.0).abs() < 1e-9);
        assert_eq!(round_for_display(cost), 21.67);
    }

    #[test]
    fn check_out_before_check_in_is_invalid() {
        let out = plus_minutes(t0(), -1);
        let err = compute_cost(&t0(), &out, rate(10.0)).unwrap_err();
        assert!(matches!(err, ParkingError::InvalidInterval { .. }));
    }

    #[test]
    fn mixed_offsets_are_normalized_before_subtraction() {
        // 09:00 civil is 03:30 UTC; a naive UTC 05:00 check-out is 90 minutes later.
        let check_out = Timestamp::parse("2026-01-15T05:00:00Z").unwrap();
        assert_eq!(billable_hours(&t0(), &check_out).unwrap(), 1.5);
    }

    proptest! {
        #[test]
        fn cost_is_never_below_one_hour(minutes in 0i64..10_000, per_hour in 0.01f64..500.0) {
            let out = plus_minutes(t0(), minutes);
            let cost = compute_cost(&t0(), &out, rate(per_hour)).unwrap();
            prop_assert!(cost >= per_hour - 1e-9);
        }

        #[test]
        fn cost_is_linear_past_the_minimum(minutes in 60i64..10_000, per_hour in 0.01f64..500.0) {
            let out = plus_minutes(t0(), minutes);
            let cost = compute_cost(&t0(), &out, rate(per_hour)).unwrap();
            let expected = minutes as f64 / 60.0 * per_hour;
            prop_assert!((cost - expected).abs() < 1e-6 * expected.max(1.0));
        }
    }
}
