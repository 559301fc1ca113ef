//! Shared numeric and time helpers.
//!
//! Travel durations are rounded through `Decimal` so that a value like
//! `2.95` lands on the same side of the travel limit regardless of how the
//! float was produced upstream.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Round an f64 to 1 decimal place (half-to-even).
///
/// Non-finite inputs are returned unchanged.
pub(crate) fn round_1dp(v: f64) -> f64 {
    if !v.is_finite() {
        tracing::warn!("round_1dp received non-finite value {}", v);
        return v;
    }
    Decimal::from_f64(v)
        .map(|d| d.round_dp(1))
        .and_then(|d| d.to_f64())
        .unwrap_or(v)
}

/// Convert unix seconds from a provider payload into a UTC timestamp.
pub(crate) fn unix_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}

/// Seconds since the unix epoch with sub-second precision.
pub(crate) fn unix_seconds(dt: DateTime<Utc>) -> f64 {
    dt.timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_1dp_normal() {
        assert_eq!(round_1dp(2.34), 2.3);
        assert_eq!(round_1dp(2.36), 2.4);
    }

    #[test]
    fn test_round_1dp_midpoint_to_even() {
        assert_eq!(round_1dp(2.25), 2.2);
        assert_eq!(round_1dp(2.35), 2.4);
    }

    #[test]
    fn test_round_1dp_nan() {
        assert!(round_1dp(f64::NAN).is_nan());
    }

    #[test]
    fn test_unix_to_utc() {
        let dt = unix_to_utc(1771070400).unwrap();
        assert_eq!(dt, "2026-02-14T12:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_unix_seconds_keeps_fraction() {
        let dt = "2026-02-14T12:00:00.5Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(unix_seconds(dt), 1771070400.5);
    }
}
