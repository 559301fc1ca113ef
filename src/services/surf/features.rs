//! Session filtering and categorical feature encoding.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeSet;

use crate::services::surf::models::{SurfSession, WindSpeedBucket};

/// Prefix of the one-hot columns derived from the provider's wind category.
pub const WIND_TYPE_PREFIX: &str = "wind_type";

/// Prefix of the one-hot columns derived from [`WindSpeedBucket`].
pub const WIND_SPEED_BUCKET_PREFIX: &str = "wind_speed_bucket";

/// The next Friday, Saturday and Sunday on or after `today`.
pub fn next_weekend(today: NaiveDate) -> [NaiveDate; 3] {
    [Weekday::Fri, Weekday::Sat, Weekday::Sun].map(|day| {
        let offset = (day.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
        today + Duration::days(offset as i64)
    })
}

/// Place a wind speed (mph) into its band. Bands are closed on the left, so
/// 13.0 is already "13-15mph". Negative or NaN speeds have no band.
pub fn bucket_wind_speed(speed: f64) -> Option<WindSpeedBucket> {
    if speed.is_nan() || speed < 0.0 {
        None
    } else if speed < 13.0 {
        Some(WindSpeedBucket::Light)
    } else if speed < 16.0 {
        Some(WindSpeedBucket::Moderate)
    } else if speed < 20.0 {
        Some(WindSpeedBucket::Fresh)
    } else {
        Some(WindSpeedBucket::Strong)
    }
}

/// True when the session starts between dawn and dusk (inclusive) of its day.
pub fn in_daylight(session: &SurfSession) -> bool {
    session
        .sunlight
        .as_ref()
        .is_some_and(|sun| sun.dawn <= session.timestamp && session.timestamp <= sun.dusk)
}

/// True when the session has a real swell and a real wave to ride.
pub fn has_rideable_swell(session: &SurfSession) -> bool {
    session.swell_period.is_some_and(|p| p > 0.0)
        && session.min_wave_size.is_some_and(|m| m > 0.0)
}

/// Drop night-time sessions, sessions without swell or waves, and sessions
/// outside `target_dates`.
pub fn filter_sessions(sessions: Vec<SurfSession>, target_dates: &[NaiveDate]) -> Vec<SurfSession> {
    sessions
        .into_iter()
        .filter(|s| in_daylight(s) && has_rideable_swell(s))
        .filter(|s| target_dates.contains(&s.date()))
        .collect()
}

/// One-hot column name, e.g. `wind_type_Cross-shore`.
pub fn indicator_column(prefix: &str, category: &str) -> String {
    format!("{}_{}", prefix, category)
}

/// Assign wind speed buckets and one-hot indicators to every session.
///
/// Returns the set of indicator columns present in the data: a category only
/// produces a column when at least one session exhibits it.
pub fn encode_features(sessions: &mut [SurfSession]) -> BTreeSet<String> {
    let mut columns = BTreeSet::new();

    for session in sessions.iter_mut() {
        session.wind_speed_bucket = session.wind_speed.and_then(bucket_wind_speed);
        session.indicators.clear();

        if let Some(wind_type) = session.wind_type.as_deref() {
            session
                .indicators
                .insert(indicator_column(WIND_TYPE_PREFIX, wind_type));
        }
        if let Some(bucket) = session.wind_speed_bucket {
            session
                .indicators
                .insert(indicator_column(WIND_SPEED_BUCKET_PREFIX, bucket.label()));
        }

        columns.extend(session.indicators.iter().cloned());
    }

    columns
}
