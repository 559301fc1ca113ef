//! Typed records flowing through the surf pipeline.
//!
//! Each stage narrows or enriches these records; nothing here is mutated
//! after scoring.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;

/// A surf location returned by spot discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct Spot {
    pub spot_id: String,
    pub spot_name: String,
    pub sub_region: String,
    pub lat: f64,
    pub lon: f64,
}

/// Precomputed travel time from home to a spot.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct DistanceRecord {
    pub spot_id: String,
    /// Rounded to one decimal place once loaded.
    pub duration_hours: f64,
}

/// A spot that survived the sub-region and travel-time filters.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSpot {
    pub spot: Spot,
    pub duration_hours: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaveReading {
    pub spot_id: String,
    pub timestamp: DateTime<Utc>,
    pub min_wave_size: Option<f64>,
    pub max_wave_size: Option<f64>,
    /// Period of the highest-impact swell; `None` when no swells were reported.
    pub swell_period: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindReading {
    pub spot_id: String,
    pub timestamp: DateTime<Utc>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    /// Provider category: "Onshore", "Offshore" or "Cross-shore".
    pub wind_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SunlightWindow {
    pub spot_id: String,
    /// UTC date of `dawn`.
    pub date: NaiveDate,
    pub dawn: DateTime<Utc>,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub dusk: DateTime<Utc>,
}

/// Wind speed bands used for one-hot encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WindSpeedBucket {
    /// [0, 13) mph
    Light,
    /// [13, 16) mph
    Moderate,
    /// [16, 20) mph
    Fresh,
    /// [20, ∞) mph
    Strong,
}

impl WindSpeedBucket {
    pub fn label(self) -> &'static str {
        match self {
            WindSpeedBucket::Light => "0-12mph",
            WindSpeedBucket::Moderate => "13-15mph",
            WindSpeedBucket::Fresh => "16-20mph",
            WindSpeedBucket::Strong => "20+mph",
        }
    }
}

/// Closeness-to-ideal scores in `[.., 1]`, one per normalized field.
///
/// A field is `None` when the session had no value for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Closeness {
    pub swell_period: Option<f64>,
    pub min_wave_size: Option<f64>,
    pub max_wave_size: Option<f64>,
    pub duration_hours: Option<f64>,
}

/// One joined row: a wave reading with its wind and sunlight context.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfSession {
    pub spot_id: String,
    pub spot_name: String,
    pub sub_region: String,
    pub duration_hours: f64,
    pub timestamp: DateTime<Utc>,
    pub min_wave_size: Option<f64>,
    pub max_wave_size: Option<f64>,
    pub swell_period: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub wind_type: Option<String>,
    pub sunlight: Option<SunlightWindow>,

    // Derived during feature engineering and scoring.
    pub wind_speed_bucket: Option<WindSpeedBucket>,
    /// One-hot columns set to 1 for this row, e.g. `wind_type_Offshore`.
    pub indicators: BTreeSet<String>,
    pub closeness: Closeness,
    pub weighted_sum: f64,
}

impl SurfSession {
    /// UTC calendar date used for target-date filtering and rank partitions.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn has_indicator(&self, column: &str) -> bool {
        self.indicators.contains(column)
    }
}

/// A scored session with its dense rank inside its calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSession {
    pub session: SurfSession,
    pub rank: u32,
}
