//! Weekend surf-session recommendation pipeline.
//!
//! Stages run strictly in order:
//! 1. discover spots in the bounding box and keep the interesting sub-regions
//! 2. join with precomputed travel times and drop spots that are too far
//! 3. fetch wave, wind and sunlight feeds per spot and join them
//! 4. keep daylight sessions with real swell on the target weekend, encode wind
//! 5. score against the ideal session and keep the top dense ranks per day

pub mod discovery;
pub mod feeds;
pub mod features;
pub mod models;
pub mod scoring;

use chrono::NaiveDate;
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::surfline::{SurflineClient, DISCOVERY_BOUNDS};
use models::RankedSession;

/// Collection the ranked sessions are written to.
pub const SURF_COLLECTION: &str = "surf";

/// Column order of the rows produced by [`to_rows`].
pub const SURF_SCHEMA: [&str; 17] = [
    "spot_name",
    "sub_region",
    "duration_hours",
    "timestamp",
    "min_wave_size",
    "max_wave_size",
    "swell_period",
    "wind_speed",
    "dawn",
    "sunrise",
    "sunset",
    "dusk",
    "wind_type_Cross-shore",
    "wind_type_Offshore",
    "wind_type_Onshore",
    "rank",
    "weighted_sum",
];

/// Output value for a swell period the provider never reported.
const MISSING_SWELL_PERIOD: f64 = -1.0;
/// Value for a wave size the provider never reported, both when scoring
/// and in output rows.
pub(crate) const MISSING_WAVE_SIZE: f64 = 0.0;

/// Inputs of one pipeline run.
#[derive(Debug, Clone)]
pub struct SurfSettings {
    pub distances_path: PathBuf,
    pub max_travel_hours: f64,
    pub target_dates: Vec<NaiveDate>,
}

impl SurfSettings {
    /// Settings for a run targeting the weekend following `today`.
    pub fn from_config(config: &AppConfig, today: NaiveDate) -> Self {
        Self {
            distances_path: config.distances_path(),
            max_travel_hours: config.max_travel_hours,
            target_dates: features::next_weekend(today).to_vec(),
        }
    }
}

/// Run the whole pipeline and return the retained sessions ordered by
/// (date, rank).
pub async fn process(
    client: &SurflineClient,
    settings: &SurfSettings,
) -> Result<Vec<RankedSession>, AppError> {
    let distances = discovery::load_distances(&settings.distances_path)?;

    let spots = client.discover_spots(&DISCOVERY_BOUNDS).await?;
    let discovered = spots.len();
    let spots = discovery::filter_subregions(spots);
    let candidates =
        discovery::apply_distance_filter(spots, &distances, settings.max_travel_hours);
    tracing::info!(
        "Discovered {} spots, {} within {}h",
        discovered,
        candidates.len(),
        settings.max_travel_hours
    );

    let mut sessions = Vec::new();
    feeds::extract_all(client, &candidates, &mut sessions).await;
    let joined = sessions.len();

    let mut sessions = features::filter_sessions(sessions, &settings.target_dates);
    tracing::info!(
        "{} of {} joined sessions fall in daylight on {:?}",
        sessions.len(),
        joined,
        settings.target_dates
    );

    let columns = features::encode_features(&mut sessions);
    scoring::score_sessions(&mut sessions, &columns);
    let top = scoring::top_sessions(sessions);

    tracing::info!("Selected {} ranked sessions", top.len());
    Ok(top)
}

/// Flatten ranked sessions into rows matching [`SURF_SCHEMA`]. Missing swell
/// periods and wave sizes become the stored sentinels.
pub fn to_rows(sessions: &[RankedSession]) -> Vec<Vec<Value>> {
    sessions
        .iter()
        .map(|ranked| {
            let s = &ranked.session;
            let sun = s.sunlight.as_ref();
            vec![
                json!(s.spot_name),
                json!(s.sub_region),
                json!(s.duration_hours),
                json!(s.timestamp),
                json!(s.min_wave_size.unwrap_or(MISSING_WAVE_SIZE)),
                json!(s.max_wave_size.unwrap_or(MISSING_WAVE_SIZE)),
                json!(s.swell_period.unwrap_or(MISSING_SWELL_PERIOD)),
                json!(s.wind_speed),
                json!(sun.map(|w| w.dawn)),
                json!(sun.map(|w| w.sunrise)),
                json!(sun.map(|w| w.sunset)),
                json!(sun.map(|w| w.dusk)),
                json!(s.has_indicator("wind_type_Cross-shore")),
                json!(s.has_indicator("wind_type_Offshore")),
                json!(s.has_indicator("wind_type_Onshore")),
                json!(ranked.rank),
                json!(s.weighted_sum),
            ]
        })
        .collect()
}
