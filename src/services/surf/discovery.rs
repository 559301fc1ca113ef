//! Spot discovery filters and the travel-time join.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::errors::AppError;
use crate::helpers::round_1dp;
use crate::services::surf::models::{CandidateSpot, DistanceRecord, Spot};

/// Sub-regions worth driving to. Matched exactly and case-sensitively.
pub const INTEREST_SUBREGIONS: [&str; 10] = [
    "Gower",
    "North Cornwall",
    "North Devon",
    "Severn Estuary",
    "South Devon",
    "South Cornwall",
    "South Pembrokeshire",
    "Southern England West",
    "Southern England East",
    "West Cornwall",
];

/// Keep only spots in one of the [`INTEREST_SUBREGIONS`].
pub fn filter_subregions(spots: Vec<Spot>) -> Vec<Spot> {
    spots
        .into_iter()
        .filter(|s| INTEREST_SUBREGIONS.contains(&s.sub_region.as_str()))
        .collect()
}

/// Load the travel-time table from disk.
pub fn load_distances(path: &Path) -> Result<Vec<DistanceRecord>, AppError> {
    let file = std::fs::File::open(path).map_err(|e| {
        AppError::ReferenceDataMissing(format!("cannot open {}: {}", path.display(), e))
    })?;
    parse_distances(file).map_err(|e| match e {
        AppError::ReferenceDataMissing(msg) => {
            AppError::ReferenceDataMissing(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}

/// Parse `spot_id,duration_hours` CSV rows (other columns are ignored) and
/// round every duration to one decimal place.
pub fn parse_distances<R: Read>(reader: R) -> Result<Vec<DistanceRecord>, AppError> {
    let mut records = Vec::new();
    for row in csv::Reader::from_reader(reader).deserialize::<DistanceRecord>() {
        let mut record =
            row.map_err(|e| AppError::ReferenceDataMissing(format!("bad distance row: {}", e)))?;
        record.duration_hours = round_1dp(record.duration_hours);
        records.push(record);
    }
    Ok(records)
}

/// Inner-join spots with their travel time, keeping those strictly under
/// `max_hours`. Spots without a travel time are dropped.
pub fn apply_distance_filter(
    spots: Vec<Spot>,
    distances: &[DistanceRecord],
    max_hours: f64,
) -> Vec<CandidateSpot> {
    let mut by_spot: HashMap<&str, f64> = HashMap::with_capacity(distances.len());
    for d in distances {
        by_spot.entry(d.spot_id.as_str()).or_insert(d.duration_hours);
    }

    spots
        .into_iter()
        .filter_map(|spot| {
            let duration_hours = *by_spot.get(spot.spot_id.as_str())?;
            if duration_hours < max_hours {
                Some(CandidateSpot {
                    spot,
                    duration_hours,
                })
            } else {
                tracing::debug!(
                    "Skipping {} ({}): {}h away",
                    spot.spot_name,
                    spot.spot_id,
                    duration_hours
                );
                None
            }
        })
        .collect()
}
