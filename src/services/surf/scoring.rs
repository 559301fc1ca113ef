//! Closeness normalization, weighted scoring and per-day dense ranking.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::services::surf::models::{RankedSession, SurfSession};
use crate::services::surf::MISSING_WAVE_SIZE;

/// Ideal dominant swell period, seconds.
pub const IDEAL_SWELL_PERIOD: f64 = 15.0;
/// Ideal minimum wave face, feet.
pub const IDEAL_MIN_WAVE_SIZE: f64 = 2.5;
/// Ideal maximum wave face, feet.
pub const IDEAL_MAX_WAVE_SIZE: f64 = 3.5;
/// Ideal drive, hours.
pub const IDEAL_DURATION_HOURS: f64 = 1.25;

/// Sessions ranked worse than this within their day are discarded.
pub const MAX_RANK: u32 = 3;

/// Importance values are turned into multipliers as `BASELINE - importance`,
/// so importance 1 weighs +5 and importance 8 weighs -2.
const IMPORTANCE_BASELINE: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosenessField {
    SwellPeriod,
    MinWaveSize,
    MaxWaveSize,
    DurationHours,
}

/// A column that contributes to the weighted sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureColumn {
    /// A one-hot column, present only when some session exhibits the category.
    Indicator(&'static str),
    Closeness(ClosenessField),
}

pub const FEATURE_IMPORTANCE: [(FeatureColumn, i32); 11] = [
    (FeatureColumn::Indicator("wind_type_Cross-shore"), 3),
    (FeatureColumn::Indicator("wind_type_Offshore"), 1),
    (FeatureColumn::Indicator("wind_type_Onshore"), 8),
    (FeatureColumn::Indicator("wind_speed_bucket_0-12mph"), 1),
    (FeatureColumn::Indicator("wind_speed_bucket_13-15mph"), 1),
    (FeatureColumn::Indicator("wind_speed_bucket_16-20mph"), 6),
    (FeatureColumn::Indicator("wind_speed_bucket_20+mph"), 8),
    (FeatureColumn::Closeness(ClosenessField::SwellPeriod), 1),
    (FeatureColumn::Closeness(ClosenessField::MinWaveSize), 1),
    (FeatureColumn::Closeness(ClosenessField::MaxWaveSize), 1),
    (FeatureColumn::Closeness(ClosenessField::DurationHours), 3),
];

/// Score each value by its closeness to `target`: `1 - |v - target| / M`,
/// where `M` is the largest value in the column (not the largest distance).
/// When `M` is zero every value scores 1. Missing values stay missing and
/// are ignored when computing `M`.
pub fn normalize_closeness(values: &[Option<f64>], target: f64) -> Vec<Option<f64>> {
    let max_value = values
        .iter()
        .flatten()
        .copied()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))));

    let Some(max_value) = max_value else {
        return vec![None; values.len()];
    };

    values
        .iter()
        .map(|v| {
            v.map(|v| {
                if max_value == 0.0 {
                    1.0
                } else {
                    1.0 - (v - target).abs() / max_value
                }
            })
        })
        .collect()
}

/// Fill in the four closeness scores across the whole batch. Missing wave
/// sizes count as 0; a missing swell period stays unscored.
pub fn apply_closeness(sessions: &mut [SurfSession]) {
    let swell = normalize_closeness(
        &sessions.iter().map(|s| s.swell_period).collect::<Vec<_>>(),
        IDEAL_SWELL_PERIOD,
    );
    // An unreported wave size is scored as flat water.
    let wave_size = |v: Option<f64>| Some(v.unwrap_or(MISSING_WAVE_SIZE));
    let min_wave = normalize_closeness(
        &sessions
            .iter()
            .map(|s| wave_size(s.min_wave_size))
            .collect::<Vec<_>>(),
        IDEAL_MIN_WAVE_SIZE,
    );
    let max_wave = normalize_closeness(
        &sessions
            .iter()
            .map(|s| wave_size(s.max_wave_size))
            .collect::<Vec<_>>(),
        IDEAL_MAX_WAVE_SIZE,
    );
    let duration = normalize_closeness(
        &sessions
            .iter()
            .map(|s| Some(s.duration_hours))
            .collect::<Vec<_>>(),
        IDEAL_DURATION_HOURS,
    );

    for (i, session) in sessions.iter_mut().enumerate() {
        session.closeness.swell_period = swell[i];
        session.closeness.min_wave_size = min_wave[i];
        session.closeness.max_wave_size = max_wave[i];
        session.closeness.duration_hours = duration[i];
    }
}

fn column_value(session: &SurfSession, column: FeatureColumn) -> f64 {
    match column {
        FeatureColumn::Indicator(name) => {
            if session.has_indicator(name) {
                1.0
            } else {
                0.0
            }
        }
        FeatureColumn::Closeness(field) => {
            let c = &session.closeness;
            match field {
                ClosenessField::SwellPeriod => c.swell_period,
                ClosenessField::MinWaveSize => c.min_wave_size,
                ClosenessField::MaxWaveSize => c.max_wave_size,
                ClosenessField::DurationHours => c.duration_hours,
            }
            .unwrap_or(0.0)
        }
    }
}

/// `Σ (6 - importance) × value` over [`FEATURE_IMPORTANCE`]. Indicator
/// columns missing from `present_columns` are skipped.
pub fn weighted_sum(session: &SurfSession, present_columns: &BTreeSet<String>) -> f64 {
    FEATURE_IMPORTANCE
        .iter()
        .filter(|(column, _)| match column {
            FeatureColumn::Indicator(name) => present_columns.contains(*name),
            FeatureColumn::Closeness(_) => true,
        })
        .map(|&(column, importance)| {
            (IMPORTANCE_BASELINE - importance) as f64 * column_value(session, column)
        })
        .sum()
}

/// Compute closeness scores and weighted sums for the batch.
pub fn score_sessions(sessions: &mut [SurfSession], present_columns: &BTreeSet<String>) {
    apply_closeness(sessions);
    for session in sessions.iter_mut() {
        session.weighted_sum = weighted_sum(session, present_columns);
    }
}

/// Dense-rank sessions by descending weighted sum within each calendar date.
/// Output is grouped by date (ascending) and keeps input order within a date.
pub fn dense_rank(sessions: Vec<SurfSession>) -> Vec<RankedSession> {
    let mut by_date: BTreeMap<NaiveDate, Vec<SurfSession>> = BTreeMap::new();
    for session in sessions {
        by_date.entry(session.date()).or_default().push(session);
    }

    let mut ranked = Vec::new();
    for (_, day) in by_date {
        let mut distinct: Vec<f64> = day.iter().map(|s| s.weighted_sum).collect();
        distinct.sort_by(|a, b| b.total_cmp(a));
        distinct.dedup();

        for session in day {
            let position = distinct
                .iter()
                .position(|v| *v == session.weighted_sum)
                .unwrap_or(distinct.len());
            ranked.push(RankedSession {
                session,
                rank: position as u32 + 1,
            });
        }
    }
    ranked
}

/// Rank per day, keep ranks `1..=MAX_RANK`, and order by (date, rank).
pub fn top_sessions(sessions: Vec<SurfSession>) -> Vec<RankedSession> {
    let mut top: Vec<RankedSession> = dense_rank(sessions)
        .into_iter()
        .filter(|r| r.rank <= MAX_RANK)
        .collect();
    top.sort_by_key(|r| (r.session.date(), r.rank));
    top
}
