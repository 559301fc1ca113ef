//! Per-spot feed extraction and the wave/wind/sunlight left joins.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeSet, HashMap};

use crate::services::surf::models::{
    CandidateSpot, Closeness, SunlightWindow, SurfSession, WaveReading, WindReading,
};
use crate::services::surfline::SurflineClient;

/// Fetch the three feeds for every candidate, one spot and one feed at a
/// time, and append the joined rows to `sessions`.
pub async fn extract_all(
    client: &SurflineClient,
    candidates: &[CandidateSpot],
    sessions: &mut Vec<SurfSession>,
) {
    for (i, candidate) in candidates.iter().enumerate() {
        let spot_id = candidate.spot.spot_id.as_str();
        tracing::info!(
            "Fetching feeds for {} ({}/{})",
            candidate.spot.spot_name,
            i + 1,
            candidates.len()
        );

        let waves = client.fetch_waves(spot_id).await;
        let wind = client.fetch_wind(spot_id).await;
        let sunlight = client.fetch_sunlight(spot_id).await;

        let before = sessions.len();
        sessions.extend(merge_feeds(candidate, waves, &wind, &sunlight));
        tracing::debug!(
            "{}: {} wave rows joined",
            candidate.spot.spot_name,
            sessions.len() - before
        );
    }
}

/// Left-join wave readings with wind on timestamp and sunlight on the UTC
/// date of the timestamp. Every wave reading yields exactly one session;
/// missing wind or sunlight stays `None`.
///
/// When a feed reports the same key twice, the first entry is used.
pub fn merge_feeds(
    candidate: &CandidateSpot,
    waves: Vec<WaveReading>,
    wind: &[WindReading],
    sunlight: &[SunlightWindow],
) -> Vec<SurfSession> {
    let mut wind_by_time: HashMap<DateTime<Utc>, &WindReading> = HashMap::new();
    for w in wind.iter().filter(|w| w.spot_id == candidate.spot.spot_id) {
        wind_by_time.entry(w.timestamp).or_insert(w);
    }

    let mut sun_by_date: HashMap<NaiveDate, &SunlightWindow> = HashMap::new();
    for s in sunlight.iter().filter(|s| s.spot_id == candidate.spot.spot_id) {
        sun_by_date.entry(s.date).or_insert(s);
    }

    waves
        .into_iter()
        .filter(|w| w.spot_id == candidate.spot.spot_id)
        .map(|wave| {
            let wind = wind_by_time.get(&wave.timestamp).copied();
            let sun = sun_by_date.get(&wave.timestamp.date_naive()).copied();
            SurfSession {
                spot_id: wave.spot_id,
                spot_name: candidate.spot.spot_name.clone(),
                sub_region: candidate.spot.sub_region.clone(),
                duration_hours: candidate.duration_hours,
                timestamp: wave.timestamp,
                min_wave_size: wave.min_wave_size,
                max_wave_size: wave.max_wave_size,
                swell_period: wave.swell_period,
                wind_speed: wind.and_then(|w| w.wind_speed),
                wind_direction: wind.and_then(|w| w.wind_direction),
                wind_type: wind.and_then(|w| w.wind_type.clone()),
                sunlight: sun.cloned(),
                wind_speed_bucket: None,
                indicators: BTreeSet::new(),
                closeness: Closeness::default(),
                weighted_sum: 0.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::surf::models::Spot;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse::<DateTime<Utc>>().unwrap()
    }

    fn candidate() -> CandidateSpot {
        CandidateSpot {
            spot: Spot {
                spot_id: "spot-1".to_string(),
                spot_name: "Croyde".to_string(),
                sub_region: "North Devon".to_string(),
                lat: 51.13,
                lon: -4.24,
            },
            duration_hours: 1.4,
        }
    }

    fn wave(at: &str) -> WaveReading {
        WaveReading {
            spot_id: "spot-1".to_string(),
            timestamp: ts(at),
            min_wave_size: Some(2.0),
            max_wave_size: Some(3.0),
            swell_period: Some(11.0),
        }
    }

    fn wind(at: &str, speed: f64, kind: &str) -> WindReading {
        WindReading {
            spot_id: "spot-1".to_string(),
            timestamp: ts(at),
            wind_speed: Some(speed),
            wind_direction: Some(90.0),
            wind_type: Some(kind.to_string()),
        }
    }

    fn sun(date: &str) -> SunlightWindow {
        SunlightWindow {
            spot_id: "spot-1".to_string(),
            date: date.parse().unwrap(),
            dawn: ts(&format!("{}T06:30:00Z", date)),
            sunrise: ts(&format!("{}T07:00:00Z", date)),
            sunset: ts(&format!("{}T17:30:00Z", date)),
            dusk: ts(&format!("{}T18:00:00Z", date)),
        }
    }

    #[test]
    fn test_merge_joins_wind_and_sunlight() {
        let sessions = merge_feeds(
            &candidate(),
            vec![wave("2026-10-23T09:00:00Z")],
            &[wind("2026-10-23T09:00:00Z", 8.0, "Offshore")],
            &[sun("2026-10-23")],
        );

        assert_eq!(sessions.len(), 1);
        let s = &sessions[0];
        assert_eq!(s.spot_name, "Croyde");
        assert_eq!(s.duration_hours, 1.4);
        assert_eq!(s.wind_speed, Some(8.0));
        assert_eq!(s.wind_type.as_deref(), Some("Offshore"));
        assert_eq!(s.sunlight.as_ref().unwrap().dusk, ts("2026-10-23T18:00:00Z"));
    }

    #[test]
    fn test_merge_keeps_unmatched_wave_rows() {
        let sessions = merge_feeds(
            &candidate(),
            vec![wave("2026-10-23T09:00:00Z"), wave("2026-10-24T10:00:00Z")],
            &[wind("2026-10-23T10:00:00Z", 8.0, "Offshore")],
            &[sun("2026-10-23")],
        );

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].wind_speed, None);
        assert!(sessions[0].sunlight.is_some());
        assert!(sessions[1].sunlight.is_none());
    }

    #[test]
    fn test_merge_without_wave_rows_is_empty() {
        let sessions = merge_feeds(
            &candidate(),
            Vec::new(),
            &[wind("2026-10-23T09:00:00Z", 8.0, "Offshore")],
            &[sun("2026-10-23")],
        );
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_merge_first_duplicate_wins() {
        let sessions = merge_feeds(
            &candidate(),
            vec![wave("2026-10-23T09:00:00Z")],
            &[
                wind("2026-10-23T09:00:00Z", 8.0, "Offshore"),
                wind("2026-10-23T09:00:00Z", 25.0, "Onshore"),
            ],
            &[],
        );
        assert_eq!(sessions[0].wind_speed, Some(8.0));
    }
}
