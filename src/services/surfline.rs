//! Surfline KBYG client.
//!
//! Spot discovery is strict: any failure aborts the run. The per-spot
//! forecast feeds are best effort: each call is preceded by a randomized
//! delay to stay under the provider's rate limits, and a failed call backs
//! off briefly and yields an empty feed instead of an error.

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::errors::AppError;
use crate::helpers::unix_to_utc;
use crate::services::surf::models::{Spot, SunlightWindow, WaveReading, WindReading};

/// Shortest delay before a feed request.
const FEED_THROTTLE_MIN: Duration = Duration::from_secs(2);

/// Upper (exclusive) bound of the delay before a feed request.
const FEED_THROTTLE_MAX: Duration = Duration::from_secs(10);

/// Pause after a failed feed request before moving on.
const FEED_FAILURE_BACKOFF: Duration = Duration::from_secs(3);

/// Geographic bounding box for spot discovery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

/// South-west England and south Wales.
pub const DISCOVERY_BOUNDS: BoundingBox = BoundingBox {
    south: 48.90805939965008,
    west: -8.920898437500002,
    north: 52.67638208083924,
    east: 0.7580566406250001,
};

/// The forecast feeds fetched for every candidate spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Wave,
    Wind,
    Sunlight,
}

impl FeedKind {
    fn name(self) -> &'static str {
        match self {
            FeedKind::Wave => "wave",
            FeedKind::Wind => "wind",
            FeedKind::Sunlight => "sunlight",
        }
    }

    fn query(self) -> &'static [(&'static str, &'static str)] {
        match self {
            FeedKind::Wave => &[
                ("days", "5"),
                ("intervalHours", "1"),
                ("cacheEnabled", "true"),
                ("units[swellHeight]", "FT"),
                ("units[waveHeight]", "FT"),
            ],
            FeedKind::Wind => &[
                ("days", "5"),
                ("intervalHours", "1"),
                ("corrected", "false"),
                ("cacheEnabled", "true"),
                ("units[windSpeed]", "MPH"),
            ],
            FeedKind::Sunlight => &[("days", "16"), ("intervalHours", "1")],
        }
    }
}

/// Client for the Surfline KBYG API.
#[derive(Debug, Clone)]
pub struct SurflineClient {
    client: reqwest::Client,
    base_url: String,
    throttle_min: Duration,
    throttle_max: Duration,
    failure_backoff: Duration,
}

// --- Surfline JSON response types ---

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct MapviewData {
    #[serde(default)]
    spots: Vec<RawSpot>,
}

#[derive(Debug, Deserialize)]
struct RawSpot {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    subregion: Option<RawSubregion>,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct RawSubregion {
    name: String,
}

// Feed entries are kept as raw JSON and decoded one by one, so a single
// malformed hour does not cost the whole feed.

#[derive(Debug, Deserialize)]
struct WaveData {
    #[serde(default)]
    wave: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawWave {
    timestamp: i64,
    #[serde(default)]
    surf: Option<RawSurf>,
    #[serde(default)]
    swells: Option<Vec<RawSwell>>,
}

#[derive(Debug, Deserialize)]
struct RawSurf {
    #[serde(default)]
    raw: Option<RawSurfSize>,
}

#[derive(Debug, Deserialize)]
struct RawSurfSize {
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawSwell {
    #[serde(default)]
    pub(crate) impact: Option<f64>,
    #[serde(default)]
    pub(crate) period: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WindData {
    #[serde(default)]
    wind: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWind {
    timestamp: i64,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    direction: Option<f64>,
    #[serde(default)]
    direction_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SunlightData {
    #[serde(default)]
    sunlight: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawSunlight {
    dawn: i64,
    sunrise: i64,
    sunset: i64,
    dusk: i64,
}

impl SurflineClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            throttle_min: FEED_THROTTLE_MIN,
            throttle_max: FEED_THROTTLE_MAX,
            failure_backoff: FEED_FAILURE_BACKOFF,
        }
    }

    /// Override the randomized pre-request delay range `[min, max)`.
    pub fn with_throttle(mut self, min: Duration, max: Duration) -> Self {
        self.throttle_min = min;
        self.throttle_max = max;
        self
    }

    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    /// Fetch every spot inside `bounds`.
    pub async fn discover_spots(&self, bounds: &BoundingBox) -> Result<Vec<Spot>, AppError> {
        let url = format!("{}/kbyg/mapview", self.base_url);
        tracing::debug!("Discovering spots via {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("south", bounds.south),
                ("west", bounds.west),
                ("north", bounds.north),
                ("east", bounds.east),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::UpstreamUnavailable(format!("surfline mapview request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamBadStatus {
                service: "surfline mapview".to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: Envelope<MapviewData> = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("surfline mapview JSON parse error: {}", e))
        })?;

        Ok(body
            .data
            .spots
            .into_iter()
            .map(|raw| Spot {
                spot_id: raw.id,
                spot_name: raw.name,
                sub_region: raw.subregion.map(|s| s.name).unwrap_or_default(),
                lat: raw.lat,
                lon: raw.lon,
            })
            .collect())
    }

    pub async fn fetch_waves(&self, spot_id: &str) -> Vec<WaveReading> {
        let Some(body) = self
            .fetch_feed::<Envelope<WaveData>>(spot_id, FeedKind::Wave)
            .await
        else {
            return Vec::new();
        };

        decode_entries::<RawWave>(body.data.wave, spot_id, FeedKind::Wave)
            .into_iter()
            .filter_map(|wave| {
                let timestamp = unix_to_utc(wave.timestamp)?;
                let size = wave.surf.and_then(|s| s.raw);
                Some(WaveReading {
                    spot_id: spot_id.to_string(),
                    timestamp,
                    min_wave_size: size.as_ref().and_then(|r| r.min),
                    max_wave_size: size.as_ref().and_then(|r| r.max),
                    swell_period: dominant_swell_period(&wave.swells.unwrap_or_default()),
                })
            })
            .collect()
    }

    pub async fn fetch_wind(&self, spot_id: &str) -> Vec<WindReading> {
        let Some(body) = self
            .fetch_feed::<Envelope<WindData>>(spot_id, FeedKind::Wind)
            .await
        else {
            return Vec::new();
        };

        decode_entries::<RawWind>(body.data.wind, spot_id, FeedKind::Wind)
            .into_iter()
            .filter_map(|wind| {
                Some(WindReading {
                    spot_id: spot_id.to_string(),
                    timestamp: unix_to_utc(wind.timestamp)?,
                    wind_speed: wind.speed,
                    wind_direction: wind.direction,
                    wind_type: wind.direction_type,
                })
            })
            .collect()
    }

    pub async fn fetch_sunlight(&self, spot_id: &str) -> Vec<SunlightWindow> {
        let Some(body) = self
            .fetch_feed::<Envelope<SunlightData>>(spot_id, FeedKind::Sunlight)
            .await
        else {
            return Vec::new();
        };

        decode_entries::<RawSunlight>(body.data.sunlight, spot_id, FeedKind::Sunlight)
            .into_iter()
            .filter_map(|sun| {
                let dawn = unix_to_utc(sun.dawn)?;
                Some(SunlightWindow {
                    spot_id: spot_id.to_string(),
                    date: dawn.date_naive(),
                    dawn,
                    sunrise: unix_to_utc(sun.sunrise)?,
                    sunset: unix_to_utc(sun.sunset)?,
                    dusk: unix_to_utc(sun.dusk)?,
                })
            })
            .collect()
    }

    /// Throttle, fetch and decode one feed. `None` means the feed is
    /// unavailable for this run.
    async fn fetch_feed<T: DeserializeOwned>(&self, spot_id: &str, kind: FeedKind) -> Option<T> {
        self.throttle().await;

        let url = format!("{}/kbyg/spots/forecasts/{}", self.base_url, kind.name());
        let result = self
            .client
            .get(&url)
            .query(&[("spotId", spot_id)])
            .query(kind.query())
            .send()
            .await;

        let response = match result {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(
                    "Surfline {} feed for spot {} returned HTTP {}",
                    kind.name(),
                    spot_id,
                    r.status()
                );
                tokio::time::sleep(self.failure_backoff).await;
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    "Surfline {} feed for spot {} failed: {}",
                    kind.name(),
                    spot_id,
                    e
                );
                tokio::time::sleep(self.failure_backoff).await;
                return None;
            }
        };

        match response.json::<T>().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!(
                    "Surfline {} feed for spot {} had an unreadable body: {}",
                    kind.name(),
                    spot_id,
                    e
                );
                tokio::time::sleep(self.failure_backoff).await;
                None
            }
        }
    }

    /// A random delay in `[throttle_min, throttle_max)`.
    fn throttle_delay(&self) -> Duration {
        if self.throttle_max > self.throttle_min {
            rand::rng().random_range(self.throttle_min..self.throttle_max)
        } else {
            self.throttle_min
        }
    }

    async fn throttle(&self) {
        tokio::time::sleep(self.throttle_delay()).await;
    }
}

/// Decode each feed entry on its own, dropping (and logging) the ones that do
/// not fit `T`.
fn decode_entries<T: DeserializeOwned>(
    entries: Vec<Value>,
    spot_id: &str,
    kind: FeedKind,
) -> Vec<T> {
    let total = entries.len();
    let decoded: Vec<T> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| match serde_json::from_value(entry) {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::warn!(
                    "Dropping {} entry {} for spot {}: {}",
                    kind.name(),
                    i,
                    spot_id,
                    e
                );
                None
            }
        })
        .collect();

    if decoded.len() < total {
        tracing::warn!(
            "Kept {} of {} {} entries for spot {}",
            decoded.len(),
            total,
            kind.name(),
            spot_id
        );
    }
    decoded
}

/// Period of the swell with the highest impact. The first swell wins ties and
/// a missing impact counts as zero.
pub(crate) fn dominant_swell_period(swells: &[RawSwell]) -> Option<f64> {
    let mut best: Option<&RawSwell> = None;
    for swell in swells {
        match best {
            Some(b) if swell.impact.unwrap_or(0.0) <= b.impact.unwrap_or(0.0) => {}
            _ => best = Some(swell),
        }
    }
    best.and_then(|s| s.period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn swell(impact: f64, period: f64) -> RawSwell {
        RawSwell {
            impact: Some(impact),
            period: Some(period),
        }
    }

    fn test_client(server: &MockServer) -> SurflineClient {
        SurflineClient::new(&server.uri())
            .with_throttle(Duration::ZERO, Duration::ZERO)
            .with_failure_backoff(Duration::ZERO)
    }

    #[test]
    fn test_dominant_swell_max_impact_wins() {
        let swells = vec![swell(1.0, 8.0), swell(5.0, 12.0)];
        assert_eq!(dominant_swell_period(&swells), Some(12.0));
    }

    #[test]
    fn test_dominant_swell_not_max_period() {
        let swells = vec![swell(5.0, 9.0), swell(0.5, 18.0)];
        assert_eq!(dominant_swell_period(&swells), Some(9.0));
    }

    #[test]
    fn test_dominant_swell_first_wins_tie() {
        let swells = vec![swell(2.0, 7.0), swell(2.0, 11.0)];
        assert_eq!(dominant_swell_period(&swells), Some(7.0));
    }

    #[test]
    fn test_default_pacing() {
        let client = SurflineClient::new("https://services.surfline.com/");
        assert_eq!(client.base_url, "https://services.surfline.com");
        assert_eq!(client.throttle_min, Duration::from_secs(2));
        assert_eq!(client.throttle_max, Duration::from_secs(10));
        assert_eq!(client.failure_backoff, Duration::from_secs(3));

        for _ in 0..200 {
            let delay = client.throttle_delay();
            assert!(
                delay >= FEED_THROTTLE_MIN && delay < FEED_THROTTLE_MAX,
                "delay {:?} outside [2s, 10s)",
                delay
            );
        }
    }

    #[test]
    fn test_zero_throttle_has_no_delay() {
        let client = SurflineClient::new("http://localhost")
            .with_throttle(Duration::ZERO, Duration::ZERO);
        assert_eq!(client.throttle_delay(), Duration::ZERO);
    }

    #[test]
    fn test_dominant_swell_empty() {
        assert_eq!(dominant_swell_period(&[]), None);
    }

    #[tokio::test]
    async fn test_discover_spots() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kbyg/mapview"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "spots": [
                        {
                            "_id": "5842041f4e65fad6a7708a01",
                            "name": "Fistral North",
                            "subregion": { "name": "North Cornwall" },
                            "lat": 50.4181,
                            "lon": -5.1003
                        },
                        {
                            "_id": "5842041f4e65fad6a7708a02",
                            "name": "Nowhere",
                            "lat": 51.0,
                            "lon": -3.0
                        }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let spots = test_client(&server)
            .discover_spots(&DISCOVERY_BOUNDS)
            .await
            .unwrap();

        assert_eq!(spots.len(), 2);
        assert_eq!(spots[0].spot_name, "Fistral North");
        assert_eq!(spots[0].sub_region, "North Cornwall");
        assert_eq!(spots[1].sub_region, "");
    }

    #[tokio::test]
    async fn test_discover_spots_bad_status_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kbyg/mapview"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .discover_spots(&DISCOVERY_BOUNDS)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::UpstreamBadStatus { status: 503, .. }
        ));
    }

    #[tokio::test]
    async fn test_fetch_waves_parses_readings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kbyg/spots/forecasts/wave"))
            .and(query_param("spotId", "spot-1"))
            .and(query_param("units[waveHeight]", "FT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "wave": [
                        {
                            "timestamp": 1771070400,
                            "surf": { "raw": { "min": 2.1, "max": 3.4 } },
                            "swells": [
                                { "impact": 1, "period": 8 },
                                { "impact": 5, "period": 12 }
                            ]
                        },
                        {
                            "timestamp": 1771074000,
                            "surf": {},
                            "swells": []
                        }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let waves = test_client(&server).fetch_waves("spot-1").await;

        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0].min_wave_size, Some(2.1));
        assert_eq!(waves[0].max_wave_size, Some(3.4));
        assert_eq!(waves[0].swell_period, Some(12.0));
        assert_eq!(waves[1].min_wave_size, None);
        assert_eq!(waves[1].swell_period, None);
    }

    #[tokio::test]
    async fn test_fetch_wind_parses_readings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kbyg/spots/forecasts/wind"))
            .and(query_param("units[windSpeed]", "MPH"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "wind": [
                        {
                            "timestamp": 1771070400,
                            "speed": 11.5,
                            "direction": 45.0,
                            "directionType": "Offshore"
                        }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let wind = test_client(&server).fetch_wind("spot-1").await;

        assert_eq!(wind.len(), 1);
        assert_eq!(wind[0].wind_speed, Some(11.5));
        assert_eq!(wind[0].wind_type.as_deref(), Some("Offshore"));
    }

    #[tokio::test]
    async fn test_fetch_sunlight_dates_from_dawn() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kbyg/spots/forecasts/sunlight"))
            .and(query_param("days", "16"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "sunlight": [
                        {
                            "dawn": 1771052400,
                            "sunrise": 1771054800,
                            "sunset": 1771091400,
                            "dusk": 1771093800
                        }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let sun = test_client(&server).fetch_sunlight("spot-1").await;

        assert_eq!(sun.len(), 1);
        assert_eq!(sun[0].date.to_string(), "2026-02-14");
        assert!(sun[0].dawn < sun[0].dusk);
    }

    #[tokio::test]
    async fn test_bad_wind_entry_keeps_the_rest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kbyg/spots/forecasts/wind"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "wind": [
                        { "timestamp": 1771070400, "speed": 11.5, "direction": 45.0, "directionType": "Offshore" },
                        { "timestamp": 1771074000, "speed": null, "direction": 50.0, "directionType": "Cross-shore" },
                        { "speed": 9.0, "direction": 40.0, "directionType": "Onshore" },
                        { "timestamp": 1771081200, "speed": 7.0, "direction": 30.0, "directionType": "Offshore" }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let wind = test_client(&server).fetch_wind("spot-1").await;

        // Only the entry without a timestamp is dropped.
        assert_eq!(wind.len(), 3);
        assert_eq!(wind[0].wind_speed, Some(11.5));
        assert_eq!(wind[1].wind_speed, None);
        assert_eq!(wind[1].wind_type.as_deref(), Some("Cross-shore"));
        assert_eq!(wind[2].wind_speed, Some(7.0));
    }

    #[tokio::test]
    async fn test_bad_wave_and_sunlight_entries_are_dropped_alone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kbyg/spots/forecasts/wave"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "wave": [
                        { "timestamp": null, "surf": { "raw": { "min": 1.0, "max": 2.0 } }, "swells": [] },
                        {
                            "timestamp": 1771074000,
                            "surf": { "raw": { "min": 2.0, "max": null } },
                            "swells": null
                        }
                    ]
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/kbyg/spots/forecasts/sunlight"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "sunlight": [
                        { "dawn": 1771052400, "sunrise": null, "sunset": 1771091400, "dusk": 1771093800 },
                        { "dawn": 1771138800, "sunrise": 1771141200, "sunset": 1771177800, "dusk": 1771180200 }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let waves = client.fetch_waves("spot-1").await;
        let sun = client.fetch_sunlight("spot-1").await;

        assert_eq!(waves.len(), 1);
        assert_eq!(waves[0].min_wave_size, Some(2.0));
        assert_eq!(waves[0].max_wave_size, None);
        assert_eq!(waves[0].swell_period, None);
        assert_eq!(sun.len(), 1);
        assert_eq!(sun[0].date.to_string(), "2026-02-15");
    }

    #[tokio::test]
    async fn test_feed_failure_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kbyg/spots/forecasts/wave"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let waves = test_client(&server).fetch_waves("spot-1").await;
        assert!(waves.is_empty());
    }

    #[tokio::test]
    async fn test_feed_malformed_body_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kbyg/spots/forecasts/wind"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let wind = test_client(&server).fetch_wind("spot-1").await;
        assert!(wind.is_empty());
    }
}
