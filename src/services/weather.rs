//! tomorrow.io realtime weather client.
//!
//! One request per run, no retry: a failed call simply yields no reading.

use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::{json, Value};

/// Collection the readings are written to.
pub const WEATHER_COLLECTION: &str = "weather";

/// Column order of the row produced by [`WeatherReading::to_row`].
pub const WEATHER_SCHEMA: [&str; 7] = [
    "humidity",
    "precipitation_probability",
    "rain_intensity",
    "temperature",
    "temperature_apparent",
    "uv_index",
    "wind_speed",
];

/// Central Bristol.
pub const WEATHER_LOCATION: &str = "51.454514, -2.587910";

/// Current conditions at [`WEATHER_LOCATION`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub humidity: f64,
    pub precipitation_probability: f64,
    pub rain_intensity: f64,
    pub temperature: f64,
    pub temperature_apparent: f64,
    pub uv_index: f64,
    pub wind_speed: f64,
}

impl WeatherReading {
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            json!(self.humidity),
            json!(self.precipitation_probability),
            json!(self.rain_intensity),
            json!(self.temperature),
            json!(self.temperature_apparent),
            json!(self.uv_index),
            json!(self.wind_speed),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct RealtimeResponse {
    data: RealtimeData,
}

#[derive(Debug, Deserialize)]
struct RealtimeData {
    values: WeatherReading,
}

/// Client for the tomorrow.io realtime endpoint.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(api_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Fetch current conditions. Any failure is logged and yields `None`.
    pub async fn process(&self) -> Option<WeatherReading> {
        let result = self
            .client
            .get(&self.api_url)
            .header(ACCEPT, "application/json")
            .query(&[("location", WEATHER_LOCATION), ("apikey", self.api_key.as_str())])
            .send()
            .await;

        let response = match result {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!("Weather API returned HTTP {}", r.status());
                return None;
            }
            Err(e) => {
                tracing::warn!("Weather API request failed: {}", e);
                return None;
            }
        };

        match response.json::<RealtimeResponse>().await {
            Ok(body) => Some(body.data.values),
            Err(e) => {
                tracing::warn!("Weather API JSON parse error: {}", e);
                None
            }
        }
    }
}
