use std::path::PathBuf;

use crate::errors::AppError;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// tomorrow.io key; only the weather job needs it.
    pub weather_api_key: Option<String>,
    pub weather_api_url: String,
    pub surfline_api_url: String,
    /// Directory containing `dist.csv`.
    pub data_dir: PathBuf,
    /// Spots at or beyond this travel time (hours) are skipped.
    pub max_travel_hours: f64,
    /// IIO device directory exposed by the kernel DHT11 driver.
    pub sensor_device_dir: PathBuf,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/reorg".to_string()),
            weather_api_key: std::env::var("WEATHER_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            weather_api_url: std::env::var("WEATHER_API_URL")
                .unwrap_or_else(|_| "https://api.tomorrow.io/v4/weather/realtime".to_string()),
            surfline_api_url: std::env::var("SURFLINE_API_URL")
                .unwrap_or_else(|_| "https://services.surfline.com".to_string()),
            data_dir: PathBuf::from(
                std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            ),
            max_travel_hours: parse_var("MAX_TRAVEL_HOURS", 3.0)?,
            sensor_device_dir: PathBuf::from(
                std::env::var("SENSOR_DEVICE_DIR")
                    .unwrap_or_else(|_| "/sys/bus/iio/devices/iio:device0".to_string()),
            ),
            port: parse_var("PORT", 8080)?,
        })
    }

    /// Path of the spot travel-time reference table.
    pub fn distances_path(&self) -> PathBuf {
        self.data_dir.join("dist.csv")
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}
