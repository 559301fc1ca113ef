//! Indoor temperature/humidity sensor polling.
//!
//! DHT11 sensors fail often and transiently, so reads are retried with a
//! fixed backoff. The sensor is consumed by [`poll`] and dropped on every
//! exit path, which releases the underlying handle.

use serde_json::{json, Value};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::AppError;

/// Collection the readings are written to.
pub const METRICS_COLLECTION: &str = "metrics";

/// Column order of the row produced by [`SensorReading::to_row`].
pub const METRICS_SCHEMA: [&str; 2] = ["temperature_c", "humidity"];

const MAX_ATTEMPTS: u32 = 10;
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Channel files exposed by the kernel `dht11` IIO driver, in milli-units.
const TEMPERATURE_CHANNEL: &str = "in_temp_input";
const HUMIDITY_CHANNEL: &str = "in_humidityrelative_input";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature_c: f64,
    pub humidity: f64,
}

impl SensorReading {
    /// The driver reports 0/0 before its first successful conversion.
    fn is_blank(&self) -> bool {
        self.temperature_c == 0.0 && self.humidity == 0.0
    }

    pub fn to_row(&self) -> Vec<Value> {
        vec![json!(self.temperature_c), json!(self.humidity)]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SensorFault {
    /// Checksum or timing failure; worth another try.
    #[error("transient sensor fault: {0}")]
    Transient(String),
    #[error("sensor fault: {0}")]
    Fatal(String),
}

/// A temperature/humidity source.
pub trait Sensor {
    fn read(&mut self) -> Result<SensorReading, SensorFault>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            backoff: RETRY_BACKOFF,
        }
    }
}

/// DHT11 read through the Linux IIO sysfs interface.
#[derive(Debug)]
pub struct Dht11Sensor {
    device_dir: PathBuf,
    temperature: File,
    humidity: File,
}

impl Dht11Sensor {
    pub fn open(device_dir: &Path) -> Result<Self, AppError> {
        let open = |channel: &str| {
            let path = device_dir.join(channel);
            File::open(&path).map_err(|e| {
                AppError::SensorReadFailure(format!("cannot open {}: {}", path.display(), e))
            })
        };
        Ok(Self {
            device_dir: device_dir.to_path_buf(),
            temperature: open(TEMPERATURE_CHANNEL)?,
            humidity: open(HUMIDITY_CHANNEL)?,
        })
    }
}

fn read_channel(file: &mut File, channel: &str) -> Result<f64, SensorFault> {
    let mut raw = String::new();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_string(&mut raw))
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                SensorFault::Fatal(format!("{}: {}", channel, e))
            }
            _ => SensorFault::Transient(format!("{}: {}", channel, e)),
        })?;

    raw.trim()
        .parse::<f64>()
        .map(|milli| milli / 1000.0)
        .map_err(|_| SensorFault::Transient(format!("{}: unreadable value '{}'", channel, raw.trim())))
}

impl Sensor for Dht11Sensor {
    fn read(&mut self) -> Result<SensorReading, SensorFault> {
        Ok(SensorReading {
            temperature_c: read_channel(&mut self.temperature, TEMPERATURE_CHANNEL)?,
            humidity: read_channel(&mut self.humidity, HUMIDITY_CHANNEL)?,
        })
    }
}

impl Drop for Dht11Sensor {
    fn drop(&mut self) {
        tracing::debug!("Released DHT11 sensor at {}", self.device_dir.display());
    }
}

/// Read the sensor until it yields a non-blank reading, a fatal fault occurs
/// or `policy.max_attempts` is spent. Returns `None` unless a reading was
/// obtained.
pub async fn poll<S: Sensor>(mut sensor: S, policy: RetryPolicy) -> Option<SensorReading> {
    for attempt in 1..=policy.max_attempts {
        match sensor.read() {
            Ok(reading) if !reading.is_blank() => {
                tracing::debug!("Sensor read succeeded on attempt {}", attempt);
                return Some(reading);
            }
            Ok(_) => {
                tracing::debug!("Sensor returned a blank reading on attempt {}", attempt);
            }
            Err(SensorFault::Transient(msg)) => {
                tracing::warn!(
                    "Sensor read attempt {}/{} failed: {}",
                    attempt,
                    policy.max_attempts,
                    msg
                );
            }
            Err(fault @ SensorFault::Fatal(_)) => {
                tracing::error!("Giving up on sensor: {}", fault);
                return None;
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.backoff).await;
        }
    }

    tracing::warn!(
        "No sensor reading after {} attempts",
        policy.max_attempts
    );
    None
}

/// Open the DHT11 at `device_dir` and poll it with the default policy.
pub async fn process(device_dir: &Path) -> Option<SensorReading> {
    match Dht11Sensor::open(device_dir) {
        Ok(sensor) => poll(sensor, RetryPolicy::default()).await,
        Err(e) => {
            tracing::error!("{}", e);
            None
        }
    }
}
