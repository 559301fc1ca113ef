//! Poll the indoor DHT11 once and store the reading under `metrics`.

use reorg_telemetry::config::AppConfig;
use reorg_telemetry::db::{self, queries};
use reorg_telemetry::errors::AppError;
use reorg_telemetry::services::sensor::{self, METRICS_COLLECTION, METRICS_SCHEMA};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AppError> {
    reorg_telemetry::init_tracing();
    let config = AppConfig::from_env()?;

    let Some(reading) = sensor::process(&config.sensor_device_dir).await else {
        tracing::warn!("No sensor reading; nothing stored");
        return Ok(());
    };
    tracing::info!(
        "Indoor {:.1}°C at {:.0}% humidity",
        reading.temperature_c,
        reading.humidity
    );

    let pool = db::connect(&config.database_url).await?;
    let ids = queries::write_documents(
        &pool,
        METRICS_COLLECTION,
        &[reading.to_row()],
        &METRICS_SCHEMA,
        false,
    )
    .await?;
    tracing::info!("Stored {:?} in '{}'", ids, METRICS_COLLECTION);
    Ok(())
}
