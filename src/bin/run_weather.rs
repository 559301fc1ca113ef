//! Fetch current Bristol conditions and store them under `weather`.

use reorg_telemetry::config::AppConfig;
use reorg_telemetry::db::{self, queries};
use reorg_telemetry::errors::AppError;
use reorg_telemetry::services::weather::{WeatherClient, WEATHER_COLLECTION, WEATHER_SCHEMA};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AppError> {
    reorg_telemetry::init_tracing();
    let config = AppConfig::from_env()?;

    let api_key = config
        .weather_api_key
        .as_deref()
        .ok_or_else(|| AppError::Config("WEATHER_API_KEY is not set".to_string()))?;
    let client = WeatherClient::new(&config.weather_api_url, api_key);

    let Some(reading) = client.process().await else {
        tracing::warn!("No weather reading; nothing stored");
        return Ok(());
    };

    let pool = db::connect(&config.database_url).await?;
    let ids = queries::write_documents(
        &pool,
        WEATHER_COLLECTION,
        &[reading.to_row()],
        &WEATHER_SCHEMA,
        false,
    )
    .await?;
    tracing::info!("Stored {:?} in '{}'", ids, WEATHER_COLLECTION);
    Ok(())
}
