//! Rank next weekend's surf sessions and replace the `surf` collection.

use reorg_telemetry::config::AppConfig;
use reorg_telemetry::db::{self, queries};
use reorg_telemetry::errors::AppError;
use reorg_telemetry::services::surf::{self, SurfSettings, SURF_COLLECTION, SURF_SCHEMA};
use reorg_telemetry::services::surfline::SurflineClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AppError> {
    reorg_telemetry::init_tracing();
    let config = AppConfig::from_env()?;

    let today = chrono::Local::now().date_naive();
    let settings = SurfSettings::from_config(&config, today);
    let client = SurflineClient::new(&config.surfline_api_url);

    let sessions = surf::process(&client, &settings).await?;
    if sessions.is_empty() {
        tracing::warn!("No surf sessions for {:?}; nothing stored", settings.target_dates);
        return Ok(());
    }

    let pool = db::connect(&config.database_url).await?;
    let ids = queries::write_documents(
        &pool,
        SURF_COLLECTION,
        &surf::to_rows(&sessions),
        &SURF_SCHEMA,
        true,
    )
    .await?;
    tracing::info!("Stored {} sessions in '{}'", ids.len(), SURF_COLLECTION);
    Ok(())
}
