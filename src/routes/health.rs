use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::db::queries;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" when the document store answers, "degraded" otherwise
    pub status: String,
    /// API version
    pub version: String,
    /// Whether the database is reachable
    pub database: bool,
    /// Time of the latest write per collection (RFC 3339)
    pub last_ingested: BTreeMap<String, String>,
}

impl HealthResponse {
    fn from_latest(latest: Option<Vec<(String, chrono::DateTime<chrono::Utc>)>>) -> Self {
        let database = latest.is_some();
        Self {
            status: if database { "ok" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
            last_ingested: latest
                .unwrap_or_default()
                .into_iter()
                .map(|(collection, at)| (collection, at.to_rfc3339()))
                .collect(),
        }
    }
}

/// Health check endpoint.
///
/// Still answers 200 when the database is unreachable, with status
/// "degraded", so a stalled ingestion job is told apart from a dead API.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service status", body = HealthResponse),
    )
)]
pub async fn health_check(State(pool): State<PgPool>) -> Json<HealthResponse> {
    let latest = match queries::latest_writes(&pool).await {
        Ok(latest) => Some(latest),
        Err(e) => {
            tracing::warn!("Health check could not reach the database: {}", e);
            None
        }
    };

    Json(HealthResponse::from_latest(latest))
}
