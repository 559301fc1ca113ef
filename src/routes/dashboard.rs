use axum::extract::{Path, State};
use axum::Json;
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::db::{models::StoredDocument, queries};
use crate::errors::{AppError, ErrorResponse};
use crate::services::sensor::METRICS_COLLECTION;
use crate::services::surf::SURF_COLLECTION;
use crate::services::weather::WEATHER_COLLECTION;

/// How far back the read API looks.
const RECENT_WINDOW_DAYS: i64 = 5;

/// Collections served by the read API.
const KNOWN_COLLECTIONS: [&str; 3] = [METRICS_COLLECTION, WEATHER_COLLECTION, SURF_COLLECTION];

/// Response type for GET /api/v1/dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    /// Indoor temperature/humidity readings, newest first
    #[schema(value_type = Vec<Object>)]
    pub metrics: Vec<Value>,
    /// Regional weather readings, newest first
    #[schema(value_type = Vec<Object>)]
    pub weather: Vec<Value>,
    /// Best-ranked surf session of each day
    #[schema(value_type = Vec<Object>)]
    pub surf: Vec<Value>,
}

/// Response type for GET /api/v1/collections/:name.
#[derive(Debug, Serialize, ToSchema)]
pub struct CollectionResponse {
    pub collection: String,
    /// Documents from the last five days, newest first
    #[schema(value_type = Vec<Object>)]
    pub documents: Vec<Value>,
}

/// Drop the `unix` stamp; clients get `datetime` only.
fn project(doc: StoredDocument) -> Value {
    let mut document = doc.document;
    if let Value::Object(fields) = &mut document {
        fields.remove("unix");
    }
    document
}

async fn recent(
    pool: &PgPool,
    collection: &str,
    filter: Option<&Value>,
) -> Result<Vec<Value>, AppError> {
    let since = Utc::now() - Duration::days(RECENT_WINDOW_DAYS);
    let docs = queries::recent_documents(pool, collection, since, filter).await?;
    tracing::debug!("Read {} recent '{}' documents", docs.len(), collection);
    Ok(docs.into_iter().map(project).collect())
}

/// Recent documents of every collection.
///
/// Covers the last five days. Surf sessions are limited to rank 1.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Recent documents per collection", body = DashboardResponse),
        (status = 500, description = "Database error", body = ErrorResponse),
    )
)]
pub async fn get_dashboard(
    State(pool): State<PgPool>,
) -> Result<Json<DashboardResponse>, AppError> {
    let best_only = json!({ "rank": 1 });

    Ok(Json(DashboardResponse {
        metrics: recent(&pool, METRICS_COLLECTION, None).await?,
        weather: recent(&pool, WEATHER_COLLECTION, None).await?,
        surf: recent(&pool, SURF_COLLECTION, Some(&best_only)).await?,
    }))
}

/// Recent documents of a single collection, unfiltered.
#[utoipa::path(
    get,
    path = "/api/v1/collections/{name}",
    tag = "Dashboard",
    params(
        ("name" = String, Path, description = "One of metrics, weather or surf"),
    ),
    responses(
        (status = 200, description = "Recent documents of the collection", body = CollectionResponse),
        (status = 404, description = "Unknown collection", body = ErrorResponse),
    )
)]
pub async fn get_collection(
    State(pool): State<PgPool>,
    Path(name): Path<String>,
) -> Result<Json<CollectionResponse>, AppError> {
    let collection = known_collection(&name)?;
    Ok(Json(CollectionResponse {
        collection: collection.to_string(),
        documents: recent(&pool, collection, None).await?,
    }))
}

fn known_collection(name: &str) -> Result<&'static str, AppError> {
    KNOWN_COLLECTIONS
        .into_iter()
        .find(|c| *c == name)
        .ok_or_else(|| AppError::NotFound(format!("Collection '{}' not found", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn stored(document: Value) -> StoredDocument {
        StoredDocument {
            id: Uuid::new_v4(),
            collection: SURF_COLLECTION.to_string(),
            document,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_project_removes_unix_stamp() {
        let doc = stored(json!({
            "spot_name": "Fistral",
            "rank": 1,
            "unix": 1792411200.25,
            "datetime": "2026-10-19T12:00:00.250Z"
        }));

        let projected = project(doc);

        assert!(projected.get("unix").is_none());
        assert_eq!(projected["datetime"], json!("2026-10-19T12:00:00.250Z"));
        assert_eq!(projected["spot_name"], json!("Fistral"));
    }

    #[test]
    fn test_project_leaves_non_objects() {
        assert_eq!(project(stored(json!([1, 2]))), json!([1, 2]));
    }

    #[test]
    fn test_known_collection() {
        assert_eq!(known_collection("weather").unwrap(), WEATHER_COLLECTION);
        assert!(matches!(
            known_collection("races"),
            Err(AppError::NotFound(_))
        ));
    }
}
