use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A stored document together with its bookkeeping columns.
#[derive(Debug, Clone, FromRow)]
pub struct StoredDocument {
    pub id: Uuid,
    pub collection: String,
    /// The zipped row plus its `unix` and `datetime` stamps.
    pub document: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
