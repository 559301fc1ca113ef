use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::StoredDocument;
use crate::helpers::unix_seconds;

/// Zip each row with `schema` into a document and stamp it with `now`.
///
/// Like `zip`, a row longer or shorter than the schema is truncated to the
/// shorter of the two.
pub fn build_documents(
    rows: &[Vec<Value>],
    schema: &[&str],
    now: DateTime<Utc>,
) -> Vec<Map<String, Value>> {
    rows.iter()
        .map(|row| {
            let mut doc: Map<String, Value> = schema
                .iter()
                .zip(row)
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect();
            doc.insert("unix".to_string(), json!(unix_seconds(now)));
            doc.insert("datetime".to_string(), json!(now));
            doc
        })
        .collect()
}

/// Write `rows` into `collection`, truncating it first when `overwrite` is
/// set. Returns the generated document IDs in row order.
pub async fn write_documents(
    pool: &PgPool,
    collection: &str,
    rows: &[Vec<Value>],
    schema: &[&str],
    overwrite: bool,
) -> Result<Vec<Uuid>, sqlx::Error> {
    let now = Utc::now();
    let documents = build_documents(rows, schema, now);

    let mut tx = pool.begin().await?;

    if overwrite {
        let dropped = sqlx::query("DELETE FROM documents WHERE collection = $1")
            .bind(collection)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tracing::debug!("Dropped {} documents from '{}'", dropped, collection);
    }

    let mut ids = Vec::with_capacity(documents.len());
    for doc in documents {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO documents (id, collection, document, created_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(collection)
        .bind(Value::Object(doc))
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        ids.push(id);
    }

    tx.commit().await?;
    Ok(ids)
}

/// Documents of `collection` created at or after `since`, newest first.
/// When `filter` is given, only documents containing it (JSONB `@>`) match.
pub async fn recent_documents(
    pool: &PgPool,
    collection: &str,
    since: DateTime<Utc>,
    filter: Option<&Value>,
) -> Result<Vec<StoredDocument>, sqlx::Error> {
    let filter = filter.cloned().unwrap_or_else(|| json!({}));
    sqlx::query_as::<_, StoredDocument>(
        "SELECT id, collection, document, created_at
         FROM documents
         WHERE collection = $1
           AND created_at >= $2
           AND document @> $3
         ORDER BY created_at DESC",
    )
    .bind(collection)
    .bind(since)
    .bind(filter)
    .fetch_all(pool)
    .await
}

/// Most recent write time of every non-empty collection, by name.
pub async fn latest_writes(pool: &PgPool) -> Result<Vec<(String, DateTime<Utc>)>, sqlx::Error> {
    sqlx::query_as::<_, (String, DateTime<Utc>)>(
        "SELECT collection, MAX(created_at)
         FROM documents
         GROUP BY collection
         ORDER BY collection",
    )
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-10-19T12:00:00.25Z".parse::<DateTime<Utc>>().unwrap()
    }

    #[test]
    fn test_build_documents_zips_schema() {
        let rows = vec![vec![json!(21.5), json!(48.0)]];
        let docs = build_documents(&rows, &["temperature_c", "humidity"], now());

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["temperature_c"], json!(21.5));
        assert_eq!(docs[0]["humidity"], json!(48.0));
    }

    #[test]
    fn test_build_documents_stamps_time() {
        let rows = vec![vec![json!(1)], vec![json!(2)]];
        let docs = build_documents(&rows, &["value"], now());

        for doc in &docs {
            assert_eq!(doc["unix"], json!(1792411200.25));
            assert_eq!(doc["datetime"], json!("2026-10-19T12:00:00.250Z"));
        }
    }

    #[test]
    fn test_build_documents_truncates_to_shorter() {
        let rows = vec![vec![json!(1), json!(2), json!(3)]];
        let docs = build_documents(&rows, &["a", "b"], now());
        assert_eq!(docs[0].len(), 4);
        assert!(!docs[0].contains_key("c"));

        let short = build_documents(&[vec![json!(1)]], &["a", "b"], now());
        assert!(short[0].contains_key("a"));
        assert!(!short[0].contains_key("b"));
    }

    #[test]
    fn test_build_documents_empty() {
        assert!(build_documents(&[], &["a"], now()).is_empty());
    }
}
