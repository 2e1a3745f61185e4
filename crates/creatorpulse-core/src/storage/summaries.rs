//! Storage for content summaries (§3 `ContentSummary`, C7), cached by
//! `(content_id, summary_type)`.

use super::DbPool;
use crate::error::StorageError;
use serde_json::Value;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentSummaryRow {
    pub id: String,
    pub content_id: String,
    pub title: String,
    pub key_points: String,
    pub summary: String,
    pub summary_type: String,
    pub metadata: String,
    pub created_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ContentSummary {
    pub id: String,
    pub content_id: String,
    pub title: String,
    pub key_points: Vec<String>,
    pub summary: String,
    pub summary_type: String,
    pub metadata: Value,
    pub created_at: String,
}

impl From<ContentSummaryRow> for ContentSummary {
    fn from(row: ContentSummaryRow) -> Self {
        ContentSummary {
            id: row.id,
            content_id: row.content_id,
            title: row.title,
            key_points: serde_json::from_str(&row.key_points).unwrap_or_default(),
            summary: row.summary,
            summary_type: row.summary_type,
            metadata: serde_json::from_str(&row.metadata).unwrap_or(Value::Null),
            created_at: row.created_at,
        }
    }
}

pub struct NewSummary {
    pub title: String,
    pub key_points: Vec<String>,
    pub summary: String,
    pub summary_type: String,
    pub metadata: Value,
}

/// Read the cached summary for `(content_id, summary_type)`, if any.
pub async fn get_cached(
    pool: &DbPool,
    content_id: &str,
    summary_type: &str,
) -> Result<Option<ContentSummary>, StorageError> {
    let row = sqlx::query_as::<_, ContentSummaryRow>(
        "SELECT * FROM content_summaries WHERE content_id = ? AND summary_type = ?",
    )
    .bind(content_id)
    .bind(summary_type)
    .fetch_optional(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.map(ContentSummary::from))
}

/// Upsert the summary for `(content_id, summary_type)`. Recomputation
/// overwrites the cached row in place (§3 idempotence invariant).
pub async fn upsert(
    pool: &DbPool,
    id: &str,
    content_id: &str,
    summary: &NewSummary,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO content_summaries (id, content_id, title, key_points, summary, summary_type, metadata) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT (content_id, summary_type) DO UPDATE SET \
         title = excluded.title, key_points = excluded.key_points, \
         summary = excluded.summary, metadata = excluded.metadata",
    )
    .bind(id)
    .bind(content_id)
    .bind(&summary.title)
    .bind(serde_json::to_string(&summary.key_points).unwrap_or_else(|_| "[]".to_string()))
    .bind(&summary.summary)
    .bind(&summary.summary_type)
    .bind(summary.metadata.to_string())
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}
