//! Open/click tracking events for delivered newsletters (SPEC_FULL §11
//! supplemental feature; tracking itself is optional per §8's testable
//! property that delivery must succeed whether or not tracking is wired up).

use super::DbPool;
use crate::error::StorageError;

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct TrackingEvent {
    pub id: String,
    pub draft_id: String,
    pub recipient_id: String,
    pub event_type: String,
    pub url: Option<String>,
    pub created_at: String,
}

pub async fn record(
    pool: &DbPool,
    id: &str,
    draft_id: &str,
    recipient_id: &str,
    event_type: &str,
    url: Option<&str>,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO email_tracking_events (id, draft_id, recipient_id, event_type, url) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(draft_id)
    .bind(recipient_id)
    .bind(event_type)
    .bind(url)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn list_for_draft(
    pool: &DbPool,
    draft_id: &str,
) -> Result<Vec<TrackingEvent>, StorageError> {
    sqlx::query_as::<_, TrackingEvent>(
        "SELECT * FROM email_tracking_events WHERE draft_id = ? ORDER BY created_at",
    )
    .bind(draft_id)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

pub async fn open_count(pool: &DbPool, draft_id: &str) -> Result<i64, StorageError> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM email_tracking_events WHERE draft_id = ? AND event_type = 'open'",
    )
    .bind(draft_id)
    .fetch_one(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.0)
}
