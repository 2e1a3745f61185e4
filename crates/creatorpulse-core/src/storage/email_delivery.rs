//! Per-recipient email delivery log (§3 `EmailDeliveryLog`, C11). One row
//! per attempted send, carrying it through `queued` -> `sending` ->
//! `sent`/`failed` with a retry counter for exponential backoff.

use super::DbPool;
use crate::error::StorageError;

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct EmailDeliveryLog {
    pub id: String,
    pub draft_id: String,
    pub user_id: String,
    pub recipient_id: String,
    pub status: String,
    pub retry_count: i64,
    pub error: Option<String>,
    pub sent_at: Option<String>,
    pub created_at: String,
}

pub async fn enqueue(
    pool: &DbPool,
    id: &str,
    draft_id: &str,
    user_id: &str,
    recipient_id: &str,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO email_delivery_log (id, draft_id, user_id, recipient_id, status, retry_count) \
         VALUES (?, ?, ?, ?, 'queued', 0)",
    )
    .bind(id)
    .bind(draft_id)
    .bind(user_id)
    .bind(recipient_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn mark_sending(pool: &DbPool, id: &str) -> Result<(), StorageError> {
    sqlx::query("UPDATE email_delivery_log SET status = 'sending' WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn mark_sent(pool: &DbPool, id: &str) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE email_delivery_log SET status = 'sent', sent_at = datetime('now') WHERE id = ?",
    )
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Record a failed attempt and bump the retry counter, for the caller's
/// exponential-backoff decision on whether to try again (§4.11).
pub async fn mark_failed_retry(pool: &DbPool, id: &str, error: &str) -> Result<i64, StorageError> {
    sqlx::query(
        "UPDATE email_delivery_log SET status = 'failed', error = ?, retry_count = retry_count + 1 \
         WHERE id = ?",
    )
    .bind(error)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    let row: (i64,) = sqlx::query_as("SELECT retry_count FROM email_delivery_log WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.0)
}

pub async fn list_for_draft(
    pool: &DbPool,
    draft_id: &str,
) -> Result<Vec<EmailDeliveryLog>, StorageError> {
    sqlx::query_as::<_, EmailDeliveryLog>(
        "SELECT * FROM email_delivery_log WHERE draft_id = ? ORDER BY created_at",
    )
    .bind(draft_id)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}
