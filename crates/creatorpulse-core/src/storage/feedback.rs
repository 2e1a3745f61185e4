//! Storage for reader feedback (§3 `Feedback`, C10).

use super::DbPool;
use crate::error::StorageError;

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Feedback {
    pub id: String,
    pub user_id: String,
    pub draft_id: String,
    pub section_id: Option<String>,
    pub feedback_type: String,
    pub comment: Option<String>,
    pub created_at: String,
}

pub async fn submit(
    pool: &DbPool,
    id: &str,
    user_id: &str,
    draft_id: &str,
    section_id: Option<&str>,
    feedback_type: &str,
    comment: Option<&str>,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO feedback (id, user_id, draft_id, section_id, feedback_type, comment) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(user_id)
    .bind(draft_id)
    .bind(section_id)
    .bind(feedback_type)
    .bind(comment)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn list_for_user(
    pool: &DbPool,
    user_id: &str,
    days_back: i64,
) -> Result<Vec<Feedback>, StorageError> {
    sqlx::query_as::<_, Feedback>(
        "SELECT * FROM feedback WHERE user_id = ? \
         AND created_at >= datetime('now', printf('-%d days', ?)) \
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .bind(days_back)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

pub async fn list_for_draft(pool: &DbPool, draft_id: &str) -> Result<Vec<Feedback>, StorageError> {
    sqlx::query_as::<_, Feedback>(
        "SELECT * FROM feedback WHERE draft_id = ? ORDER BY created_at",
    )
    .bind(draft_id)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

pub async fn update_comment(
    pool: &DbPool,
    feedback_id: &str,
    comment: Option<&str>,
) -> Result<(), StorageError> {
    sqlx::query("UPDATE feedback SET comment = ? WHERE id = ?")
        .bind(comment)
        .bind(feedback_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn delete(pool: &DbPool, feedback_id: &str) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM feedback WHERE id = ?")
        .bind(feedback_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Positive rate (thumbs up / total) for a user's recent feedback, used by
/// the stats endpoint (§6).
pub async fn positive_rate(pool: &DbPool, user_id: &str, days_back: i64) -> Result<f64, StorageError> {
    let items = list_for_user(pool, user_id, days_back).await?;
    if items.is_empty() {
        return Ok(0.0);
    }
    let positive = items.iter().filter(|f| f.feedback_type == "thumbs_up").count();
    Ok(positive as f64 / items.len() as f64)
}
