//! Storage for drafts (§3 `Draft`, C9). A draft is a single row from creation
//! (`status=generating`) through `ready`/`failed` and any later regeneration
//! (§8.9 draft single-row invariant).

use super::DbPool;
use crate::error::StorageError;
use serde_json::Value;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DraftRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub sections: String,
    pub status: String,
    pub metadata: String,
    pub generated_at: Option<String>,
    pub published_at: Option<String>,
    pub email_sent: bool,
    pub email_sent_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Draft {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub sections: Value,
    pub status: String,
    pub metadata: Value,
    pub generated_at: Option<String>,
    pub published_at: Option<String>,
    pub email_sent: bool,
    pub email_sent_at: Option<String>,
    pub created_at: String,
}

impl From<DraftRow> for Draft {
    fn from(row: DraftRow) -> Self {
        Draft {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            sections: serde_json::from_str(&row.sections).unwrap_or_else(|_| serde_json::json!([])),
            status: row.status,
            metadata: serde_json::from_str(&row.metadata).unwrap_or(Value::Null),
            generated_at: row.generated_at,
            published_at: row.published_at,
            email_sent: row.email_sent,
            email_sent_at: row.email_sent_at,
            created_at: row.created_at,
        }
    }
}

/// Create the placeholder row a draft API returns immediately, `status=generating`.
pub async fn create_placeholder(
    pool: &DbPool,
    id: &str,
    user_id: &str,
    title: &str,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO drafts (id, user_id, title, sections, status, metadata) \
         VALUES (?, ?, ?, '[]', 'generating', '{}')",
    )
    .bind(id)
    .bind(user_id)
    .bind(title)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn get_draft(pool: &DbPool, draft_id: &str) -> Result<Option<Draft>, StorageError> {
    let row = sqlx::query_as::<_, DraftRow>("SELECT * FROM drafts WHERE id = ?")
        .bind(draft_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.map(Draft::from))
}

pub async fn list_for_user(pool: &DbPool, user_id: &str) -> Result<Vec<Draft>, StorageError> {
    let rows = sqlx::query_as::<_, DraftRow>(
        "SELECT * FROM drafts WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(rows.into_iter().map(Draft::from).collect())
}

/// Mark the placeholder `ready`, writing its generated sections and metadata.
/// Same row used by both initial generation and regeneration (§4.9).
pub async fn mark_ready(
    pool: &DbPool,
    draft_id: &str,
    title: &str,
    sections: &Value,
    metadata: &Value,
    generated_at: &str,
) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE drafts SET title = ?, sections = ?, metadata = ?, status = 'ready', \
         generated_at = ? WHERE id = ?",
    )
    .bind(title)
    .bind(sections.to_string())
    .bind(metadata.to_string())
    .bind(generated_at)
    .bind(draft_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Mark the placeholder `failed`, writing `metadata.error`/`error_type` (§4.9).
pub async fn mark_failed(
    pool: &DbPool,
    draft_id: &str,
    metadata: &Value,
) -> Result<(), StorageError> {
    sqlx::query("UPDATE drafts SET status = 'failed', metadata = ? WHERE id = ?")
        .bind(metadata.to_string())
        .bind(draft_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn update_sections(
    pool: &DbPool,
    draft_id: &str,
    sections: &Value,
) -> Result<(), StorageError> {
    sqlx::query("UPDATE drafts SET sections = ? WHERE id = ?")
        .bind(sections.to_string())
        .bind(draft_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn mark_published(
    pool: &DbPool,
    draft_id: &str,
    published_at: &str,
) -> Result<(), StorageError> {
    sqlx::query("UPDATE drafts SET status = 'published', published_at = ? WHERE id = ?")
        .bind(published_at)
        .bind(draft_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn mark_email_sent(
    pool: &DbPool,
    draft_id: &str,
    sent_at: &str,
) -> Result<(), StorageError> {
    sqlx::query("UPDATE drafts SET email_sent = 1, email_sent_at = ? WHERE id = ?")
        .bind(sent_at)
        .bind(draft_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn delete_draft(pool: &DbPool, draft_id: &str) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM drafts WHERE id = ?")
        .bind(draft_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}
