//! CRUD operations for sources (C1 registry entries, §3 `Source`).

use super::DbPool;
use crate::error::StorageError;
use serde_json::Value;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub name: String,
    pub url: Option<String>,
    pub config: String,
    pub credentials: String,
    pub status: String,
    pub error_message: Option<String>,
    pub last_crawled_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Source {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub name: String,
    pub url: Option<String>,
    pub config: Value,
    pub credentials: Value,
    pub status: String,
    pub error_message: Option<String>,
    pub last_crawled_at: Option<String>,
    pub created_at: String,
}

impl From<SourceRow> for Source {
    fn from(row: SourceRow) -> Self {
        Source {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind,
            name: row.name,
            url: row.url,
            config: serde_json::from_str(&row.config).unwrap_or(Value::Null),
            credentials: serde_json::from_str(&row.credentials).unwrap_or(Value::Null),
            status: row.status,
            error_message: row.error_message,
            last_crawled_at: row.last_crawled_at,
            created_at: row.created_at,
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn create_source(
    pool: &DbPool,
    id: &str,
    user_id: &str,
    kind: &str,
    name: &str,
    url: Option<&str>,
    config: &Value,
    credentials: &Value,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO sources (id, user_id, kind, name, url, config, credentials, status) \
         VALUES (?, ?, ?, ?, ?, ?, ?, 'pending')",
    )
    .bind(id)
    .bind(user_id)
    .bind(kind)
    .bind(name)
    .bind(url)
    .bind(config.to_string())
    .bind(credentials.to_string())
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn get_source(pool: &DbPool, source_id: &str) -> Result<Option<Source>, StorageError> {
    let row = sqlx::query_as::<_, SourceRow>("SELECT * FROM sources WHERE id = ?")
        .bind(source_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.map(Source::from))
}

pub async fn list_sources(pool: &DbPool, user_id: &str) -> Result<Vec<Source>, StorageError> {
    let rows = sqlx::query_as::<_, SourceRow>(
        "SELECT * FROM sources WHERE user_id = ? ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(rows.into_iter().map(Source::from).collect())
}

pub async fn list_active_sources(
    pool: &DbPool,
    user_id: &str,
) -> Result<Vec<Source>, StorageError> {
    let rows = sqlx::query_as::<_, SourceRow>(
        "SELECT * FROM sources WHERE user_id = ? AND status = 'active' ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(rows.into_iter().map(Source::from).collect())
}

pub async fn update_config(
    pool: &DbPool,
    source_id: &str,
    config: &Value,
) -> Result<(), StorageError> {
    sqlx::query("UPDATE sources SET config = ? WHERE id = ?")
        .bind(config.to_string())
        .bind(source_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Mark a source's crawl outcome (§4.2 step 4). `status=error` iff
/// `error_message` is non-empty, enforced by always setting both together.
pub async fn mark_crawl_outcome(
    pool: &DbPool,
    source_id: &str,
    status: &str,
    error_message: Option<&str>,
    last_crawled_at: Option<&str>,
) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE sources SET status = ?, error_message = ?, last_crawled_at = COALESCE(?, last_crawled_at) \
         WHERE id = ?",
    )
    .bind(status)
    .bind(error_message)
    .bind(last_crawled_at)
    .bind(source_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Reactivate a single errored source: clears `error_message` and sets
/// `status=active` atomically (§4.2 "Reactivation").
pub async fn reactivate(pool: &DbPool, source_id: &str) -> Result<(), StorageError> {
    sqlx::query("UPDATE sources SET status = 'active', error_message = NULL WHERE id = ?")
        .bind(source_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Reactivate every errored source belonging to a user.
pub async fn reactivate_all(pool: &DbPool, user_id: &str) -> Result<u64, StorageError> {
    let result = sqlx::query(
        "UPDATE sources SET status = 'active', error_message = NULL \
         WHERE user_id = ? AND status = 'error'",
    )
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(result.rows_affected())
}

pub async fn delete_source(pool: &DbPool, source_id: &str) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM sources WHERE id = ?")
        .bind(source_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}
