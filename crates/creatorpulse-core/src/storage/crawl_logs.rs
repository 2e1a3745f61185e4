//! Per-source crawl attempt history (SPEC_FULL §11 supplemental feature).
//!
//! One row per crawl attempt against one source, recording the outcome so
//! operators can diagnose a source that keeps failing without re-reading
//! application logs.

use super::DbPool;
use crate::error::StorageError;

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct CrawlLog {
    pub id: String,
    pub user_id: String,
    pub source_id: String,
    pub status: String,
    pub items_found: i64,
    pub items_new: i64,
    pub error: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
}

pub async fn start(
    pool: &DbPool,
    id: &str,
    user_id: &str,
    source_id: &str,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO crawl_logs (id, user_id, source_id, status, items_found, items_new) \
         VALUES (?, ?, ?, 'running', 0, 0)",
    )
    .bind(id)
    .bind(user_id)
    .bind(source_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn finish_ok(
    pool: &DbPool,
    id: &str,
    items_found: i64,
    items_new: i64,
) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE crawl_logs SET status = 'success', items_found = ?, items_new = ?, \
         finished_at = datetime('now') WHERE id = ?",
    )
    .bind(items_found)
    .bind(items_new)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn finish_failed(pool: &DbPool, id: &str, error: &str) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE crawl_logs SET status = 'failed', error = ?, finished_at = datetime('now') \
         WHERE id = ?",
    )
    .bind(error)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn recent_for_source(
    pool: &DbPool,
    source_id: &str,
    limit: i64,
) -> Result<Vec<CrawlLog>, StorageError> {
    sqlx::query_as::<_, CrawlLog>(
        "SELECT * FROM crawl_logs WHERE source_id = ? ORDER BY started_at DESC LIMIT ?",
    )
    .bind(source_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{init_test_db, sources::create_source, users::create_user};

    #[tokio::test]
    async fn start_then_finish_records_outcome() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");
        create_source(
            &pool, "s1", "u1", "rss", "Example Feed",
            Some("https://example.com/feed.xml"),
            &serde_json::json!({}), &serde_json::json!({}),
        )
        .await
        .expect("create source");

        start(&pool, "log1", "u1", "s1").await.expect("start");
        finish_ok(&pool, "log1", 10, 3).await.expect("finish ok");

        let logs = recent_for_source(&pool, "s1", 10).await.expect("recent");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, "success");
        assert_eq!(logs[0].items_new, 3);
        assert!(logs[0].finished_at.is_some());
    }

    #[tokio::test]
    async fn finish_failed_records_error() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u2", "u2@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");
        create_source(
            &pool, "s2", "u2", "rss", "Example Feed",
            Some("https://example.com/feed.xml"),
            &serde_json::json!({}), &serde_json::json!({}),
        )
        .await
        .expect("create source");

        start(&pool, "log2", "u2", "s2").await.expect("start");
        finish_failed(&pool, "log2", "connection timed out").await.expect("finish failed");

        let logs = recent_for_source(&pool, "s2", 10).await.expect("recent");
        assert_eq!(logs[0].status, "failed");
        assert_eq!(logs[0].error.as_deref(), Some("connection timed out"));
    }
}
