//! CRUD and atomic transition operations for the per-user batch schedule row.
//!
//! The schedule row's `is_crawling` flag is the batch mutex described in §5:
//! acquire-and-set must be atomic, which is why `try_start_batch` runs as a
//! single conditional `UPDATE`.

use super::DbPool;
use crate::error::StorageError;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Schedule {
    pub user_id: String,
    pub is_crawling: bool,
    pub crawl_frequency_hours: i64,
    pub last_batch_crawl_at: Option<String>,
    pub next_scheduled_crawl_at: Option<String>,
    pub last_items_fetched: i64,
    pub last_items_new: i64,
    pub last_crawl_duration_seconds: Option<f64>,
}

pub async fn get_schedule(pool: &DbPool, user_id: &str) -> Result<Option<Schedule>, StorageError> {
    sqlx::query_as::<_, Schedule>("SELECT * FROM schedules WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

/// Atomically flip `is_crawling` from false to true. Returns `true` if this
/// call won the race and should proceed with the batch; `false` means a
/// batch is already in progress and the caller must skip this user (§8.3).
pub async fn try_start_batch(pool: &DbPool, user_id: &str) -> Result<bool, StorageError> {
    let result = sqlx::query(
        "UPDATE schedules SET is_crawling = 1 WHERE user_id = ? AND is_crawling = 0",
    )
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(result.rows_affected() == 1)
}

/// Mark the batch complete: clear `is_crawling`, stamp `last_batch_crawl_at`,
/// compute `next_scheduled_crawl_at`, and record the run's counts (§4.2 step 5).
pub async fn complete_batch(
    pool: &DbPool,
    user_id: &str,
    now: DateTime<Utc>,
    items_fetched: i64,
    items_new: i64,
    duration_seconds: f64,
) -> Result<(), StorageError> {
    let schedule = get_schedule(pool, user_id)
        .await?
        .ok_or_else(|| StorageError::NotFound {
            entity: "schedule".to_string(),
            id: user_id.to_string(),
        })?;

    let next = now + chrono::Duration::hours(schedule.crawl_frequency_hours);

    sqlx::query(
        "UPDATE schedules SET is_crawling = 0, last_batch_crawl_at = ?, \
         next_scheduled_crawl_at = ?, last_items_fetched = ?, last_items_new = ?, \
         last_crawl_duration_seconds = ? WHERE user_id = ?",
    )
    .bind(now.to_rfc3339())
    .bind(next.to_rfc3339())
    .bind(items_fetched)
    .bind(items_new)
    .bind(duration_seconds)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(())
}

/// Unconditionally clear `is_crawling`, used when a crawl tick is cancelled
/// (§5 "Cancellation and timeouts") so the mutex does not leak.
pub async fn clear_crawling_flag(pool: &DbPool, user_id: &str) -> Result<(), StorageError> {
    sqlx::query("UPDATE schedules SET is_crawling = 0 WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn set_crawl_frequency_hours(
    pool: &DbPool,
    user_id: &str,
    hours: i64,
) -> Result<(), StorageError> {
    sqlx::query("UPDATE schedules SET crawl_frequency_hours = ? WHERE user_id = ?")
        .bind(hours)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{init_test_db, users::create_user};

    #[tokio::test]
    async fn try_start_batch_is_mutually_exclusive() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");

        assert!(try_start_batch(&pool, "u1").await.expect("first start"));
        assert!(!try_start_batch(&pool, "u1").await.expect("second start"));
    }

    #[tokio::test]
    async fn complete_batch_clears_flag_and_schedules_next() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");
        try_start_batch(&pool, "u1").await.expect("start");

        let now = "2026-07-27T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        complete_batch(&pool, "u1", now, 10, 3, 1.5)
            .await
            .expect("complete");

        let schedule = get_schedule(&pool, "u1")
            .await
            .expect("get")
            .expect("exists");
        assert!(!schedule.is_crawling);
        assert_eq!(schedule.last_items_fetched, 10);
        assert_eq!(schedule.last_items_new, 3);
        assert_eq!(
            schedule.next_scheduled_crawl_at.as_deref(),
            Some("2026-07-28T00:00:00+00:00")
        );

        assert!(try_start_batch(&pool, "u1").await.expect("can start again"));
    }
}
