//! Per-user daily email send counter (§3 `EmailRateLimit`, C11), resetting
//! at the next UTC midnight.

use super::DbPool;
use crate::error::StorageError;
use chrono::{DateTime, Duration, TimeZone, Utc};

fn next_midnight_utc(now: DateTime<Utc>) -> DateTime<Utc> {
    let next_day = now.date_naive() + Duration::days(1);
    Utc.from_utc_datetime(&next_day.and_hms_opt(0, 0, 0).expect("midnight"))
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct RateLimitRow {
    current_count: i64,
    limit_value: i64,
    reset_at: String,
}

/// Current daily send count for the user, resetting in-memory if the
/// stored window has elapsed (the row itself is only mutated by `increment`).
pub async fn current_count(pool: &DbPool, user_id: &str, daily_cap: i64) -> Result<i64, StorageError> {
    let now = Utc::now();
    let row = sqlx::query_as::<_, RateLimitRow>(
        "SELECT current_count, limit_value, reset_at FROM email_rate_limits WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    match row {
        None => Ok(0),
        Some(r) => {
            let reset_at = r.reset_at.parse::<DateTime<Utc>>().unwrap_or(now);
            if now >= reset_at {
                Ok(0)
            } else {
                let _ = daily_cap;
                Ok(r.current_count)
            }
        }
    }
}

/// Increment the daily counter, lazily creating/resetting the row as needed.
pub async fn increment(pool: &DbPool, user_id: &str, daily_cap: i64) -> Result<(), StorageError> {
    let now = Utc::now();
    let now_str = now.to_rfc3339();
    let next_reset = next_midnight_utc(now).to_rfc3339();

    sqlx::query(
        "INSERT INTO email_rate_limits (user_id, current_count, limit_value, reset_at) \
         VALUES (?, 1, ?, ?) \
         ON CONFLICT (user_id) DO UPDATE SET \
         current_count = CASE WHEN email_rate_limits.reset_at <= ? THEN 1 \
                               ELSE email_rate_limits.current_count + 1 END, \
         reset_at = CASE WHEN email_rate_limits.reset_at <= ? THEN ? \
                         ELSE email_rate_limits.reset_at END",
    )
    .bind(user_id)
    .bind(daily_cap)
    .bind(&next_reset)
    .bind(&now_str)
    .bind(&now_str)
    .bind(&next_reset)
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
    async fn increment_accumulates_within_the_day() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u5", "u5@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");

        for _ in 0..450 {
            increment(&pool, "u5", 450).await.expect("increment");
        }
        let count = current_count(&pool, "u5", 450).await.expect("count");
        assert_eq!(count, 450);
    }
}
