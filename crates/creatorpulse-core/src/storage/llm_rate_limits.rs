//! Per-user LLM rate limit counters (§3 `LLMRateLimit`, C4).
//!
//! One row per `(user_id, limit_type)` where `limit_type` is `minute` or
//! `day`. Rows are lazily created on first use via `INSERT OR IGNORE`
//! (§12 open-question decision #2) rather than pre-provisioned at user
//! creation. The check-then-increment path runs inside one transaction so
//! concurrent first-ever calls collapse to a single row (§5).

use super::DbPool;
use crate::error::StorageError;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

/// A rate-limit window kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitType {
    Minute,
    Day,
}

impl LimitType {
    pub fn as_str(self) -> &'static str {
        match self {
            LimitType::Minute => "minute",
            LimitType::Day => "day",
        }
    }

    /// The next reset instant strictly after `now`, aligned per §4.4/§8.5:
    /// minute resets fall on `:00` of the next minute, day resets fall on
    /// `00:00:00 UTC` of the next day.
    pub fn next_reset(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            LimitType::Minute => {
                let truncated = now
                    .date_naive()
                    .and_hms_opt(now.hour(), now.minute(), 0)
                    .expect("valid hms");
                Utc.from_utc_datetime(&truncated) + Duration::minutes(1)
            }
            LimitType::Day => {
                let next_day = now.date_naive() + Duration::days(1);
                Utc.from_utc_datetime(&next_day.and_hms_opt(0, 0, 0).expect("midnight"))
            }
        }
    }
}

use chrono::Timelike;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RateLimitRow {
    pub user_id: String,
    pub limit_type: String,
    pub current_count: i64,
    pub limit_value: i64,
    pub reset_at: String,
}

/// Outcome of a pre-call check for one window.
#[derive(Debug, Clone)]
pub struct LimitStatus {
    pub current_count: i64,
    pub limit_value: i64,
    pub reset_at: DateTime<Utc>,
}

/// Safe default applied when no per-user row and no global default exist,
/// so callers always observe a finite, non-zero quota (§4.4 "Defaults").
pub const SAFE_DEFAULT_LIMIT: i64 = 1000;

async fn get_row(
    pool: &DbPool,
    user_id: &str,
    limit_type: LimitType,
) -> Result<Option<RateLimitRow>, StorageError> {
    sqlx::query_as::<_, RateLimitRow>(
        "SELECT * FROM llm_rate_limits WHERE user_id = ? AND limit_type = ?",
    )
    .bind(user_id)
    .bind(limit_type.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

/// Check whether the user is under the limit for this window, without
/// mutating state. Lazily reports the safe default if no row exists yet.
pub async fn check(
    pool: &DbPool,
    user_id: &str,
    limit_type: LimitType,
    default_limit: i64,
) -> Result<LimitStatus, StorageError> {
    let now = Utc::now();
    match get_row(pool, user_id, limit_type).await? {
        None => Ok(LimitStatus {
            current_count: 0,
            limit_value: default_limit,
            reset_at: limit_type.next_reset(now),
        }),
        Some(row) => {
            let reset_at = row.reset_at.parse::<DateTime<Utc>>().unwrap_or(now);
            if now >= reset_at {
                Ok(LimitStatus {
                    current_count: 0,
                    limit_value: row.limit_value,
                    reset_at: limit_type.next_reset(now),
                })
            } else {
                Ok(LimitStatus {
                    current_count: row.current_count,
                    limit_value: row.limit_value,
                    reset_at,
                })
            }
        }
    }
}

/// Create the row (if absent) with `current_count=1`, or reset-then-1 if
/// the window elapsed, or increment otherwise. Mirrors §4.4 step 4.
///
/// A single `INSERT ... ON CONFLICT DO UPDATE` keeps this a single atomic
/// statement, so concurrent first-ever calls for the same user collapse
/// into one row rather than racing a read-then-write (§5).
pub async fn record_call(
    pool: &DbPool,
    user_id: &str,
    limit_type: LimitType,
    default_limit: i64,
) -> Result<(), StorageError> {
    let now = Utc::now();
    let now_str = now.to_rfc3339();
    let next_reset = limit_type.next_reset(now).to_rfc3339();

    sqlx::query(
        "INSERT INTO llm_rate_limits (user_id, limit_type, current_count, limit_value, reset_at) \
         VALUES (?, ?, 1, ?, ?) \
         ON CONFLICT (user_id, limit_type) DO UPDATE SET \
         current_count = CASE WHEN llm_rate_limits.reset_at <= ? THEN 1 \
                               ELSE llm_rate_limits.current_count + 1 END, \
         reset_at = CASE WHEN llm_rate_limits.reset_at <= ? THEN ? \
                         ELSE llm_rate_limits.reset_at END",
    )
    .bind(user_id)
    .bind(limit_type.as_str())
    .bind(default_limit)
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
    async fn first_call_creates_row_with_count_one() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");

        record_call(&pool, "u1", LimitType::Minute, 30).await.expect("record");
        let status = check(&pool, "u1", LimitType::Minute, 30).await.expect("check");
        assert_eq!(status.current_count, 1);
        assert_eq!(status.limit_value, 30);
    }

    #[tokio::test]
    async fn minute_reset_denies_31st_call_then_resets() {
        // S3 from §8 end-to-end scenarios.
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u2", "u2@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");

        for _ in 0..30 {
            record_call(&pool, "u2", LimitType::Minute, 30).await.expect("record");
        }
        let status = check(&pool, "u2", LimitType::Minute, 30).await.expect("check");
        assert_eq!(status.current_count, 30);
        assert!(status.current_count >= status.limit_value, "31st call should be denied");

        // Simulate the next whole minute by backdating reset_at into the past.
        sqlx::query("UPDATE llm_rate_limits SET reset_at = '2020-01-01T00:00:00+00:00' WHERE user_id = 'u2'")
            .execute(&pool)
            .await
            .expect("backdate");

        record_call(&pool, "u2", LimitType::Minute, 30).await.expect("record after reset");
        let status = check(&pool, "u2", LimitType::Minute, 30).await.expect("check after reset");
        assert_eq!(status.current_count, 1);
    }

    #[tokio::test]
    async fn reset_alignment_minute_falls_on_zero_seconds() {
        let now = "2026-07-27T10:30:45Z".parse::<DateTime<Utc>>().unwrap();
        let reset = LimitType::Minute.next_reset(now);
        assert_eq!(reset.second(), 0);
        assert_eq!(reset.minute(), 31);
    }

    #[tokio::test]
    async fn reset_alignment_day_falls_on_midnight_utc() {
        let now = "2026-07-27T10:30:45Z".parse::<DateTime<Utc>>().unwrap();
        let reset = LimitType::Day.next_reset(now);
        assert_eq!(reset.hour(), 0);
        assert_eq!(reset.minute(), 0);
        assert_eq!(reset.day(), 28);
    }
}
