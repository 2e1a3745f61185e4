//! Append-only LLM call log and cost/usage summaries (§3 `LLMUsageLog`, C4).

use super::DbPool;
use crate::error::StorageError;
use serde_json::Value;

#[allow(clippy::too_many_arguments)]
pub async fn log_call(
    pool: &DbPool,
    id: &str,
    user_id: &str,
    service_name: &str,
    model: &str,
    status: &str,
    prompt_tokens: i64,
    completion_tokens: i64,
    duration_ms: i64,
    error: Option<&str>,
    metadata: &Value,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO llm_usage_logs \
         (id, user_id, service_name, model, status, prompt_tokens, completion_tokens, \
          total_tokens, duration_ms, error, metadata) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(user_id)
    .bind(service_name)
    .bind(model)
    .bind(status)
    .bind(prompt_tokens)
    .bind(completion_tokens)
    .bind(prompt_tokens + completion_tokens)
    .bind(duration_ms)
    .bind(error)
    .bind(metadata.to_string())
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct UsageLogRow {
    pub id: String,
    pub user_id: String,
    pub service_name: String,
    pub model: String,
    pub status: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub duration_ms: i64,
    pub error: Option<String>,
    pub created_at: String,
}

pub async fn recent_logs(
    pool: &DbPool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<UsageLogRow>, StorageError> {
    sqlx::query_as::<_, UsageLogRow>(
        "SELECT id, user_id, service_name, model, status, prompt_tokens, completion_tokens, \
         total_tokens, duration_ms, error, created_at FROM llm_usage_logs \
         WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

/// Tokens used by a user today (UTC) across all services.
pub async fn tokens_used_today(pool: &DbPool, user_id: &str) -> Result<i64, StorageError> {
    let row: (Option<i64>,) = sqlx::query_as(
        "SELECT SUM(total_tokens) FROM llm_usage_logs \
         WHERE user_id = ? AND date(created_at) = date('now')",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.0.unwrap_or(0))
}

/// Tokens used by a user so far this UTC calendar month.
pub async fn tokens_used_this_month(pool: &DbPool, user_id: &str) -> Result<i64, StorageError> {
    let row: (Option<i64>,) = sqlx::query_as(
        "SELECT SUM(total_tokens) FROM llm_usage_logs \
         WHERE user_id = ? AND strftime('%Y-%m', created_at) = strftime('%Y-%m', 'now')",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.0.unwrap_or(0))
}
