//! CRUD operations for users and their schedule rows.

use super::DbPool;
use crate::error::StorageError;
use serde_json::Value;

/// A user row as stored. `preferences_raw` is the serialized JSON document;
/// callers needing the merged-with-defaults view should go through
/// `preferences::resolve`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub preferences: String,
    pub created_at: String,
}

/// A user record with `preferences` parsed as JSON.
#[derive(Debug, Clone, serde::Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub preferences: Value,
    pub created_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let preferences = serde_json::from_str(&row.preferences).unwrap_or(Value::Null);
        User {
            id: row.id,
            email: row.email,
            preferences,
            created_at: row.created_at,
        }
    }
}

/// Create a user and its schedule row in one call. New users get the full
/// preferences defaults document and a schedule row (§4.5).
pub async fn create_user(
    pool: &DbPool,
    id: &str,
    email: &str,
    default_preferences: &Value,
    default_crawl_frequency_hours: i64,
) -> Result<(), StorageError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| StorageError::Connection { source: e })?;

    sqlx::query("INSERT INTO users (id, email, preferences) VALUES (?, ?, ?)")
        .bind(id)
        .bind(email)
        .bind(default_preferences.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Query { source: e })?;

    sqlx::query(
        "INSERT INTO schedules (user_id, crawl_frequency_hours) VALUES (?, ?)",
    )
    .bind(id)
    .bind(default_crawl_frequency_hours)
    .execute(&mut *tx)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    tx.commit()
        .await
        .map_err(|e| StorageError::Connection { source: e })?;

    Ok(())
}

pub async fn get_user(pool: &DbPool, user_id: &str) -> Result<Option<User>, StorageError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.map(User::from))
}

pub async fn get_preferences(pool: &DbPool, user_id: &str) -> Result<Option<Value>, StorageError> {
    Ok(get_user(pool, user_id).await?.map(|u| u.preferences))
}

pub async fn set_preferences(
    pool: &DbPool,
    user_id: &str,
    preferences: &Value,
) -> Result<(), StorageError> {
    sqlx::query("UPDATE users SET preferences = ? WHERE id = ?")
        .bind(preferences.to_string())
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// List every user id that owns at least one active source (§4.2 batch entry).
pub async fn users_with_active_sources(pool: &DbPool) -> Result<Vec<String>, StorageError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT user_id FROM sources WHERE status = 'active' ORDER BY user_id",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// List every user id, regardless of source activity (§4.3 reconciliation
/// covers every user's draft job, not just those with crawlable sources).
pub async fn all_user_ids(pool: &DbPool) -> Result<Vec<String>, StorageError> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT id FROM users ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
