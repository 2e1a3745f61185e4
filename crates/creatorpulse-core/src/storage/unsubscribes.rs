//! The per-user unsubscribe suppression set (§3, §8.8).

use super::DbPool;
use crate::error::StorageError;

pub async fn unsubscribe(
    pool: &DbPool,
    user_id: &str,
    recipient_email: &str,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT OR IGNORE INTO unsubscribes (user_id, recipient_email) VALUES (?, ?)",
    )
    .bind(user_id)
    .bind(recipient_email)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn is_unsubscribed(
    pool: &DbPool,
    user_id: &str,
    recipient_email: &str,
) -> Result<bool, StorageError> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT recipient_email FROM unsubscribes WHERE user_id = ? AND recipient_email = ?",
    )
    .bind(user_id)
    .bind(recipient_email)
    .fetch_optional(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{init_test_db, users::create_user};

    #[tokio::test]
    async fn unsubscribed_recipient_is_suppressed() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");

        assert!(!is_unsubscribed(&pool, "u1", "reader@example.com").await.expect("check"));
        unsubscribe(&pool, "u1", "reader@example.com").await.expect("unsubscribe");
        assert!(is_unsubscribed(&pool, "u1", "reader@example.com").await.expect("check"));
    }
}
