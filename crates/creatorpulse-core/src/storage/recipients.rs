//! CRUD for newsletter recipients (§3 `Recipient`, C11).

use super::DbPool;
use crate::error::StorageError;

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Recipient {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub status: String,
    pub unsubscribe_token: String,
    pub created_at: String,
}

pub async fn create(
    pool: &DbPool,
    id: &str,
    user_id: &str,
    email: &str,
    name: Option<&str>,
    unsubscribe_token: &str,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO recipients (id, user_id, email, name, status, unsubscribe_token) \
         VALUES (?, ?, ?, ?, 'active', ?)",
    )
    .bind(id)
    .bind(user_id)
    .bind(email)
    .bind(name)
    .bind(unsubscribe_token)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn list_for_user(pool: &DbPool, user_id: &str) -> Result<Vec<Recipient>, StorageError> {
    sqlx::query_as::<_, Recipient>(
        "SELECT * FROM recipients WHERE user_id = ? ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

pub async fn get_by_token(
    pool: &DbPool,
    token: &str,
) -> Result<Option<Recipient>, StorageError> {
    sqlx::query_as::<_, Recipient>("SELECT * FROM recipients WHERE unsubscribe_token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

pub async fn delete(pool: &DbPool, recipient_id: &str) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM recipients WHERE id = ?")
        .bind(recipient_id)
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
    async fn create_list_and_lookup_by_token() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");

        create(&pool, "r1", "u1", "reader@example.com", Some("Reader"), "tok-abc")
            .await
            .expect("create recipient");

        let list = list_for_user(&pool, "u1").await.expect("list");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].email, "reader@example.com");
        assert_eq!(list[0].status, "active");

        let found = get_by_token(&pool, "tok-abc").await.expect("get by token");
        assert_eq!(found.expect("recipient").id, "r1");

        delete(&pool, "r1").await.expect("delete");
        let list = list_for_user(&pool, "u1").await.expect("list after delete");
        assert!(list.is_empty());
    }
}
