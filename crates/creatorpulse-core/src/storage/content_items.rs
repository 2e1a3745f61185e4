//! CRUD for content items (§3 `ContentItem`), including the delta-dedup
//! insert path used by the crawl orchestrator (§8.1, §8.2).

use super::DbPool;
use crate::error::StorageError;
use serde_json::Value;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentItemRow {
    pub id: String,
    pub source_id: String,
    pub content_type: String,
    pub title: String,
    pub content: String,
    pub url: String,
    pub published_at: Option<String>,
    pub metadata: String,
    pub created_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ContentItem {
    pub id: String,
    pub source_id: String,
    pub content_type: String,
    pub title: String,
    pub content: String,
    pub url: String,
    pub published_at: Option<String>,
    pub metadata: Value,
    pub created_at: String,
}

impl From<ContentItemRow> for ContentItem {
    fn from(row: ContentItemRow) -> Self {
        ContentItem {
            id: row.id,
            source_id: row.source_id,
            content_type: row.content_type,
            title: row.title,
            content: row.content,
            url: row.url,
            published_at: row.published_at,
            metadata: serde_json::from_str(&row.metadata).unwrap_or(Value::Null),
            created_at: row.created_at,
        }
    }
}

/// A normalized item as returned by a connector's `fetch`, before persistence.
#[derive(Debug, Clone)]
pub struct NewContentItem {
    pub content_type: String,
    pub title: String,
    pub content: String,
    pub url: String,
    pub published_at: Option<String>,
    pub metadata: Value,
}

/// Insert the item if `(source_id, url)` is new. Returns `true` if a row was
/// inserted, `false` if it already existed (the delta-dedup invariant, §8.2).
pub async fn insert_if_new(
    pool: &DbPool,
    id: &str,
    source_id: &str,
    item: &NewContentItem,
) -> Result<bool, StorageError> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO content_items \
         (id, source_id, content_type, title, content, url, published_at, metadata) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(source_id)
    .bind(&item.content_type)
    .bind(&item.title)
    .bind(&item.content)
    .bind(&item.url)
    .bind(&item.published_at)
    .bind(item.metadata.to_string())
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(result.rows_affected() == 1)
}

pub async fn exists_by_source_and_url(
    pool: &DbPool,
    source_id: &str,
    url: &str,
) -> Result<bool, StorageError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM content_items WHERE source_id = ? AND url = ?",
    )
    .bind(source_id)
    .bind(url)
    .fetch_optional(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.is_some())
}

pub async fn get_content_item(
    pool: &DbPool,
    content_id: &str,
) -> Result<Option<ContentItem>, StorageError> {
    let row = sqlx::query_as::<_, ContentItemRow>("SELECT * FROM content_items WHERE id = ?")
        .bind(content_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.map(ContentItem::from))
}

/// Content items for a user across all their sources, published within the
/// last `days_back` days (or with no `published_at`, treated as recent).
pub async fn recent_for_user(
    pool: &DbPool,
    user_id: &str,
    days_back: i64,
) -> Result<Vec<ContentItem>, StorageError> {
    let rows = sqlx::query_as::<_, ContentItemRow>(
        "SELECT ci.* FROM content_items ci \
         JOIN sources s ON s.id = ci.source_id \
         WHERE s.user_id = ? \
         AND (ci.published_at IS NULL OR ci.published_at >= datetime('now', printf('-%d days', ?))) \
         ORDER BY ci.published_at DESC",
    )
    .bind(user_id)
    .bind(days_back)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(rows.into_iter().map(ContentItem::from).collect())
}

pub async fn get_many(pool: &DbPool, ids: &[String]) -> Result<Vec<ContentItem>, StorageError> {
    let mut items = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(item) = get_content_item(pool, id).await? {
            items.push(item);
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{init_test_db, sources::create_source, users::create_user};

    async fn setup() -> DbPool {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");
        create_source(&pool, "s1", "u1", "rss", "Feed", None, &serde_json::json!({}), &serde_json::json!({}))
            .await
            .expect("create source");
        pool
    }

    fn item(url: &str) -> NewContentItem {
        NewContentItem {
            content_type: "article".to_string(),
            title: "Title".to_string(),
            content: "Body".to_string(),
            url: url.to_string(),
            published_at: None,
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn insert_if_new_is_idempotent_per_url() {
        let pool = setup().await;
        assert!(insert_if_new(&pool, "c1", "s1", &item("https://a")).await.expect("first"));
        assert!(!insert_if_new(&pool, "c2", "s1", &item("https://a")).await.expect("dup"));
        assert!(exists_by_source_and_url(&pool, "s1", "https://a").await.expect("exists"));
    }

    #[tokio::test]
    async fn delta_crawl_with_dup_inserts_only_new() {
        // S1 from §8 end-to-end scenarios: {A,B,C} then {B,C,D} -> one new row.
        let pool = setup().await;
        for url in ["https://a", "https://b", "https://c"] {
            insert_if_new(&pool, &format!("c-{url}"), "s1", &item(url))
                .await
                .expect("first crawl insert");
        }

        let mut new_count = 0;
        for url in ["https://b", "https://c", "https://d"] {
            if insert_if_new(&pool, &format!("c2-{url}"), "s1", &item(url))
                .await
                .expect("second crawl insert")
            {
                new_count += 1;
            }
        }
        assert_eq!(new_count, 1);
    }
}
