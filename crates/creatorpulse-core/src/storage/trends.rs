//! Storage for detected trends (§3 `Trend`, C6).

use super::DbPool;
use crate::error::StorageError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrendRow {
    pub id: String,
    pub user_id: String,
    pub topic: String,
    pub score: f64,
    pub rationale: Option<String>,
    pub supporting_item_ids: String,
    pub detected_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Trend {
    pub id: String,
    pub user_id: String,
    pub topic: String,
    pub score: f64,
    pub rationale: Option<String>,
    pub supporting_item_ids: Vec<String>,
    pub detected_at: String,
}

impl From<TrendRow> for Trend {
    fn from(row: TrendRow) -> Self {
        Trend {
            id: row.id,
            user_id: row.user_id,
            topic: row.topic,
            score: row.score,
            rationale: row.rationale,
            supporting_item_ids: serde_json::from_str(&row.supporting_item_ids).unwrap_or_default(),
            detected_at: row.detected_at,
        }
    }
}

pub struct NewTrend {
    pub topic: String,
    pub score: f64,
    pub rationale: Option<String>,
    pub supporting_item_ids: Vec<String>,
}

pub async fn insert_trends(
    pool: &DbPool,
    user_id: &str,
    ids: &[String],
    trends: &[NewTrend],
) -> Result<(), StorageError> {
    for (id, trend) in ids.iter().zip(trends.iter()) {
        sqlx::query(
            "INSERT INTO trends (id, user_id, topic, score, rationale, supporting_item_ids) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(&trend.topic)
        .bind(trend.score)
        .bind(&trend.rationale)
        .bind(serde_json::to_string(&trend.supporting_item_ids).unwrap_or_else(|_| "[]".to_string()))
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    }
    Ok(())
}

pub async fn recent_for_user(
    pool: &DbPool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<Trend>, StorageError> {
    let rows = sqlx::query_as::<_, TrendRow>(
        "SELECT * FROM trends WHERE user_id = ? ORDER BY detected_at DESC, score DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(rows.into_iter().map(Trend::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{init_test_db, users::create_user};

    #[tokio::test]
    async fn insert_and_fetch_trends() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");

        let trends = vec![NewTrend {
            topic: "Rust async runtimes".to_string(),
            score: 0.82,
            rationale: Some("frequent mentions".to_string()),
            supporting_item_ids: vec!["c1".to_string(), "c2".to_string()],
        }];
        insert_trends(&pool, "u1", &["t1".to_string()], &trends)
            .await
            .expect("insert");

        let fetched = recent_for_user(&pool, "u1", 10).await.expect("fetch");
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].topic, "Rust async runtimes");
        assert_eq!(fetched[0].supporting_item_ids, vec!["c1", "c2"]);
    }
}
