//! Crawl Orchestrator (C2): runs a batch crawl across every active source
//! of every user with at least one active source (§4.2).

use crate::error::CrawlError;
use crate::source::{self, FetchedItem};
use crate::storage::{content_items, crawl_logs, schedules, sources, users, DbPool};
use chrono::Utc;
use std::time::Instant;

/// Outcome of crawling one source.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceCrawlOutcome {
    pub source_id: String,
    pub items_fetched: i64,
    pub items_new: i64,
    pub error: Option<String>,
}

/// Outcome of a whole batch for one user.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserCrawlOutcome {
    pub user_id: String,
    pub skipped: bool,
    pub sources: Vec<SourceCrawlOutcome>,
}

/// Crawl every active source of a single user (§4.2 steps 2-4), guarded by
/// the schedule row's `is_crawling` mutex (step 1) and concluded with
/// `complete_batch` (step 5).
pub async fn crawl_user(pool: &DbPool, user_id: &str) -> Result<UserCrawlOutcome, CrawlError> {
    if !schedules::try_start_batch(pool, user_id).await? {
        return Ok(UserCrawlOutcome { user_id: user_id.to_string(), skipped: true, sources: Vec::new() });
    }

    let started = Instant::now();
    let mut outcomes = Vec::new();
    let mut total_fetched = 0i64;
    let mut total_new = 0i64;

    let active_sources = sources::list_active_sources(pool, user_id).await?;
    for source_row in active_sources {
        let outcome = crawl_one_source(pool, user_id, &source_row).await;
        total_fetched += outcome.items_fetched;
        total_new += outcome.items_new;
        outcomes.push(outcome);
    }

    schedules::complete_batch(
        pool,
        user_id,
        Utc::now(),
        total_fetched,
        total_new,
        started.elapsed().as_secs_f64(),
    )
    .await?;

    Ok(UserCrawlOutcome { user_id: user_id.to_string(), skipped: false, sources: outcomes })
}

/// Trigger a sync of exactly one source, outside the per-user batch mutex
/// (§6 "trigger a per-source sync").
pub async fn crawl_source(pool: &DbPool, source_id: &str) -> Result<SourceCrawlOutcome, CrawlError> {
    let source_row = sources::get_source(pool, source_id)
        .await?
        .ok_or_else(|| CrawlError::Storage(crate::error::StorageError::NotFound {
            entity: "source".to_string(),
            id: source_id.to_string(),
        }))?;
    Ok(crawl_one_source(pool, &source_row.user_id, &source_row).await)
}

async fn crawl_one_source(
    pool: &DbPool,
    user_id: &str,
    source_row: &sources::Source,
) -> SourceCrawlOutcome {
    let log_id = uuid::Uuid::new_v4().to_string();
    if crawl_logs::start(pool, &log_id, user_id, &source_row.id).await.is_err() {
        // Logging must never block the crawl itself; fall through without a log row.
    }

    let mut connector = match source::build_connector(
        &source_row.kind,
        &source_row.id,
        source_row.config.clone(),
        source_row.credentials.clone(),
    ) {
        Ok(connector) => connector,
        Err(err) => return fail_source(pool, &log_id, source_row, err.to_string()).await,
    };

    if let Err(err) = connector.validate().await {
        return fail_source(pool, &log_id, source_row, err.to_string()).await;
    }

    // validate() may have normalized config in place (e.g. resolved a handle
    // to a channel id); persist it so the next crawl skips the lookup.
    if connector.config() != &source_row.config {
        let _ = sources::update_config(pool, &source_row.id, connector.config()).await;
    }

    let fetched = match connector.fetch(source_row.last_crawled_at.as_deref()).await {
        Ok(items) => items,
        Err(err) => return fail_source(pool, &log_id, source_row, err.to_string()).await,
    };

    let mut items_new = 0i64;
    let items_fetched = fetched.len() as i64;
    for item in fetched {
        if item.url.is_empty() {
            continue;
        }
        let new_item = to_new_content_item(item);
        let item_id = uuid::Uuid::new_v4().to_string();
        match content_items::insert_if_new(pool, &item_id, &source_row.id, &new_item).await {
            Ok(true) => items_new += 1,
            Ok(false) => {}
            Err(err) => return fail_source(pool, &log_id, source_row, err.to_string()).await,
        }
    }

    let now = Utc::now().to_rfc3339();
    let _ = sources::mark_crawl_outcome(pool, &source_row.id, "active", None, Some(&now)).await;
    let _ = crawl_logs::finish_ok(pool, &log_id, items_fetched, items_new).await;

    SourceCrawlOutcome { source_id: source_row.id.clone(), items_fetched, items_new, error: None }
}

async fn fail_source(
    pool: &DbPool,
    log_id: &str,
    source_row: &sources::Source,
    message: String,
) -> SourceCrawlOutcome {
    let _ = sources::mark_crawl_outcome(pool, &source_row.id, "error", Some(&message), None).await;
    let _ = crawl_logs::finish_failed(pool, log_id, &message).await;
    SourceCrawlOutcome { source_id: source_row.id.clone(), items_fetched: 0, items_new: 0, error: Some(message) }
}

fn to_new_content_item(item: FetchedItem) -> content_items::NewContentItem {
    content_items::NewContentItem {
        content_type: item.content_type,
        title: item.title,
        content: item.content,
        url: item.url,
        published_at: item.published_at,
        metadata: item.metadata,
    }
}

/// Batch entry point (§4.2 "Batch entry"): crawl every user with at least
/// one active source. A per-user failure never aborts the batch.
pub async fn crawl_all_sources(pool: &DbPool) -> Result<Vec<UserCrawlOutcome>, CrawlError> {
    let mut outcomes = Vec::new();
    for user_id in users::users_with_active_sources(pool).await? {
        match crawl_user(pool, &user_id).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => {
                tracing::error!(user_id = %user_id, error = %err, "crawl batch failed for user");
            }
        }
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{init_test_db, sources::create_source, users::create_user};

    #[tokio::test]
    async fn skips_user_whose_batch_is_already_running() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");
        schedules::try_start_batch(&pool, "u1").await.expect("pre-start");

        let outcome = crawl_user(&pool, "u1").await.expect("crawl");
        assert!(outcome.skipped);
    }

    #[tokio::test]
    async fn failing_source_does_not_abort_the_batch() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");
        create_source(
            &pool, "s1", "u1", "rss", "Broken feed",
            Some("https://127.0.0.1:1/nonexistent-feed.xml"),
            &serde_json::json!({"feed_url": "https://127.0.0.1:1/nonexistent-feed.xml"}),
            &serde_json::json!({}),
        )
        .await
        .expect("create source");

        let outcome = crawl_user(&pool, "u1").await.expect("crawl completes");
        assert!(!outcome.skipped);
        assert_eq!(outcome.sources.len(), 1);
        assert!(outcome.sources[0].error.is_some());

        let source = sources::get_source(&pool, "s1").await.expect("get").expect("exists");
        assert_eq!(source.status, "error");
        assert!(source.error_message.is_some());

        // The batch mutex must still clear so a later crawl can run.
        assert!(schedules::try_start_batch(&pool, "u1").await.expect("can start again"));
    }

    #[tokio::test]
    async fn crawl_source_runs_outside_the_batch_mutex() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");
        create_source(
            &pool, "s1", "u1", "rss", "Broken feed",
            Some("https://127.0.0.1:1/nonexistent-feed.xml"),
            &serde_json::json!({"feed_url": "https://127.0.0.1:1/nonexistent-feed.xml"}),
            &serde_json::json!({}),
        )
        .await
        .expect("create source");

        schedules::try_start_batch(&pool, "u1").await.expect("hold batch mutex");

        let outcome = crawl_source(&pool, "s1").await.expect("crawl one source");
        assert_eq!(outcome.source_id, "s1");
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn crawl_source_rejects_unknown_id() {
        let pool = init_test_db().await.expect("init db");
        let result = crawl_source(&pool, "missing").await;
        assert!(matches!(result, Err(CrawlError::Storage(crate::error::StorageError::NotFound { .. }))));
    }
}
