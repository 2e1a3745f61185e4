//! Content Summarizer (C7): per-item structured summarization cached by
//! `(content_id, summary_type)` (§4.7).

use crate::error::SummaryError;
use crate::llm::gateway::LlmGateway;
use crate::llm::GenerationParams;
use crate::storage::{content_items, summaries, DbPool};
use serde::Deserialize;

/// Length band controlling key-point count and target detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryType {
    Brief,
    Standard,
    Detailed,
}

impl SummaryType {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryType::Brief => "brief",
            SummaryType::Standard => "standard",
            SummaryType::Detailed => "detailed",
        }
    }

    fn key_point_count(self) -> u32 {
        match self {
            SummaryType::Brief => 2,
            SummaryType::Standard => 4,
            SummaryType::Detailed => 7,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    title: String,
    key_points: Vec<String>,
    summary: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default = "default_sentiment")]
    sentiment: String,
    #[serde(default)]
    relevance_score: f64,
}

fn default_sentiment() -> String {
    "neutral".to_string()
}

fn system_prompt(summary_type: SummaryType) -> String {
    format!(
        "You summarize a single piece of content for a newsletter draft. \
         Respond with JSON only: {{\"title\": string, \"key_points\": array of up to {} strings, \
         \"summary\": string, \"topics\": array of strings, \"sentiment\": one of \"positive\"|\"neutral\"|\"negative\", \
         \"relevance_score\": number between 0 and 1}}. No text outside the JSON object.",
        summary_type.key_point_count()
    )
}

/// Summarize one content item at `summary_type`, reusing the cached row if
/// one already exists (§3 idempotence invariant — recomputation overwrites
/// in place rather than duplicating).
pub async fn summarize(
    pool: &DbPool,
    gateway: &LlmGateway,
    user_id: &str,
    content_id: &str,
    summary_type: SummaryType,
) -> Result<summaries::ContentSummary, SummaryError> {
    if let Some(cached) = summaries::get_cached(pool, content_id, summary_type.as_str()).await? {
        return Ok(cached);
    }

    let item = content_items::get_content_item(pool, content_id)
        .await?
        .ok_or_else(|| SummaryError::Storage(crate::error::StorageError::NotFound {
            entity: "content_item".to_string(),
            id: content_id.to_string(),
        }))?;

    let user_message = format!("Title: {}\nURL: {}\n\n{}", item.title, item.url, item.content);
    let params = GenerationParams { max_tokens: 768, temperature: 0.4, system_prompt: None };

    let response = gateway
        .chat_completion(user_id, "content_summarizer", &system_prompt(summary_type), &user_message, &params)
        .await?;

    let raw: RawSummary = parse_summary(&response.text)
        .ok_or_else(|| SummaryError::Llm(crate::error::LlmError::Parse("unparseable summary response".to_string())))?;

    let id = uuid::Uuid::new_v4().to_string();
    let new_summary = summaries::NewSummary {
        title: raw.title,
        key_points: raw.key_points,
        summary: raw.summary,
        summary_type: summary_type.as_str().to_string(),
        metadata: serde_json::json!({
            "topics": raw.topics,
            "sentiment": raw.sentiment,
            "relevance_score": raw.relevance_score,
        }),
    };
    summaries::upsert(pool, &id, content_id, &new_summary).await?;

    summaries::get_cached(pool, content_id, summary_type.as_str())
        .await?
        .ok_or_else(|| SummaryError::Storage(crate::error::StorageError::NotFound {
            entity: "content_summary".to_string(),
            id,
        }))
}

fn parse_summary(text: &str) -> Option<RawSummary> {
    let trimmed = text.trim().trim_start_matches("```json").trim_start_matches("```").trim_end_matches("```").trim();
    serde_json::from_str(trimmed).ok()
}

/// Summarize a batch of content IDs sequentially, sharing a single
/// per-call rate-limit check per item via the gateway (§4.7 "batch form").
pub async fn summarize_batch(
    pool: &DbPool,
    gateway: &LlmGateway,
    user_id: &str,
    content_ids: &[String],
    summary_type: SummaryType,
) -> Vec<Result<summaries::ContentSummary, SummaryError>> {
    let mut results = Vec::with_capacity(content_ids.len());
    for content_id in content_ids {
        results.push(summarize(pool, gateway, user_id, content_id, summary_type).await);
    }
    results
}

/// Find content items for `user_id` published within `days_back` that have
/// no cached summary at `summary_type`, and summarize them (§4.7 "recent form").
pub async fn summarize_recent(
    pool: &DbPool,
    gateway: &LlmGateway,
    user_id: &str,
    days_back: i64,
    summary_type: SummaryType,
) -> Result<Vec<summaries::ContentSummary>, SummaryError> {
    let items = content_items::recent_for_user(pool, user_id, days_back).await?;
    let mut unsummarized = Vec::new();
    for item in items {
        if summaries::get_cached(pool, &item.id, summary_type.as_str()).await?.is_none() {
            unsummarized.push(item.id);
        }
    }

    let mut out = Vec::with_capacity(unsummarized.len());
    for content_id in unsummarized {
        out.push(summarize(pool, gateway, user_id, &content_id, summary_type).await?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmRateLimitConfig;
    use crate::error::LlmError;
    use crate::llm::{LlmProvider, LlmResponse, TokenUsage};
    use crate::storage::{init_test_db, sources::create_source, users::create_user};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubProvider {
        response: String,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            _system: &str,
            _user_message: &str,
            _params: &GenerationParams,
        ) -> Result<LlmResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LlmResponse {
                text: self.response.clone(),
                usage: TokenUsage { input_tokens: 5, output_tokens: 5 },
                model: "stub-model".to_string(),
            })
        }

        async fn health_check(&self) -> Result<(), LlmError> {
            Ok(())
        }
    }

    async fn seeded_pool() -> (DbPool, String) {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");
        create_source(&pool, "s1", "u1", "rss", "Feed", None, &serde_json::json!({}), &serde_json::json!({}))
            .await
            .expect("create source");
        content_items::insert_if_new(
            &pool,
            "c1",
            "s1",
            &content_items::NewContentItem {
                content_type: "article".to_string(),
                title: "Original title".to_string(),
                content: "Body text".to_string(),
                url: "https://example.com/a".to_string(),
                published_at: None,
                metadata: serde_json::json!({}),
            },
        )
        .await
        .expect("insert item");
        (pool, "c1".to_string())
    }

    fn valid_response() -> String {
        serde_json::json!({
            "title": "Summarized title",
            "key_points": ["point one", "point two"],
            "summary": "a short summary",
            "topics": ["rust"],
            "sentiment": "positive",
            "relevance_score": 0.7
        })
        .to_string()
    }

    #[tokio::test]
    async fn summarize_caches_and_skips_a_second_llm_call() {
        let (pool, content_id) = seeded_pool().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let gateway = LlmGateway::new(
            Box::new(StubProvider { response: valid_response(), calls: calls.clone() }),
            pool.clone(),
            LlmRateLimitConfig { minute: 30, day: 500 },
        );

        let first = summarize(&pool, &gateway, "u1", &content_id, SummaryType::Standard)
            .await
            .expect("first summarize");
        assert_eq!(first.summary, "a short summary");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let second = summarize(&pool, &gateway, "u1", &content_id, SummaryType::Standard)
            .await
            .expect("second summarize reuses cache");
        assert_eq!(second.id, first.id);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "cached summary must not re-invoke the LLM");
    }

    #[tokio::test]
    async fn unparseable_response_surfaces_as_error() {
        let (pool, content_id) = seeded_pool().await;
        let gateway = LlmGateway::new(
            Box::new(StubProvider { response: "not json".to_string(), calls: Arc::new(AtomicUsize::new(0)) }),
            pool.clone(),
            LlmRateLimitConfig { minute: 30, day: 500 },
        );

        let result = summarize(&pool, &gateway, "u1", &content_id, SummaryType::Brief).await;
        assert!(matches!(result, Err(SummaryError::Llm(_))));
    }

    #[tokio::test]
    async fn summarize_recent_finds_only_unsummarized_items() {
        let (pool, content_id) = seeded_pool().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let gateway = LlmGateway::new(
            Box::new(StubProvider { response: valid_response(), calls: calls.clone() }),
            pool.clone(),
            LlmRateLimitConfig { minute: 30, day: 500 },
        );

        let first_pass = summarize_recent(&pool, &gateway, "u1", 30, SummaryType::Standard)
            .await
            .expect("first pass");
        assert_eq!(first_pass.len(), 1);
        assert_eq!(first_pass[0].content_id, content_id);

        let second_pass = summarize_recent(&pool, &gateway, "u1", 30, SummaryType::Standard)
            .await
            .expect("second pass");
        assert!(second_pass.is_empty(), "already-summarized item should not resurface");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
