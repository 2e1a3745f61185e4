//! Trend Detector (C6): aggregates a user's recent content and asks the LLM
//! gateway for ranked topics in a single call (§4.6).

use crate::error::TrendError;
use crate::llm::gateway::LlmGateway;
use crate::llm::GenerationParams;
use crate::storage::{content_items, trends as trend_storage, DbPool};
use serde::Deserialize;

const SYSTEM_PROMPT: &str = "You identify emerging topics across a creator's recent content. \
Respond with a JSON array only, each element: \
{\"topic\": string, \"score\": number between 0 and 1, \"rationale\": string, \"supporting_item_ids\": [string]}. \
Do not include any text outside the JSON array.";

#[derive(Debug, Deserialize)]
struct RawTrend {
    topic: String,
    score: f64,
    rationale: Option<String>,
    #[serde(default)]
    supporting_item_ids: Vec<String>,
}

/// Detect trends for `user_id` from content published in the last
/// `days_back` days, keeping at most `max_trends` with `score >= min_score`.
/// A failed or unparseable LLM call degrades to an empty list rather than
/// propagating (§7 "trend detector returns empty"); only a storage failure
/// surfaces as an error.
pub async fn detect_trends(
    pool: &DbPool,
    gateway: &LlmGateway,
    user_id: &str,
    days_back: i64,
    min_score: f64,
    max_trends: usize,
) -> Result<Vec<trend_storage::Trend>, TrendError> {
    let items = content_items::recent_for_user(pool, user_id, days_back).await?;
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let user_message = build_prompt(&items);
    let params = GenerationParams {
        max_tokens: 1024,
        temperature: 0.3,
        system_prompt: None,
    };

    let response = match gateway
        .chat_completion(user_id, "trend_detector", SYSTEM_PROMPT, &user_message, &params)
        .await
    {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(user_id = %user_id, error = %err, "trend detection LLM call failed, returning no trends");
            return Ok(Vec::new());
        }
    };

    let raw_trends: Vec<RawTrend> = match parse_trends(&response.text) {
        Some(parsed) => parsed,
        None => {
            tracing::warn!(user_id = %user_id, "trend detection response was not parseable, returning no trends");
            return Ok(Vec::new());
        }
    };

    let mut filtered: Vec<RawTrend> = raw_trends.into_iter().filter(|t| t.score >= min_score).collect();
    filtered.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    filtered.truncate(max_trends);

    if filtered.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = filtered.iter().map(|_| uuid::Uuid::new_v4().to_string()).collect();
    let new_trends: Vec<trend_storage::NewTrend> = filtered
        .iter()
        .map(|t| trend_storage::NewTrend {
            topic: t.topic.clone(),
            score: t.score,
            rationale: t.rationale.clone(),
            supporting_item_ids: t.supporting_item_ids.clone(),
        })
        .collect();

    trend_storage::insert_trends(pool, user_id, &ids, &new_trends).await?;

    Ok(ids
        .into_iter()
        .zip(filtered.into_iter())
        .map(|(id, raw)| trend_storage::Trend {
            id,
            user_id: user_id.to_string(),
            topic: raw.topic,
            score: raw.score,
            rationale: raw.rationale,
            supporting_item_ids: raw.supporting_item_ids,
            detected_at: chrono::Utc::now().to_rfc3339(),
        })
        .collect())
}

fn build_prompt(items: &[content_items::ContentItem]) -> String {
    let mut prompt = String::from("Recent content items (id | title | url):\n");
    for item in items {
        prompt.push_str(&format!("{} | {} | {}\n", item.id, item.title, item.url));
    }
    prompt
}

/// Parse the model's response as a JSON array, tolerating a leading/trailing
/// code fence the way providers sometimes wrap structured output.
fn parse_trends(text: &str) -> Option<Vec<RawTrend>> {
    let trimmed = text.trim().trim_start_matches("```json").trim_start_matches("```").trim_end_matches("```").trim();
    serde_json::from_str(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmRateLimitConfig;
    use crate::error::LlmError;
    use crate::llm::{LlmProvider, LlmResponse, TokenUsage};
    use crate::storage::{init_test_db, sources::create_source, users::create_user};
    use async_trait::async_trait;

    struct StubProvider {
        response: String,
        fail: bool,
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
            if self.fail {
                return Err(LlmError::GenerationFailed("simulated failure".to_string()));
            }
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

    async fn seeded_pool() -> DbPool {
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
                title: "Rust async runtimes compared".to_string(),
                content: "body".to_string(),
                url: "https://example.com/a".to_string(),
                published_at: None,
                metadata: serde_json::json!({}),
            },
        )
        .await
        .expect("insert item");
        pool
    }

    #[tokio::test]
    async fn detects_and_persists_trends_above_threshold() {
        let pool = seeded_pool().await;
        let response = serde_json::json!([
            {"topic": "async runtimes", "score": 0.8, "rationale": "frequent", "supporting_item_ids": ["c1"]},
            {"topic": "low signal", "score": 0.1, "rationale": "rare", "supporting_item_ids": []}
        ])
        .to_string();
        let gateway = LlmGateway::new(
            Box::new(StubProvider { response, fail: false }),
            pool.clone(),
            LlmRateLimitConfig { minute: 30, day: 500 },
        );

        let trends = detect_trends(&pool, &gateway, "u1", 7, 0.3, 5).await.expect("detect");
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].topic, "async runtimes");

        let persisted = trend_storage::recent_for_user(&pool, "u1", 10).await.expect("fetch");
        assert_eq!(persisted.len(), 1);
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_empty_list() {
        let pool = seeded_pool().await;
        let gateway = LlmGateway::new(
            Box::new(StubProvider { response: String::new(), fail: true }),
            pool.clone(),
            LlmRateLimitConfig { minute: 30, day: 500 },
        );

        let trends = detect_trends(&pool, &gateway, "u1", 7, 0.3, 5).await.expect("detect");
        assert!(trends.is_empty());
    }

    #[tokio::test]
    async fn unparseable_response_degrades_to_empty_list() {
        let pool = seeded_pool().await;
        let gateway = LlmGateway::new(
            Box::new(StubProvider { response: "not json".to_string(), fail: false }),
            pool.clone(),
            LlmRateLimitConfig { minute: 30, day: 500 },
        );

        let trends = detect_trends(&pool, &gateway, "u1", 7, 0.3, 5).await.expect("detect");
        assert!(trends.is_empty());
    }

    #[tokio::test]
    async fn no_content_short_circuits_without_calling_llm() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");

        let gateway = LlmGateway::new(
            Box::new(StubProvider { response: "[]".to_string(), fail: true }),
            pool.clone(),
            LlmRateLimitConfig { minute: 30, day: 500 },
        );

        let trends = detect_trends(&pool, &gateway, "u1", 7, 0.3, 5).await.expect("detect");
        assert!(trends.is_empty());
    }
}
