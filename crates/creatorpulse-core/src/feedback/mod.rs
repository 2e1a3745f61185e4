//! Feedback Analyzer (C10): converts recent reader feedback into prompt
//! adjustments for the draft generator (§4.10).

use crate::error::FeedbackError;
use crate::llm::gateway::LlmGateway;
use crate::llm::GenerationParams;
use crate::storage::feedback;
use crate::storage::DbPool;
use serde::Deserialize;

const DEFAULT_DAYS_BACK: i64 = 30;
const MIN_SIGNALS: usize = 5;

const SYSTEM_PROMPT: &str = "You analyze reader feedback on past newsletter drafts. \
Respond with JSON only: {\"liked_aspects\": array of strings, \"disliked_aspects\": array of strings, \
\"recommendations\": array of strings}. No text outside the JSON object.";

#[derive(Debug, Deserialize, Clone)]
pub struct FeedbackInsights {
    pub liked_aspects: Vec<String>,
    pub disliked_aspects: Vec<String>,
    pub recommendations: Vec<String>,
}

impl FeedbackInsights {
    /// Render as a short addendum for the draft generation prompt (§4.9's
    /// "optional addendum" consumed by C9).
    pub fn as_prompt_addendum(&self) -> String {
        format!(
            "Readers have liked: {}. Readers have disliked: {}. Apply these recommendations: {}.",
            join_or_none(&self.liked_aspects),
            join_or_none(&self.disliked_aspects),
            join_or_none(&self.recommendations),
        )
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none noted".to_string()
    } else {
        items.join("; ")
    }
}

/// Analyze `user_id`'s feedback from the last `days_back` days (default 30).
/// Below `MIN_SIGNALS` (5) feedback rows, produces no adjustment (`None`)
/// without calling the LLM (§4.10).
pub async fn analyze_feedback(
    pool: &DbPool,
    gateway: &LlmGateway,
    user_id: &str,
    days_back: Option<i64>,
) -> Result<Option<FeedbackInsights>, FeedbackError> {
    let days_back = days_back.unwrap_or(DEFAULT_DAYS_BACK);
    let signals = feedback::list_for_user(pool, user_id, days_back).await?;

    if signals.len() < MIN_SIGNALS {
        return Ok(None);
    }

    let user_message = build_prompt(&signals);
    let params = GenerationParams { max_tokens: 512, temperature: 0.3, system_prompt: None };

    let response = match gateway
        .chat_completion(user_id, "feedback_analyzer", SYSTEM_PROMPT, &user_message, &params)
        .await
    {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(user_id = %user_id, error = %err, "feedback analysis LLM call failed, no adjustment produced");
            return Ok(None);
        }
    };

    let insights = parse_insights(&response.text);
    if insights.is_none() {
        tracing::warn!(user_id = %user_id, "feedback analysis response was not parseable, no adjustment produced");
    }
    Ok(insights)
}

fn build_prompt(signals: &[feedback::Feedback]) -> String {
    let mut prompt = String::from("Recent feedback (type | comment):\n");
    for signal in signals {
        prompt.push_str(&format!(
            "{} | {}\n",
            signal.feedback_type,
            signal.comment.as_deref().unwrap_or("(no comment)"),
        ));
    }
    prompt
}

fn parse_insights(text: &str) -> Option<FeedbackInsights> {
    let trimmed = text.trim().trim_start_matches("```json").trim_start_matches("```").trim_end_matches("```").trim();
    serde_json::from_str(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmRateLimitConfig;
    use crate::error::LlmError;
    use crate::llm::{LlmProvider, LlmResponse, TokenUsage};
    use crate::storage::{drafts::create_placeholder, init_test_db, users::create_user};
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

    async fn pool_with_signals(count: usize) -> DbPool {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");
        create_placeholder(&pool, "d1", "u1", "Digest").await.expect("draft");
        for i in 0..count {
            let feedback_type = if i % 2 == 0 { "thumbs_up" } else { "thumbs_down" };
            feedback::submit(&pool, &format!("f{i}"), "u1", "d1", None, feedback_type, Some("too long"))
                .await
                .expect("submit feedback");
        }
        pool
    }

    #[tokio::test]
    async fn below_threshold_produces_no_adjustment_without_calling_llm() {
        let pool = pool_with_signals(4).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let gateway = LlmGateway::new(
            Box::new(StubProvider { response: String::new(), calls: calls.clone() }),
            pool.clone(),
            LlmRateLimitConfig { minute: 30, day: 500 },
        );

        let result = analyze_feedback(&pool, &gateway, "u1", None).await.expect("analyze");
        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn at_threshold_synthesizes_insights() {
        let pool = pool_with_signals(5).await;
        let response = serde_json::json!({
            "liked_aspects": ["concise intros"],
            "disliked_aspects": ["too many links"],
            "recommendations": ["trim the conclusion"]
        })
        .to_string();
        let calls = Arc::new(AtomicUsize::new(0));
        let gateway = LlmGateway::new(
            Box::new(StubProvider { response, calls: calls.clone() }),
            pool.clone(),
            LlmRateLimitConfig { minute: 30, day: 500 },
        );

        let result = analyze_feedback(&pool, &gateway, "u1", None).await.expect("analyze");
        let insights = result.expect("insights produced");
        assert_eq!(insights.liked_aspects, vec!["concise intros"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(insights.as_prompt_addendum().contains("trim the conclusion"));
    }
}
