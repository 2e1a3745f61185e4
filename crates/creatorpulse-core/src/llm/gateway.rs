//! The LLM Gateway (C4): the single path every component uses to call an
//! LLM provider, responsible in order for (§4.4):
//! 1. checking the caller's per-minute and per-day rate limits,
//! 2. invoking the provider,
//! 3. logging the call to `llm_usage_logs`,
//! 4. recording the call against both rate-limit windows.

use super::{GenerationParams, LlmProvider, LlmResponse};
use crate::config::LlmRateLimitConfig;
use crate::error::LlmError;
use crate::storage::{llm_rate_limits, llm_usage, DbPool};
use std::time::Instant;

/// One LLM call, routed through rate limiting and usage logging.
pub struct LlmGateway {
    provider: Box<dyn LlmProvider>,
    pool: DbPool,
    rate_limits: LlmRateLimitConfig,
}

impl LlmGateway {
    pub fn new(provider: Box<dyn LlmProvider>, pool: DbPool, rate_limits: LlmRateLimitConfig) -> Self {
        Self { provider, pool, rate_limits }
    }

    /// Run a completion on behalf of `user_id` for `service_name` (e.g.
    /// `"draft_generator"`, `"trend_detector"`), enforcing and recording
    /// rate limits around the call (§4.4).
    pub async fn chat_completion(
        &self,
        user_id: &str,
        service_name: &str,
        system: &str,
        user_message: &str,
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError> {
        self.check_rate_limits(user_id).await?;

        let started = Instant::now();
        let result = self.provider.complete(system, user_message, params).await;
        let duration_ms = started.elapsed().as_millis() as i64;

        let log_id = uuid_v4();
        match &result {
            Ok(response) => {
                llm_usage::log_call(
                    &self.pool,
                    &log_id,
                    user_id,
                    service_name,
                    &response.model,
                    "ok",
                    response.usage.input_tokens as i64,
                    response.usage.output_tokens as i64,
                    duration_ms,
                    None,
                    &serde_json::json!({ "service_name": service_name }),
                )
                .await?;
            }
            Err(err) => {
                llm_usage::log_call(
                    &self.pool,
                    &log_id,
                    user_id,
                    service_name,
                    self.provider.name(),
                    "error",
                    0,
                    0,
                    duration_ms,
                    Some(&err.to_string()),
                    &serde_json::json!({ "service_name": service_name }),
                )
                .await?;
            }
        }

        self.record_rate_limit_usage(user_id).await?;
        result
    }

    async fn check_rate_limits(&self, user_id: &str) -> Result<(), LlmError> {
        let minute = llm_rate_limits::check(
            &self.pool,
            user_id,
            llm_rate_limits::LimitType::Minute,
            self.rate_limits.minute,
        )
        .await?;
        if minute.current_count >= minute.limit_value {
            return Err(LlmError::RateLimited {
                user_id: user_id.to_string(),
                window: "minute".to_string(),
            });
        }

        let day = llm_rate_limits::check(
            &self.pool,
            user_id,
            llm_rate_limits::LimitType::Day,
            self.rate_limits.day,
        )
        .await?;
        if day.current_count >= day.limit_value {
            return Err(LlmError::RateLimited {
                user_id: user_id.to_string(),
                window: "day".to_string(),
            });
        }

        Ok(())
    }

    async fn record_rate_limit_usage(&self, user_id: &str) -> Result<(), LlmError> {
        llm_rate_limits::record_call(
            &self.pool,
            user_id,
            llm_rate_limits::LimitType::Minute,
            self.rate_limits.minute,
        )
        .await?;
        llm_rate_limits::record_call(
            &self.pool,
            user_id,
            llm_rate_limits::LimitType::Day,
            self.rate_limits.day,
        )
        .await?;
        Ok(())
    }
}

fn uuid_v4() -> String {
    uuid::Uuid::new_v4().to_string()
}
