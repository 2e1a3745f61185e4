//! Voice Analyzer (C8): derives a user's voice profile from uploaded
//! writing samples via a single LLM call (§4.8).

use crate::error::VoiceError;
use crate::llm::gateway::LlmGateway;
use crate::llm::GenerationParams;
use crate::storage::voice::{self, NewVoiceProfile, VoiceProfile, VoiceSource};
use crate::storage::DbPool;
use serde::Deserialize;

const SYSTEM_PROMPT: &str = "You analyze writing samples and describe the author's voice. \
Respond with JSON only: {\"tone\": string, \"style\": string, \"vocabulary_level\": string, \
\"personality_traits\": array of strings, \"writing_patterns\": array of strings, \
\"formatting_preferences\": object, \"unique_characteristics\": array of strings}. \
No text outside the JSON object.";

#[derive(Debug, Deserialize)]
struct RawProfile {
    tone: Option<String>,
    style: Option<String>,
    vocabulary_level: Option<String>,
    #[serde(default)]
    personality_traits: Vec<String>,
    #[serde(default)]
    writing_patterns: Vec<String>,
    #[serde(default)]
    formatting_preferences: serde_json::Value,
    #[serde(default)]
    unique_characteristics: Vec<String>,
}

fn default_profile(samples_count: i64, source: VoiceSource) -> NewVoiceProfile {
    NewVoiceProfile {
        tone: None,
        style: None,
        vocabulary_level: None,
        personality_traits: Vec::new(),
        writing_patterns: Vec::new(),
        formatting_preferences: serde_json::json!({}),
        unique_characteristics: Vec::new(),
        samples_count,
        source,
    }
}

/// Analyze `user_id`'s uploaded samples and persist a voice profile.
///
/// With no samples, saves a `source=default` profile without calling the
/// LLM. A provider error saves `source=default_error`; an unparseable
/// response saves `source=default_fallback`. In both failure modes a
/// default document is still saved so downstream code never sees a missing
/// profile (§4.8).
pub async fn analyze_voice(
    pool: &DbPool,
    gateway: &LlmGateway,
    user_id: &str,
) -> Result<VoiceProfile, VoiceError> {
    let samples = voice::list_samples(pool, user_id).await?;

    if samples.is_empty() {
        voice::upsert_profile(pool, user_id, &default_profile(0, VoiceSource::Default)).await?;
        return fetch_profile(pool, user_id).await;
    }

    let user_message = build_prompt(&samples);
    let params = GenerationParams { max_tokens: 768, temperature: 0.5, system_prompt: None };

    let response = match gateway
        .chat_completion(user_id, "voice_analyzer", SYSTEM_PROMPT, &user_message, &params)
        .await
    {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(user_id = %user_id, error = %err, "voice analysis LLM call failed, saving default profile");
            voice::upsert_profile(pool, user_id, &default_profile(samples.len() as i64, VoiceSource::DefaultError)).await?;
            return fetch_profile(pool, user_id).await;
        }
    };

    let raw: Option<RawProfile> = parse_profile(&response.text);
    let Some(raw) = raw else {
        tracing::warn!(user_id = %user_id, "voice analysis response was not parseable, saving default profile");
        voice::upsert_profile(pool, user_id, &default_profile(samples.len() as i64, VoiceSource::DefaultFallback)).await?;
        return fetch_profile(pool, user_id).await;
    };

    voice::upsert_profile(
        pool,
        user_id,
        &NewVoiceProfile {
            tone: raw.tone,
            style: raw.style,
            vocabulary_level: raw.vocabulary_level,
            personality_traits: raw.personality_traits,
            writing_patterns: raw.writing_patterns,
            formatting_preferences: raw.formatting_preferences,
            unique_characteristics: raw.unique_characteristics,
            samples_count: samples.len() as i64,
            source: VoiceSource::Analyzed,
        },
    )
    .await?;

    fetch_profile(pool, user_id).await
}

async fn fetch_profile(pool: &DbPool, user_id: &str) -> Result<VoiceProfile, VoiceError> {
    voice::get_profile(pool, user_id)
        .await?
        .ok_or_else(|| VoiceError::Storage(crate::error::StorageError::NotFound {
            entity: "voice_profile".to_string(),
            id: user_id.to_string(),
        }))
}

fn build_prompt(samples: &[voice::VoiceSample]) -> String {
    let mut prompt = String::from("Writing samples:\n\n");
    for (i, sample) in samples.iter().enumerate() {
        prompt.push_str(&format!("--- sample {} ---\n{}\n\n", i + 1, sample.content));
    }
    prompt
}

fn parse_profile(text: &str) -> Option<RawProfile> {
    let trimmed = text.trim().trim_start_matches("```json").trim_start_matches("```").trim_end_matches("```").trim();
    serde_json::from_str(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmRateLimitConfig;
    use crate::error::LlmError;
    use crate::llm::{LlmProvider, LlmResponse, TokenUsage};
    use crate::storage::{init_test_db, users::create_user};
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

    async fn user_pool() -> DbPool {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");
        pool
    }

    #[tokio::test]
    async fn no_samples_yields_default_without_llm_call() {
        let pool = user_pool().await;
        let gateway = LlmGateway::new(
            Box::new(StubProvider { response: String::new(), fail: true }),
            pool.clone(),
            LlmRateLimitConfig { minute: 30, day: 500 },
        );

        let profile = analyze_voice(&pool, &gateway, "u1").await.expect("analyze");
        assert_eq!(profile.source, VoiceSource::Default);
        assert_eq!(profile.samples_count, 0);
    }

    #[tokio::test]
    async fn samples_with_valid_response_yield_analyzed_profile() {
        let pool = user_pool().await;
        voice::add_sample(&pool, "sample1", "u1", "Hey there, loving the vibe today!").await.expect("add sample");

        let response = serde_json::json!({
            "tone": "witty",
            "style": "concise",
            "vocabulary_level": "casual",
            "personality_traits": ["playful"],
            "writing_patterns": ["short sentences"],
            "formatting_preferences": {"bullet_lists": false},
            "unique_characteristics": ["loves exclamation marks"]
        })
        .to_string();
        let gateway = LlmGateway::new(
            Box::new(StubProvider { response, fail: false }),
            pool.clone(),
            LlmRateLimitConfig { minute: 30, day: 500 },
        );

        let profile = analyze_voice(&pool, &gateway, "u1").await.expect("analyze");
        assert_eq!(profile.source, VoiceSource::Analyzed);
        assert_eq!(profile.samples_count, 1);
        assert_eq!(profile.tone.as_deref(), Some("witty"));
    }

    #[tokio::test]
    async fn provider_failure_saves_default_error_profile() {
        let pool = user_pool().await;
        voice::add_sample(&pool, "sample1", "u1", "some sample text").await.expect("add sample");

        let gateway = LlmGateway::new(
            Box::new(StubProvider { response: String::new(), fail: true }),
            pool.clone(),
            LlmRateLimitConfig { minute: 30, day: 500 },
        );

        let profile = analyze_voice(&pool, &gateway, "u1").await.expect("analyze still succeeds");
        assert_eq!(profile.source, VoiceSource::DefaultError);
        assert_eq!(profile.samples_count, 1);
    }

    #[tokio::test]
    async fn unparseable_response_saves_default_fallback_profile() {
        let pool = user_pool().await;
        voice::add_sample(&pool, "sample1", "u1", "some sample text").await.expect("add sample");

        let gateway = LlmGateway::new(
            Box::new(StubProvider { response: "not json".to_string(), fail: false }),
            pool.clone(),
            LlmRateLimitConfig { minute: 30, day: 500 },
        );

        let profile = analyze_voice(&pool, &gateway, "u1").await.expect("analyze still succeeds");
        assert_eq!(profile.source, VoiceSource::DefaultFallback);
    }
}
