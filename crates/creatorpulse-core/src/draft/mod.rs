//! Draft Generator (C9): assembles a newsletter draft from detected trends,
//! per-trend summaries, and the user's voice/tone, via a single LLM call
//! (§4.9).

use crate::config::{EmailConfig, SmtpConfig};
use crate::email::{self, Mailer};
use crate::error::DraftError;
use crate::feedback;
use crate::llm::gateway::LlmGateway;
use crate::llm::GenerationParams;
use crate::preferences::{self, StyleSource};
use crate::storage::drafts::{self, Draft};
use crate::storage::{users, DbPool};
use crate::summarizer::{self, SummaryType};
use crate::trends;
use serde::Deserialize;

const DEFAULT_MIN_SCORE: f64 = 0.3;

const SYSTEM_PROMPT: &str = "You write a newsletter draft from a creator's trending topics. \
Respond with JSON only: {\"title\": string, \"sections\": [{\"type\": \"intro\"|\"topic\"|\"conclusion\", \
\"heading\": string, \"content\": string}]}. The sections array must start with exactly one \"intro\" \
section, end with exactly one \"conclusion\" section, and contain one \"topic\" section per topic \
provided. No text outside the JSON object.";

#[derive(Debug, Deserialize)]
struct RawDraft {
    title: String,
    sections: serde_json::Value,
}

/// Generate a brand new draft for `user_id`: creates the placeholder row and
/// materializes it in one call (§4.9 operation signature).
#[allow(clippy::too_many_arguments)]
pub async fn generate_draft(
    pool: &DbPool,
    gateway: &LlmGateway,
    mailer: &dyn Mailer,
    smtp: &SmtpConfig,
    email_config: &EmailConfig,
    user_id: &str,
    topic_count: usize,
    days_back: i64,
) -> Result<Draft, DraftError> {
    let draft_id = uuid::Uuid::new_v4().to_string();
    drafts::create_placeholder(pool, &draft_id, user_id, "Untitled draft").await?;
    materialize(pool, gateway, mailer, smtp, email_config, user_id, &draft_id, topic_count, days_back).await
}

/// Regenerate an existing draft in place: no new row is created, matching
/// the single-row draft lifecycle (§8.9).
#[allow(clippy::too_many_arguments)]
pub async fn regenerate_draft(
    pool: &DbPool,
    gateway: &LlmGateway,
    mailer: &dyn Mailer,
    smtp: &SmtpConfig,
    email_config: &EmailConfig,
    user_id: &str,
    draft_id: &str,
    topic_count: usize,
    days_back: i64,
) -> Result<Draft, DraftError> {
    drafts::get_draft(pool, draft_id)
        .await?
        .ok_or_else(|| DraftError::NotFound { draft_id: draft_id.to_string() })?;
    materialize(pool, gateway, mailer, smtp, email_config, user_id, draft_id, topic_count, days_back).await
}

#[allow(clippy::too_many_arguments)]
async fn materialize(
    pool: &DbPool,
    gateway: &LlmGateway,
    mailer: &dyn Mailer,
    smtp: &SmtpConfig,
    email_config: &EmailConfig,
    user_id: &str,
    draft_id: &str,
    topic_count: usize,
    days_back: i64,
) -> Result<Draft, DraftError> {
    let preferences_doc = preferences::resolve(pool, user_id).await?;

    let detected = trends::detect_trends(pool, gateway, user_id, days_back, DEFAULT_MIN_SCORE, topic_count).await?;

    if detected.is_empty() {
        return finish_fallback(pool, mailer, smtp, email_config, draft_id, user_id).await;
    }

    let style = preferences::resolve_style(pool, user_id).await?;
    let style_instruction = match &style {
        StyleSource::Voice(profile) => format!(
            "Write in this voice: tone={}, style={}, vocabulary_level={}.",
            profile.tone.as_deref().unwrap_or("unspecified"),
            profile.style.as_deref().unwrap_or("unspecified"),
            profile.vocabulary_level.as_deref().unwrap_or("unspecified"),
        ),
        StyleSource::ToneInstruction(instruction) => instruction.clone(),
    };
    let voice_profile_used = matches!(style, StyleSource::Voice(_));

    // Feedback is an optional addendum (§4.10): a failure to analyze it
    // never blocks draft generation itself.
    let feedback_addendum = match feedback::analyze_feedback(pool, gateway, user_id, None).await {
        Ok(insights) => insights.map(|i| i.as_prompt_addendum()),
        Err(err) => {
            tracing::warn!(user_id = %user_id, error = %err, "feedback analysis failed, proceeding without addendum");
            None
        }
    };

    let mut topic_contexts = Vec::with_capacity(detected.len());
    for trend in &detected {
        let summary_text = match trend.supporting_item_ids.first() {
            Some(content_id) => summarizer::summarize(pool, gateway, user_id, content_id, SummaryType::Standard)
                .await
                .map(|s| Some(s.summary))
                .unwrap_or(None),
            None => None,
        };
        topic_contexts.push(format!(
            "Topic: {}\nScore: {:.2}\nRationale: {}\nSupporting summary: {}",
            trend.topic,
            trend.score,
            trend.rationale.as_deref().unwrap_or("none"),
            summary_text.as_deref().unwrap_or("none"),
        ));
    }

    let user_message = format!(
        "{}\n\nTopics to cover ({} total):\n\n{}{}",
        style_instruction,
        detected.len(),
        topic_contexts.join("\n\n"),
        feedback_addendum.map(|a| format!("\n\n{a}")).unwrap_or_default(),
    );
    let params = GenerationParams { max_tokens: 2048, temperature: 0.6, system_prompt: None };

    let model_used = gateway
        .chat_completion(user_id, "draft_generator", SYSTEM_PROMPT, &user_message, &params)
        .await;

    let response = match model_used {
        Ok(response) => response,
        Err(err) => return finish_failed(pool, draft_id, "LLMGenerationError", &err.to_string()).await,
    };

    let raw: Option<RawDraft> = parse_draft(&response.text);
    let Some(raw) = raw else {
        return finish_failed(pool, draft_id, "LLMGenerationError", "unparseable draft response").await;
    };

    let metadata = serde_json::json!({
        "voice_profile_used": voice_profile_used,
        "trends_used": detected.iter().map(|t| t.topic.clone()).collect::<Vec<_>>(),
        "model_used": response.model,
    });
    let generated_at = chrono::Utc::now().to_rfc3339();
    drafts::mark_ready(pool, draft_id, &raw.title, &raw.sections, &metadata, &generated_at).await?;
    notify_ready(pool, mailer, smtp, email_config, user_id, draft_id).await;

    drafts::get_draft(pool, draft_id)
        .await?
        .ok_or_else(|| DraftError::NotFound { draft_id: draft_id.to_string() })
}

/// Draft-ready notification is best-effort (§4.11): a delivery failure is
/// logged but never fails the draft that just finished generating.
async fn notify_ready(
    pool: &DbPool,
    mailer: &dyn Mailer,
    smtp: &SmtpConfig,
    email_config: &EmailConfig,
    user_id: &str,
    draft_id: &str,
) {
    let user = match users::get_user(pool, user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return,
        Err(err) => {
            tracing::warn!(user_id = %user_id, error = %err, "could not look up user for draft-ready notification");
            return;
        }
    };

    if let Err(err) = email::notify_draft_ready(pool, mailer, smtp, email_config, user_id, &user.email, draft_id).await {
        tracing::warn!(user_id = %user_id, draft_id = %draft_id, error = %err, "draft-ready notification failed");
    }
}

async fn finish_fallback(
    pool: &DbPool,
    mailer: &dyn Mailer,
    smtp: &SmtpConfig,
    email_config: &EmailConfig,
    draft_id: &str,
    user_id: &str,
) -> Result<Draft, DraftError> {
    let sections = serde_json::json!([
        {
            "type": "intro",
            "heading": "This week",
            "content": "We didn't spot enough fresh activity to surface a trending topic this time around.",
        },
        {
            "type": "conclusion",
            "heading": "Until next time",
            "content": "Check back soon for the next update.",
        }
    ]);
    let metadata = serde_json::json!({ "no_trends": true, "fallback": true });
    let generated_at = chrono::Utc::now().to_rfc3339();
    drafts::mark_ready(pool, draft_id, "Your newsletter", &sections, &metadata, &generated_at).await?;
    notify_ready(pool, mailer, smtp, email_config, user_id, draft_id).await;

    drafts::get_draft(pool, draft_id)
        .await?
        .ok_or_else(|| DraftError::NotFound { draft_id: draft_id.to_string() })
        .map(|draft| {
            tracing::info!(user_id = %user_id, draft_id = %draft_id, "draft generated with no trends, fallback sections used");
            draft
        })
}

async fn finish_failed(pool: &DbPool, draft_id: &str, error_type: &str, message: &str) -> Result<Draft, DraftError> {
    let metadata = serde_json::json!({ "error": message, "error_type": error_type });
    drafts::mark_failed(pool, draft_id, &metadata).await?;
    drafts::get_draft(pool, draft_id)
        .await?
        .ok_or_else(|| DraftError::NotFound { draft_id: draft_id.to_string() })
}

fn parse_draft(text: &str) -> Option<RawDraft> {
    let trimmed = text.trim().trim_start_matches("```json").trim_start_matches("```").trim_end_matches("```").trim();
    serde_json::from_str(trimmed).ok()
}
