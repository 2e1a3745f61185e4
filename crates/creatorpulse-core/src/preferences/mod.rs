//! Preferences Resolver (C5): deep-merges a user's stored JSON preferences
//! document against a fixed defaults document, and decides between a
//! stored voice profile and a tone instruction built from fixed phrase
//! banks (§4.5).

use crate::error::PreferencesError;
use crate::storage::{users, voice, DbPool};
use serde_json::{json, Value};

/// The full preferences defaults document (§4.5 "New users are
/// initialized with the full defaults document").
pub fn defaults() -> Value {
    json!({
        "draft_schedule_time": "08:00",
        "newsletter_frequency": "weekly",
        "tone_preferences": {
            "formality": "balanced",
            "enthusiasm": "moderate",
            "length_preference": "medium",
            "use_emojis": false
        },
        "use_voice_profile": true,
        "notification_preferences": {
            "email_on_draft_ready": true,
            "email_on_publish_success": true,
            "email_on_errors": true,
            "weekly_summary": false
        },
        "email_preferences": {
            "default_subject_template": "Your newsletter: {title}",
            "include_preview_text": true,
            "track_opens": true,
            "track_clicks": true
        }
    })
}

/// Deep-merge `override_doc` on top of `base`: objects merge key by key,
/// any other value type in `override_doc` replaces the base value outright.
fn deep_merge(base: &Value, override_doc: &Value) -> Value {
    match (base, override_doc) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged = base_map.clone();
            for (key, override_value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(base_value) => deep_merge(base_value, override_value),
                    None => override_value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        (_, override_doc) => override_doc.clone(),
    }
}

/// Resolve a user's effective preferences: stored document deep-merged
/// onto the defaults document.
pub async fn resolve(pool: &DbPool, user_id: &str) -> Result<Value, PreferencesError> {
    let stored = users::get_preferences(pool, user_id)
        .await?
        .unwrap_or(Value::Null);
    Ok(deep_merge(&defaults(), &stored))
}

/// Style source for a draft prompt: either a stored voice profile, or a
/// tone instruction string built from fixed phrase banks.
pub enum StyleSource {
    Voice(voice::VoiceProfile),
    ToneInstruction(String),
}

const FORMALITY_PHRASES: &[(&str, &str)] = &[
    ("casual", "friendly, conversational tone"),
    ("balanced", "clear, approachable tone"),
    ("formal", "polished, professional tone"),
];

const ENTHUSIASM_PHRASES: &[(&str, &str)] = &[
    ("low", "measured and understated"),
    ("moderate", "engaged and upbeat"),
    ("high", "energetic and enthusiastic"),
];

const LENGTH_PHRASES: &[(&str, &str)] = &[
    ("short", "200-300 words"),
    ("medium", "400-600 words"),
    ("long", "800-1000 words"),
];

fn phrase_for(bank: &[(&str, &str)], key: &str, default_key: &str) -> String {
    bank.iter()
        .find(|(k, _)| *k == key)
        .or_else(|| bank.iter().find(|(k, _)| *k == default_key))
        .map(|(_, phrase)| phrase.to_string())
        .unwrap_or_default()
}

/// Build the tone instruction string from `tone_preferences`, using the
/// fixed phrase banks keyed on each enum value (§4.5 "Voice/tone decision").
fn tone_instruction(preferences: &Value) -> String {
    let tone = preferences.get("tone_preferences").cloned().unwrap_or(json!({}));
    let formality = tone.get("formality").and_then(Value::as_str).unwrap_or("balanced");
    let enthusiasm = tone.get("enthusiasm").and_then(Value::as_str).unwrap_or("moderate");
    let length = tone.get("length_preference").and_then(Value::as_str).unwrap_or("medium");
    let use_emojis = tone.get("use_emojis").and_then(Value::as_bool).unwrap_or(false);

    let formality_phrase = phrase_for(FORMALITY_PHRASES, formality, "balanced");
    let enthusiasm_phrase = phrase_for(ENTHUSIASM_PHRASES, enthusiasm, "moderate");
    let length_phrase = phrase_for(LENGTH_PHRASES, length, "medium");
    let emoji_phrase = if use_emojis { "Use emojis sparingly where natural." } else { "Do not use emojis." };

    format!(
        "Write in a {formality_phrase}, {enthusiasm_phrase}. Target length: {length_phrase}. {emoji_phrase}"
    )
}

/// Decide between the stored voice profile and a tone instruction
/// (§4.5 "Voice/tone decision"): the voice profile is used only when
/// `use_voice_profile=true` *and* the profile's discriminant is `analyzed`.
pub async fn resolve_style(pool: &DbPool, user_id: &str) -> Result<StyleSource, PreferencesError> {
    let preferences = resolve(pool, user_id).await?;
    let use_voice_profile = preferences.get("use_voice_profile").and_then(Value::as_bool).unwrap_or(true);

    if use_voice_profile {
        if let Some(profile) = voice::get_profile(pool, user_id).await? {
            if profile.source == voice::VoiceSource::Analyzed {
                return Ok(StyleSource::Voice(profile));
            }
        }
    }

    Ok(StyleSource::ToneInstruction(tone_instruction(&preferences)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{init_test_db, users::create_user, voice::{upsert_profile, NewVoiceProfile, VoiceSource}};

    #[tokio::test]
    async fn resolve_fills_in_missing_keys_from_defaults() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({"newsletter_frequency": "daily"}), 24)
            .await
            .expect("create user");

        let resolved = resolve(&pool, "u1").await.expect("resolve");
        assert_eq!(resolved["newsletter_frequency"], "daily");
        assert_eq!(resolved["tone_preferences"]["formality"], "balanced");
        assert_eq!(resolved["email_preferences"]["track_opens"], true);
    }

    #[tokio::test]
    async fn analyzed_voice_profile_wins_when_enabled() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({"use_voice_profile": true}), 24)
            .await
            .expect("create user");
        upsert_profile(
            &pool,
            "u1",
            &NewVoiceProfile {
                tone: Some("witty".to_string()),
                style: None,
                vocabulary_level: None,
                personality_traits: vec![],
                writing_patterns: vec![],
                formatting_preferences: serde_json::json!({}),
                unique_characteristics: vec![],
                samples_count: 2,
                source: VoiceSource::Analyzed,
            },
        )
        .await
        .expect("upsert");

        let style = resolve_style(&pool, "u1").await.expect("resolve style");
        assert!(matches!(style, StyleSource::Voice(_)));
    }

    #[tokio::test]
    async fn default_fallback_profile_is_ignored_even_when_enabled() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({"use_voice_profile": true}), 24)
            .await
            .expect("create user");
        upsert_profile(
            &pool,
            "u1",
            &NewVoiceProfile {
                tone: None,
                style: None,
                vocabulary_level: None,
                personality_traits: vec![],
                writing_patterns: vec![],
                formatting_preferences: serde_json::json!({}),
                unique_characteristics: vec![],
                samples_count: 0,
                source: VoiceSource::DefaultFallback,
            },
        )
        .await
        .expect("upsert");

        let style = resolve_style(&pool, "u1").await.expect("resolve style");
        assert!(matches!(style, StyleSource::ToneInstruction(_)));
    }

    #[tokio::test]
    async fn use_voice_profile_false_always_yields_tone_instruction() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({"use_voice_profile": false}), 24)
            .await
            .expect("create user");
        upsert_profile(
            &pool,
            "u1",
            &NewVoiceProfile {
                tone: None,
                style: None,
                vocabulary_level: None,
                personality_traits: vec![],
                writing_patterns: vec![],
                formatting_preferences: serde_json::json!({}),
                unique_characteristics: vec![],
                samples_count: 5,
                source: VoiceSource::Analyzed,
            },
        )
        .await
        .expect("upsert");

        let style = resolve_style(&pool, "u1").await.expect("resolve style");
        match style {
            StyleSource::ToneInstruction(instruction) => {
                assert!(instruction.contains("approachable tone"));
            }
            _ => panic!("expected tone instruction"),
        }
    }
}
