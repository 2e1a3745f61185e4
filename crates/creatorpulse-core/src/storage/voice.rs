//! Storage for voice profiles and uploaded samples (§3 `VoiceProfile`, C8).

use super::DbPool;
use crate::error::StorageError;
use serde_json::Value;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoiceProfileRow {
    pub user_id: String,
    pub tone: Option<String>,
    pub style: Option<String>,
    pub vocabulary_level: Option<String>,
    pub personality_traits: String,
    pub writing_patterns: String,
    pub formatting_preferences: String,
    pub unique_characteristics: String,
    pub samples_count: i64,
    pub source: String,
    pub updated_at: String,
}

/// The `source` discriminant of a voice profile (§8.6).
///
/// Only `Analyzed` is a usable, personalized voice; all other values are
/// defaults the draft generator must not treat as personalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceSource {
    Analyzed,
    Default,
    DefaultError,
    DefaultFallback,
}

impl VoiceSource {
    fn as_str(self) -> &'static str {
        match self {
            VoiceSource::Analyzed => "analyzed",
            VoiceSource::Default => "default",
            VoiceSource::DefaultError => "default_error",
            VoiceSource::DefaultFallback => "default_fallback",
        }
    }

    fn parse(s: &str) -> VoiceSource {
        match s {
            "analyzed" => VoiceSource::Analyzed,
            "default_error" => VoiceSource::DefaultError,
            "default_fallback" => VoiceSource::DefaultFallback,
            _ => VoiceSource::Default,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct VoiceProfile {
    pub user_id: String,
    pub tone: Option<String>,
    pub style: Option<String>,
    pub vocabulary_level: Option<String>,
    pub personality_traits: Vec<String>,
    pub writing_patterns: Vec<String>,
    pub formatting_preferences: Value,
    pub unique_characteristics: Vec<String>,
    pub samples_count: i64,
    pub source: VoiceSource,
    pub updated_at: String,
}

impl From<VoiceProfileRow> for VoiceProfile {
    fn from(row: VoiceProfileRow) -> Self {
        VoiceProfile {
            user_id: row.user_id,
            tone: row.tone,
            style: row.style,
            vocabulary_level: row.vocabulary_level,
            personality_traits: serde_json::from_str(&row.personality_traits).unwrap_or_default(),
            writing_patterns: serde_json::from_str(&row.writing_patterns).unwrap_or_default(),
            formatting_preferences: serde_json::from_str(&row.formatting_preferences)
                .unwrap_or(Value::Null),
            unique_characteristics: serde_json::from_str(&row.unique_characteristics)
                .unwrap_or_default(),
            samples_count: row.samples_count,
            source: VoiceSource::parse(&row.source),
            updated_at: row.updated_at,
        }
    }
}

pub struct NewVoiceProfile {
    pub tone: Option<String>,
    pub style: Option<String>,
    pub vocabulary_level: Option<String>,
    pub personality_traits: Vec<String>,
    pub writing_patterns: Vec<String>,
    pub formatting_preferences: Value,
    pub unique_characteristics: Vec<String>,
    pub samples_count: i64,
    pub source: VoiceSource,
}

pub async fn upsert_profile(
    pool: &DbPool,
    user_id: &str,
    profile: &NewVoiceProfile,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO voice_profiles \
         (user_id, tone, style, vocabulary_level, personality_traits, writing_patterns, \
          formatting_preferences, unique_characteristics, samples_count, source, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, strftime('%Y-%m-%dT%H:%M:%SZ', 'now')) \
         ON CONFLICT (user_id) DO UPDATE SET \
         tone = excluded.tone, style = excluded.style, vocabulary_level = excluded.vocabulary_level, \
         personality_traits = excluded.personality_traits, writing_patterns = excluded.writing_patterns, \
         formatting_preferences = excluded.formatting_preferences, \
         unique_characteristics = excluded.unique_characteristics, \
         samples_count = excluded.samples_count, source = excluded.source, \
         updated_at = excluded.updated_at",
    )
    .bind(user_id)
    .bind(&profile.tone)
    .bind(&profile.style)
    .bind(&profile.vocabulary_level)
    .bind(serde_json::to_string(&profile.personality_traits).unwrap_or_else(|_| "[]".to_string()))
    .bind(serde_json::to_string(&profile.writing_patterns).unwrap_or_else(|_| "[]".to_string()))
    .bind(profile.formatting_preferences.to_string())
    .bind(serde_json::to_string(&profile.unique_characteristics).unwrap_or_else(|_| "[]".to_string()))
    .bind(profile.samples_count)
    .bind(profile.source.as_str())
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn get_profile(
    pool: &DbPool,
    user_id: &str,
) -> Result<Option<VoiceProfile>, StorageError> {
    let row = sqlx::query_as::<_, VoiceProfileRow>("SELECT * FROM voice_profiles WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.map(VoiceProfile::from))
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct VoiceSample {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
}

pub async fn add_sample(
    pool: &DbPool,
    id: &str,
    user_id: &str,
    content: &str,
) -> Result<(), StorageError> {
    sqlx::query("INSERT INTO voice_samples (id, user_id, content) VALUES (?, ?, ?)")
        .bind(id)
        .bind(user_id)
        .bind(content)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

pub async fn list_samples(pool: &DbPool, user_id: &str) -> Result<Vec<VoiceSample>, StorageError> {
    sqlx::query_as::<_, VoiceSample>(
        "SELECT * FROM voice_samples WHERE user_id = ? ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

pub async fn delete_sample(pool: &DbPool, sample_id: &str) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM voice_samples WHERE id = ?")
        .bind(sample_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{init_test_db, users::create_user};

    #[tokio::test]
    async fn voice_discriminant_round_trips() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");

        upsert_profile(
            &pool,
            "u1",
            &NewVoiceProfile {
                tone: Some("witty".to_string()),
                style: Some("concise".to_string()),
                vocabulary_level: Some("technical".to_string()),
                personality_traits: vec!["curious".to_string()],
                writing_patterns: vec!["short paragraphs".to_string()],
                formatting_preferences: serde_json::json!({"bullet_lists": true}),
                unique_characteristics: vec![],
                samples_count: 3,
                source: VoiceSource::Analyzed,
            },
        )
        .await
        .expect("upsert");

        let profile = get_profile(&pool, "u1").await.expect("get").expect("exists");
        assert_eq!(profile.source, VoiceSource::Analyzed);
        assert_eq!(profile.samples_count, 3);
    }

    #[tokio::test]
    async fn voice_samples_can_be_listed_and_deleted() {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");

        add_sample(&pool, "sample1", "u1", "hello world").await.expect("add");
        let samples = list_samples(&pool, "u1").await.expect("list");
        assert_eq!(samples.len(), 1);

        delete_sample(&pool, "sample1").await.expect("delete");
        let samples = list_samples(&pool, "u1").await.expect("list");
        assert!(samples.is_empty());
    }
}
