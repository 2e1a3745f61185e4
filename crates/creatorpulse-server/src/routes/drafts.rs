//! Draft generator endpoints (§6 "Drafts").

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use creatorpulse_core::email;
use creatorpulse_core::storage::{content_items, drafts, trends, voice};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_TOPIC_COUNT: usize = 5;
const DEFAULT_DAYS_BACK: i64 = 14;

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct GenerateBody {
    pub user_id: String,
    #[serde(default = "default_topic_count")]
    pub topic_count: usize,
    #[serde(default = "default_days_back")]
    pub days_back: i64,
}

fn default_topic_count() -> usize {
    DEFAULT_TOPIC_COUNT
}
fn default_days_back() -> i64 {
    DEFAULT_DAYS_BACK
}

/// `POST /api/drafts` — generate a new draft.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<Value>, ApiError> {
    let draft = creatorpulse_core::draft::generate_draft(
        &state.db,
        &state.gateway,
        state.mailer.as_ref(),
        &state.config.smtp,
        &state.config.email,
        &body.user_id,
        body.topic_count,
        body.days_back,
    )
    .await?;
    Ok(Json(json!(draft)))
}

/// `GET /api/drafts?user_id=`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let rows = drafts::list_for_user(&state.db, &params.user_id).await?;
    Ok(Json(json!(rows)))
}

/// `GET /api/drafts/:id`
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let draft = drafts::get_draft(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("draft not found: {id}")))?;
    Ok(Json(json!(draft)))
}

#[derive(Deserialize)]
pub struct UpdateSectionsBody {
    pub sections: Value,
}

/// `PATCH /api/drafts/:id/sections`
pub async fn update_sections(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateSectionsBody>,
) -> Result<Json<Value>, ApiError> {
    drafts::update_sections(&state.db, &id, &body.sections).await?;
    let draft = drafts::get_draft(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("draft not found: {id}")))?;
    Ok(Json(json!(draft)))
}

#[derive(Deserialize)]
pub struct RegenerateBody {
    pub user_id: String,
    #[serde(default = "default_topic_count")]
    pub topic_count: usize,
    #[serde(default = "default_days_back")]
    pub days_back: i64,
}

/// `POST /api/drafts/:id/regenerate`
pub async fn regenerate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RegenerateBody>,
) -> Result<Json<Value>, ApiError> {
    let draft = creatorpulse_core::draft::regenerate_draft(
        &state.db,
        &state.gateway,
        state.mailer.as_ref(),
        &state.config.smtp,
        &state.config.email,
        &body.user_id,
        &id,
        body.topic_count,
        body.days_back,
    )
    .await?;
    Ok(Json(json!(draft)))
}

#[derive(Deserialize)]
pub struct PublishBody {
    pub user_id: String,
}

/// `POST /api/drafts/:id/publish` — marks the draft published and sends it
/// via C11 (§6 "publish (sends via C11)").
pub async fn publish(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<PublishBody>,
) -> Result<Json<Value>, ApiError> {
    let draft = drafts::get_draft(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("draft not found: {id}")))?;

    let report = email::send_newsletter(
        &state.db,
        state.mailer.as_ref(),
        &state.config.smtp,
        &state.config.email,
        &id,
        &draft,
        &body.user_id,
        state.config.email.daily_cap_standard,
    )
    .await?;

    let now = Utc::now().to_rfc3339();
    drafts::mark_published(&state.db, &id, &now).await?;
    drafts::mark_email_sent(&state.db, &id, &now).await?;

    Ok(Json(json!({ "draft_id": id, "send_report": report })))
}

/// `DELETE /api/drafts/:id`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    drafts::delete_draft(&state.db, &id).await?;
    Ok(Json(json!({ "deleted": true })))
}

/// `GET /api/drafts/debug?user_id=` — content/trend/voice-sample counts and
/// whether a draft can currently be generated (§6 "debug endpoint").
pub async fn debug(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let content_count = content_items::recent_for_user(&state.db, &params.user_id, DEFAULT_DAYS_BACK)
        .await?
        .len();
    let trend_count = trends::recent_for_user(&state.db, &params.user_id, 50).await?.len();
    let voice_sample_count = voice::list_samples(&state.db, &params.user_id).await?.len();

    Ok(Json(json!({
        "content_item_count": content_count,
        "trend_count": trend_count,
        "voice_sample_count": voice_sample_count,
        "can_generate": content_count > 0,
    })))
}
