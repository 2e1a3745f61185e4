//! Reader feedback endpoints (§6 "Feedback").

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use creatorpulse_core::error::FeedbackError;
use creatorpulse_core::storage::{drafts, feedback};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_DAYS_BACK: i64 = 30;

#[derive(Deserialize)]
pub struct SubmitBody {
    pub user_id: String,
    pub draft_id: String,
    pub section_id: Option<String>,
    pub feedback_type: String,
    pub comment: Option<String>,
}

/// `POST /api/feedback` — submit reader feedback on a draft.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitBody>,
) -> Result<Json<Value>, ApiError> {
    drafts::get_draft(&state.db, &body.draft_id)
        .await?
        .ok_or_else(|| FeedbackError::DraftNotFound { draft_id: body.draft_id.clone() })?;

    let id = uuid::Uuid::new_v4().to_string();
    feedback::submit(
        &state.db,
        &id,
        &body.user_id,
        &body.draft_id,
        body.section_id.as_deref(),
        &body.feedback_type,
        body.comment.as_deref(),
    )
    .await?;
    Ok(Json(json!({ "id": id })))
}

#[derive(Deserialize)]
pub struct UserFeedbackQuery {
    pub user_id: String,
    pub days_back: Option<i64>,
}

/// `GET /api/feedback?user_id=&days_back=` — a user's recent feedback.
pub async fn list_for_user(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserFeedbackQuery>,
) -> Result<Json<Value>, ApiError> {
    let days_back = params.days_back.unwrap_or(DEFAULT_DAYS_BACK);
    let rows = feedback::list_for_user(&state.db, &params.user_id, days_back).await?;
    Ok(Json(json!(rows)))
}

/// `GET /api/feedback/draft/:draft_id` — feedback on a single draft.
pub async fn list_for_draft(
    State(state): State<Arc<AppState>>,
    Path(draft_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let rows = feedback::list_for_draft(&state.db, &draft_id).await?;
    Ok(Json(json!(rows)))
}

/// `GET /api/feedback/stats?user_id=&days_back=` — positive-feedback rate.
pub async fn stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserFeedbackQuery>,
) -> Result<Json<Value>, ApiError> {
    let days_back = params.days_back.unwrap_or(DEFAULT_DAYS_BACK);
    let rate = feedback::positive_rate(&state.db, &params.user_id, days_back).await?;
    Ok(Json(json!({ "positive_rate": rate, "days_back": days_back })))
}

#[derive(Deserialize)]
pub struct UpdateCommentBody {
    pub comment: Option<String>,
}

/// `PATCH /api/feedback/:id` — edit a feedback comment.
pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateCommentBody>,
) -> Result<Json<Value>, ApiError> {
    feedback::update_comment(&state.db, &id, body.comment.as_deref()).await?;
    Ok(Json(json!({ "updated": true })))
}

/// `DELETE /api/feedback/:id`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    feedback::delete(&state.db, &id).await?;
    Ok(Json(json!({ "deleted": true })))
}
