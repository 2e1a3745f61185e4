//! Voice sample/profile endpoints (§6 "Voice").

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use creatorpulse_core::storage::voice;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct AddSampleBody {
    pub user_id: String,
    pub content: String,
}

/// `GET /api/voice/samples?user_id=`
pub async fn list_samples(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let samples = voice::list_samples(&state.db, &params.user_id).await?;
    Ok(Json(json!(samples)))
}

/// `POST /api/voice/samples` — upload a writing sample.
pub async fn add_sample(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddSampleBody>,
) -> Result<Json<Value>, ApiError> {
    let id = uuid::Uuid::new_v4().to_string();
    voice::add_sample(&state.db, &id, &body.user_id, &body.content).await?;
    Ok(Json(json!({ "id": id })))
}

/// `DELETE /api/voice/samples/:id`
pub async fn delete_sample(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    voice::delete_sample(&state.db, &id).await?;
    Ok(Json(json!({ "deleted": true })))
}

/// `POST /api/voice/analyze?user_id=` — trigger voice analysis (§4.8).
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let profile =
        creatorpulse_core::voice::analyze_voice(&state.db, &state.gateway, &params.user_id).await?;
    Ok(Json(json!(profile)))
}

/// `GET /api/voice/profile?user_id=`
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let profile = voice::get_profile(&state.db, &params.user_id).await?;
    Ok(Json(json!(profile)))
}
