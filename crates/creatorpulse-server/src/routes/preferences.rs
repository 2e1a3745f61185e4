//! User preferences endpoints (§6 "Preferences", C5).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use creatorpulse_core::preferences;
use creatorpulse_core::storage::users;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

/// `GET /api/preferences?user_id=` — effective preferences (stored
/// document deep-merged onto defaults, per C5).
pub async fn get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let resolved = preferences::resolve(&state.db, &params.user_id).await?;
    Ok(Json(resolved))
}

#[derive(Deserialize)]
pub struct PatchBody {
    pub user_id: String,
    pub patch: Value,
}

/// `PATCH /api/preferences` — merges `patch` onto the user's stored
/// document and persists it, then returns the newly resolved preferences.
pub async fn patch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PatchBody>,
) -> Result<Json<Value>, ApiError> {
    let stored = users::get_preferences(&state.db, &body.user_id)
        .await?
        .unwrap_or(json!({}));
    let merged = merge(&stored, &body.patch);
    users::set_preferences(&state.db, &body.user_id, &merged).await?;

    let resolved = preferences::resolve(&state.db, &body.user_id).await?;
    Ok(Json(resolved))
}

/// `POST /api/preferences/reset?user_id=` — clears the stored override
/// document, so the user falls back to pure defaults.
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    users::set_preferences(&state.db, &params.user_id, &json!({})).await?;
    let resolved = preferences::resolve(&state.db, &params.user_id).await?;
    Ok(Json(resolved))
}

fn merge(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            let mut merged = base_map.clone();
            for (key, patch_value) in patch_map {
                let merged_value = match merged.get(key) {
                    Some(base_value) => merge(base_value, patch_value),
                    None => patch_value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        (_, patch) => patch.clone(),
    }
}
