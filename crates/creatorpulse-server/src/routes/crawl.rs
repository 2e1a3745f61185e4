//! Crawl orchestrator endpoints (§6 "Crawl").

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use creatorpulse_core::crawl;
use creatorpulse_core::storage::{crawl_logs, schedules, sources};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

/// `POST /api/crawl?user_id=` — trigger a full batch crawl for one user.
pub async fn trigger(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let outcome = crawl::crawl_user(&state.db, &params.user_id).await?;
    Ok(Json(json!(outcome)))
}

/// `GET /api/crawl/status?user_id=` — the schedule row plus recent logs
/// for every active source (§6 "fetch batch status and logs").
pub async fn status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let schedule = schedules::get_schedule(&state.db, &params.user_id).await?;
    let active_sources = sources::list_active_sources(&state.db, &params.user_id).await?;

    let mut logs = Vec::new();
    for source in &active_sources {
        let recent = crawl_logs::recent_for_source(&state.db, &source.id, 10).await?;
        logs.push(json!({ "source_id": source.id, "logs": recent }));
    }

    Ok(Json(json!({ "schedule": schedule, "logs": logs })))
}
