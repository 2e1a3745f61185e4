//! LLM usage/rate-limit inspection endpoints (§6 "LLM usage").

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use creatorpulse_core::storage::llm_rate_limits::{self, LimitType};
use creatorpulse_core::storage::llm_usage;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

/// `GET /api/llm/usage/summary?user_id=` — tokens today/this month plus
/// both rate-limit windows.
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let today = llm_usage::tokens_used_today(&state.db, &params.user_id).await?;
    let month = llm_usage::tokens_used_this_month(&state.db, &params.user_id).await?;
    let minute = llm_rate_limits::check(
        &state.db,
        &params.user_id,
        LimitType::Minute,
        state.config.llm_rate_limits.minute,
    )
    .await?;
    let day = llm_rate_limits::check(
        &state.db,
        &params.user_id,
        LimitType::Day,
        state.config.llm_rate_limits.day,
    )
    .await?;

    Ok(Json(json!({
        "tokens_used_today": today,
        "tokens_used_this_month": month,
        "minute_window": {
            "current_count": minute.current_count,
            "limit_value": minute.limit_value,
            "reset_at": minute.reset_at,
        },
        "day_window": {
            "current_count": day.current_count,
            "limit_value": day.limit_value,
            "reset_at": day.reset_at,
        },
    })))
}

#[derive(Deserialize)]
pub struct LogsQuery {
    pub user_id: String,
    pub limit: Option<i64>,
}

/// `GET /api/llm/usage/logs?user_id=&limit=`
pub async fn logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogsQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = params.limit.unwrap_or(50);
    let rows = llm_usage::recent_logs(&state.db, &params.user_id, limit).await?;
    Ok(Json(json!(rows)))
}
