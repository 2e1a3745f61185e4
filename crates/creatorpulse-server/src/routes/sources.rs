//! Source connector registry endpoints (§6 "Sources").

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use creatorpulse_core::source;
use creatorpulse_core::storage::sources;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

const SOURCE_KINDS: &[&str] = &["rss", "youtube", "reddit", "github", "twitter"];

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct CreateSourceBody {
    pub user_id: String,
    pub kind: String,
    pub name: String,
    pub url: Option<String>,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub credentials: Value,
}

/// `GET /api/sources?user_id=` — list a user's sources.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let rows = sources::list_sources(&state.db, &params.user_id).await?;
    Ok(Json(json!(rows)))
}

/// `POST /api/sources` — register a new source.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSourceBody>,
) -> Result<Json<Value>, ApiError> {
    if !SOURCE_KINDS.contains(&body.kind.as_str()) {
        return Err(ApiError::BadRequest(format!("unknown source kind: {}", body.kind)));
    }

    let id = uuid::Uuid::new_v4().to_string();
    sources::create_source(
        &state.db,
        &id,
        &body.user_id,
        &body.kind,
        &body.name,
        body.url.as_deref(),
        &body.config,
        &body.credentials,
    )
    .await?;

    let created = sources::get_source(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("source {id} vanished after creation")))?;
    Ok(Json(json!(created)))
}

#[derive(Deserialize)]
pub struct UpdateSourceBody {
    pub config: Value,
}

/// `PATCH /api/sources/:id` — update a source's config.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateSourceBody>,
) -> Result<Json<Value>, ApiError> {
    sources::update_config(&state.db, &id, &body.config).await?;
    let updated = sources::get_source(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("source not found: {id}")))?;
    Ok(Json(json!(updated)))
}

/// `DELETE /api/sources/:id`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    sources::delete_source(&state.db, &id).await?;
    Ok(Json(json!({ "deleted": true })))
}

/// `GET /api/sources/kinds` — the registered connector kinds.
pub async fn kinds() -> Json<Value> {
    Json(json!(SOURCE_KINDS))
}

/// `GET /api/sources/kinds/:kind/schema` — required config/credential keys.
pub async fn kind_schema(Path(kind): Path<String>) -> Result<Json<Value>, ApiError> {
    let connector = source::build_connector(&kind, "schema-probe", json!({}), json!({}))
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(json!({
        "kind": kind,
        "required_config": connector.required_config(),
        "required_credentials": connector.required_credentials(),
    })))
}

/// `POST /api/sources/:id/sync` — trigger a per-source crawl.
pub async fn sync(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let outcome = creatorpulse_core::crawl::crawl_source(&state.db, &id).await?;
    Ok(Json(json!(outcome)))
}

/// `POST /api/sources/:id/reactivate`
pub async fn reactivate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    sources::reactivate(&state.db, &id).await?;
    Ok(Json(json!({ "reactivated": true })))
}

/// `POST /api/sources/reactivate-all?user_id=`
pub async fn reactivate_all(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let count = sources::reactivate_all(&state.db, &params.user_id).await?;
    Ok(Json(json!({ "reactivated": count })))
}
