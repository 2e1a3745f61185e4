//! Email delivery, recipient, and tracking endpoints (§6 "Email").
//!
//! The tracking pixel and click-redirect handlers are mounted outside
//! `/api` at the path `send_newsletter` itself writes into outgoing mail
//! (`{tracking_base_url}/track/...`), and must never fail the request even
//! if the underlying storage write does (§7 "logging failures never
//! propagate").

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use creatorpulse_core::storage::{
    drafts, email_delivery, email_rate_limits, email_tracking_events, recipients, unsubscribes,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// A 1x1 transparent GIF, served regardless of whether the open event was
/// recorded.
const TRACKING_PIXEL: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xff, 0xff, 0xff,
    0x00, 0x00, 0x00, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00,
    0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

/// `GET /api/email/rate-limit?user_id=`
pub async fn rate_limit_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let daily_cap = state.config.email.daily_cap_standard;
    let count = email_rate_limits::current_count(&state.db, &params.user_id, daily_cap).await?;
    Ok(Json(json!({ "current_count": count, "daily_cap": daily_cap })))
}

/// `GET /api/email/drafts/:draft_id/deliveries`
pub async fn deliveries_for_draft(
    State(state): State<Arc<AppState>>,
    Path(draft_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let rows = email_delivery::list_for_draft(&state.db, &draft_id).await?;
    Ok(Json(json!(rows)))
}

/// `GET /api/email/drafts/:draft_id/stats` — delivery counts plus open
/// count, the "tracking stats" surface called for in §6.
pub async fn stats_for_draft(
    State(state): State<Arc<AppState>>,
    Path(draft_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let deliveries = email_delivery::list_for_draft(&state.db, &draft_id).await?;
    let sent = deliveries.iter().filter(|d| d.status == "sent").count();
    let failed = deliveries.iter().filter(|d| d.status == "failed").count();
    let queued = deliveries.iter().filter(|d| d.status == "queued").count();
    let opens = email_tracking_events::open_count(&state.db, &draft_id).await?;

    Ok(Json(json!({
        "draft_id": draft_id,
        "sent": sent,
        "failed": failed,
        "queued": queued,
        "opens": opens,
    })))
}

#[derive(Deserialize)]
pub struct AddRecipientBody {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
}

/// `GET /api/recipients?user_id=`
pub async fn list_recipients(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let rows = recipients::list_for_user(&state.db, &params.user_id).await?;
    Ok(Json(json!(rows)))
}

/// `POST /api/recipients`
pub async fn add_recipient(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddRecipientBody>,
) -> Result<Json<Value>, ApiError> {
    let id = Uuid::new_v4().to_string();
    let token = Uuid::new_v4().to_string();
    recipients::create(&state.db, &id, &body.user_id, &body.email, body.name.as_deref(), &token)
        .await?;
    Ok(Json(json!({ "id": id, "unsubscribe_token": token })))
}

/// `DELETE /api/recipients/:id`
pub async fn delete_recipient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    recipients::delete(&state.db, &id).await?;
    Ok(Json(json!({ "deleted": true })))
}

/// `GET /api/unsubscribe/status?user_id=&email=`
#[derive(Deserialize)]
pub struct UnsubscribeStatusQuery {
    pub user_id: String,
    pub email: String,
}

pub async fn unsubscribe_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UnsubscribeStatusQuery>,
) -> Result<Json<Value>, ApiError> {
    let unsubscribed =
        unsubscribes::is_unsubscribed(&state.db, &params.user_id, &params.email).await?;
    Ok(Json(json!({ "unsubscribed": unsubscribed })))
}

/// `GET /unsubscribe?token=` — the link recipients click from the footer.
/// Resolves the recipient by their unsubscribe token and records the
/// suppression by user/email pair.
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let token = params
        .get("token")
        .ok_or_else(|| ApiError::BadRequest("missing token query parameter".to_string()))?;

    let recipient = recipients::get_by_token(&state.db, token)
        .await?
        .ok_or_else(|| ApiError::NotFound("unknown unsubscribe token".to_string()))?;

    unsubscribes::unsubscribe(&state.db, &recipient.user_id, &recipient.email).await?;
    Ok(Json(json!({ "unsubscribed": true, "email": recipient.email })))
}

/// `GET /track/open/:draft_id/:recipient_token.gif` — always serves the
/// pixel; the event write is best-effort.
pub async fn track_open(
    State(state): State<Arc<AppState>>,
    Path((draft_id, recipient_token)): Path<(String, String)>,
) -> Response {
    let recipient_token = recipient_token.trim_end_matches(".gif").to_string();
    if let Ok(Some(recipient)) = recipients::get_by_token(&state.db, &recipient_token).await {
        let event_id = Uuid::new_v4().to_string();
        let _ = email_tracking_events::record(
            &state.db,
            &event_id,
            &draft_id,
            &recipient.id,
            "open",
            None,
        )
        .await;
    }

    ([(header::CONTENT_TYPE, "image/gif")], TRACKING_PIXEL).into_response()
}

/// `GET /track/click/:draft_id/:recipient_token?u=` — records the click
/// and redirects to the original URL, regardless of whether the event
/// write succeeds.
#[derive(Deserialize)]
pub struct TrackClickQuery {
    pub u: String,
}

pub async fn track_click(
    State(state): State<Arc<AppState>>,
    Path((draft_id, recipient_token)): Path<(String, String)>,
    Query(params): Query<TrackClickQuery>,
) -> Response {
    let target = match URL_SAFE_NO_PAD
        .decode(&params.u)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    {
        Some(url) => url,
        None => return (StatusCode::BAD_REQUEST, "invalid tracking url").into_response(),
    };

    if let Ok(Some(recipient)) = recipients::get_by_token(&state.db, &recipient_token).await {
        let event_id = Uuid::new_v4().to_string();
        let _ = email_tracking_events::record(
            &state.db,
            &event_id,
            &draft_id,
            &recipient.id,
            "click",
            Some(&target),
        )
        .await;
    }

    Redirect::to(&target).into_response()
}

/// `POST /api/drafts/:draft_id/resend?user_id=` — re-trigger delivery for a
/// draft already published once (e.g. after adding recipients).
pub async fn resend(
    State(state): State<Arc<AppState>>,
    Path(draft_id): Path<String>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let draft = drafts::get_draft(&state.db, &draft_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("draft not found: {draft_id}")))?;

    let report = creatorpulse_core::email::send_newsletter(
        &state.db,
        state.mailer.as_ref(),
        &state.config.smtp,
        &state.config.email,
        &draft_id,
        &draft,
        &params.user_id,
        state.config.email.daily_cap_standard,
    )
    .await?;

    Ok(Json(json!(report)))
}
