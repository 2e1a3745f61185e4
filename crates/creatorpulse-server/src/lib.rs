//! CreatorPulse HTTP API server.
//!
//! Exposes `creatorpulse-core`'s storage and pipeline layers as a REST API.
//! Authentication is handled by an external session layer (§6) — this
//! crate assumes every request it receives has already been authorized.

pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the complete axum router with all API routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        // Sources
        .route("/sources", get(routes::sources::list).post(routes::sources::create))
        .route("/sources/kinds", get(routes::sources::kinds))
        .route("/sources/kinds/{kind}/schema", get(routes::sources::kind_schema))
        .route("/sources/reactivate-all", post(routes::sources::reactivate_all))
        .route(
            "/sources/{id}",
            patch(routes::sources::update).delete(routes::sources::delete),
        )
        .route("/sources/{id}/sync", post(routes::sources::sync))
        .route("/sources/{id}/reactivate", post(routes::sources::reactivate))
        // Crawl
        .route("/crawl", post(routes::crawl::trigger))
        .route("/crawl/status", get(routes::crawl::status))
        // Drafts
        .route("/drafts", get(routes::drafts::list).post(routes::drafts::generate))
        .route("/drafts/debug", get(routes::drafts::debug))
        .route(
            "/drafts/{id}",
            get(routes::drafts::get).delete(routes::drafts::delete),
        )
        .route("/drafts/{id}/sections", patch(routes::drafts::update_sections))
        .route("/drafts/{id}/regenerate", post(routes::drafts::regenerate))
        .route("/drafts/{id}/publish", post(routes::drafts::publish))
        .route("/drafts/{id}/resend", post(routes::email::resend))
        // Voice
        .route(
            "/voice/samples",
            get(routes::voice::list_samples).post(routes::voice::add_sample),
        )
        .route("/voice/samples/{id}", axum::routing::delete(routes::voice::delete_sample))
        .route("/voice/analyze", post(routes::voice::analyze))
        .route("/voice/profile", get(routes::voice::profile))
        // Feedback
        .route("/feedback", get(routes::feedback::list_for_user).post(routes::feedback::submit))
        .route("/feedback/stats", get(routes::feedback::stats))
        .route("/feedback/draft/{draft_id}", get(routes::feedback::list_for_draft))
        .route(
            "/feedback/{id}",
            patch(routes::feedback::update_comment).delete(routes::feedback::delete),
        )
        // LLM usage
        .route("/llm/usage/summary", get(routes::llm_usage::summary))
        .route("/llm/usage/logs", get(routes::llm_usage::logs))
        // Email / recipients / unsubscribe
        .route("/email/rate-limit", get(routes::email::rate_limit_status))
        .route("/email/drafts/{draft_id}/deliveries", get(routes::email::deliveries_for_draft))
        .route("/email/drafts/{draft_id}/stats", get(routes::email::stats_for_draft))
        .route(
            "/recipients",
            get(routes::email::list_recipients).post(routes::email::add_recipient),
        )
        .route("/recipients/{id}", axum::routing::delete(routes::email::delete_recipient))
        .route("/unsubscribe/status", get(routes::email::unsubscribe_status))
        // Preferences
        .route("/preferences", get(routes::preferences::get).patch(routes::preferences::patch))
        .route("/preferences/reset", post(routes::preferences::reset));

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/unsubscribe", get(routes::email::unsubscribe))
        .route("/track/open/{draft_id}/{recipient_token}", get(routes::email::track_open))
        .route("/track/click/{draft_id}/{recipient_token}", get(routes::email::track_click))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
