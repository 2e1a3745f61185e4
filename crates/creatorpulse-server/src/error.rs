//! API error types for the CreatorPulse server.
//!
//! Maps core domain errors to HTTP status codes and a
//! `{"error": "...", "kind": "..."}` JSON body carrying the stable
//! error-kind token required by spec §7.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use creatorpulse_core::error::{
    ConnectorError, CrawlError, DraftError, EmailError, FeedbackError, LlmError,
    PreferencesError, StorageError, SummaryError, TrendError, VoiceError,
};
use serde_json::json;

/// API error type for route handlers, wrapping every core error enum this
/// server surfaces (§10.2 — the server wraps core errors into one `ApiError`
/// the way the teacher wraps `StorageError`).
pub enum ApiError {
    Storage(StorageError),
    Connector(ConnectorError),
    Crawl(CrawlError),
    Llm(LlmError),
    Preferences(PreferencesError),
    Trend(TrendError),
    Summary(SummaryError),
    Voice(VoiceError),
    Draft(DraftError),
    Feedback(FeedbackError),
    Email(EmailError),
    NotFound(String),
    BadRequest(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}
impl From<ConnectorError> for ApiError {
    fn from(err: ConnectorError) -> Self {
        Self::Connector(err)
    }
}
impl From<CrawlError> for ApiError {
    fn from(err: CrawlError) -> Self {
        Self::Crawl(err)
    }
}
impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        Self::Llm(err)
    }
}
impl From<PreferencesError> for ApiError {
    fn from(err: PreferencesError) -> Self {
        Self::Preferences(err)
    }
}
impl From<TrendError> for ApiError {
    fn from(err: TrendError) -> Self {
        Self::Trend(err)
    }
}
impl From<SummaryError> for ApiError {
    fn from(err: SummaryError) -> Self {
        Self::Summary(err)
    }
}
impl From<VoiceError> for ApiError {
    fn from(err: VoiceError) -> Self {
        Self::Voice(err)
    }
}
impl From<DraftError> for ApiError {
    fn from(err: DraftError) -> Self {
        Self::Draft(err)
    }
}
impl From<FeedbackError> for ApiError {
    fn from(err: FeedbackError) -> Self {
        Self::Feedback(err)
    }
}
impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        Self::Email(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            Self::Storage(StorageError::NotFound { entity, id }) => {
                (StatusCode::NOT_FOUND, "NotFound", format!("{entity} not found: {id}"))
            }
            Self::Storage(e) => {
                tracing::error!(error = %e, "storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "StorageError", e.to_string())
            }
            Self::Connector(e @ ConnectorError::Validation { .. }) => {
                (StatusCode::BAD_REQUEST, "ValidationError", e.to_string())
            }
            Self::Connector(e @ ConnectorError::RateLimited { .. }) => {
                (StatusCode::TOO_MANY_REQUESTS, "RateLimitExceeded", e.to_string())
            }
            Self::Connector(e) => (StatusCode::BAD_GATEWAY, "SourceFetchError", e.to_string()),
            Self::Crawl(e @ CrawlError::AlreadyCrawling { .. }) => {
                (StatusCode::CONFLICT, "AlreadyCrawling", e.to_string())
            }
            Self::Crawl(e) => (StatusCode::INTERNAL_SERVER_ERROR, "CrawlError", e.to_string()),
            Self::Llm(e @ LlmError::RateLimited { .. }) => {
                (StatusCode::TOO_MANY_REQUESTS, "RateLimitExceeded", e.to_string())
            }
            Self::Llm(LlmError::NotConfigured) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "ValidationError", "no LLM provider configured".to_string())
            }
            Self::Llm(e) => (StatusCode::BAD_GATEWAY, "LLMGenerationError", e.to_string()),
            Self::Preferences(e) => (StatusCode::INTERNAL_SERVER_ERROR, "StorageError", e.to_string()),
            Self::Trend(e) => (StatusCode::INTERNAL_SERVER_ERROR, "TrendError", e.to_string()),
            Self::Summary(e @ SummaryError::Llm(_)) => {
                (StatusCode::BAD_GATEWAY, "LLMGenerationError", e.to_string())
            }
            Self::Summary(e) => (StatusCode::INTERNAL_SERVER_ERROR, "SummaryError", e.to_string()),
            Self::Voice(e) => (StatusCode::INTERNAL_SERVER_ERROR, "VoiceError", e.to_string()),
            Self::Draft(e @ DraftError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, "NotFound", e.to_string())
            }
            Self::Draft(e) => (StatusCode::INTERNAL_SERVER_ERROR, "DraftError", e.to_string()),
            Self::Feedback(e @ FeedbackError::DraftNotFound { .. }) => {
                (StatusCode::NOT_FOUND, "NotFound", e.to_string())
            }
            Self::Feedback(e) => (StatusCode::INTERNAL_SERVER_ERROR, "FeedbackError", e.to_string()),
            Self::Email(e @ EmailError::DailyCapReached { .. }) => {
                (StatusCode::TOO_MANY_REQUESTS, "RateLimitExceeded", e.to_string())
            }
            Self::Email(e @ EmailError::SendFailed { .. }) => {
                (StatusCode::BAD_GATEWAY, "EmailSendError", e.to_string())
            }
            Self::Email(e) => (StatusCode::INTERNAL_SERVER_ERROR, "EmailError", e.to_string()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "ValidationError", msg.clone()),
        };

        let body = axum::Json(json!({ "error": message, "kind": kind }));
        (status, body).into_response()
    }
}
