//! Error types for the CreatorPulse core library.
//!
//! Each component has its own error enum to provide a clear error boundary.
//! The library uses `thiserror` for structured, typed errors; every
//! user-facing failure is expected to carry a stable error-kind token
//! (the variant name) plus a short message.

/// Errors related to configuration loading, parsing, and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required configuration field is absent.
    #[error("missing required config field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration field has an unacceptable value.
    #[error("invalid value for config field '{field}': {message}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// A description of why the value is invalid.
        message: String,
    },

    /// The configuration file does not exist at the specified path.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// The path that was searched.
        path: String,
    },

    /// TOML deserialization failed.
    #[error("failed to parse config file: {source}")]
    ParseError {
        /// The underlying TOML parse error.
        #[source]
        source: toml::de::Error,
    },
}

/// Errors from SQLite storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to connect to SQLite database.
    #[error("database connection error: {source}")]
    Connection {
        /// The underlying SQLx error.
        #[source]
        source: sqlx::Error,
    },

    /// Database migration failed.
    #[error("database migration error: {source}")]
    Migration {
        /// The underlying migration error.
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    /// A database query failed.
    #[error("database query error: {source}")]
    Query {
        /// The underlying SQLx error.
        #[source]
        source: sqlx::Error,
    },

    /// A row referenced by id was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The entity type, e.g. "source", "draft".
        entity: String,
        /// The id that was looked up.
        id: String,
    },
}

/// Errors from source connectors (C1): missing credentials/config, and
/// provider-side fetch failures (§7 `ValidationError` / `SourceFetchError`).
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// The connector kind is not registered.
    #[error("unknown connector kind: {kind}")]
    UnknownKind {
        /// The requested connector kind string.
        kind: String,
    },

    /// Required credentials or config fields are missing or incomplete
    /// (e.g. an incomplete OAuth1.0a quadruple). Never retried.
    #[error("validation failed for source {source_id}: missing {}", missing.join(", "))]
    Validation {
        /// The source that failed validation.
        source_id: String,
        /// The names of the missing required fields.
        missing: Vec<String>,
    },

    /// The provider returned a 4xx/5xx response or the payload failed to parse.
    #[error("source fetch failed for {source_id}: {message}")]
    Fetch {
        /// The source that failed to fetch.
        source_id: String,
        /// Details of the failure.
        message: String,
    },

    /// The provider signaled a rate limit; source should be marked `error`
    /// with a retry hint rather than retried inline.
    #[error("source {source_id} rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// The source that was rate limited.
        source_id: String,
        /// Seconds to wait before the next attempt.
        retry_after_secs: u64,
    },

    /// Network-level failure communicating with the provider.
    #[error("connector network error: {source}")]
    Network {
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
}

/// Errors from the crawl orchestrator (C2).
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// A batch crawl was skipped because one was already in progress for the user.
    #[error("crawl already in progress for user {user_id}")]
    AlreadyCrawling {
        /// The user whose batch is already running.
        user_id: String,
    },

    /// A connector-level error occurred while crawling one source; the batch
    /// continues for the remaining sources.
    #[error("connector error during crawl: {0}")]
    Connector(#[from] ConnectorError),

    /// A storage error occurred while persisting crawl results.
    #[error("storage error during crawl: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from the scheduler (C3).
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The cron-equivalent expression for a schedule could not be parsed.
    #[error("invalid schedule expression '{expr}': {message}")]
    InvalidExpression {
        /// The offending expression.
        expr: String,
        /// Details of the parse failure.
        message: String,
    },

    /// A storage error occurred while reconciling schedules.
    #[error("storage error during scheduling: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from interacting with LLM providers (OpenAI, Anthropic, Ollama)
/// via the LLM gateway (C4).
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP request to the LLM endpoint failed.
    #[error("LLM HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// LLM API returned an error response.
    #[error("LLM API error (status {status}): {message}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The error message from the API.
        message: String,
    },

    /// Per-user LLM rate limit exceeded (minute or day window). Surfaced
    /// synchronously as an HTTP 429-equivalent; never slept on.
    #[error("LLM rate limit exceeded for user {user_id}: {window} limit")]
    RateLimited {
        /// The user whose limit was exceeded.
        user_id: String,
        /// Which window was exceeded: "minute" or "day".
        window: String,
    },

    /// LLM response could not be parsed into the expected structure.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// No LLM provider configured for the user or global default.
    #[error("no LLM provider configured")]
    NotConfigured,

    /// Content generation failed after retries.
    #[error("content generation failed: {0}")]
    GenerationFailed(String),

    /// A storage error occurred while logging usage or checking limits.
    #[error("storage error in LLM gateway: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from the preferences resolver (C5).
#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    /// The stored preferences document is not valid JSON.
    #[error("malformed preferences document for user {user_id}: {message}")]
    Malformed {
        /// The user whose preferences failed to parse.
        user_id: String,
        /// Details of the parse failure.
        message: String,
    },

    /// A storage error occurred while reading or writing preferences.
    #[error("storage error in preferences: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from the trend detector (C6). Per §7, a failed LLM call degrades
/// to an empty trend list rather than propagating as an error in normal
/// operation; this enum covers the cases that do need to surface.
#[derive(Debug, thiserror::Error)]
pub enum TrendError {
    /// A storage error occurred while reading content items.
    #[error("storage error in trend detector: {0}")]
    Storage(#[from] StorageError),

    /// The LLM call backing trend detection failed.
    #[error("LLM error in trend detector: {0}")]
    Llm(#[from] LlmError),
}

/// Errors from the content summarizer (C7).
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    /// A storage error occurred while reading or caching summaries.
    #[error("storage error in summarizer: {0}")]
    Storage(#[from] StorageError),

    /// The LLM call backing summarization failed.
    #[error("LLM error in summarizer: {0}")]
    Llm(#[from] LlmError),
}

/// Errors from the voice analyzer (C8). Per §7, an `LLMGenerationError`
/// here does not propagate: the analyzer falls back to a default profile
/// with `source=default_error` or `default_fallback` instead.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// A storage error occurred while reading or writing the voice profile.
    #[error("storage error in voice analyzer: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from the draft generator (C9).
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    /// The referenced draft does not exist.
    #[error("draft not found: {draft_id}")]
    NotFound {
        /// The draft id that was looked up.
        draft_id: String,
    },

    /// The LLM call backing draft generation failed; the draft is marked
    /// `failed` with this detail rather than propagating further.
    #[error("draft generation failed: {0}")]
    Llm(#[from] LlmError),

    /// A storage error occurred while persisting the draft.
    #[error("storage error in draft generator: {0}")]
    Storage(#[from] StorageError),

    /// Preferences could not be resolved for the draft's owner.
    #[error("preferences error in draft generator: {0}")]
    Preferences(#[from] PreferencesError),

    /// Trend detection failed ahead of drafting (distinct from "no trends").
    #[error("trend detection error in draft generator: {0}")]
    Trend(#[from] TrendError),

    /// Content summarization failed while building the draft prompt.
    #[error("summarization error in draft generator: {0}")]
    Summary(#[from] SummaryError),
}

/// Errors from the feedback analyzer (C10).
#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    /// The feedback payload referenced a draft that does not exist.
    #[error("draft not found for feedback: {draft_id}")]
    DraftNotFound {
        /// The draft id the feedback referenced.
        draft_id: String,
    },

    /// A storage error occurred while recording feedback.
    #[error("storage error in feedback analyzer: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from email delivery and draft-ready notification (C11/C12).
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport could not be built or connected.
    #[error("SMTP transport error: {message}")]
    Transport {
        /// Details of the transport failure.
        message: String,
    },

    /// Sending to one recipient failed after exhausting retries; that
    /// recipient is marked `failed` without stopping the rest of the run.
    #[error("send failed for recipient {recipient_id} after {attempts} attempts: {message}")]
    SendFailed {
        /// The recipient whose send failed.
        recipient_id: String,
        /// Number of attempts made.
        attempts: u32,
        /// Details of the last failure.
        message: String,
    },

    /// The user's daily send cap was reached; remaining recipients stay `queued`.
    #[error("daily send cap reached for user {user_id}: {cap}")]
    DailyCapReached {
        /// The user whose cap was reached.
        user_id: String,
        /// The cap value that was hit.
        cap: i64,
    },

    /// A storage error occurred while recording delivery state.
    #[error("storage error in email delivery: {0}")]
    Storage(#[from] StorageError),

    /// Preferences could not be resolved for the sending user.
    #[error("preferences error in email delivery: {0}")]
    Preferences(#[from] PreferencesError),
}
