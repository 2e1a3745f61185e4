//! Shared application state for the CreatorPulse server.

use std::sync::Arc;

use creatorpulse_core::config::Config;
use creatorpulse_core::email::Mailer;
use creatorpulse_core::llm::gateway::LlmGateway;
use creatorpulse_core::storage::DbPool;

/// Shared application state accessible by all route handlers.
pub struct AppState {
    /// SQLite connection pool.
    pub db: DbPool,
    /// The single path every LLM-backed component calls through (C4).
    /// Shared with the background reconciliation loop.
    pub gateway: Arc<LlmGateway>,
    /// Outbound mailer used by C11/C12.
    pub mailer: Arc<dyn Mailer>,
    /// Full loaded configuration, for SMTP/email settings the route
    /// handlers need alongside the gateway and mailer.
    pub config: Config,
}
