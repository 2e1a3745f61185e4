//! Implementation of the `creatorpulse schedule` command: runs the
//! reconciliation loop in the foreground without the HTTP API server.

use anyhow::Context;
use creatorpulse_core::config::Config;
use creatorpulse_core::email::SmtpMailer;
use creatorpulse_core::llm::factory::build_provider;
use creatorpulse_core::llm::gateway::LlmGateway;
use creatorpulse_core::scheduler;
use creatorpulse_core::storage;

pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<()> {
    let db_dir_path = std::path::PathBuf::from(storage::expand_tilde(config_path));
    let db_dir = db_dir_path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let db_path = db_dir.join("creatorpulse.db");

    let period_seconds = config.scheduler.reconciliation_period_seconds;
    tracing::info!(db = %db_path.display(), period_seconds, "starting creatorpulse scheduler");

    let pool = storage::init_db(&db_path.to_string_lossy()).await?;
    let provider = build_provider(&config.llm).context("building LLM provider")?;
    let gateway = LlmGateway::new(provider, pool.clone(), config.llm_rate_limits.clone());
    let mailer = SmtpMailer::new(&config.smtp).context("building SMTP mailer")?;

    scheduler::run_reconciliation_loop(&pool, &gateway, &mailer, &config.smtp, &config.email, period_seconds).await
}
