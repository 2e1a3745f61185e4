//! Implementation of the `creatorpulse serve` command.
//!
//! Loads configuration, wires up the LLM provider and mailer, and runs the
//! HTTP API server in the foreground.

use std::sync::Arc;

use anyhow::Context;
use creatorpulse_core::config::Config;
use creatorpulse_core::email::SmtpMailer;
use creatorpulse_core::llm::factory::build_provider;
use creatorpulse_core::llm::gateway::LlmGateway;
use creatorpulse_core::storage;
use creatorpulse_server::state::AppState;

pub async fn execute(config: Config, config_path: &str, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let db_dir_path = std::path::PathBuf::from(storage::expand_tilde(config_path));
    let db_dir = db_dir_path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let db_path = db_dir.join("creatorpulse.db");

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    tracing::info!(db = %db_path.display(), host = %host, port, "starting creatorpulse server");

    let pool = storage::init_db(&db_path.to_string_lossy()).await?;
    let provider = build_provider(&config.llm).context("building LLM provider")?;
    let gateway = Arc::new(LlmGateway::new(provider, pool.clone(), config.llm_rate_limits.clone()));
    let mailer = Arc::new(SmtpMailer::new(&config.smtp).context("building SMTP mailer")?);

    tokio::spawn({
        let pool = pool.clone();
        let gateway = gateway.clone();
        let mailer = mailer.clone();
        let smtp = config.smtp.clone();
        let email_config = config.email.clone();
        let period_seconds = config.scheduler.reconciliation_period_seconds;
        async move {
            creatorpulse_core::scheduler::run_reconciliation_loop(
                &pool,
                &gateway,
                mailer.as_ref(),
                &smtp,
                &email_config,
                period_seconds,
            )
            .await;
        }
    });

    let state = Arc::new(AppState { db: pool, gateway, mailer, config });
    let router = creatorpulse_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!("listening on http://{host}:{port}");
    axum::serve(listener, router).await?;

    Ok(())
}
