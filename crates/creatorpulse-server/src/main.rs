//! CreatorPulse API server binary.
//!
//! Starts an HTTP server exposing creatorpulse-core's ingestion, trend
//! detection, drafting, and delivery pipeline as a REST API.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use creatorpulse_core::config::Config;
use creatorpulse_core::email::SmtpMailer;
use creatorpulse_core::llm::factory::build_provider;
use creatorpulse_core::llm::gateway::LlmGateway;
use creatorpulse_core::storage;

use creatorpulse_server::state::AppState;

/// CreatorPulse API server.
#[derive(Parser)]
#[command(name = "creatorpulse-server", version, about)]
struct Cli {
    /// Port to listen on. Overrides the config file's `server.port`.
    #[arg(long)]
    port: Option<u16>,

    /// Host address to bind to. Overrides the config file's `server.host`.
    #[arg(long)]
    host: Option<String>,

    /// Path to the CreatorPulse configuration file.
    #[arg(long, default_value = "~/.creatorpulse/config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let config = Config::load(Some(&cli.config)).context("loading configuration")?;

    let config_path = std::path::PathBuf::from(storage::expand_tilde(&cli.config));
    let db_dir = config_path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let db_path = db_dir.join("creatorpulse.db");

    let host = cli.host.unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);

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
