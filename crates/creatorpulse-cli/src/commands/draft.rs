//! Implementation of the `creatorpulse draft generate --user <id>` command.

use anyhow::Context;
use creatorpulse_core::config::Config;
use creatorpulse_core::draft;
use creatorpulse_core::email::SmtpMailer;
use creatorpulse_core::llm::factory::build_provider;
use creatorpulse_core::llm::gateway::LlmGateway;
use creatorpulse_core::storage;

const DEFAULT_TOPIC_COUNT: usize = 5;
const DEFAULT_DAYS_BACK: i64 = 14;

pub async fn generate(config: &Config, config_path: &str, user_id: &str) -> anyhow::Result<()> {
    let db_dir_path = std::path::PathBuf::from(storage::expand_tilde(config_path));
    let db_dir = db_dir_path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let db_path = db_dir.join("creatorpulse.db");

    let pool = storage::init_db(&db_path.to_string_lossy()).await?;
    let provider = build_provider(&config.llm).context("building LLM provider")?;
    let gateway = LlmGateway::new(provider, pool.clone(), config.llm_rate_limits.clone());
    let mailer = SmtpMailer::new(&config.smtp).context("building SMTP mailer")?;

    let generated = draft::generate_draft(
        &pool,
        &gateway,
        &mailer,
        &config.smtp,
        &config.email,
        user_id,
        DEFAULT_TOPIC_COUNT,
        DEFAULT_DAYS_BACK,
    )
    .await
    .context("generating draft")?;

    println!("draft {} generated for {user_id}: \"{}\"", generated.id, generated.title);
    Ok(())
}
