//! CreatorPulse CLI — operator commands driving `creatorpulse-core` directly.
mod commands;

use clap::Parser;
use creatorpulse_core::config::Config;
use tracing_subscriber::EnvFilter;

use commands::{ConfigArgs, ConfigCommand, CrawlArgs, DraftArgs, DraftCommand, ServeArgs};

/// CreatorPulse operator CLI.
#[derive(Parser)]
#[command(name = "creatorpulse")]
#[command(version)]
#[command(about = "CreatorPulse content ingestion and newsletter generation CLI")]
struct Cli {
    /// Path to config.toml
    #[arg(short = 'c', long, global = true, default_value = "~/.creatorpulse/config.toml")]
    config: String,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve(ServeArgs),
    /// Run the reconciliation loop in the foreground, without the HTTP API server
    Schedule,
    /// Trigger a batch crawl for one user
    Crawl(CrawlArgs),
    /// Draft-related operations
    Draft(DraftArgs),
    /// Configuration inspection
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("creatorpulse=debug,creatorpulse_core=debug,info")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("creatorpulse=info,creatorpulse_core=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .compact()
        .init();

    // `config validate` manages its own error reporting, so it loads the
    // config itself rather than sharing the eager load below.
    if let Commands::Config(ConfigArgs { command: ConfigCommand::Validate }) = &cli.command {
        return commands::config::validate(&cli.config);
    }

    let config = Config::load(Some(&cli.config)).map_err(|e| {
        anyhow::anyhow!(
            "failed to load configuration: {e}\n\
             hint: create a config file at {} or pass --config",
            cli.config
        )
    })?;

    match cli.command {
        Commands::Serve(args) => {
            commands::serve::execute(config, &cli.config, args.host, args.port).await?;
        }
        Commands::Schedule => {
            commands::schedule::run(&config, &cli.config).await?;
        }
        Commands::Crawl(args) => {
            commands::crawl::execute(&cli.config, &args.user_id).await?;
        }
        Commands::Draft(args) => match args.command {
            DraftCommand::Generate(generate_args) => {
                commands::draft::generate(&config, &cli.config, &generate_args.user_id).await?;
            }
        },
        Commands::Config(args) => match args.command {
            ConfigCommand::Show => commands::config::show(&config)?,
            ConfigCommand::Validate => unreachable!("handled above"),
        },
    }

    Ok(())
}
