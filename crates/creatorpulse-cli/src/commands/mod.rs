//! CLI subcommand implementations for CreatorPulse.
//!
//! Each module is a thin wrapper dispatching straight into
//! `creatorpulse-core` (and, for `serve`, `creatorpulse-server`).
pub mod config;
pub mod crawl;
pub mod draft;
pub mod schedule;
pub mod serve;

use clap::{Args, Subcommand};

/// Arguments for the `serve` subcommand.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Host address to bind to. Overrides the config file's `server.host`.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on. Overrides the config file's `server.port`.
    #[arg(long)]
    pub port: Option<u16>,
}

/// Arguments for the `crawl` subcommand.
#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// The user id to crawl active sources for.
    #[arg(long = "user")]
    pub user_id: String,
}

/// The `draft` subcommand group.
#[derive(Debug, Subcommand)]
pub enum DraftCommand {
    /// Generate a new draft for a user.
    Generate(DraftGenerateArgs),
}

/// Arguments for the `draft generate` subcommand.
#[derive(Debug, Args)]
pub struct DraftGenerateArgs {
    /// The user id to generate a draft for.
    #[arg(long = "user")]
    pub user_id: String,
}

/// Arguments for the `draft` subcommand.
#[derive(Debug, Args)]
pub struct DraftArgs {
    #[command(subcommand)]
    pub command: DraftCommand,
}

/// The `config` subcommand group.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration.
    Show,
    /// Validate the configuration file, reporting every error found.
    Validate,
}

/// Arguments for the `config` subcommand.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}
