//! Configuration management for CreatorPulse.
//!
//! Supports three-layer configuration loading:
//! 1. Built-in defaults
//! 2. TOML config file (`~/.creatorpulse/config.toml`)
//! 3. Environment variable overrides (`CREATORPULSE_` prefix)
//!
//! CLI flag overrides are applied by the binary crates after loading.

mod defaults;
mod env_overrides;
mod validation;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for the CreatorPulse service.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// HTTP server bind settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Global LLM provider defaults, used only when a user has no override.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Default per-user LLM rate limits applied on first use (§4.4).
    #[serde(default)]
    pub llm_rate_limits: LlmRateLimitConfig,

    /// SMTP transport settings for newsletter delivery.
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Email delivery caps and tracking endpoint base URL.
    #[serde(default)]
    pub email: EmailConfig,

    /// Scheduler reconciliation cadence.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// HTTP server bind settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "defaults::server_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "defaults::server_port")]
    pub port: u16,
}

/// SQLite storage settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file. Supports a leading `~`.
    #[serde(default = "defaults::db_path")]
    pub db_path: String,
}

/// Global LLM provider configuration (fallback when a user has no override).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Provider identifier: `"openai"`, `"anthropic"`, or `"ollama"`.
    #[serde(default)]
    pub provider: String,
    /// API key for the provider, if required.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Default model identifier passed to the gateway (opaque per §4.4).
    #[serde(default)]
    pub default_model: String,
    /// Base URL override, used for OpenAI-compatible/Ollama endpoints.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Defaults for per-user LLM rate-limit rows, lazily created on first call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmRateLimitConfig {
    /// Calls allowed per rolling minute window.
    #[serde(default = "defaults::llm_limit_minute")]
    pub minute: i64,
    /// Calls allowed per UTC day.
    #[serde(default = "defaults::llm_limit_day")]
    pub day: i64,
}

/// SMTP transport settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SmtpConfig {
    /// SMTP relay host.
    #[serde(default)]
    pub host: String,
    /// SMTP relay port.
    #[serde(default = "defaults::smtp_port")]
    pub port: u16,
    /// SMTP username.
    #[serde(default)]
    pub username: String,
    /// SMTP password.
    #[serde(default)]
    pub password: Option<String>,
    /// From-address for outgoing newsletters.
    #[serde(default)]
    pub from_address: String,
}

/// Email delivery caps and tracking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    /// Daily per-user send cap for the standard tier (§4.11).
    #[serde(default = "defaults::daily_cap_standard")]
    pub daily_cap_standard: i64,
    /// Daily per-user send cap for the "workspace" tier (§4.11).
    #[serde(default = "defaults::daily_cap_workspace")]
    pub daily_cap_workspace: i64,
    /// Base URL the tracking pixel/redirect endpoints are served from.
    #[serde(default = "defaults::tracking_base_url")]
    pub tracking_base_url: String,
}

/// Scheduler reconciliation cadence (§4.3).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Reconciliation tick period in seconds (recommended 30 min).
    #[serde(default = "defaults::reconciliation_period_seconds")]
    pub reconciliation_period_seconds: u64,
    /// Default crawl frequency in hours for newly created user schedules.
    #[serde(default = "defaults::crawl_frequency_hours")]
    pub default_crawl_frequency_hours: i64,
}

impl Config {
    /// Load configuration from the given path (or the default location),
    /// applying environment variable overrides.
    pub fn load(config_path: Option<&str>) -> Result<Config, ConfigError> {
        let (path, explicit) = Self::resolve_config_path(config_path);

        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str::<Config>(&contents)
                .map_err(|e| ConfigError::ParseError { source: e })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if explicit {
                    return Err(ConfigError::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                Config::default()
            }
            Err(_) => {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
        };

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Load configuration and validate it, returning all validation errors at once.
    pub fn load_and_validate(config_path: Option<&str>) -> Result<Config, Vec<ConfigError>> {
        let config = Config::load(config_path).map_err(|e| vec![e])?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_config_path(config_path: Option<&str>) -> (PathBuf, bool) {
        if let Some(p) = config_path {
            return (PathBuf::from(crate::storage::expand_tilde(p)), true);
        }
        let default = crate::storage::expand_tilde("~/.creatorpulse/config.toml");
        (PathBuf::from(default), false)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::server_host(),
            port: defaults::server_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: defaults::db_path(),
        }
    }
}

impl Default for LlmRateLimitConfig {
    fn default() -> Self {
        Self {
            minute: defaults::llm_limit_minute(),
            day: defaults::llm_limit_day(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            daily_cap_standard: defaults::daily_cap_standard(),
            daily_cap_workspace: defaults::daily_cap_workspace(),
            tracking_base_url: defaults::tracking_base_url(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reconciliation_period_seconds: defaults::reconciliation_period_seconds(),
            default_crawl_frequency_hours: defaults::crawl_frequency_hours(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_caps() {
        let config = Config::default();
        assert_eq!(config.email.daily_cap_standard, 450);
        assert_eq!(config.email.daily_cap_workspace, 1950);
        assert_eq!(config.llm_rate_limits.minute, 1000);
        assert_eq!(config.scheduler.default_crawl_frequency_hours, 24);
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let config = Config::load(None).expect("load with no explicit path");
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn load_explicit_missing_file_errors() {
        let err = Config::load(Some("/nonexistent/path/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn load_parses_valid_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [server]
            port = 4000

            [email]
            daily_cap_standard = 100
            "#,
        )
        .expect("write config");

        let config = Config::load(Some(path.to_str().unwrap())).expect("load");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.email.daily_cap_standard, 100);
    }
}
