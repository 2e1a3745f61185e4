//! Environment variable overrides for configuration.

use super::Config;
use crate::error::ConfigError;
use std::env;

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables use the `CREATORPULSE_` prefix with double
    /// underscores separating nested keys (e.g. `CREATORPULSE_SMTP__HOST`).
    pub(super) fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = env::var("CREATORPULSE_SERVER__HOST") {
            self.server.host = val;
        }
        if let Ok(val) = env::var("CREATORPULSE_SERVER__PORT") {
            self.server.port = parse_env_u16("CREATORPULSE_SERVER__PORT", &val)?;
        }

        if let Ok(val) = env::var("CREATORPULSE_STORAGE__DB_PATH") {
            self.storage.db_path = val;
        }

        if let Ok(val) = env::var("CREATORPULSE_LLM__PROVIDER") {
            self.llm.provider = val;
        }
        if let Ok(val) = env::var("CREATORPULSE_LLM__API_KEY") {
            self.llm.api_key = Some(val);
        }
        if let Ok(val) = env::var("CREATORPULSE_LLM__DEFAULT_MODEL") {
            self.llm.default_model = val;
        }
        if let Ok(val) = env::var("CREATORPULSE_LLM__BASE_URL") {
            self.llm.base_url = Some(val);
        }

        if let Ok(val) = env::var("CREATORPULSE_LLM_RATE_LIMITS__MINUTE") {
            self.llm_rate_limits.minute =
                parse_env_i64("CREATORPULSE_LLM_RATE_LIMITS__MINUTE", &val)?;
        }
        if let Ok(val) = env::var("CREATORPULSE_LLM_RATE_LIMITS__DAY") {
            self.llm_rate_limits.day = parse_env_i64("CREATORPULSE_LLM_RATE_LIMITS__DAY", &val)?;
        }

        if let Ok(val) = env::var("CREATORPULSE_SMTP__HOST") {
            self.smtp.host = val;
        }
        if let Ok(val) = env::var("CREATORPULSE_SMTP__PORT") {
            self.smtp.port = parse_env_u16("CREATORPULSE_SMTP__PORT", &val)?;
        }
        if let Ok(val) = env::var("CREATORPULSE_SMTP__USERNAME") {
            self.smtp.username = val;
        }
        if let Ok(val) = env::var("CREATORPULSE_SMTP__PASSWORD") {
            self.smtp.password = Some(val);
        }
        if let Ok(val) = env::var("CREATORPULSE_SMTP__FROM_ADDRESS") {
            self.smtp.from_address = val;
        }

        if let Ok(val) = env::var("CREATORPULSE_EMAIL__DAILY_CAP_STANDARD") {
            self.email.daily_cap_standard =
                parse_env_i64("CREATORPULSE_EMAIL__DAILY_CAP_STANDARD", &val)?;
        }
        if let Ok(val) = env::var("CREATORPULSE_EMAIL__DAILY_CAP_WORKSPACE") {
            self.email.daily_cap_workspace =
                parse_env_i64("CREATORPULSE_EMAIL__DAILY_CAP_WORKSPACE", &val)?;
        }
        if let Ok(val) = env::var("CREATORPULSE_EMAIL__TRACKING_BASE_URL") {
            self.email.tracking_base_url = val;
        }

        if let Ok(val) = env::var("CREATORPULSE_SCHEDULER__RECONCILIATION_PERIOD_SECONDS") {
            self.scheduler.reconciliation_period_seconds = val
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    field: "scheduler.reconciliation_period_seconds".to_string(),
                    message: format!("'{val}' is not a valid u64"),
                })?;
        }

        Ok(())
    }
}

fn parse_env_u16(field: &str, val: &str) -> Result<u16, ConfigError> {
    val.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("'{val}' is not a valid port number"),
    })
}

fn parse_env_i64(field: &str, val: &str) -> Result<i64, ConfigError> {
    val.parse::<i64>().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("'{val}' is not a valid integer"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_port_is_rejected() {
        let mut config = Config::default();
        std::env::set_var("CREATORPULSE_SERVER__PORT", "not-a-port");
        let result = config.apply_env_overrides();
        std::env::remove_var("CREATORPULSE_SERVER__PORT");
        assert!(result.is_err());
    }
}
