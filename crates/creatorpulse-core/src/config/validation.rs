//! Configuration validation logic.

use super::Config;
use crate::error::ConfigError;

impl Config {
    /// Validate the configuration, returning all errors found (not just the first).
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if !self.llm.provider.is_empty() {
            match self.llm.provider.as_str() {
                "openai" | "anthropic" | "ollama" => {}
                other => {
                    errors.push(ConfigError::InvalidValue {
                        field: "llm.provider".to_string(),
                        message: format!(
                            "'{other}' is not a recognized provider (openai, anthropic, ollama)"
                        ),
                    });
                }
            }

            if matches!(self.llm.provider.as_str(), "openai" | "anthropic") {
                match &self.llm.api_key {
                    Some(key) if !key.is_empty() => {}
                    _ => errors.push(ConfigError::MissingField {
                        field: format!("llm.api_key (required for {} provider)", self.llm.provider),
                    }),
                }
            }
        }

        if !self.smtp.host.is_empty() && self.smtp.from_address.is_empty() {
            errors.push(ConfigError::MissingField {
                field: "smtp.from_address".to_string(),
            });
        }

        if self.llm_rate_limits.minute <= 0 {
            errors.push(ConfigError::InvalidValue {
                field: "llm_rate_limits.minute".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.llm_rate_limits.day <= 0 {
            errors.push(ConfigError::InvalidValue {
                field: "llm_rate_limits.day".to_string(),
                message: "must be positive".to_string(),
            });
        }

        if self.email.daily_cap_standard <= 0 || self.email.daily_cap_workspace <= 0 {
            errors.push(ConfigError::InvalidValue {
                field: "email.daily_cap_*".to_string(),
                message: "daily caps must be positive".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
