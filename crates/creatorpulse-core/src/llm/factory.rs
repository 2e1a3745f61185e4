//! Builds a configured `LlmProvider` from `LlmConfig` (C4).

use super::{anthropic::AnthropicProvider, openai_compat::OpenAiCompatProvider, LlmProvider};
use crate::config::LlmConfig;
use crate::error::LlmError;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Construct the provider named by `config.provider`, validating required
/// fields are present (§4 "Validation" / `validate()` for `llm.*`).
pub fn build_provider(config: &LlmConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    match config.provider.as_str() {
        "anthropic" => {
            let api_key = config
                .api_key
                .clone()
                .ok_or(LlmError::NotConfigured)?;
            let provider = match &config.base_url {
                Some(base_url) => {
                    AnthropicProvider::with_base_url(api_key, config.default_model.clone(), base_url.clone())
                }
                None => AnthropicProvider::new(api_key, config.default_model.clone()),
            };
            Ok(Box::new(provider))
        }
        "openai" => {
            let api_key = config
                .api_key
                .clone()
                .ok_or(LlmError::NotConfigured)?;
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
            Ok(Box::new(OpenAiCompatProvider::new(
                base_url,
                api_key,
                config.default_model.clone(),
                "openai".to_string(),
            )))
        }
        "ollama" => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string());
            Ok(Box::new(OpenAiCompatProvider::new(
                base_url,
                String::new(),
                config.default_model.clone(),
                "ollama".to_string(),
            )))
        }
        _ => Err(LlmError::NotConfigured),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            api_key: None,
            default_model: "test-model".to_string(),
            base_url: None,
        }
    }

    #[test]
    fn anthropic_without_api_key_is_not_configured() {
        let config = base_config("anthropic");
        let result = build_provider(&config);
        assert!(matches!(result, Err(LlmError::NotConfigured)));
    }

    #[test]
    fn anthropic_with_api_key_builds() {
        let mut config = base_config("anthropic");
        config.api_key = Some("sk-ant-test".to_string());
        let provider = build_provider(&config).expect("build provider");
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn ollama_needs_no_api_key() {
        let config = base_config("ollama");
        let provider = build_provider(&config).expect("build provider");
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn unknown_provider_is_not_configured() {
        let config = base_config("unknown");
        let result = build_provider(&config);
        assert!(matches!(result, Err(LlmError::NotConfigured)));
    }
}
