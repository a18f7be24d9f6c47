use crate::llm_provider::*;
use anyhow::{anyhow, Result};
use chainquery_core::LLMConfig;
use std::sync::Arc;

#[cfg(feature = "anthropic")]
use crate::anthropic_provider::{AnthropicConfig, AnthropicProvider};

#[cfg(feature = "openai-compatible")]
use crate::openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    pub fn create_from_config(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        if !config.enabled {
            return Err(anyhow!("LLM is not enabled in configuration"));
        }

        let provider_name = config.provider.to_lowercase();

        match provider_name.as_str() {
            #[cfg(feature = "openai-compatible")]
            "openai" => Self::create_openai_provider(config),
            #[cfg(feature = "openai-compatible")]
            "ollama" | "lmstudio" | "openai-compatible" => {
                Self::create_openai_compatible_provider(&provider_name, config)
            }
            #[cfg(feature = "anthropic")]
            "anthropic" => Self::create_anthropic_provider(config),
            _ => Err(anyhow!(
                "Unsupported LLM provider: {}. Available providers: {}",
                provider_name,
                Self::supported_providers().join(", ")
            )),
        }
    }

    /// Create a hosted OpenAI provider
    #[cfg(feature = "openai-compatible")]
    fn create_openai_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let api_key = config
            .openai_api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                anyhow!(
                    "OpenAI API key not found. Set 'openai_api_key' in config \
                     or OPENAI_API_KEY environment variable"
                )
            })?;

        let mut openai_config = OpenAICompatibleConfig::openai(
            api_key,
            config
                .model
                .clone()
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
        );
        if let Some(base_url) = &config.base_url {
            openai_config.base_url = base_url.trim_end_matches('/').to_string();
        }
        openai_config.timeout_secs = config.timeout_secs;
        openai_config.max_retries = config.max_retries;

        Ok(Arc::new(OpenAICompatibleProvider::new(openai_config)?))
    }

    /// Create a provider for a local or custom OpenAI-compatible endpoint
    #[cfg(feature = "openai-compatible")]
    fn create_openai_compatible_provider(
        provider_name: &str,
        config: &LLMConfig,
    ) -> Result<Arc<dyn LLMProvider>> {
        let model = config.model.clone();
        let mut compat_config = match provider_name {
            "ollama" => {
                OpenAICompatibleConfig::ollama(model.unwrap_or_else(|| "qwen2.5:7b".to_string()))
            }
            "lmstudio" => {
                OpenAICompatibleConfig::lm_studio(model.unwrap_or_else(|| "local-model".to_string()))
            }
            _ => {
                let base_url = config.base_url.clone().ok_or_else(|| {
                    anyhow!("OpenAI-compatible base URL not found. Set 'base_url' in config")
                })?;
                let model = model.ok_or_else(|| {
                    anyhow!("Model name is required for OpenAI-compatible provider")
                })?;
                OpenAICompatibleConfig::custom(base_url, model, provider_name.to_string())
            }
        };

        if let Some(base_url) = &config.base_url {
            compat_config.base_url = base_url.trim_end_matches('/').to_string();
        }
        compat_config.api_key = config.openai_api_key.clone();
        compat_config.timeout_secs = config.timeout_secs;
        compat_config.max_retries = config.max_retries;

        Ok(Arc::new(OpenAICompatibleProvider::new(compat_config)?))
    }

    /// Create an Anthropic Claude provider
    #[cfg(feature = "anthropic")]
    fn create_anthropic_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let api_key = config
            .anthropic_api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                anyhow!(
                    "Anthropic API key not found. Set 'anthropic_api_key' in config \
                     or ANTHROPIC_API_KEY environment variable"
                )
            })?;

        let mut anthropic_config = AnthropicConfig::new(api_key);
        if let Some(model) = &config.model {
            anthropic_config.model = model.clone();
        }
        anthropic_config.timeout_secs = config.timeout_secs;
        anthropic_config.max_retries = config.max_retries;

        Ok(Arc::new(AnthropicProvider::new(anthropic_config)?))
    }

    /// Get a list of supported providers (based on enabled features)
    pub fn supported_providers() -> Vec<&'static str> {
        #[allow(unused_mut)]
        let mut providers = Vec::new();

        #[cfg(feature = "openai-compatible")]
        providers.extend(["openai", "openai-compatible", "ollama", "lmstudio"]);

        #[cfg(feature = "anthropic")]
        providers.push("anthropic");

        providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_llm() {
        let config = LLMConfig {
            enabled: false,
            ..Default::default()
        };

        let result = LLMProviderFactory::create_from_config(&config);
        assert!(result.is_err());
        assert!(result
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default()
            .contains("LLM is not enabled"));
    }

    #[test]
    fn test_unknown_provider() {
        let config = LLMConfig {
            enabled: true,
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };

        assert!(LLMProviderFactory::create_from_config(&config).is_err());
    }

    #[cfg(feature = "openai-compatible")]
    #[test]
    fn test_ollama_provider_creation() {
        let config = LLMConfig {
            enabled: true,
            provider: "ollama".to_string(),
            model: Some("qwen2.5:7b".to_string()),
            ..Default::default()
        };

        let provider = LLMProviderFactory::create_from_config(&config).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "qwen2.5:7b");
    }

    #[cfg(feature = "openai-compatible")]
    #[test]
    fn test_custom_endpoint_requires_base_url() {
        let config = LLMConfig {
            enabled: true,
            provider: "openai-compatible".to_string(),
            model: Some("m".to_string()),
            ..Default::default()
        };

        assert!(LLMProviderFactory::create_from_config(&config).is_err());
    }
}
