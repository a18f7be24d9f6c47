use crate::llm_provider::*;
use crate::transport::{read_json, with_backoff};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const LM_STUDIO_BASE: &str = "http://localhost:1234/v1";
const OLLAMA_BASE: &str = "http://localhost:11434/v1";

/// Any endpoint speaking the Chat Completions protocol: hosted OpenAI,
/// LM Studio, Ollama, or a custom gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAICompatibleConfig {
    /// Root URL without the `/chat/completions` suffix
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Sent as a bearer token when present
    pub api_key: Option<String>,
    pub provider_name: String,
    /// Local servers often reject `response_format`
    pub supports_response_format: bool,
}

impl OpenAICompatibleConfig {
    fn endpoint(
        provider_name: &str,
        base_url: impl Into<String>,
        model: String,
        supports_response_format: bool,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model,
            timeout_secs: 30,
            max_retries: 1,
            api_key: None,
            provider_name: provider_name.to_string(),
            supports_response_format,
        }
    }

    pub fn openai(api_key: String, model: String) -> Self {
        Self {
            api_key: Some(api_key),
            ..Self::endpoint("openai", OPENAI_API_BASE, model, true)
        }
    }

    pub fn lm_studio(model: String) -> Self {
        Self::endpoint("lmstudio", LM_STUDIO_BASE, model, false)
    }

    pub fn ollama(model: String) -> Self {
        Self::endpoint("ollama", OLLAMA_BASE, model, true)
    }

    pub fn custom(base_url: String, model: String, provider_name: String) -> Self {
        Self::endpoint(&provider_name, base_url, model, false)
    }
}

pub struct OpenAICompatibleProvider {
    config: OpenAICompatibleConfig,
    client: Client,
}

impl OpenAICompatibleProvider {
    pub fn new(config: OpenAICompatibleConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { config, client })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let label = self.config.provider_name.as_str();

        with_backoff(label, self.config.max_retries, || async {
            let response = self
                .authorized(self.client.post(&url))
                .json(request)
                .send()
                .await
                .with_context(|| format!("{} unreachable at {}", label, self.config.base_url))?;
            read_json(response, label).await
        })
        .await
    }

    fn build_request(&self, messages: &[Message], config: &GenerationConfig) -> CompletionRequest {
        let response_format = config
            .response_format
            .clone()
            .filter(|_| self.config.supports_response_format)
            .map(WireResponseFormat::from);

        CompletionRequest {
            model: self.config.model.clone(),
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            stop: config.stop.clone(),
            response_format,
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let request = self.build_request(messages, config);
        let response = self.complete(&request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("{} returned no choices", self.config.provider_name))?;

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            total_tokens: response.usage.map(|u| u.total_tokens),
            finish_reason: choice.finish_reason,
            model: response.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }

    async fn is_available(&self) -> bool {
        let probe = self.authorized(self.client.get(format!("{}/models", self.config.base_url)));
        matches!(probe.send().await, Ok(response) if response.status().is_success())
    }

    fn provider_name(&self) -> &str {
        &self.config.provider_name
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
}

/// `{"type": "json_schema", "json_schema": {"name", "schema", "strict"}}`
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireResponseFormat {
    Text,
    JsonObject,
    JsonSchema { json_schema: JsonSchema },
}

impl From<ResponseFormat> for WireResponseFormat {
    fn from(format: ResponseFormat) -> Self {
        match format {
            ResponseFormat::Text => Self::Text,
            ResponseFormat::JsonObject => Self::JsonObject,
            ResponseFormat::JsonSchema { json_schema } => Self::JsonSchema { json_schema },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// `content` is null when the model answers with a tool call
#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_config() -> GenerationConfig {
        GenerationConfig {
            response_format: Some(ResponseFormat::JsonSchema {
                json_schema: JsonSchema {
                    name: "resolution".to_string(),
                    schema: serde_json::json!({"type": "object"}),
                    strict: false,
                },
            }),
            ..Default::default()
        }
    }

    #[test]
    fn presets_pick_endpoint_and_format_support() {
        let lm = OpenAICompatibleConfig::lm_studio("test-model".to_string());
        assert_eq!(lm.base_url, LM_STUDIO_BASE);
        assert_eq!(lm.provider_name, "lmstudio");
        assert!(!lm.supports_response_format);

        let openai = OpenAICompatibleConfig::openai("sk-test".to_string(), "gpt-4o-mini".to_string());
        assert_eq!(openai.base_url, OPENAI_API_BASE);
        assert_eq!(openai.api_key.as_deref(), Some("sk-test"));
        assert!(openai.supports_response_format);
    }

    #[test]
    fn request_nests_json_schema() {
        let provider = OpenAICompatibleProvider::new(OpenAICompatibleConfig::openai(
            "sk-test".to_string(),
            "gpt-4o-mini".to_string(),
        ))
        .unwrap();

        let request = provider.build_request(&[Message::user("hi")], &schema_config());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["name"], "resolution");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn local_endpoints_skip_response_format() {
        let provider =
            OpenAICompatibleProvider::new(OpenAICompatibleConfig::lm_studio("m".to_string()))
                .unwrap();

        let request = provider.build_request(&[Message::user("hi")], &schema_config());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn null_content_decodes() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null},"finish_reason":"tool_calls"}]}"#;
        let response: CompletionResponse = serde_json::from_str(body).unwrap();
        assert!(response.choices[0].message.content.is_none());
        assert!(response.model.is_none());
    }
}
