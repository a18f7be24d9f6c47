use crate::llm_provider::*;
use crate::transport::{read_json, with_backoff};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub model: String,
    /// Per-request HTTP timeout in seconds
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 30,
            max_retries: 1,
        }
    }
}

/// Claude through the Messages API
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(anyhow!(
                "Anthropic API key is empty. Set 'anthropic_api_key' or ANTHROPIC_API_KEY."
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build Anthropic HTTP client")?;

        Ok(Self { config, client })
    }

    async fn post(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        with_backoff("anthropic", self.config.max_retries, || async {
            let response = self
                .client
                .post(MESSAGES_URL)
                .header("x-api-key", &self.config.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(request)
                .send()
                .await
                .context("Anthropic request could not be sent")?;
            read_json(response, "anthropic").await
        })
        .await
    }
}

/// Messages API has no response_format; a requested schema rides along
/// in the system prompt instead.
fn build_request(model: &str, messages: &[Message], config: &GenerationConfig) -> MessagesRequest {
    let mut system_parts: Vec<String> = messages
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| m.content.clone())
        .collect();

    match &config.response_format {
        Some(ResponseFormat::JsonSchema { json_schema }) => system_parts.push(format!(
            "Respond with a single JSON object matching this schema and nothing else:\n{}",
            json_schema.schema
        )),
        Some(ResponseFormat::JsonObject) => {
            system_parts.push("Respond with a single JSON object and nothing else.".to_string())
        }
        Some(ResponseFormat::Text) | None => {}
    }

    let turns = messages
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .map(|m| MessagesTurn {
            role: if m.role == MessageRole::Assistant {
                "assistant"
            } else {
                "user"
            },
            content: m.content.clone(),
        })
        .collect();

    MessagesRequest {
        model: model.to_string(),
        system: (!system_parts.is_empty()).then(|| system_parts.join("\n\n")),
        messages: turns,
        max_tokens: config.max_tokens.unwrap_or(1024),
        temperature: config.temperature,
        top_p: config.top_p,
        stop_sequences: config.stop.clone(),
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let request = build_request(&self.config.model, messages, config);
        let response = self.post(&request).await?;

        let content: String = response
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        Ok(LLMResponse {
            content,
            total_tokens: Some(response.usage.input_tokens + response.usage.output_tokens),
            finish_reason: response.stop_reason,
            model: response.model,
        })
    }

    async fn is_available(&self) -> bool {
        let probe = GenerationConfig {
            max_tokens: Some(1),
            ..Default::default()
        };
        self.generate_chat(&[Message::user("ping")], &probe)
            .await
            .is_ok()
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<MessagesTurn>,
    max_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct MessagesTurn {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<MessagesBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: MessagesUsage,
}

#[derive(Debug, Deserialize)]
struct MessagesBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    input_tokens: usize,
    output_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_api_key_is_rejected() {
        assert!(AnthropicProvider::new(AnthropicConfig::new("  ")).is_err());
        assert!(AnthropicProvider::new(AnthropicConfig::new("sk-ant-test")).is_ok());
    }

    #[test]
    fn schema_is_folded_into_system_prompt() {
        let messages = vec![
            Message::system("You resolve indexing intents."),
            Message::user("track USDC"),
        ];
        let config = GenerationConfig {
            response_format: Some(ResponseFormat::JsonSchema {
                json_schema: JsonSchema {
                    name: "resolution".to_string(),
                    schema: serde_json::json!({"type": "object"}),
                    strict: false,
                },
            }),
            ..Default::default()
        };

        let request = build_request(DEFAULT_MODEL, &messages, &config);
        let system = request.system.unwrap();

        assert!(system.starts_with("You resolve indexing intents."));
        assert!(system.contains("\"type\":\"object\""));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
    }

    #[test]
    fn plain_requests_have_no_system_prompt() {
        let request = build_request(
            DEFAULT_MODEL,
            &[Message::user("hi")],
            &GenerationConfig::default(),
        );
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["max_tokens"], 1024);
    }
}
