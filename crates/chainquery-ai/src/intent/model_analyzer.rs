use super::schema::resolution_response_format;
use crate::llm_provider::{GenerationConfig, LLMProvider, Message};
use chainquery_core::{MissingKind, ResolutionResult, Turn};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

const SYSTEM_INSTRUCTION: &str = "\
You help users describe which on-chain token transfer data to index. \
Read the whole conversation and decide whether three things are known: \
the subject (a token symbol such as USDC, USDT, WETH, or a 0x contract address), \
the action (index, track, monitor, get, find, collect, gather), \
and the scope (a block range such as \"block 18000000 to 18100000\", or \"latest\"/\"recent\" blocks).

Reply with exactly one JSON object and no other text:
{
  \"message\": string,          // confirmation when ready, otherwise ONE follow-up question
  \"isReady\": boolean,
  \"confidence\": number,       // 0 to 1
  \"combinedQuery\": string,    // only when ready: \"<action> <SUBJECT> transfers from <scope>\"
  \"missing\": [string],        // when not ready: any of \"subject\", \"action\", \"scope\"
  \"suggestions\": [string]     // short example replies the user could send
}
Ask for the subject before the action, and the action before the scope.";

/// Why the model-assisted path produced no usable result
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("model-assisted analysis is disabled")]
    Disabled,

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("model call cancelled")]
    Cancelled,

    #[error("provider error: {0}")]
    Provider(String),

    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

/// Delegates the readiness decision to a language model
pub struct ModelAnalyzer {
    provider: Arc<dyn LLMProvider>,
    timeout: Duration,
    generation: GenerationConfig,
}

impl ModelAnalyzer {
    pub fn new(provider: Arc<dyn LLMProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            generation: GenerationConfig {
                temperature: 0.1,
                max_tokens: Some(1024),
                response_format: Some(resolution_response_format()),
                ..Default::default()
            },
        }
    }

    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        if generation.response_format.is_none() {
            self.generation = GenerationConfig {
                response_format: Some(resolution_response_format()),
                ..generation
            };
        } else {
            self.generation = generation;
        }
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// System instruction, then the full history, then the new utterance
    pub fn build_messages(utterance: &str, turns: &[Turn]) -> Vec<Message> {
        std::iter::once(Message::system(SYSTEM_INSTRUCTION))
            .chain(turns.iter().map(Message::from))
            .chain(std::iter::once(Message::user(utterance)))
            .collect()
    }

    /// One bounded model call. Every failure comes back as an
    /// [`AnalyzerError`] for the caller to fall back on.
    pub async fn analyze(
        &self,
        utterance: &str,
        turns: &[Turn],
    ) -> Result<ResolutionResult, AnalyzerError> {
        let messages = Self::build_messages(utterance, turns);

        let response = timeout(
            self.timeout,
            self.provider.generate_chat(&messages, &self.generation),
        )
        .await
        .map_err(|_| AnalyzerError::Timeout(self.timeout))?
        .map_err(|e| AnalyzerError::Provider(format!("{:#}", e)))?;

        debug!(
            provider = self.provider.provider_name(),
            model = %response.model,
            tokens = ?response.total_tokens,
            "model-assisted analysis returned"
        );

        parse_model_response(&response.content)
    }
}

/// Coerce a raw model reply into a [`ResolutionResult`].
///
/// `isReady` is read as a boolean, `confidence` clamped into [0, 1],
/// `missing` kept only when it is an array of strings. A ready verdict
/// without a query, or a reply without a message, is malformed.
pub fn parse_model_response(content: &str) -> Result<ResolutionResult, AnalyzerError> {
    let json = extract_json_object(content)
        .ok_or_else(|| AnalyzerError::MalformedResponse("no JSON object in reply".to_string()))?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| AnalyzerError::MalformedResponse(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| AnalyzerError::MalformedResponse("reply is not an object".to_string()))?;

    let message = field(object, &["message"])
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AnalyzerError::MalformedResponse("missing message".to_string()))?
        .to_string();

    let is_ready = field(object, &["isReady", "isQueryReady"])
        .map(coerce_bool)
        .unwrap_or(false);

    let confidence = field(object, &["confidence"])
        .and_then(coerce_number)
        .map(clamp_unit)
        .unwrap_or(0.0);

    let query = field(object, &["combinedQuery", "suggestedQuery"])
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string);

    let suggestions = field(object, &["suggestions"])
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if is_ready {
        let query = query.ok_or_else(|| {
            AnalyzerError::MalformedResponse("ready without combinedQuery".to_string())
        })?;
        return Ok(ResolutionResult::ready(message, confidence, query, suggestions));
    }

    let missing = field(object, &["missing", "needsMoreInfo"])
        .and_then(string_array)
        .map(|names| {
            let mut kinds: Vec<MissingKind> = Vec::new();
            for kind in names.iter().filter_map(|name| name.parse().ok()) {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
            kinds
        })
        .unwrap_or_default();

    Ok(ResolutionResult::needs_info(message, confidence, missing, suggestions))
}

fn field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| object.get(*key))
        .filter(|v| !v.is_null())
}

/// Strips code fences and surrounding prose some models add
fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (start < end).then(|| &content[start..=end])
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// `Some` only when every element is a string
fn string_array(value: &Value) -> Option<Vec<&str>> {
    value.as_array()?.iter().map(Value::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_provider::{LLMResponse, LLMResult, MessageRole};
    use async_trait::async_trait;

    #[test]
    fn messages_wrap_history_with_instruction_and_utterance() {
        let turns = vec![Turn::user("track something"), Turn::assistant("Which token?")];
        let messages = ModelAnalyzer::build_messages("USDC", &turns);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[2].role, MessageRole::Assistant);
        assert_eq!(messages[3].content, "USDC");
    }

    #[test]
    fn parses_ready_reply() {
        let result = parse_model_response(
            r#"{"message":"On it","isReady":true,"confidence":0.93,"combinedQuery":"index USDC transfers from latest blocks"}"#,
        )
        .unwrap();

        assert!(result.is_query_ready);
        assert_eq!(
            result.suggested_query.as_deref(),
            Some("index USDC transfers from latest blocks")
        );
        assert!(result.needs_more_info.is_none());
    }

    #[test]
    fn clamps_confidence_and_coerces_ready_flag() {
        let high = parse_model_response(
            r#"{"message":"ok","isReady":"true","confidence":3.5,"combinedQuery":"q"}"#,
        )
        .unwrap();
        assert!(high.is_query_ready);
        assert_eq!(high.confidence, 1.0);

        let low = parse_model_response(r#"{"message":"hm","isReady":0,"confidence":-2}"#).unwrap();
        assert!(!low.is_query_ready);
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn missing_only_accepted_as_string_array() {
        let listed = parse_model_response(
            r#"{"message":"Which token?","isReady":false,"confidence":0.4,"missing":["subject","scope","subject"]}"#,
        )
        .unwrap();
        assert_eq!(listed.missing(), &[MissingKind::Subject, MissingKind::Scope]);

        let mixed = parse_model_response(
            r#"{"message":"Which token?","isReady":false,"confidence":0.4,"missing":["subject",3]}"#,
        )
        .unwrap();
        assert!(mixed.needs_more_info.is_none());

        let scalar = parse_model_response(
            r#"{"message":"Which token?","isReady":false,"missing":"subject"}"#,
        )
        .unwrap();
        assert!(scalar.needs_more_info.is_none());
    }

    #[test]
    fn tolerates_code_fences() {
        let result = parse_model_response(
            "```json\n{\"message\":\"Which blocks?\",\"isReady\":false,\"confidence\":0.8,\"suggestions\":[\"latest blocks\"]}\n```",
        )
        .unwrap();
        assert_eq!(result.suggestions, Some(vec!["latest blocks".to_string()]));
    }

    #[test]
    fn malformed_replies_are_errors() {
        for reply in [
            "I think you want USDC",
            "{not json}",
            "[1, 2]",
            r#"{"isReady":false}"#,
            r#"{"message":"ready!","isReady":true,"confidence":0.9}"#,
        ] {
            assert!(
                matches!(
                    parse_model_response(reply),
                    Err(AnalyzerError::MalformedResponse(_))
                ),
                "expected malformed for {}",
                reply
            );
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl LLMProvider for SlowProvider {
        async fn generate_chat(
            &self,
            _messages: &[Message],
            _config: &GenerationConfig,
        ) -> LLMResult<LLMResponse> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(LLMResponse {
                content: "{}".to_string(),
                total_tokens: None,
                finish_reason: None,
                model: "slow".to_string(),
            })
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn provider_name(&self) -> &str {
            "slow"
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn analyze_is_bounded_by_timeout() {
        let analyzer = ModelAnalyzer::new(Arc::new(SlowProvider), Duration::from_millis(20));
        let result = analyzer.analyze("index USDC", &[]).await;
        assert!(matches!(result, Err(AnalyzerError::Timeout(_))));
    }
}
