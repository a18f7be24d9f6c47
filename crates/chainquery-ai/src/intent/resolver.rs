use super::context::accumulate_with;
use super::guidance::guidance;
use super::model_analyzer::{AnalyzerError, ModelAnalyzer};
use super::scoring::ConfidenceScorer;
use super::synthesis::synthesize;
use crate::llm_factory::LLMProviderFactory;
use crate::llm_provider::{GenerationConfig, LLMProvider};
use chainquery_core::{ChainQueryConfig, IntentConfig, ResolutionResult, Turn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Which pipeline produced a [`Resolution`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Model,
    RuleBased,
}

#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub result: ResolutionResult,
    pub source: ResolutionSource,
    /// Set when the model path was attempted and abandoned
    pub fallback_reason: Option<String>,
}

/// Entry point turning an utterance plus history into a [`ResolutionResult`].
///
/// Holds no per-conversation state; callers pass the full history each time.
pub struct IntentResolver {
    config: IntentConfig,
    scorer: ConfidenceScorer,
    analyzer: Option<ModelAnalyzer>,
}

impl IntentResolver {
    pub fn new(config: IntentConfig) -> Self {
        let scorer = ConfidenceScorer::new(config.weights, config.readiness_threshold);
        Self {
            config,
            scorer,
            analyzer: None,
        }
    }

    /// Build from the full configuration. A provider is attached only when
    /// the LLM is enabled and `use_model` is set; if it cannot be created
    /// the resolver runs rule-only.
    pub fn from_config(config: &ChainQueryConfig) -> Self {
        let resolver = Self::new(config.intent.clone());
        if !(config.llm.enabled && config.intent.use_model) {
            info!("Model-assisted analysis disabled, resolving with rules only");
            return resolver;
        }

        let provider = match LLMProviderFactory::create_from_config(&config.llm) {
            Ok(provider) => provider,
            Err(e) => {
                warn!("LLM provider unavailable, resolving with rules only: {:#}", e);
                return resolver;
            }
        };
        info!(
            provider = provider.provider_name(),
            model = provider.model_name(),
            timeout_ms = config.intent.model_timeout_ms,
            "Model-assisted analysis enabled"
        );

        let generation = GenerationConfig {
            temperature: config.llm.temperature,
            max_tokens: Some(config.llm.max_tokens),
            ..Default::default()
        };
        let timeout = Duration::from_millis(config.intent.model_timeout_ms);
        let analyzer = ModelAnalyzer::new(provider, timeout).with_generation_config(generation);
        resolver.with_analyzer(analyzer)
    }

    /// Attach a provider for the model-assisted path, bounded by `model_timeout_ms`.
    pub fn with_model(self, provider: Arc<dyn LLMProvider>) -> Self {
        let timeout = Duration::from_millis(self.config.model_timeout_ms);
        self.with_analyzer(ModelAnalyzer::new(provider, timeout))
    }

    pub fn with_analyzer(mut self, analyzer: ModelAnalyzer) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn config(&self) -> &IntentConfig {
        &self.config
    }

    /// True when a provider is attached and the model path is switched on
    pub fn has_model(&self) -> bool {
        self.config.use_model && self.analyzer.is_some()
    }

    pub async fn resolve(&self, utterance: &str, turns: &[Turn]) -> ResolutionResult {
        self.resolve_with_cancel(utterance, turns, &CancellationToken::new())
            .await
            .result
    }

    /// Try the model first when available; any failure or cancellation
    /// resolves through the rule-based pipeline instead.
    pub async fn resolve_with_cancel(
        &self,
        utterance: &str,
        turns: &[Turn],
        cancel: &CancellationToken,
    ) -> Resolution {
        let attempt = match &self.analyzer {
            Some(analyzer) if self.config.use_model => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(AnalyzerError::Cancelled),
                    outcome = analyzer.analyze(utterance, turns) => outcome,
                }
            }
            _ => Err(AnalyzerError::Disabled),
        };

        match attempt {
            Ok(result) => {
                info!(
                    ready = result.is_query_ready,
                    confidence = result.confidence,
                    "intent resolved by model"
                );
                Resolution {
                    result,
                    source: ResolutionSource::Model,
                    fallback_reason: None,
                }
            }
            Err(AnalyzerError::Disabled) => Resolution {
                result: self.resolve_rule_based(utterance, turns),
                source: ResolutionSource::RuleBased,
                fallback_reason: None,
            },
            Err(e) => {
                warn!("Model-assisted analysis failed, using rules: {}", e);
                Resolution {
                    result: self.resolve_rule_based(utterance, turns),
                    source: ResolutionSource::RuleBased,
                    fallback_reason: Some(e.to_string()),
                }
            }
        }
    }

    /// Deterministic pipeline: accumulate, score, then synthesize or guide.
    pub fn resolve_rule_based(&self, utterance: &str, turns: &[Turn]) -> ResolutionResult {
        let context = accumulate_with(turns, utterance, self.config.include_assistant_turns);
        let turn_count = turns.len();
        let score = self.scorer.score(&context, turn_count);

        debug!(
            confidence = score.confidence,
            ready = score.ready,
            turn_count,
            "rule-based score"
        );

        if score.ready {
            let query = synthesize(&context);
            let message = format!("Great! I'll {}. Creating your indexing job now.", query);
            return ResolutionResult::ready(message, score.confidence, query, Vec::new());
        }

        let missing = context.missing();
        let guide = guidance(&missing, &context, turn_count);
        ResolutionResult::needs_info(guide.message, score.confidence, missing, guide.suggestions)
    }
}

impl Default for IntentResolver {
    fn default() -> Self {
        Self::new(IntentConfig::default())
    }
}
