use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for ChainQuery
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChainQueryConfig {
    /// Intent resolver tuning
    #[serde(default)]
    pub intent: IntentConfig,

    /// Language model used by the model-assisted analyzer
    #[serde(default)]
    pub llm: LLMConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Weights applied per signal class when scoring an accumulated context
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_subject_weight")]
    pub subject: f64,
    #[serde(default = "default_action_weight")]
    pub action: f64,
    #[serde(default = "default_scope_weight")]
    pub scope: f64,
    /// Added once the conversation has at least one prior turn
    #[serde(default = "default_history_bonus")]
    pub history_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            subject: default_subject_weight(),
            action: default_action_weight(),
            scope: default_scope_weight(),
            history_bonus: default_history_bonus(),
        }
    }
}

/// Intent resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Confidence at or above which a query is synthesized
    #[serde(default = "default_readiness_threshold")]
    pub readiness_threshold: f64,

    #[serde(default)]
    pub weights: ScoringWeights,

    /// Try the model-assisted analyzer before the rule-based pipeline
    #[serde(default = "default_true")]
    pub use_model: bool,

    /// Upper bound on a single model call (ms)
    #[serde(default = "default_model_timeout_ms")]
    pub model_timeout_ms: u64,

    /// Scan assistant turns as well as user turns when accumulating signals
    #[serde(default = "default_true")]
    pub include_assistant_turns: bool,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            readiness_threshold: default_readiness_threshold(),
            weights: ScoringWeights::default(),
            use_model: true,
            model_timeout_ms: default_model_timeout_ms(),
            include_assistant_turns: true,
        }
    }
}

/// LLM configuration for the model-assisted analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Enable the model path (false = rule-based only)
    #[serde(default)]
    pub enabled: bool,

    /// LLM provider: "openai", "openai-compatible", "ollama", "lmstudio", "anthropic"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model identifier
    /// For OpenAI: model name (e.g., "gpt-4o-mini")
    /// For Ollama: model name (e.g., "qwen2.5:7b")
    /// For Anthropic: model name (e.g., "claude-3-5-haiku-20241022")
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL override (required for "openai-compatible")
    #[serde(default)]
    pub base_url: Option<String>,

    /// OpenAI API key
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Anthropic API key
    #[serde(default)]
    pub anthropic_api_key: Option<String>,

    /// Temperature for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// HTTP timeout per provider request (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after a failed provider request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            enabled: false, // Rule-based unless a model is configured
            provider: default_llm_provider(),
            model: None,
            base_url: None,
            openai_api_key: None,
            anthropic_api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Older turns beyond this count are dropped before resolution
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,

    /// Let assistant turns sent by clients contribute signals. Clients echo
    /// guidance replies back, so only user turns are scanned unless set.
    #[serde(default)]
    pub scan_assistant_turns: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_history_turns: default_max_history_turns(),
            scan_assistant_turns: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_readiness_threshold() -> f64 {
    0.7
}
fn default_subject_weight() -> f64 {
    0.4
}
fn default_action_weight() -> f64 {
    0.4
}
fn default_scope_weight() -> f64 {
    0.2
}
fn default_history_bonus() -> f64 {
    0.1
}
fn default_model_timeout_ms() -> u64 {
    8000
}
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> usize {
    1024
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    1
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8787
}
fn default_max_history_turns() -> usize {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

const SUPPORTED_PROVIDERS: &[&str] = &["openai", "openai-compatible", "ollama", "lmstudio", "anthropic"];

/// Configuration manager with layered loading
pub struct ConfigManager {
    config: ChainQueryConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.chainquery.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("Loading ChainQuery configuration...");

        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        if let Some(ref path) = config_path {
            info!("Config file: {}", path.display());
        } else {
            info!("Config file: NONE (using defaults)");
        }
        info!(
            "Readiness threshold: {}, model path: {}",
            config.intent.readiness_threshold,
            if config.llm.enabled && config.intent.use_model {
                config.llm.provider.as_str()
            } else {
                "disabled (rule-based only)"
            }
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load a specific config file, still honoring environment overrides
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let config = Self::apply_env_overrides(Self::read_toml_file(path)?);
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an already-built configuration
    pub fn from_config(config: ChainQueryConfig) -> Result<Self, ConfigError> {
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: None,
        })
    }

    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                info!("Loaded .env file from current directory");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".chainquery.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .chainquery.env: {}", e);
                } else {
                    info!("Loaded .chainquery.env from home directory");
                }
            }
        }
    }

    /// Search order:
    /// 1. ./.chainquery.toml (current directory)
    /// 2. ~/.chainquery/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(ChainQueryConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".chainquery.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".chainquery").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("No config file found, using defaults");
        Ok((ChainQueryConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<ChainQueryConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(mut config: ChainQueryConfig) -> ChainQueryConfig {
        // Intent resolver
        if let Ok(threshold) = std::env::var("CHAINQUERY_READINESS_THRESHOLD") {
            if let Ok(t) = threshold.parse() {
                config.intent.readiness_threshold = t;
            }
        }
        if let Ok(use_model) = std::env::var("CHAINQUERY_USE_MODEL") {
            config.intent.use_model = use_model.to_lowercase() == "true" || use_model == "1";
        }
        if let Ok(timeout) = std::env::var("CHAINQUERY_MODEL_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                config.intent.model_timeout_ms = ms;
            }
        }

        // LLM configuration
        if let Ok(provider) =
            std::env::var("CHAINQUERY_LLM_PROVIDER").or_else(|_| std::env::var("LLM_PROVIDER"))
        {
            config.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("CHAINQUERY_MODEL") {
            config.llm.model = Some(model);
            config.llm.enabled = true; // Enable if model specified
        }
        if let Ok(url) = std::env::var("CHAINQUERY_LLM_BASE_URL") {
            config.llm.base_url = Some(url);
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.openai_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.llm.anthropic_api_key = Some(key);
        }

        // Server
        if let Ok(host) = std::env::var("CHAINQUERY_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("CHAINQUERY_PORT") {
            if let Ok(p) = port.parse() {
                config.server.port = p;
            }
        }
        if let Ok(scan) = std::env::var("CHAINQUERY_SCAN_ASSISTANT_TURNS") {
            config.server.scan_assistant_turns = scan.to_lowercase() == "true" || scan == "1";
        }

        // Logging
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.logging.level = level;
        }

        config
    }

    fn validate_config(config: &ChainQueryConfig) -> Result<(), ConfigError> {
        let intent = &config.intent;
        if !(intent.readiness_threshold > 0.0 && intent.readiness_threshold <= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid readiness threshold: {}. Must be in (0, 1]",
                intent.readiness_threshold
            )));
        }

        let weights = &intent.weights;
        if [weights.subject, weights.action, weights.scope, weights.history_bonus]
            .iter()
            .any(|w| *w < 0.0)
        {
            return Err(ConfigError::ValidationError(format!(
                "Scoring weights must be non-negative: {:?}",
                weights
            )));
        }

        if intent.model_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "model_timeout_ms must be greater than zero".to_string(),
            ));
        }

        let provider = config.llm.provider.to_lowercase();
        if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid LLM provider: {}. Must be one of: {}",
                config.llm.provider,
                SUPPORTED_PROVIDERS.join(", ")
            )));
        }

        // RUST_LOG may carry full filter directives; only bare levels are checked
        let level = config.logging.level.as_str();
        if !level.contains('=') && !level.contains(',') {
            match level {
                "trace" | "debug" | "info" | "warn" | "error" => {}
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        other
                    )))
                }
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ChainQueryConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = ChainQueryConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}
