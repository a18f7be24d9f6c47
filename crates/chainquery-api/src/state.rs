use chainquery_ai::IntentResolver;
use chainquery_core::ConfigManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<IntentResolver>,
    pub config: Arc<ConfigManager>,
}

impl AppState {
    /// Assistant turns from clients only count when both
    /// `intent.include_assistant_turns` and `server.scan_assistant_turns` are set.
    pub fn new(config: Arc<ConfigManager>) -> Self {
        let mut effective = config.config().clone();
        effective.intent.include_assistant_turns &= effective.server.scan_assistant_turns;
        let resolver = IntentResolver::from_config(&effective);
        Self::with_resolver(resolver, config)
    }

    /// Use a prebuilt resolver, e.g. one wired to a custom provider
    pub fn with_resolver(resolver: IntentResolver, config: Arc<ConfigManager>) -> Self {
        Self {
            resolver: Arc::new(resolver),
            config,
        }
    }

    pub fn max_history_turns(&self) -> usize {
        self.config.config().server.max_history_turns
    }
}
