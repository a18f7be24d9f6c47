pub mod intent;
pub mod llm_factory;
pub mod llm_provider;
#[cfg(any(feature = "anthropic", feature = "openai-compatible"))]
mod transport;

// Cloud LLM providers
#[cfg(feature = "anthropic")]
pub mod anthropic_provider;
#[cfg(feature = "openai-compatible")]
pub mod openai_compatible_provider;

pub use intent::*;
pub use llm_factory::LLMProviderFactory;
pub use llm_provider::*;
