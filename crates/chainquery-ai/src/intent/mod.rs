//! Conversational intent resolution for transfer-indexing requests.
//!
//! The rule-based pipeline runs extract, accumulate, score, then either
//! synthesize or guide. [`IntentResolver`] optionally tries a language model
//! first and falls back to that pipeline on any failure.

pub mod context;
pub mod guidance;
pub mod model_analyzer;
pub mod ordered_set;
pub mod resolver;
pub mod schema;
pub mod scoring;
pub mod signals;
pub mod synthesis;

pub use context::{accumulate, accumulate_with, AccumulatedContext};
pub use guidance::{guidance, guide, Guidance, GuidanceRule};
pub use model_analyzer::{parse_model_response, AnalyzerError, ModelAnalyzer};
pub use ordered_set::OrderedSet;
pub use resolver::{IntentResolver, Resolution, ResolutionSource};
pub use schema::{resolution_response_format, ModelResolution};
pub use scoring::{score, ConfidenceScorer, Score, READINESS_THRESHOLD};
pub use signals::{extract, Signals};
pub use synthesis::synthesize;
