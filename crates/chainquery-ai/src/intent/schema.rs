// Structured-output contract the model-assisted analyzer asks providers for

use crate::llm_provider::{JsonSchema as LLMJsonSchema, ResponseFormat};
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shape the language model must return for one conversation turn
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelResolution {
    /// Reply shown to the user: a confirmation or one follow-up question
    pub message: String,
    /// True once subject, action and scope are all known
    pub is_ready: bool,
    /// Confidence between 0 and 1
    pub confidence: f64,
    /// Canonical query ("<action> <SUBJECT> transfers from <scope>"), only when ready
    pub combined_query: Option<String>,
    /// Missing pieces, any of "subject", "action", "scope"
    pub missing: Option<Vec<String>>,
    /// Example follow-up replies the user could send
    pub suggestions: Option<Vec<String>>,
}

pub const RESOLUTION_SCHEMA_NAME: &str = "indexing_intent_resolution";

pub fn resolution_schema() -> Value {
    let schema = schema_for!(ModelResolution);
    serde_json::to_value(&schema).unwrap_or_else(|_| serde_json::json!({ "type": "object" }))
}

pub fn resolution_response_format() -> ResponseFormat {
    ResponseFormat::JsonSchema {
        json_schema: LLMJsonSchema {
            name: RESOLUTION_SCHEMA_NAME.to_string(),
            schema: resolution_schema(),
            strict: false,
        },
    }
}
