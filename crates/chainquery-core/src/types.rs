use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message of a conversation, supplied by the caller oldest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Signal class the user still has to supply before a query can be built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingKind {
    /// Token symbol or contract address
    Subject,
    /// What to do with the data (index, track, monitor...)
    Action,
    /// Block range or recency qualifier
    Scope,
}

impl MissingKind {
    pub const ALL: [MissingKind; 3] = [MissingKind::Subject, MissingKind::Action, MissingKind::Scope];

    pub fn as_str(&self) -> &'static str {
        match self {
            MissingKind::Subject => "subject",
            MissingKind::Action => "action",
            MissingKind::Scope => "scope",
        }
    }
}

impl fmt::Display for MissingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissingKind {
    type Err = String;

    /// Accepts the canonical identifiers plus the loose names models tend to emit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "subject" | "token" | "address" | "contract" | "contract address" => {
                Ok(MissingKind::Subject)
            }
            "action" | "intent" | "operation" => Ok(MissingKind::Action),
            "scope" | "block range" | "blocks" | "range" | "timeframe" | "time range" => {
                Ok(MissingKind::Scope)
            }
            other => Err(format!("unknown missing kind: {}", other)),
        }
    }
}

/// The single output of the intent resolver.
///
/// Field names on the wire are the ones the frontend consumes:
/// `isQueryReady`, `suggestedQuery`, `needsMoreInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    /// Human-readable reply
    pub message: String,
    pub is_query_ready: bool,
    /// Rule-based scores are not clamped and may exceed 1.0
    pub confidence: f64,
    /// Canonical query, present iff `is_query_ready`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_query: Option<String>,
    /// Missing signal classes, present iff not ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_more_info: Option<Vec<MissingKind>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl ResolutionResult {
    pub fn ready(
        message: impl Into<String>,
        confidence: f64,
        query: impl Into<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self {
            message: message.into(),
            is_query_ready: true,
            confidence,
            suggested_query: Some(query.into()),
            needs_more_info: None,
            suggestions: non_empty(suggestions),
        }
    }

    pub fn needs_info(
        message: impl Into<String>,
        confidence: f64,
        missing: Vec<MissingKind>,
        suggestions: Vec<String>,
    ) -> Self {
        Self {
            message: message.into(),
            is_query_ready: false,
            confidence,
            suggested_query: None,
            needs_more_info: non_empty(missing),
            suggestions: non_empty(suggestions),
        }
    }

    /// Worst-case reply when resolution itself broke down.
    pub fn trouble_understanding() -> Self {
        Self::needs_info(
            "I'm having trouble understanding. Could you tell me which token or contract \
             address you want to index, what you want to do with it, and which blocks to cover?",
            0.0,
            MissingKind::ALL.to_vec(),
            vec!["Index USDC transfers from the latest 1000 blocks".to_string()],
        )
    }

    pub fn missing(&self) -> &[MissingKind] {
        self.needs_more_info.as_deref().unwrap_or(&[])
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}
