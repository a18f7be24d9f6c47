use super::context::AccumulatedContext;
use chainquery_core::ScoringWeights;

/// Confidence at or above which the rule-based path synthesizes a query
pub const READINESS_THRESHOLD: f64 = 0.7;

/// Outcome of scoring one accumulated context
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    /// Sum of present-signal weights plus the history bonus; not clamped
    pub confidence: f64,
    pub ready: bool,
}

/// Weighted readiness scorer
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    weights: ScoringWeights,
    threshold: f64,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(ScoringWeights::default(), READINESS_THRESHOLD)
    }
}

impl ConfidenceScorer {
    pub fn new(weights: ScoringWeights, threshold: f64) -> Self {
        Self { weights, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// `turn_count` is the number of turns before the current utterance.
    pub fn score(&self, context: &AccumulatedContext, turn_count: usize) -> Score {
        let mut confidence = 0.0;
        if context.has_subject {
            confidence += self.weights.subject;
        }
        if context.has_action {
            confidence += self.weights.action;
        }
        if context.has_scope {
            confidence += self.weights.scope;
        }
        if turn_count > 0 {
            confidence += self.weights.history_bonus;
        }

        Score {
            confidence,
            ready: self.is_ready(confidence),
        }
    }

    pub fn is_ready(&self, confidence: f64) -> bool {
        confidence >= self.threshold
    }
}

/// Score with the default weights and threshold.
pub fn score(context: &AccumulatedContext, turn_count: usize) -> (f64, bool) {
    let Score { confidence, ready } = ConfidenceScorer::default().score(context, turn_count);
    (confidence, ready)
}
