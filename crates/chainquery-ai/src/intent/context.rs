use super::ordered_set::OrderedSet;
use super::signals::{extract, Signals};
use chainquery_core::{MissingKind, Role, Turn};
use tracing::debug;

/// Signals accumulated across the whole conversation.
///
/// Recomputed on every call from the full turn sequence plus the new
/// utterance; never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccumulatedContext {
    pub subjects: OrderedSet,
    pub actions: OrderedSet,
    pub scopes: OrderedSet,
    pub has_subject: bool,
    pub has_action: bool,
    pub has_scope: bool,
}

impl AccumulatedContext {
    /// Absent signal classes, always in subject, action, scope order
    pub fn missing(&self) -> Vec<MissingKind> {
        MissingKind::ALL
            .into_iter()
            .filter(|kind| !self.has(*kind))
            .collect()
    }

    pub fn has(&self, kind: MissingKind) -> bool {
        match kind {
            MissingKind::Subject => self.has_subject,
            MissingKind::Action => self.has_action,
            MissingKind::Scope => self.has_scope,
        }
    }

    pub fn first_subject(&self) -> Option<&str> {
        self.subjects.first()
    }

    pub fn first_action(&self) -> Option<&str> {
        self.actions.first()
    }

    pub fn first_scope(&self) -> Option<&str> {
        self.scopes.first()
    }
}

impl From<Signals> for AccumulatedContext {
    fn from(signals: Signals) -> Self {
        Self {
            has_subject: signals.has_subject,
            has_action: signals.has_action,
            has_scope: signals.has_scope,
            subjects: signals.subjects,
            actions: signals.actions,
            scopes: signals.scopes,
        }
    }
}

/// Merge every prior turn with the current utterance into one context.
pub fn accumulate(turns: &[Turn], current_utterance: &str) -> AccumulatedContext {
    accumulate_with(turns, current_utterance, true)
}

/// Like [`accumulate`], optionally ignoring assistant turns.
///
/// The whole conversation is scanned as one lower-cased blob, so a subject
/// from turn 1 and a scope from turn 3 combine even though neither turn is
/// complete on its own.
pub fn accumulate_with(
    turns: &[Turn],
    current_utterance: &str,
    include_assistant_turns: bool,
) -> AccumulatedContext {
    let texts: Vec<&str> = turns
        .iter()
        .filter(|turn| include_assistant_turns || turn.role == Role::User)
        .map(|turn| turn.content.as_str())
        .chain(std::iter::once(current_utterance))
        .collect();

    let blob = texts.join("\n").to_lowercase();
    let mut context = AccumulatedContext::from(extract(&blob));

    // Running per-turn flags; a turn never matches where the blob would not,
    // but the aggregate flags are defined as the union of both.
    for text in &texts {
        let signals = extract(text);
        context.has_subject |= signals.has_subject;
        context.has_action |= signals.has_action;
        context.has_scope |= signals.has_scope;
    }

    debug!(
        turns = texts.len(),
        subjects = ?context.subjects,
        actions = ?context.actions,
        scopes = ?context.scopes,
        "accumulated conversation context"
    );

    context
}
