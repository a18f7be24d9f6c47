//! Picks the single most useful follow-up question when a query is not
//! ready yet. Rules are checked top to bottom and the first match wins:
//!
//! 1. subject and action missing: generic "what would you like to do"
//! 2. subject missing: which token or address
//! 3. action missing: what to do with the known subject
//! 4. scope missing: which blocks
//! 5. anything else: generic prompt

use super::context::AccumulatedContext;
use chainquery_core::MissingKind;

const EXAMPLE_REQUESTS: [&str; 3] = [
    "Index USDC transfers from the latest 1000 blocks",
    "Track WETH transfers from block 18000000 to 18100000",
    "Monitor USDT transfers in recent blocks",
];

const EXAMPLE_TOKENS: [&str; 3] = ["USDC", "USDT", "WETH"];

/// Question to ask plus example answers the frontend can offer as chips
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guidance {
    pub rule: GuidanceRule,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidanceRule {
    SubjectAndAction,
    Subject,
    Action,
    Scope,
    Generic,
}

/// Message text of the selected guidance.
pub fn guide(missing: &[MissingKind], context: &AccumulatedContext, turn_count: usize) -> String {
    guidance(missing, context, turn_count).message
}

pub fn guidance(
    missing: &[MissingKind],
    context: &AccumulatedContext,
    turn_count: usize,
) -> Guidance {
    let lacks = |kind: MissingKind| missing.contains(&kind);
    let subject = context.first_subject().unwrap_or("that token");
    let action = context.first_action().unwrap_or("index");

    if lacks(MissingKind::Subject) && lacks(MissingKind::Action) {
        let opener = if turn_count == 0 {
            "Happy to help with on-chain transfer data!"
        } else {
            "I still need a bit more to go on."
        };
        return Guidance {
            rule: GuidanceRule::SubjectAndAction,
            message: format!(
                "{} What would you like to do? Pick one of the examples below or describe it in your own words.",
                opener
            ),
            suggestions: EXAMPLE_REQUESTS.iter().map(|s| s.to_string()).collect(),
        };
    }

    if lacks(MissingKind::Subject) {
        return Guidance {
            rule: GuidanceRule::Subject,
            message: format!(
                "Which token or contract would you like to {}? You can name a token like {}, {}, or {}, or paste a contract address (0x...).",
                action, EXAMPLE_TOKENS[0], EXAMPLE_TOKENS[1], EXAMPLE_TOKENS[2]
            ),
            suggestions: EXAMPLE_TOKENS.iter().map(|s| s.to_string()).collect(),
        };
    }

    if lacks(MissingKind::Action) {
        return Guidance {
            rule: GuidanceRule::Action,
            message: format!(
                "What would you like me to do with {}? Choose one of the options below.",
                subject
            ),
            suggestions: ["Index", "Track", "Monitor"]
                .iter()
                .map(|verb| format!("{} {} transfers", verb, subject))
                .collect(),
        };
    }

    if lacks(MissingKind::Scope) {
        return Guidance {
            rule: GuidanceRule::Scope,
            message: format!(
                "Over what range should I {} {} transfers? A start and end height both work, or just the newest activity.",
                action, subject
            ),
            suggestions: vec![
                "From the latest 1000 blocks".to_string(),
                "From block 18000000 to 18100000".to_string(),
                "Recent blocks".to_string(),
            ],
        };
    }

    Guidance {
        rule: GuidanceRule::Generic,
        message: "Could you tell me a bit more about the transfer data you're after?".to_string(),
        suggestions: vec![EXAMPLE_REQUESTS[0].to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::context::accumulate;

    fn pick(utterance: &str) -> Guidance {
        pick_at(utterance, 0)
    }

    fn pick_at(utterance: &str, turn_count: usize) -> Guidance {
        let context = accumulate(&[], utterance);
        guidance(&context.missing(), &context, turn_count)
    }

    #[test]
    fn nothing_known_asks_what_to_do() {
        let g = pick("hello there");
        assert_eq!(g.rule, GuidanceRule::SubjectAndAction);
        assert!(g.message.contains("What would you like to do?"));
        assert_eq!(g.suggestions.len(), 3);
    }

    #[test]
    fn subject_and_action_missing_wins_over_scope() {
        let g = pick("the latest blocks");
        assert_eq!(g.rule, GuidanceRule::SubjectAndAction);
    }

    #[test]
    fn action_without_subject_asks_which_token() {
        let g = pick("I want to track something");
        assert_eq!(g.rule, GuidanceRule::Subject);
        assert!(g.message.contains("Which token"));
        assert!(g.message.contains("track"));
        assert_eq!(g.suggestions, vec!["USDC", "USDT", "WETH"]);
    }

    #[test]
    fn subject_without_action_interpolates_subject() {
        let g = pick("USDC transfers");
        assert_eq!(g.rule, GuidanceRule::Action);
        assert!(g.message.starts_with("What would you like me to do with USDC?"));
        assert_eq!(g.suggestions[0], "Index USDC transfers");
    }

    #[test]
    fn missing_scope_interpolates_action_and_subject() {
        let context = accumulate(&[], "monitor WETH");
        let g = guidance(&[MissingKind::Scope], &context, 1);
        assert_eq!(g.rule, GuidanceRule::Scope);
        assert!(g.message.contains("monitor WETH transfers"));
    }

    #[test]
    fn fallback_when_nothing_is_missing() {
        let context = accumulate(&[], "index USDC from latest blocks");
        assert_eq!(
            guide(&[], &context, 3),
            "Could you tell me a bit more about the transfer data you're after?"
        );
    }

    #[test]
    fn messages_add_no_signals_of_their_own() {
        use crate::intent::signals::extract;

        for turn_count in [0, 2] {
            let opener = extract(&pick_at("hello there", turn_count).message);
            assert!(!opener.has_subject && !opener.has_action && !opener.has_scope);
        }

        let action = extract(&pick("USDC transfers").message);
        assert!(!action.has_action && !action.has_scope);

        let context = accumulate(&[], "monitor WETH");
        let scope = extract(&guidance(&[MissingKind::Scope], &context, 1).message);
        assert!(!scope.has_scope);

        let generic = extract(&guide(&[], &context, 3));
        assert!(!generic.has_subject && !generic.has_action && !generic.has_scope);
    }

    #[test]
    fn generic_subject_uses_placeholder() {
        let g = pick("the ethereum token");
        assert_eq!(g.rule, GuidanceRule::Action);
        assert!(g.message.contains("that token"));
    }
}
