use approx::assert_abs_diff_eq;
use chainquery_ai::{accumulate, extract, synthesize, IntentResolver};
use chainquery_core::{MissingKind, Turn};

fn resolver() -> IntentResolver {
    IntentResolver::default()
}

#[tokio::test]
async fn track_something_asks_which_token() {
    let result = resolver().resolve("I want to track something", &[]).await;

    assert!(!result.is_query_ready);
    assert_abs_diff_eq!(result.confidence, 0.4);
    assert_eq!(result.missing(), &[MissingKind::Subject, MissingKind::Scope]);
    assert!(result.message.starts_with("Which token or contract would you like to track?"));
    assert_eq!(
        result.suggestions,
        Some(vec!["USDC".to_string(), "USDT".to_string(), "WETH".to_string()])
    );
}

#[tokio::test]
async fn bare_subject_asks_what_to_do() {
    let result = resolver().resolve("USDC transfers", &[]).await;

    assert!(!result.is_query_ready);
    assert_abs_diff_eq!(result.confidence, 0.4);
    assert_eq!(result.missing(), &[MissingKind::Action, MissingKind::Scope]);
    assert!(result.message.contains("What would you like me to do with USDC?"));
}

#[tokio::test]
async fn multi_turn_conversation_becomes_ready() {
    let turns = vec![
        Turn::user("I want to index something"),
        Turn::user("USDC transfers"),
    ];
    let result = resolver()
        .resolve("Index USDC transfers from latest blocks", &turns)
        .await;

    assert!(result.is_query_ready);
    assert_abs_diff_eq!(result.confidence, 1.1, epsilon = 1e-9);
    assert_eq!(
        result.suggested_query.as_deref(),
        Some("index USDC transfers from latest blocks")
    );
    assert!(result.needs_more_info.is_none());
}

#[tokio::test]
async fn complete_single_message_is_ready_without_bonus() {
    let result = resolver()
        .resolve("Index USDC transfers from the latest 1000 blocks", &[])
        .await;

    assert!(result.is_query_ready);
    assert_abs_diff_eq!(result.confidence, 1.0);
    assert_eq!(
        result.suggested_query.as_deref(),
        Some("index USDC transfers from latest 1000 blocks")
    );
}

#[tokio::test]
async fn signals_from_separate_turns_combine() {
    let turns = vec![
        Turn::user("monitor something"),
        Turn::assistant("Which token or contract would you like to monitor?"),
        Turn::user("WETH"),
        Turn::assistant("Which blocks should I monitor WETH transfers from?"),
    ];
    let result = resolver()
        .resolve("from block 18000000 to 18100000", &turns)
        .await;

    assert!(result.is_query_ready);
    assert_eq!(
        result.suggested_query.as_deref(),
        Some("monitor WETH transfers from block 18000000 to 18100000")
    );
}

#[tokio::test]
async fn grouped_block_numbers_survive_into_query() {
    let result = resolver()
        .resolve("Track WETH transfers from block 18,000,000 to 18,100,000", &[])
        .await;

    assert!(result.is_query_ready);
    assert_eq!(
        result.suggested_query.as_deref(),
        Some("track WETH transfers from block 18000000 to 18100000")
    );
}

#[tokio::test]
async fn transfer_count_is_not_turned_into_blocks() {
    let result = resolver()
        .resolve("Index the latest 1000 USDC transfers", &[])
        .await;

    assert!(result.is_query_ready);
    assert_eq!(
        result.suggested_query.as_deref(),
        Some("index USDC transfers from latest 1000")
    );
}

#[tokio::test]
async fn no_signals_means_zero_confidence_and_everything_missing() {
    let first = resolver().resolve("hello, how are you?", &[]).await;
    assert_eq!(first.confidence, 0.0);
    assert!(!first.is_query_ready);
    assert_eq!(first.missing(), &MissingKind::ALL);
    assert!(first.message.contains("What would you like to do?"));

    let turns = vec![Turn::user("hi"), Turn::assistant("Hello!")];
    let later = resolver().resolve("what's up", &turns).await;
    assert_abs_diff_eq!(later.confidence, 0.1);
    assert!(!later.is_query_ready);
}

#[test]
fn rule_based_path_is_deterministic() {
    let turns = vec![Turn::user("track DAI")];
    let a = resolver().resolve_rule_based("recent blocks please", &turns);
    let b = resolver().resolve_rule_based("recent blocks please", &turns);
    assert_eq!(a, b);
}

#[test]
fn extraction_is_idempotent() {
    let text = "index usdc and weth transfers from the latest 500 blocks";
    let first = extract(text);
    let second = extract(text);
    assert_eq!(first.subjects, second.subjects);
    assert_eq!(first.actions, second.actions);
    assert_eq!(first.scopes, second.scopes);
}

#[test]
fn synthesis_takes_first_mentioned_values() {
    let turns = vec![Turn::user("track WETH from recent blocks")];
    let context = accumulate(&turns, "actually index USDC from the latest 10 blocks");
    assert_eq!(synthesize(&context), "track WETH transfers from recent blocks");
}

#[test]
fn new_signal_class_never_lowers_confidence() {
    let cases: [(&[Turn], &str); 3] = [
        (&[], "track something"),
        (&[Turn::user("track something")], "USDC"),
        (
            &[Turn::user("track something"), Turn::user("USDC")],
            "latest blocks",
        ),
    ];

    let mut previous = 0.0;
    for (turns, utterance) in cases {
        let confidence = resolver().resolve_rule_based(utterance, turns).confidence;
        assert!(confidence >= previous);
        previous = confidence;
    }
}
