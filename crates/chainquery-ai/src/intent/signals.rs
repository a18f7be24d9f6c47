//! Signal extraction: finds subjects (token symbols, contract addresses),
//! actions (index/track/monitor...) and scopes (block ranges, recency)
//! in a block of conversation text.

use super::ordered_set::OrderedSet;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Reverse;

/// Well-known token symbols recognized as subjects
pub const KNOWN_TOKENS: &[&str] = &["USDC", "USDT", "WETH", "DAI", "WBTC", "LINK", "UNI"];

/// Verbs that express an intent to index data
pub const ACTION_VERBS: &[&str] = &["index", "track", "monitor", "get", "find", "collect", "gather"];

/// Action recorded for the phrase "all transfers"; synthesizes as "index all <subject> transfers"
pub const ALL_TRANSFERS_ACTION: &str = "index all";

static TOKEN_SYMBOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({})\b", KNOWN_TOKENS.join("|"))).unwrap()
});
static GENERIC_SUBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:tokens?|ethereum)\b").unwrap());
static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b0x[0-9a-f]{40}\b").unwrap());

static ACTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({})[a-z]*\b", ACTION_VERBS.join("|"))).unwrap()
});
static ALL_TRANSFERS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\ball\s+transfers\b").unwrap());

static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bfrom\s+((?:block\s+)?#?(?:\d{1,3}(?:[,_]\d{3})+|[\w.]+))\s+to\s+((?:block\s+)?#?(?:\d{1,3}(?:[,_]\d{3})+|[\w.]+))",
    )
    .unwrap()
});
static RECENCY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(latest|recent)(?:\s+(\d{1,3}(?:[,_]\d{3})+|\d+))?(\s+blocks?)?\b").unwrap()
});
static BLOCK_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bblock\s+#?(\d{1,3}(?:[,_]\d{3})+|\d+)\b").unwrap());
static LONG_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,3}(?:[,_]\d{3}){2,}|\d{7,})\b").unwrap());
/// Digits grouped by thousands separators, e.g. 18,000,000 or 18_000_000
static SEPARATED_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,3}(?:[,_]\d{3})+\b").unwrap());
static BLOCK_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bblocks?\b").unwrap());

/// Signals found in one block of text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signals {
    pub has_subject: bool,
    pub has_action: bool,
    pub has_scope: bool,
    pub subjects: OrderedSet,
    pub actions: OrderedSet,
    pub scopes: OrderedSet,
}

/// A match and where it started, so each set is filled in order of mention
struct Hit {
    start: usize,
    len: usize,
    value: String,
}

fn into_ordered_set(mut hits: Vec<Hit>) -> OrderedSet {
    // Earliest first; on a shared start the longer phrase wins
    hits.sort_by_key(|hit| (hit.start, Reverse(hit.len)));
    hits.into_iter().map(|hit| hit.value).collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_digit_separators(s: &str) -> String {
    SEPARATED_NUMBER_RE
        .replace_all(s, |caps: &regex::Captures| caps[0].replace([',', '_'], ""))
        .into_owned()
}

fn normalize_bound(s: &str) -> String {
    strip_digit_separators(&collapse_whitespace(s))
}

/// Scan `text` for subject, action and scope signals.
///
/// Matching is case-insensitive. Symbols are stored upper-case, addresses,
/// actions and scopes lower-case.
pub fn extract(text: &str) -> Signals {
    let subjects = extract_subjects(text);
    let actions = extract_actions(text);
    let scopes = extract_scopes(text);

    Signals {
        has_subject: !subjects.is_empty() || GENERIC_SUBJECT_RE.is_match(text),
        has_action: !actions.is_empty(),
        has_scope: !scopes.is_empty() || BLOCK_WORD_RE.is_match(text),
        subjects,
        actions,
        scopes,
    }
}

fn extract_subjects(text: &str) -> OrderedSet {
    let symbols = TOKEN_SYMBOL_RE.find_iter(text).map(|m| Hit {
        start: m.start(),
        len: m.len(),
        value: m.as_str().to_uppercase(),
    });
    let addresses = ADDRESS_RE.find_iter(text).map(|m| Hit {
        start: m.start(),
        len: m.len(),
        value: m.as_str().to_lowercase(),
    });

    into_ordered_set(symbols.chain(addresses).collect())
}

fn extract_actions(text: &str) -> OrderedSet {
    let mut hits: Vec<Hit> = ACTION_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Hit {
                start: whole.start(),
                len: whole.len(),
                value: caps.get(1)?.as_str().to_lowercase(),
            })
        })
        .collect();

    hits.extend(ALL_TRANSFERS_RE.find_iter(text).map(|m| Hit {
        start: m.start(),
        len: m.len(),
        value: ALL_TRANSFERS_ACTION.to_string(),
    }));

    into_ordered_set(hits)
}

fn extract_scopes(text: &str) -> OrderedSet {
    let mut hits = Vec::new();

    for caps in RANGE_RE.captures_iter(text) {
        if let (Some(whole), Some(from), Some(to)) = (caps.get(0), caps.get(1), caps.get(2)) {
            hits.push(Hit {
                start: whole.start(),
                len: whole.len(),
                value: format!(
                    "{} to {}",
                    normalize_bound(from.as_str()),
                    normalize_bound(to.as_str())
                )
                .to_lowercase(),
            });
        }
    }

    for caps in RECENCY_RE.captures_iter(text) {
        if let (Some(whole), Some(keyword)) = (caps.get(0), caps.get(1)) {
            // A count only means blocks when the unit says so
            let value = match (caps.get(2), caps.get(3)) {
                (Some(count), Some(_)) => format!(
                    "{} {} blocks",
                    keyword.as_str(),
                    strip_digit_separators(count.as_str())
                ),
                (Some(count), None) => format!(
                    "{} {}",
                    keyword.as_str(),
                    strip_digit_separators(count.as_str())
                ),
                (None, _) => format!("{} blocks", keyword.as_str()),
            };
            hits.push(Hit {
                start: whole.start(),
                len: whole.len(),
                value: value.to_lowercase(),
            });
        }
    }

    for re in [&*BLOCK_NUMBER_RE, &*LONG_NUMBER_RE] {
        for caps in re.captures_iter(text) {
            if let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) {
                hits.push(Hit {
                    start: whole.start(),
                    len: whole.len(),
                    value: format!("block {}", strip_digit_separators(number.as_str())),
                });
            }
        }
    }

    into_ordered_set(hits)
}
