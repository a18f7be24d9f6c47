use super::context::AccumulatedContext;

/// Assemble the canonical query: `<action> <subject> transfers from <scope>`.
///
/// Only the first element of each set is used. Missing parts are skipped
/// rather than failing, so a partial context still yields a string.
pub fn synthesize(context: &AccumulatedContext) -> String {
    let subject_part = match context.first_subject() {
        Some(subject) => format!("{} transfers", subject),
        None => "transfers".to_string(),
    };

    let parts = [
        context.first_action().map(str::to_string),
        Some(subject_part),
        context.first_scope().map(|scope| format!("from {}", scope)),
    ];

    parts
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::context::accumulate;
    use crate::intent::ordered_set::OrderedSet;

    #[test]
    fn builds_action_subject_scope() {
        let context = accumulate(&[], "Index USDC transfers from the latest 1000 blocks");
        assert_eq!(
            synthesize(&context),
            "index USDC transfers from latest 1000 blocks"
        );
    }

    #[test]
    fn uses_first_element_of_each_set() {
        let context = AccumulatedContext {
            subjects: ["WETH", "USDC"].into_iter().collect(),
            actions: ["track", "index"].into_iter().collect(),
            scopes: ["recent blocks", "block 18000000"].into_iter().collect(),
            has_subject: true,
            has_action: true,
            has_scope: true,
        };

        let query = synthesize(&context);
        assert_eq!(query, "track WETH transfers from recent blocks");
        assert_eq!(query, synthesize(&context));
    }

    #[test]
    fn partial_context_still_synthesizes() {
        let context = AccumulatedContext {
            subjects: ["DAI"].into_iter().collect(),
            scopes: ["latest blocks"].into_iter().collect(),
            has_subject: true,
            has_scope: true,
            ..Default::default()
        };
        assert_eq!(synthesize(&context), "DAI transfers from latest blocks");

        let empty = AccumulatedContext {
            actions: OrderedSet::from_iter(["monitor"]),
            has_action: true,
            ..Default::default()
        };
        assert_eq!(synthesize(&empty), "monitor transfers");
    }

    #[test]
    fn all_transfers_reads_naturally() {
        let context = accumulate(&[], "all transfers of USDC in recent blocks");
        assert_eq!(synthesize(&context), "index all USDC transfers from recent blocks");
    }
}
