use crate::config::ReactionConfig;
use crate::slack::{ReactionMap, UserId};
use std::collections::BTreeSet;

const NUMBER_WORDS: [&str; 11] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
];

/// Order reaction names: acknowledgement first, then number words in numeric order,
/// then everything else lexicographically. Duplicates are dropped.
pub fn order_reactions<S: AsRef<str>>(names: &[S], acknowledgement: &str) -> Vec<String> {
    let present: BTreeSet<&str> = names.iter().map(AsRef::as_ref).collect();
    let mut ordered = Vec::with_capacity(present.len());

    if present.contains(acknowledgement) {
        ordered.push(acknowledgement.to_string());
    }

    for word in NUMBER_WORDS {
        if word != acknowledgement && present.contains(word) {
            ordered.push(word.to_string());
        }
    }

    // BTreeSet iteration is already lexicographic
    ordered.extend(
        present
            .iter()
            .copied()
            .filter(|name| *name != acknowledgement && !NUMBER_WORDS.contains(name))
            .map(|name| name.to_string()),
    );

    ordered
}

/// Reactions on the message that count as an acknowledgement in any-of mode
pub fn candidate_reactions(snapshot: &ReactionMap, reactions: &ReactionConfig) -> Vec<String> {
    let reserved = reactions.reserved();
    let names: Vec<&str> = snapshot
        .names()
        .filter(|name| !reserved.contains(name))
        .collect();

    order_reactions(&names, &reactions.acknowledgement)
}

/// Audience members not in `acknowledged`, keeping audience order
pub fn missing_users(audience: &[UserId], acknowledged: &BTreeSet<UserId>) -> Vec<UserId> {
    audience
        .iter()
        .filter(|user| !acknowledged.contains(*user))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<UserId> {
        raw.iter().map(|u| UserId::new(*u)).collect()
    }

    #[test]
    fn test_order_reactions() {
        assert_eq!(
            order_reactions(&["three", "eyes", "zebra", "one"], "eyes"),
            vec!["eyes", "one", "three", "zebra"]
        );
    }

    #[test]
    fn test_order_numbers_are_numeric_not_lexicographic() {
        assert_eq!(
            order_reactions(&["ten", "two", "eight", "zero", "apple"], "eyes"),
            vec!["zero", "two", "eight", "ten", "apple"]
        );
    }

    #[test]
    fn test_order_uses_configured_acknowledgement() {
        assert_eq!(
            order_reactions(&["eyes", "ok_hand", "one"], "ok_hand"),
            vec!["ok_hand", "one", "eyes"]
        );
    }

    #[test]
    fn test_order_dedupes() {
        assert_eq!(order_reactions(&["b", "a", "b"], "eyes"), vec!["a", "b"]);
        assert!(order_reactions::<&str>(&[], "eyes").is_empty());
    }

    #[test]
    fn test_candidates_exclude_reserved() {
        let snapshot: ReactionMap = vec![
            ("eyes", ids(&["U1"])),
            ("check_any", ids(&["UBOT"])),
            ("check_eyes", ids(&["UBOT"])),
            ("thumbsup", ids(&["U2"])),
            ("two", ids(&["U3"])),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            candidate_reactions(&snapshot, &ReactionConfig::default()),
            vec!["two", "thumbsup"]
        );
    }

    #[test]
    fn test_missing_users() {
        let acknowledged: BTreeSet<UserId> = ids(&["U2", "UBOT"]).into_iter().collect();
        assert_eq!(
            missing_users(&ids(&["U1", "U2", "U3"]), &acknowledged),
            ids(&["U1", "U3"])
        );
    }
}
