//! Sloppy matching of human-typed status names against tracker transitions.
//!
//! Two rules, in order:
//! 1. A candidate made only of digits is a transition id and must equal the
//!    transition's id exactly. Operators copy ids from the tracker UI to
//!    bypass fuzzing entirely.
//! 2. Anything else is a name. Whitespace runs in the candidate accept any mix
//!    of hyphens, underscores and whitespace (including none), the comparison
//!    ignores case, and the candidate may match anywhere inside the
//!    transition name.
//!
//! Picking between several matching transitions is the caller's concern.

use crate::domain::Transition;
use regex::{Regex, RegexBuilder};
use tracing::debug;

/// Separator accepted wherever the candidate has whitespace.
const SEPARATOR: &str = r"[-_\s]*";

/// Decide whether `candidate` denotes `transition`.
///
/// # Examples
///
/// ```
/// use jm::domain::Transition;
/// use jm::fuzzy::fuzzy_match_status;
///
/// let transition = Transition::new("21", "in_progress");
/// assert!(fuzzy_match_status(&transition, "In Progress"));
/// assert!(fuzzy_match_status(&transition, "21"));
/// assert!(!fuzzy_match_status(&transition, "In Review"));
/// ```
pub fn fuzzy_match_status(transition: &Transition, candidate: &str) -> bool {
    if is_transition_id(candidate) {
        return transition.id == candidate;
    }

    match name_pattern(candidate) {
        Some(pattern) => {
            debug!("Fuzzing: {} =~ /{}/i", transition.name, pattern.as_str());
            pattern.is_match(&transition.name)
        }
        None => false,
    }
}

/// First transition, in tracker order, that `candidate` denotes.
pub fn find_transition<'a>(
    transitions: &'a [Transition],
    candidate: &str,
) -> Option<&'a Transition> {
    transitions
        .iter()
        .find(|transition| fuzzy_match_status(transition, candidate))
}

fn is_transition_id(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_digit())
}

/// Case-insensitive, unanchored pattern for a candidate name. `None` for a
/// blank candidate, which must never match.
fn name_pattern(candidate: &str) -> Option<Regex> {
    let pieces: Vec<String> = candidate.split_whitespace().map(regex::escape).collect();
    if pieces.is_empty() {
        return None;
    }

    RegexBuilder::new(&pieces.join(SEPARATOR))
        .case_insensitive(true)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn named(name: &str) -> Transition {
        Transition::new("99", name)
    }

    #[test]
    fn test_whitespace_accepts_separator_variants() {
        for name in ["In Progress", "In-Progress", "in_progress", "inprogress", "IN -_ PROGRESS"] {
            assert!(
                fuzzy_match_status(&named(name), "In Progress"),
                "expected 'In Progress' to match '{}'",
                name
            );
        }
    }

    #[test]
    fn test_different_name_does_not_match() {
        assert!(!fuzzy_match_status(&named("In Review"), "In Progress"));
    }

    #[test]
    fn test_match_is_unanchored() {
        assert!(fuzzy_match_status(&named("Start Progress (dev)"), "progress"));
    }

    #[test]
    fn test_numeric_candidate_compares_ids_only() {
        let transition = Transition::new("31", "31 flavours");
        assert!(fuzzy_match_status(&transition, "31"));
        assert!(!fuzzy_match_status(&Transition::new("310", "31"), "31"));
        assert!(!fuzzy_match_status(&Transition::new("031", "Done"), "31"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(fuzzy_match_status(&named("Testing (Review)"), "Testing (Review)"));
        assert!(!fuzzy_match_status(&named("Testing Review"), "Testing (Review)"));
        assert!(!fuzzy_match_status(&named("Done"), ".*"));
    }

    #[test]
    fn test_unbalanced_input_does_not_panic() {
        assert!(!fuzzy_match_status(&named("Done"), "Done ("));
        assert!(fuzzy_match_status(&named("Done ["), "Done ["));
    }

    #[test]
    fn test_blank_candidate_matches_nothing() {
        assert!(!fuzzy_match_status(&named("Done"), ""));
        assert!(!fuzzy_match_status(&named("Done"), "   "));
    }

    #[test]
    fn test_find_transition_takes_first_in_tracker_order() {
        let transitions = vec![
            Transition::new("11", "Start Progress"),
            Transition::new("12", "Stop Progress"),
        ];
        let found = find_transition(&transitions, "progress").unwrap();
        assert_eq!(found.id, "11");
        assert!(find_transition(&transitions, "Close").is_none());
    }

    proptest! {
        #[test]
        fn prop_any_separator_between_words_matches(
            first in "[A-Za-z]{1,8}",
            second in "[A-Za-z]{1,8}",
            sep in "[-_ ]{0,3}",
        ) {
            let name = format!("{}{}{}", first.to_uppercase(), sep, second.to_lowercase());
            let candidate = format!("{} {}", first, second);
            prop_assert!(fuzzy_match_status(&named(&name), &candidate));
        }

        #[test]
        fn prop_numeric_candidate_ignores_name(id in "[0-9]{1,4}", name in ".{0,16}") {
            let transition = Transition::new(id.clone(), name);
            prop_assert!(fuzzy_match_status(&transition, &id));
        }
    }
}
