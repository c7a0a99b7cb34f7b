//! Configured multi-hop paths between statuses.
//!
//! The tracker only exposes the transitions leaving an issue's current status,
//! never the whole workflow, so paths that need several hops are curated by
//! hand in the `[goto]` configuration table:
//!
//! ```toml
//! [goto.Bug.Open]
//! Done = ["In Progress", "Testing", "Done"]
//!
//! [goto."*"."In Progress"]
//! Closed = ["Resolve", "Close"]
//! ```
//!
//! This is a lookup table, not a graph: a path is used only if someone wrote
//! it down. `*` as the issue type applies to every type without its own entry.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Issue type that matches every type.
pub const WILDCARD_TYPE: &str = "*";

/// Raw `[goto]` table: issue type → from status → to status → steps.
pub type GotoTable = HashMap<String, HashMap<String, HashMap<String, Vec<String>>>>;

static NON_WORD: OnceLock<Regex> = OnceLock::new();

/// Collapse every run of non-word characters into `_` so that `In Progress`,
/// `In-Progress` and `In - Progress` index the same entry.
///
/// The wildcard type is kept as is.
pub fn normalize_name(name: &str) -> String {
    let name = name.trim();
    if name == WILDCARD_TYPE {
        return name.to_string();
    }
    NON_WORD
        .get_or_init(|| Regex::new(r"\W+").expect("Non-word regex should compile"))
        .replace_all(name, "_")
        .into_owned()
}

/// `(issue type, from status, to status)` with every part normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionMapKey {
    pub issue_type: String,
    pub from: String,
    pub to: String,
}

impl TransitionMapKey {
    pub fn new(issue_type: &str, from: &str, to: &str) -> Self {
        Self {
            issue_type: normalize_name(issue_type),
            from: normalize_name(from),
            to: normalize_name(to),
        }
    }

    /// The same `(from, to)` pair for any issue type.
    pub fn wildcard(&self) -> Self {
        Self {
            issue_type: WILDCARD_TYPE.to_string(),
            from: self.from.clone(),
            to: self.to.clone(),
        }
    }
}

impl fmt::Display for TransitionMapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.issue_type, self.from, self.to)
    }
}

/// Lookup table of curated paths. Holds no mutable state once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionMap {
    paths: HashMap<TransitionMapKey, Vec<String>>,
}

impl TransitionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map from a `[goto]` table.
    pub fn from_table(table: &GotoTable) -> Self {
        let mut map = Self::new();
        for (issue_type, from_statuses) in table {
            for (from, targets) in from_statuses {
                for (to, steps) in targets {
                    map.insert(TransitionMapKey::new(issue_type, from, to), steps.clone());
                }
            }
        }
        map
    }

    /// Add or replace a path. Blank steps are dropped and an entry left with
    /// no steps is ignored, since it could never move an issue.
    pub fn insert(&mut self, key: TransitionMapKey, steps: Vec<String>) {
        let steps: Vec<String> = steps
            .into_iter()
            .map(|step| step.trim().to_string())
            .filter(|step| !step.is_empty())
            .collect();

        if steps.is_empty() {
            warn!("Ignoring goto map {} with no steps", key);
            return;
        }
        self.paths.insert(key, steps);
    }

    /// Merge `other` into this map; entries from `other` win.
    pub fn extend(&mut self, other: TransitionMap) {
        self.paths.extend(other.paths);
    }

    /// Steps configured for `(issue_type, from, to)`, falling back to the
    /// wildcard issue type. `None` means nobody has mapped this pair.
    pub fn resolve(&self, issue_type: &str, from: &str, to: &str) -> Option<&[String]> {
        let key = TransitionMapKey::new(issue_type, from, to);
        debug!("Getting path for {}", key);

        if let Some(steps) = self.paths.get(&key) {
            return Some(steps);
        }

        let wildcard = key.wildcard();
        let steps = self.paths.get(&wildcard)?;
        debug!("Using wildcard path {}", wildcard);
        Some(steps)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// All entries, sorted by key for stable output.
    pub fn entries(&self) -> Vec<(&TransitionMapKey, &[String])> {
        let mut entries: Vec<_> = self
            .paths
            .iter()
            .map(|(key, steps)| (key, steps.as_slice()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_collapses_non_word_runs() {
        assert_eq!(normalize_name("In Progress"), "In_Progress");
        assert_eq!(normalize_name("In-Progress"), "In_Progress");
        assert_eq!(normalize_name("In - Progress"), "In_Progress");
        assert_eq!(normalize_name("Testing (Review)"), "Testing_Review_");
        assert_eq!(normalize_name("*"), "*");
    }

    #[test]
    fn test_exact_entry_wins() {
        let mut map = TransitionMap::new();
        map.insert(
            TransitionMapKey::new("Bug", "Open", "Done"),
            steps(&["In Progress", "Testing", "Done"]),
        );
        map.insert(TransitionMapKey::new("*", "Open", "Done"), steps(&["Close"]));

        assert_eq!(
            map.resolve("Bug", "Open", "Done"),
            Some(&steps(&["In Progress", "Testing", "Done"])[..])
        );
    }

    #[test]
    fn test_wildcard_fallback() {
        let mut map = TransitionMap::new();
        map.insert(TransitionMapKey::new("*", "Open", "Done"), steps(&["Close"]));

        assert_eq!(map.resolve("Bug", "Open", "Done"), Some(&steps(&["Close"])[..]));
        assert_eq!(map.resolve("Story", "Open", "Done"), Some(&steps(&["Close"])[..]));
    }

    #[test]
    fn test_missing_entry_is_none() {
        let mut map = TransitionMap::new();
        map.insert(TransitionMapKey::new("Bug", "Open", "Done"), steps(&["Close"]));

        assert_eq!(map.resolve("Bug", "Open", "Testing"), None);
        assert_eq!(map.resolve("Story", "Open", "Done"), None);
    }

    #[test]
    fn test_lookup_tolerates_punctuation_variance() {
        let mut map = TransitionMap::new();
        map.insert(
            TransitionMapKey::new("Bug", "In Progress", "Done"),
            steps(&["Resolve"]),
        );
        assert!(map.resolve("Bug", "In-Progress", "Done").is_some());
        assert!(map.resolve("Bug", " In  Progress ", "Done").is_some());
    }

    #[test]
    fn test_empty_paths_are_ignored() {
        let mut map = TransitionMap::new();
        map.insert(TransitionMapKey::new("Bug", "Open", "Done"), steps(&["", "  "]));
        assert!(map.is_empty());
        assert_eq!(map.resolve("Bug", "Open", "Done"), None);
    }

    #[test]
    fn test_from_table() {
        let table: GotoTable = toml::from_str(
            r#"
[Bug.Open]
Done = ["In Progress", "Testing", "Done"]

["*"."In Progress"]
Closed = ["Resolve", "Close"]
"#,
        )
        .unwrap();

        let map = TransitionMap::from_table(&table);
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.resolve("Task", "In Progress", "Closed"),
            Some(&steps(&["Resolve", "Close"])[..])
        );
    }

    #[test]
    fn test_extend_overrides_entries() {
        let mut base = TransitionMap::new();
        base.insert(TransitionMapKey::new("*", "Open", "Done"), steps(&["Close"]));
        let mut overlay = TransitionMap::new();
        overlay.insert(TransitionMapKey::new("*", "Open", "Done"), steps(&["Resolve"]));

        base.extend(overlay);
        assert_eq!(base.resolve("Bug", "Open", "Done"), Some(&steps(&["Resolve"])[..]));
    }
}
