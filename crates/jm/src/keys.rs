//! Issue key normalization.
//!
//! Operators type keys with or without the project prefix (`42`, `BUG-42`) and
//! often paste surrounding noise. Everything downstream works on fully
//! qualified keys only.

use regex::Regex;
use std::sync::OnceLock;

/// Issue key: optional `PREFIX-` (ASCII alphanumerics then a hyphen) followed
/// by digits. The first key found anywhere in the token is used, so pasted
/// punctuation (`BUG-42,`, `#42`) is ignored.
static KEY_REGEX: OnceLock<Regex> = OnceLock::new();

fn key_regex() -> &'static Regex {
    KEY_REGEX.get_or_init(|| {
        Regex::new(r"(?:([A-Za-z0-9]+)-)?([0-9]+)").expect("Key regex should compile")
    })
}

/// Qualify a single key token with `project` when it has no prefix.
///
/// Returns `None` for tokens that are not issue keys.
///
/// # Examples
///
/// ```
/// use jm::keys::expand_key;
///
/// assert_eq!(expand_key("42", "APP"), Some("APP-42".to_string()));
/// assert_eq!(expand_key("BUG-42", "APP"), Some("BUG-42".to_string()));
/// assert_eq!(expand_key("abc", "APP"), None);
/// ```
pub fn expand_key(token: &str, project: &str) -> Option<String> {
    let captures = key_regex().captures(token)?;

    if captures.get(1).is_some() {
        // Foreign prefixes are trusted to allow cross-project references.
        Some(captures[0].to_string())
    } else {
        Some(format!("{}-{}", project, &captures[2]))
    }
}

/// Qualify every token with `project`, preserving order and silently dropping
/// tokens that are not issue keys.
///
/// An empty result means there is nothing to do; it is not an error.
///
/// # Examples
///
/// ```
/// use jm::keys::expand_keys;
///
/// let keys = expand_keys(&["1", "56", "BUG-78", "--"], "APP");
/// assert_eq!(keys, vec!["APP-1", "APP-56", "BUG-78"]);
/// ```
pub fn expand_keys<S: AsRef<str>>(tokens: &[S], project: &str) -> Vec<String> {
    tokens
        .iter()
        .filter_map(|token| expand_key(token.as_ref(), project))
        .collect()
}

/// Whether `token` is a key without a project prefix (`42`).
pub fn is_bare(token: &str) -> bool {
    key_regex()
        .captures(token)
        .is_some_and(|captures| captures.get(1).is_none())
}

/// Numeric part of a qualified key, used for natural ordering (`APP-9` before
/// `APP-10`). Keys without a numeric suffix sort first.
pub fn key_number(key: &str) -> u64 {
    key.rsplit('-')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}
