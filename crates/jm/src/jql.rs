//! JQL query construction for the reporting commands.

use std::sync::OnceLock;

use regex::Regex;

/// Status filter applied by `progress` when neither keys nor statuses are given.
pub const DEFAULT_PROGRESS_STATUS: &str = "In Progress";

static BARE_TERM: OnceLock<Regex> = OnceLock::new();

/// Quote a value as a JQL string literal.
///
/// ```
/// assert_eq!(jm::jql::quote(r#"Testing "QA""#), r#""Testing \"QA\"""#);
/// ```
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// A value left bare when it is a plain word, quoted otherwise.
fn term(value: &str) -> String {
    let bare = BARE_TERM
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("Bare term regex should compile"));
    if bare.is_match(value) {
        value.to_string()
    } else {
        quote(value)
    }
}

/// Query for the `progress` report.
///
/// Restricted to the current user's issues in `project`, then to `keys` and
/// `statuses` when given. With neither, only issues in
/// [`DEFAULT_PROGRESS_STATUS`] are reported.
pub fn progress_query<K: AsRef<str>, S: AsRef<str>>(
    project: &str,
    keys: &[K],
    statuses: &[S],
) -> String {
    let mut query = format!("assignee = currentUser() AND project = {}", term(project));

    if !keys.is_empty() {
        let keys: Vec<String> = keys.iter().map(|k| format!("key={}", k.as_ref())).collect();
        query.push_str(&format!(" AND ({})", keys.join(" OR ")));
    }

    let statuses: Vec<String> = if keys.is_empty() && statuses.is_empty() {
        vec![format!("status={}", quote(DEFAULT_PROGRESS_STATUS))]
    } else {
        statuses
            .iter()
            .map(|s| format!("status={}", quote(s.as_ref())))
            .collect()
    };
    if !statuses.is_empty() {
        query.push_str(&format!(" AND ({})", statuses.join(" OR ")));
    }

    query
}

/// Query for one board column.
///
/// `project` of `None` runs the fragment raw, without the project and
/// assignee restriction.
pub fn board_query(project: Option<&str>, fragment: &str) -> String {
    let mut parts = Vec::new();
    if let Some(project) = project {
        parts.push(format!("project = {}", term(project)));
        parts.push("assignee = currentUser()".to_string());
    }
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        parts.push(fragment.to_string());
    }
    let filter = parts.join(" AND ");
    if filter.is_empty() {
        "ORDER BY Rank".to_string()
    } else {
        format!("{} ORDER BY Rank", filter)
    }
}

/// Query for an issue of `issue_type` currently in `status`.
pub fn sample_query(project: &str, issue_type: &str, status: &str) -> String {
    format!(
        "project = {} AND issuetype = {} AND status = {}",
        term(project),
        quote(issue_type),
        quote(status)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: &[&str] = &[];

    #[test]
    fn test_progress_defaults_to_in_progress() {
        assert_eq!(
            progress_query("APP", NONE, NONE),
            r#"assignee = currentUser() AND project = APP AND (status="In Progress")"#
        );
    }

    #[test]
    fn test_progress_with_keys_has_no_default_status() {
        assert_eq!(
            progress_query("APP", &["APP-1", "APP-7"], NONE),
            "assignee = currentUser() AND project = APP AND (key=APP-1 OR key=APP-7)"
        );
    }

    #[test]
    fn test_progress_with_statuses() {
        assert_eq!(
            progress_query("APP", NONE, &["Open", "Testing"]),
            r#"assignee = currentUser() AND project = APP AND (status="Open" OR status="Testing")"#
        );
    }

    #[test]
    fn test_board_query_prefix_and_raw() {
        assert_eq!(
            board_query(Some("APP"), "status = Testing"),
            "project = APP AND assignee = currentUser() AND status = Testing ORDER BY Rank"
        );
        assert_eq!(
            board_query(None, "status = Testing"),
            "status = Testing ORDER BY Rank"
        );
        assert_eq!(
            board_query(Some("APP"), "  "),
            "project = APP AND assignee = currentUser() ORDER BY Rank"
        );
    }

    #[test]
    fn test_sample_query_quotes_names() {
        assert_eq!(
            sample_query("APP", "Sub-task", "In Progress"),
            r#"project = APP AND issuetype = "Sub-task" AND status = "In Progress""#
        );
    }

    #[test]
    fn test_project_with_odd_characters_is_quoted() {
        assert_eq!(
            board_query(Some("MY PROJ"), ""),
            r#"project = "MY PROJ" AND assignee = currentUser() ORDER BY Rank"#
        );
    }
}
