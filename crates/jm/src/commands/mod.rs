//! Command execution logic for all CLI operations.
//!
//! The `CommandExecutor` holds the tracker and the resolved settings and
//! implements every command that talks to the tracker. Printing is left to
//! the binary.
//!
//! This module is organized into submodules by functional area:
//! - `goto`: moving issues, listing transitions, the workflow report
//! - `worklog`: logging work
//! - `progress`: the progress report
//! - `kanban`: boards and status lists

mod goto;
mod kanban;
mod progress;
mod worklog;

pub use goto::{WorkflowStatus, WorkflowType};
pub use progress::{render_progress, ProgressRow};
pub use worklog::WorklogResult;

use crate::config::Settings;
use crate::keys;
use crate::tracker::IssueTracker;
use anyhow::{bail, Result};
use serde_json::{json, Value};

/// Executes CLI commands against an issue tracker.
///
/// Generic over the tracker so the same code runs against Jira and the
/// in-memory tracker used by tests.
pub struct CommandExecutor<T: IssueTracker> {
    tracker: T,
    settings: Settings,
}

impl<T: IssueTracker> CommandExecutor<T> {
    /// Create a new command executor with the given tracker and settings
    pub fn new(tracker: T, settings: Settings) -> Self {
        Self { tracker, settings }
    }

    /// Get reference to the tracker backend
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn expand_keys(&self, tokens: &[String]) -> Result<Vec<String>> {
        expand_keys(&self.settings, tokens)
    }

    /// Expand a token that must be exactly one issue key.
    fn single_key(&self, token: &str) -> Result<String> {
        match self.expand_keys(&[token.to_string()])?.into_iter().next() {
            Some(key) => Ok(key),
            None => bail!("Invalid issue key '{}': expected 42 or PROJ-42", token),
        }
    }
}

/// Qualify key tokens with the default project.
///
/// A project is only required when some token is a bare number.
pub fn expand_keys(settings: &Settings, tokens: &[String]) -> Result<Vec<String>> {
    let project = match settings.project.as_deref() {
        Some(project) => project,
        None if tokens.iter().any(|token| keys::is_bare(token)) => settings.require_project()?,
        None => "",
    };
    Ok(keys::expand_keys(tokens, project))
}

/// The effective configuration as shown by `config show`, token masked.
pub fn config_view(settings: &Settings) -> Value {
    let goto: Vec<Value> = settings
        .transition_map
        .entries()
        .into_iter()
        .map(|(key, steps)| {
            json!({
                "issue_type": key.issue_type,
                "from": key.from,
                "to": key.to,
                "steps": steps,
            })
        })
        .collect();

    json!({
        "jira": {
            "url": settings.jira.url,
            "user": settings.jira.user,
            "token": settings.jira.token.as_ref().map(|_| "********"),
            "timeout_secs": settings.jira.timeout_secs,
            "page_size": settings.jira.page_size,
        },
        "project": settings.project,
        "dry_run": settings.dry_run,
        "worklog": settings.worklog,
        "goto": goto,
        "kanban_styles": settings.kanban_styles.keys().collect::<Vec<_>>(),
        "sources": settings.sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition_map::{TransitionMap, TransitionMapKey};

    fn settings(project: Option<&str>) -> Settings {
        Settings {
            project: project.map(str::to_string),
            ..Settings::default()
        }
    }

    #[test]
    fn test_expand_keys_with_project() {
        let tokens = vec!["1".to_string(), "BUG-2".to_string(), "junk".to_string()];
        assert_eq!(
            expand_keys(&settings(Some("APP")), &tokens).unwrap(),
            vec!["APP-1", "BUG-2"]
        );
    }

    #[test]
    fn test_qualified_keys_need_no_project() {
        let tokens = vec!["BUG-2".to_string()];
        assert_eq!(
            expand_keys(&settings(None), &tokens).unwrap(),
            vec!["BUG-2"]
        );
    }

    #[test]
    fn test_bare_number_without_project_is_an_error() {
        let tokens = vec!["2".to_string()];
        assert!(expand_keys(&settings(None), &tokens).is_err());
    }

    #[test]
    fn test_config_view_masks_token() {
        let mut settings = settings(Some("APP"));
        settings.jira.token = Some("s3cret".to_string());
        let mut map = TransitionMap::new();
        map.insert(
            TransitionMapKey::new("*", "Open", "Done"),
            vec!["Close".to_string()],
        );
        settings.transition_map = map;

        let view = config_view(&settings);
        assert_eq!(view["jira"]["token"], "********");
        assert!(!view.to_string().contains("s3cret"));
        assert_eq!(view["goto"][0]["steps"][0], "Close");
        assert_eq!(view["project"], "APP");
    }
}
