//! Goto, transition listing and the workflow report.

use super::*;
use crate::domain::Transition;
use crate::goto::{GotoReport, Navigator};
use crate::jql;
use serde::Serialize;
use tracing::debug;

/// One status of the workflow report.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatus {
    pub name: String,
    /// Issue the transitions were read from, if any issue is in this status.
    pub sample: Option<String>,
    pub transitions: Vec<Transition>,
}

/// One issue type of the workflow report.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowType {
    pub name: String,
    pub statuses: Vec<WorkflowStatus>,
}

impl<T: IssueTracker> CommandExecutor<T> {
    /// Move every key to `target`.
    ///
    /// Per-key failures are in the report; only key expansion fails the
    /// whole call.
    pub fn goto(&self, target: &str, tokens: &[String]) -> Result<GotoReport> {
        let keys = self.expand_keys(tokens)?;
        debug!("goto {} for {:?}", target, keys);
        let navigator = Navigator::new(
            &self.tracker,
            &self.settings.transition_map,
            self.settings.dry_run,
        );
        Ok(navigator.goto(target, &keys))
    }

    /// Transitions currently offered for one issue.
    pub fn transitions(&self, token: &str) -> Result<(String, Vec<Transition>)> {
        let key = self.single_key(token)?;
        let transitions = self.tracker.transitions_for(&key)?;
        Ok((key, transitions))
    }

    /// For each issue type and status of the project, the transitions
    /// offered from a sample issue in that status.
    pub fn map_goto(&self) -> Result<Vec<WorkflowType>> {
        let project = self.settings.require_project()?;
        let mut report = Vec::new();

        for issue_type in self.tracker.statuses_for(project)? {
            if issue_type.statuses.is_empty() {
                continue;
            }
            let mut statuses = Vec::with_capacity(issue_type.statuses.len());
            for status in &issue_type.statuses {
                let query = jql::sample_query(project, &issue_type.name, &status.name);
                let sample = self
                    .tracker
                    .first_issue(&query, &["key"])?
                    .and_then(|issue| issue["key"].as_str().map(str::to_string));
                let transitions = match sample {
                    Some(ref key) => self.tracker.transitions_for(key)?,
                    None => Vec::new(),
                };
                statuses.push(WorkflowStatus {
                    name: status.name.clone(),
                    sample,
                    transitions,
                });
            }
            report.push(WorkflowType {
                name: issue_type.name,
                statuses,
            });
        }

        Ok(report)
    }
}
