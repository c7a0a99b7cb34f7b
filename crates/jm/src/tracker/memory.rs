//! In-memory tracker for testing.
//!
//! Models a small workflow (status → outgoing transitions) and a set of
//! issues, answers with payloads shaped like the tracker's REST responses, and
//! records every call so tests can assert on the exact sequence of fetches and
//! mutations.

use crate::domain::{IssueTypeStatuses, StatusRef, Transition, WorklogEntry};
use crate::tracker::{IssueTracker, TrackerError};
use anyhow::Result;
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

/// A call made against the in-memory tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    ListTransitions { key: String },
    Transition { key: String, transition_id: String },
    Issue { key: String, fields: Vec<String> },
    Search { jql: String },
    LogWork { key: String },
    Statuses { project: String },
}

impl TrackerCall {
    /// Whether this call changes tracker state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            TrackerCall::Transition { .. } | TrackerCall::LogWork { .. }
        )
    }
}

#[derive(Debug, Clone)]
struct IssueRecord {
    issue_type: String,
    status: String,
    fields: Map<String, Value>,
}

#[derive(Debug, Clone)]
struct Edge {
    id: String,
    name: String,
    to: String,
}

#[derive(Debug, Default)]
struct TrackerState {
    issues: BTreeMap<String, IssueRecord>,
    workflow: HashMap<String, Vec<Edge>>,
    searches: HashMap<String, Vec<Value>>,
    statuses: HashMap<String, Vec<IssueTypeStatuses>>,
    unavailable: HashSet<String>,
    worklogs: Vec<(String, WorklogEntry)>,
    calls: Vec<TrackerCall>,
}

/// In-memory tracker backend.
///
/// Uses `Rc<RefCell<>>` for shared interior mutability - clones share the same
/// data, so a test can keep a handle while a command executor owns another.
///
/// # Examples
///
/// ```
/// use jm::tracker::{InMemoryTracker, IssueTracker};
///
/// let tracker = InMemoryTracker::new()
///     .with_transition("Open", "11", "Start Progress", "In Progress")
///     .with_issue("APP-1", "Bug", "Open");
///
/// tracker.transition("APP-1", "11").unwrap();
/// assert_eq!(tracker.status_of("APP-1").as_deref(), Some("In Progress"));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryTracker {
    state: Rc<RefCell<TrackerState>>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer transition `id`/`name` from status `from`, landing in `to`.
    pub fn with_transition(self, from: &str, id: &str, name: &str, to: &str) -> Self {
        self.state
            .borrow_mut()
            .workflow
            .entry(from.to_string())
            .or_default()
            .push(Edge {
                id: id.to_string(),
                name: name.to_string(),
                to: to.to_string(),
            });
        self
    }

    /// Add an issue of `issue_type` sitting in `status`.
    pub fn with_issue(self, key: &str, issue_type: &str, status: &str) -> Self {
        self.state.borrow_mut().issues.insert(
            key.to_string(),
            IssueRecord {
                issue_type: issue_type.to_string(),
                status: status.to_string(),
                fields: Map::new(),
            },
        );
        self
    }

    /// Set extra fields returned for an issue (summary, duedate, ...).
    pub fn with_fields(self, key: &str, fields: Value) -> Self {
        if let (Some(record), Value::Object(extra)) =
            (self.state.borrow_mut().issues.get_mut(key), fields)
        {
            record.fields.extend(extra);
        }
        self
    }

    /// Answer `jql` with `issues`. Unknown queries return no issues.
    pub fn with_search(self, jql: &str, issues: Vec<Value>) -> Self {
        self.state
            .borrow_mut()
            .searches
            .insert(jql.to_string(), issues);
        self
    }

    /// Statuses reported for `project`.
    pub fn with_statuses(self, project: &str, types: Vec<IssueTypeStatuses>) -> Self {
        self.state
            .borrow_mut()
            .statuses
            .insert(project.to_string(), types);
        self
    }

    /// Make every call touching `key` fail with HTTP 503.
    pub fn with_unavailable(self, key: &str) -> Self {
        self.state.borrow_mut().unavailable.insert(key.to_string());
        self
    }

    /// Move an issue behind the tool's back (a concurrent editor).
    pub fn set_status(&self, key: &str, status: &str) {
        if let Some(record) = self.state.borrow_mut().issues.get_mut(key) {
            record.status = status.to_string();
        }
    }

    pub fn status_of(&self, key: &str) -> Option<String> {
        self.state
            .borrow()
            .issues
            .get(key)
            .map(|record| record.status.clone())
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<TrackerCall> {
        self.state.borrow().calls.clone()
    }

    /// Number of state-changing calls made so far.
    pub fn mutation_count(&self) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .count()
    }

    pub fn worklogs(&self) -> Vec<(String, WorklogEntry)> {
        self.state.borrow().worklogs.clone()
    }

    fn record(&self, call: TrackerCall) {
        self.state.borrow_mut().calls.push(call);
    }

    fn check_available(&self, method: &'static str, key: &str, path: String) -> Result<()> {
        if self.state.borrow().unavailable.contains(key) {
            return Err(TrackerError::Status {
                method,
                path,
                status: 503,
                body: "Service Unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn load(&self, method: &'static str, key: &str, path: String) -> Result<IssueRecord> {
        self.check_available(method, key, path.clone())?;
        self.state
            .borrow()
            .issues
            .get(key)
            .cloned()
            .ok_or_else(|| {
                TrackerError::Status {
                    method,
                    path,
                    status: 404,
                    body: r#"{"errorMessages":["Issue does not exist or you do not have permission to see it."]}"#
                        .to_string(),
                }
                .into()
            })
    }

    fn offered(&self, status: &str) -> Vec<Edge> {
        self.state
            .borrow()
            .workflow
            .get(status)
            .cloned()
            .unwrap_or_default()
    }
}

impl IssueTracker for InMemoryTracker {
    fn transitions_for(&self, key: &str) -> Result<Vec<Transition>> {
        self.record(TrackerCall::ListTransitions {
            key: key.to_string(),
        });
        let record = self.load("GET", key, format!("issue/{}/transitions", key))?;

        Ok(self
            .offered(&record.status)
            .into_iter()
            .map(|edge| Transition::new(edge.id, edge.name).leading_to(edge.to))
            .collect())
    }

    fn transition(&self, key: &str, transition_id: &str) -> Result<()> {
        self.record(TrackerCall::Transition {
            key: key.to_string(),
            transition_id: transition_id.to_string(),
        });
        let path = format!("issue/{}/transitions", key);
        let record = self.load("POST", key, path.clone())?;

        let edge = self
            .offered(&record.status)
            .into_iter()
            .find(|edge| edge.id == transition_id)
            .ok_or_else(|| TrackerError::Status {
                method: "POST",
                path,
                status: 400,
                body: format!(
                    r#"{{"errorMessages":["Transition id '{}' is not valid for this issue."]}}"#,
                    transition_id
                ),
            })?;

        self.set_status(key, &edge.to);
        Ok(())
    }

    fn issue(&self, key: &str, fields: &[&str]) -> Result<Value> {
        self.record(TrackerCall::Issue {
            key: key.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        });
        let record = self.load("GET", key, format!("issue/{}", key))?;

        let mut all = record.fields.clone();
        all.insert("status".to_string(), json!({ "name": record.status }));
        all.insert("issuetype".to_string(), json!({ "name": record.issue_type }));
        let selected: Map<String, Value> = all
            .into_iter()
            .filter(|(name, _)| fields.is_empty() || fields.contains(&name.as_str()))
            .collect();

        Ok(json!({ "key": key, "fields": selected }))
    }

    fn search(&self, jql: &str, _fields: &[&str]) -> Result<Vec<Value>> {
        self.record(TrackerCall::Search {
            jql: jql.to_string(),
        });
        Ok(self
            .state
            .borrow()
            .searches
            .get(jql)
            .cloned()
            .unwrap_or_default())
    }

    fn log_work(&self, key: &str, entry: &WorklogEntry) -> Result<()> {
        self.record(TrackerCall::LogWork {
            key: key.to_string(),
        });
        self.load("POST", key, format!("issue/{}/worklog", key))?;
        self.state
            .borrow_mut()
            .worklogs
            .push((key.to_string(), entry.clone()));
        Ok(())
    }

    fn statuses_for(&self, project: &str) -> Result<Vec<IssueTypeStatuses>> {
        self.record(TrackerCall::Statuses {
            project: project.to_string(),
        });
        Ok(self
            .state
            .borrow()
            .statuses
            .get(project)
            .cloned()
            .unwrap_or_default())
    }
}

/// Shorthand for building `statuses_for` fixtures.
pub fn issue_type_statuses(name: &str, statuses: &[&str]) -> IssueTypeStatuses {
    IssueTypeStatuses {
        name: name.to_string(),
        statuses: statuses
            .iter()
            .map(|s| StatusRef {
                name: s.to_string(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> InMemoryTracker {
        InMemoryTracker::new()
            .with_transition("Open", "11", "Start Progress", "In Progress")
            .with_transition("In Progress", "21", "Resolve", "Done")
            .with_issue("APP-1", "Bug", "Open")
    }

    #[test]
    fn test_transitions_follow_current_status() {
        let tracker = tracker();
        let offered = tracker.transitions_for("APP-1").unwrap();
        assert_eq!(offered.len(), 1);
        assert_eq!(offered[0].name, "Start Progress");
        assert_eq!(offered[0].destination(), Some("In Progress"));

        tracker.transition("APP-1", "11").unwrap();
        let offered = tracker.transitions_for("APP-1").unwrap();
        assert_eq!(offered[0].id, "21");
    }

    #[test]
    fn test_invalid_transition_is_rejected_with_400() {
        let tracker = tracker();
        let err = tracker.transition("APP-1", "21").unwrap_err();
        let tracker_err = err.downcast_ref::<TrackerError>().unwrap();
        assert_eq!(tracker_err.status_code(), Some(400));
        assert_eq!(tracker.status_of("APP-1").as_deref(), Some("Open"));
    }

    #[test]
    fn test_unknown_issue_is_404() {
        let err = tracker().transitions_for("APP-404").unwrap_err();
        let tracker_err = err.downcast_ref::<TrackerError>().unwrap();
        assert_eq!(tracker_err.status_code(), Some(404));
    }

    #[test]
    fn test_issue_is_limited_to_requested_fields() {
        let tracker = tracker().with_fields("APP-1", json!({"summary": "Crash"}));
        let issue = tracker.issue("APP-1", &["status"]).unwrap();
        assert_eq!(issue["fields"]["status"]["name"], "Open");
        assert!(issue["fields"].get("summary").is_none());
        assert!(issue["fields"].get("issuetype").is_none());
    }

    #[test]
    fn test_calls_are_recorded_and_mutations_counted() {
        let tracker = tracker();
        tracker.transitions_for("APP-1").unwrap();
        tracker.transition("APP-1", "11").unwrap();

        assert_eq!(
            tracker.calls(),
            vec![
                TrackerCall::ListTransitions {
                    key: "APP-1".to_string()
                },
                TrackerCall::Transition {
                    key: "APP-1".to_string(),
                    transition_id: "11".to_string()
                },
            ]
        );
        assert_eq!(tracker.mutation_count(), 1);
    }

    #[test]
    fn test_unavailable_issue_fails_with_503() {
        let tracker = tracker().with_unavailable("APP-1");
        let err = tracker.transitions_for("APP-1").unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_clones_share_state() {
        let tracker = tracker();
        let other = tracker.clone();
        other.transition("APP-1", "11").unwrap();
        assert_eq!(tracker.status_of("APP-1").as_deref(), Some("In Progress"));
    }
}
