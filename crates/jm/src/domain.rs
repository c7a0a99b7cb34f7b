//! Domain types shared by the tracker client, the goto engine and commands.
//!
//! Everything here mirrors the shape of the tracker's REST payloads closely
//! enough to be deserialized directly, while only naming the fields `jm`
//! actually reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A workflow transition offered by the tracker for one issue.
///
/// Transitions are only valid for the issue and moment they were fetched:
/// applying any transition changes which ones are offered next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
    /// Status the issue lands in after this transition (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<StatusRef>,
}

impl Transition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            to: None,
        }
    }

    /// Attach the destination status name.
    pub fn leading_to(mut self, status: impl Into<String>) -> Self {
        self.to = Some(StatusRef {
            name: status.into(),
        });
        self
    }

    /// Name of the destination status, if the tracker reported one.
    pub fn destination(&self) -> Option<&str> {
        self.to.as_ref().map(|s| s.name.as_str())
    }

    /// Exact (non-fuzzy) match on name or id.
    pub fn is_exactly(&self, wanted: &str) -> bool {
        self.name == wanted || self.id == wanted
    }
}

/// A reference to a status by name, as embedded in tracker payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRef {
    pub name: String,
}

/// Issue type and current status, as fetched for one key.
///
/// Never cached: another editor may move the issue between the fetch and the
/// next mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueSnapshot {
    pub key: String,
    pub issue_type: String,
    pub status: String,
}

impl IssueSnapshot {
    /// Extract a snapshot from an issue payload (`fields.issuetype.name` and
    /// `fields.status.name`).
    ///
    /// On failure returns the path of the first missing field.
    pub fn from_issue(key: &str, issue: &Value) -> Result<Self, &'static str> {
        let issue_type = issue
            .pointer("/fields/issuetype/name")
            .and_then(Value::as_str)
            .ok_or("fields.issuetype.name")?;
        let status = issue
            .pointer("/fields/status/name")
            .and_then(Value::as_str)
            .ok_or("fields.status.name")?;

        Ok(Self {
            key: key.to_string(),
            issue_type: issue_type.to_string(),
            status: status.to_string(),
        })
    }
}

/// The statuses available to one issue type of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTypeStatuses {
    pub name: String,
    #[serde(default)]
    pub statuses: Vec<StatusRef>,
}

/// A work log entry to record against an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorklogEntry {
    pub comment: String,
    pub time_spent_seconds: u64,
    /// Start time, already formatted as `%Y-%m-%dT%H:%M:%S%.3f%z`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,
}

/// Look up a dotted field path (`fields.status.name`) in an issue payload.
pub fn issue_field<'a>(issue: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(issue, |value, segment| value.get(segment))
        .filter(|value| !value.is_null())
}
