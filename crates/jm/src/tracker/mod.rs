//! Issue tracker abstraction.
//!
//! This module defines the `IssueTracker` trait that every command talks to,
//! allowing the Jira REST client and the in-memory tracker used by tests to be
//! swapped freely.

use crate::domain::{IssueTypeStatuses, Transition, WorklogEntry};
use anyhow::Result;
use serde_json::Value;
use thiserror::Error;

pub mod jira;
pub mod memory;

pub use jira::JiraClient;
pub use memory::InMemoryTracker;

/// Failures raised by tracker backends.
///
/// Tracker error bodies are carried verbatim; nothing in `jm` interprets them
/// beyond showing them to the operator.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{method} {path} failed with HTTP {status}: {body}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    #[error("{method} {path} failed: {source}")]
    Transport {
        method: &'static str,
        path: String,
        #[source]
        source: ureq::Error,
    },

    #[error("Could not decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Tracker setting '{0}' is not configured")]
    MissingSetting(&'static str),
}

impl TrackerError {
    /// HTTP status code, when the tracker answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TrackerError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Operations `jm` needs from an issue tracker.
///
/// Every call is a blocking request/response. Implementations must not cache
/// transitions or statuses: a transition changes what is offered next.
pub trait IssueTracker {
    /// Transitions currently offered for `key`, in tracker order.
    fn transitions_for(&self, key: &str) -> Result<Vec<Transition>>;

    /// Apply the transition with `transition_id` to `key`.
    fn transition(&self, key: &str, transition_id: &str) -> Result<()>;

    /// Fetch one issue limited to `fields`.
    fn issue(&self, key: &str, fields: &[&str]) -> Result<Value>;

    /// Run a JQL query and return every matching issue with `fields`.
    fn search(&self, jql: &str, fields: &[&str]) -> Result<Vec<Value>>;

    /// First issue matching a JQL query, if any.
    fn first_issue(&self, jql: &str, fields: &[&str]) -> Result<Option<Value>> {
        Ok(self.search(jql, fields)?.into_iter().next())
    }

    /// Record a work log entry on `key`.
    fn log_work(&self, key: &str, entry: &WorklogEntry) -> Result<()>;

    /// Statuses available to each issue type of `project`.
    fn statuses_for(&self, project: &str) -> Result<Vec<IssueTypeStatuses>>;
}
