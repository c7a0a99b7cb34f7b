//! Moving issues to a status, one workflow transition at a time.
//!
//! For each key the [`Navigator`] first looks for a transition whose name or
//! id is exactly the target. Failing that it fetches the issue's type and
//! status, looks up a curated path in the [`TransitionMap`] and walks it,
//! re-fetching the offered transitions before every hop and fuzzy-matching
//! the step against them.
//!
//! Keys are independent: a failure stops that key only, and nothing already
//! applied is rolled back.

use crate::domain::{IssueSnapshot, Transition};
use crate::errors::{self, ActionableError};
use crate::fuzzy::find_transition;
use crate::output::ExitCode;
use crate::tracker::{IssueTracker, TrackerError};
use crate::transition_map::TransitionMap;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fields requested when the issue's current position is needed.
const SNAPSHOT_FIELDS: &[&str] = &["status", "issuetype"];

/// Why a key could not be moved.
#[derive(Debug, Error)]
pub enum GotoError {
    /// No direct transition and no configured path for the triple.
    #[error("No transition map for {key} from '{from}' to '{to}'")]
    NoTransitionMap {
        key: String,
        issue_type: String,
        from: String,
        to: String,
    },

    /// A configured step matched nothing the tracker offered at that point.
    #[error("Broken transition step on {key} to '{step}'")]
    BrokenStep {
        key: String,
        step: String,
        /// Names of the transitions that were on offer.
        offered: Vec<String>,
    },

    #[error("Issue {key} came back without {field}")]
    MalformedIssue { key: String, field: &'static str },

    /// The tracker call itself failed; the source is kept as returned.
    #[error("{key}: {source}")]
    Tracker {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

impl GotoError {
    fn tracker(key: &str, source: anyhow::Error) -> Self {
        GotoError::Tracker {
            key: key.to_string(),
            source,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            GotoError::NoTransitionMap { key, .. }
            | GotoError::BrokenStep { key, .. }
            | GotoError::MalformedIssue { key, .. }
            | GotoError::Tracker { key, .. } => key,
        }
    }

    /// Configuration gap or broken step: the operator has to fix the map.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GotoError::NoTransitionMap { .. } | GotoError::BrokenStep { .. }
        )
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            GotoError::NoTransitionMap { .. } | GotoError::BrokenStep { .. } => {
                ExitCode::ValidationFailed
            }
            GotoError::MalformedIssue { .. } => ExitCode::ExternalError,
            GotoError::Tracker { source, .. } => source
                .downcast_ref::<TrackerError>()
                .map(ExitCode::from_tracker_error)
                .unwrap_or(ExitCode::ExternalError),
        }
    }

    /// JSON error code.
    pub fn code(&self) -> &'static str {
        use crate::output::ErrorCode;
        match self {
            GotoError::NoTransitionMap { .. } => ErrorCode::NO_TRANSITION_MAP,
            GotoError::BrokenStep { .. } => ErrorCode::BROKEN_STEP,
            GotoError::MalformedIssue { .. } => ErrorCode::MALFORMED_ISSUE,
            GotoError::Tracker { .. } => ErrorCode::for_exit_code(self.exit_code()),
        }
    }

    /// Structured details for `--json`.
    pub fn details(&self) -> Value {
        match self {
            GotoError::NoTransitionMap {
                key,
                issue_type,
                from,
                to,
            } => json!({"key": key, "issue_type": issue_type, "from": from, "to": to}),
            GotoError::BrokenStep { key, step, offered } => {
                json!({"key": key, "step": step, "offered": offered})
            }
            GotoError::MalformedIssue { key, field } => json!({"key": key, "field": field}),
            GotoError::Tracker { key, source } => {
                let mut details = json!({"key": key});
                if let Some(TrackerError::Status { status, body, .. }) =
                    source.downcast_ref::<TrackerError>()
                {
                    details["status"] = json!(status);
                    details["body"] = json!(body);
                }
                details
            }
        }
    }

    /// Human-facing rendering with causes and remedies.
    pub fn to_actionable(&self) -> ActionableError {
        match self {
            GotoError::NoTransitionMap {
                key,
                issue_type,
                from,
                to,
            } => errors::no_transition_map(key, issue_type, from, to),
            GotoError::BrokenStep { key, step, offered } => {
                errors::broken_step(key, step, offered)
            }
            GotoError::MalformedIssue { key, field } => ActionableError::new(self.to_string())
                .with_cause(format!("The tracker did not return {} for {}", field, key))
                .with_remedy("Check that the account can see the issue type and status"),
            GotoError::Tracker { source, .. } => ActionableError::new(self.to_string())
                .with_cause(format!("{:#}", source))
                .with_remedy("Transitions already applied stay applied; re-run to continue"),
        }
    }
}

/// What happened to one step of a goto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The transition was sent to the tracker.
    Applied,
    /// Dry run: the transition matched and would have been sent.
    Skipped,
    /// Dry run: nothing matched, but earlier steps were never applied so the
    /// offered transitions are not the ones this step would see.
    Unverified,
}

/// One hop of a goto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// Step text as requested (target or configured step).
    pub step: String,
    /// Transition the step resolved to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
    pub status: StepStatus,
}

/// How the target was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GotoPath {
    /// A single transition named or numbered exactly like the target.
    Direct,
    /// A configured path, looked up from the issue's type and status.
    MultiHop { issue_type: String, from: String },
}

/// A key that reached its target (or would have, in a dry run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GotoOutcome {
    pub key: String,
    pub target: String,
    pub path: GotoPath,
    pub steps: Vec<StepOutcome>,
}

impl GotoOutcome {
    /// Number of transitions sent to the tracker.
    pub fn applied(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Applied)
            .count()
    }
}

/// Result of a goto over several keys, in the order they were given.
#[derive(Debug)]
pub struct GotoReport {
    pub target: String,
    pub dry_run: bool,
    pub results: Vec<Result<GotoOutcome, GotoError>>,
}

impl GotoReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &GotoOutcome> {
        self.results.iter().filter_map(|result| result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &GotoError> {
        self.results.iter().filter_map(|result| result.as_ref().err())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// `Success` when every key made it, `ValidationFailed` when any key hit a
    /// configuration gap or broken step, otherwise the first tracker failure.
    pub fn exit_code(&self) -> ExitCode {
        if self.failures().any(GotoError::is_configuration) {
            return ExitCode::ValidationFailed;
        }
        self.failures()
            .next()
            .map(GotoError::exit_code)
            .unwrap_or(ExitCode::Success)
    }

    pub fn to_json(&self) -> Value {
        let failed: Vec<Value> = self
            .failures()
            .map(|error| {
                json!({
                    "key": error.key(),
                    "code": error.code(),
                    "message": error.to_string(),
                    "details": error.details(),
                })
            })
            .collect();
        json!({
            "target": self.target,
            "dry_run": self.dry_run,
            "succeeded": self.succeeded().collect::<Vec<_>>(),
            "failed": failed,
        })
    }
}

/// Drives issues to a target status.
///
/// Holds no state between keys: transitions and snapshots are fetched fresh
/// for every decision.
pub struct Navigator<'a, T: ?Sized> {
    tracker: &'a T,
    map: &'a TransitionMap,
    dry_run: bool,
}

impl<'a, T: IssueTracker + ?Sized> Navigator<'a, T> {
    pub fn new(tracker: &'a T, map: &'a TransitionMap, dry_run: bool) -> Self {
        Self {
            tracker,
            map,
            dry_run,
        }
    }

    /// Move every key to `target`, one key at a time.
    pub fn goto(&self, target: &str, keys: &[String]) -> GotoReport {
        let results = keys
            .iter()
            .map(|key| {
                let result = self.goto_key(key, target);
                if let Err(ref error) = result {
                    warn!("{}", error);
                }
                result
            })
            .collect();

        GotoReport {
            target: target.to_string(),
            dry_run: self.dry_run,
            results,
        }
    }

    /// Move one key to `target`.
    pub fn goto_key(&self, key: &str, target: &str) -> Result<GotoOutcome, GotoError> {
        let offered = self.offered(key)?;
        if let Some(direct) = offered.iter().find(|t| t.is_exactly(target)) {
            debug!("{}: direct transition {} ({})", key, direct.name, direct.id);
            let step = self.apply(key, target, direct)?;
            return Ok(GotoOutcome {
                key: key.to_string(),
                target: target.to_string(),
                path: GotoPath::Direct,
                steps: vec![step],
            });
        }

        let snapshot = self.snapshot(key)?;
        let path = self
            .map
            .resolve(&snapshot.issue_type, &snapshot.status, target)
            .ok_or_else(|| GotoError::NoTransitionMap {
                key: key.to_string(),
                issue_type: snapshot.issue_type.clone(),
                from: snapshot.status.clone(),
                to: target.to_string(),
            })?;
        info!(
            "{}: {} '{}' to '{}' via {}",
            key,
            snapshot.issue_type,
            snapshot.status,
            target,
            path.join(" > ")
        );

        let mut steps = Vec::with_capacity(path.len());
        for (index, step) in path.iter().enumerate() {
            let offered = self.offered(key)?;
            match find_transition(&offered, step) {
                Some(transition) => steps.push(self.apply(key, step, transition)?),
                None if self.dry_run && index > 0 => {
                    warn!(
                        "{}: dry run, cannot verify step '{}' before earlier steps are applied",
                        key, step
                    );
                    steps.push(StepOutcome {
                        step: step.clone(),
                        transition: None,
                        status: StepStatus::Unverified,
                    });
                }
                None => {
                    return Err(GotoError::BrokenStep {
                        key: key.to_string(),
                        step: step.clone(),
                        offered: offered.into_iter().map(|t| t.name).collect(),
                    })
                }
            }
        }

        Ok(GotoOutcome {
            key: key.to_string(),
            target: target.to_string(),
            path: GotoPath::MultiHop {
                issue_type: snapshot.issue_type,
                from: snapshot.status,
            },
            steps,
        })
    }

    fn offered(&self, key: &str) -> Result<Vec<Transition>, GotoError> {
        self.tracker
            .transitions_for(key)
            .map_err(|source| GotoError::tracker(key, source))
    }

    fn snapshot(&self, key: &str) -> Result<IssueSnapshot, GotoError> {
        let issue = self
            .tracker
            .issue(key, SNAPSHOT_FIELDS)
            .map_err(|source| GotoError::tracker(key, source))?;
        IssueSnapshot::from_issue(key, &issue).map_err(|field| GotoError::MalformedIssue {
            key: key.to_string(),
            field,
        })
    }

    fn apply(
        &self,
        key: &str,
        step: &str,
        transition: &Transition,
    ) -> Result<StepOutcome, GotoError> {
        let status = if self.dry_run {
            info!(
                "{}: dry run, would apply '{}' ({})",
                key, transition.name, transition.id
            );
            StepStatus::Skipped
        } else {
            self.tracker
                .transition(key, &transition.id)
                .map_err(|source| GotoError::tracker(key, source))?;
            info!("{}: applied '{}' ({})", key, transition.name, transition.id);
            StepStatus::Applied
        };

        Ok(StepOutcome {
            step: step.to_string(),
            transition: Some(transition.clone()),
            status,
        })
    }
}
