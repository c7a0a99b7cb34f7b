//! Actionable error formatting for improved user experience.
//!
//! This module provides utilities for creating error messages with:
//! - Clear error description
//! - Possible causes (diagnostics)
//! - Remediation steps (actionable fixes)

use std::fmt;

/// An error with diagnostic context and remediation steps.
///
/// # Example
///
/// ```
/// use jm::errors::ActionableError;
///
/// let error = ActionableError::new("No transition map for APP-4 from 'Open' to 'Done'")
///     .with_cause("No direct transition to 'Done' is offered from 'Open'")
///     .with_remedy("Add a [goto.\"*\".Open] entry to .jiramule.toml");
///
/// eprintln!("{}", error);
/// ```
#[derive(Debug, Clone)]
pub struct ActionableError {
    /// The main error message
    error: String,
    /// Possible causes (diagnostic hints)
    causes: Vec<String>,
    /// Remediation steps (how to fix)
    remediation: Vec<String>,
}

impl ActionableError {
    /// Create a new actionable error with the given message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            causes: Vec::new(),
            remediation: Vec::new(),
        }
    }

    /// Add a possible cause (diagnostic hint).
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Add a remediation step (actionable fix).
    pub fn with_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.remediation.push(remedy.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.error
    }

    pub fn remedies(&self) -> &[String] {
        &self.remediation
    }

    /// Convert to a formatted error message suitable for display.
    pub fn to_error_message(&self) -> String {
        let mut msg = format!("Error: {}\n", self.error);

        if !self.causes.is_empty() {
            msg.push_str("\nPossible causes:\n");
            for cause in &self.causes {
                msg.push_str(&format!("  • {}\n", cause));
            }
        }

        if !self.remediation.is_empty() {
            msg.push_str("\nTo fix:\n");
            for remedy in &self.remediation {
                msg.push_str(&format!("  • {}\n", remedy));
            }
        }

        msg
    }
}

impl fmt::Display for ActionableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_error_message())
    }
}

impl std::error::Error for ActionableError {}

/// TOML table header for a goto entry, quoting names that need it.
fn goto_header(issue_type: &str, from: &str) -> String {
    let part = |name: &str| {
        if !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            name.to_string()
        } else {
            format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
        }
    };
    format!("[goto.{}.{}]", part(issue_type), part(from))
}

/// No configured path between two statuses.
pub fn no_transition_map(key: &str, issue_type: &str, from: &str, to: &str) -> ActionableError {
    ActionableError::new(format!(
        "No transition map for {} from '{}' to '{}'",
        key, from, to
    ))
    .with_cause(format!(
        "No transition named or numbered '{}' is offered from '{}'",
        to, from
    ))
    .with_cause(format!(
        "No goto path is configured for issue type '{}' or '*'",
        issue_type
    ))
    .with_remedy(format!(
        "Add the steps to .jiramule.toml:\n      {}\n      \"{}\" = [\"<step>\", \"<step>\"]",
        goto_header(issue_type, from),
        to
    ))
    .with_remedy(format!("See what {} offers now: jm transitions {}", key, key))
    .with_remedy("Survey the project workflow: jm map-goto")
}

/// A configured step matches nothing the tracker currently offers.
pub fn broken_step(key: &str, step: &str, offered: &[String]) -> ActionableError {
    let offered = if offered.is_empty() {
        "nothing".to_string()
    } else {
        offered.join(", ")
    };
    ActionableError::new(format!("Broken transition step on {} to '{}'", key, step))
        .with_cause(format!("{} currently offers: {}", key, offered))
        .with_cause("The goto path in the configuration may be incomplete or out of date")
        .with_cause("Someone else may have moved the issue in the meantime")
        .with_remedy("Fix the step name, or use the transition id instead of its name")
        .with_remedy(format!("See what {} offers now: jm transitions {}", key, key))
}

/// A required tracker setting is missing.
pub fn missing_setting(setting: &str) -> ActionableError {
    let env = match setting {
        "jira.url" => "JM_URL",
        "jira.token" => "JM_TOKEN",
        "jira.user" => "JM_USER",
        _ => "JM_PROJECT",
    };
    ActionableError::new(format!("Tracker setting '{}' is not configured", setting))
        .with_remedy("Set it in .jiramule.toml or the user config file (jm config show lists them)")
        .with_remedy(format!("Or export {}", env))
}
