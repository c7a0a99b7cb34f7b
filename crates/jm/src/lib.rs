//! JiraMule library
//!
//! The `goto` engine, the Jira client and the reports behind the `jm` binary.
//! Everything that talks to Jira goes through [`tracker::IssueTracker`], so
//! the same code runs against [`tracker::InMemoryTracker`] in tests.

pub mod board;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod duration;
pub mod errors;
pub mod fuzzy;
pub mod goto;
pub mod jql;
pub mod keys;
pub mod output;
pub mod tracker;
pub mod transition_map;

// Re-export commonly used types
pub use commands::CommandExecutor;
pub use config::Settings;
pub use domain::Transition;
pub use goto::{GotoError, GotoReport, Navigator};
pub use output::{ExitCode, JsonError, JsonOutput};
pub use tracker::{InMemoryTracker, IssueTracker, JiraClient};
pub use transition_map::TransitionMap;
