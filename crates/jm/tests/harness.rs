//! Test harness for in-process command testing
//!
//! Wraps an `InMemoryTracker` seeded with a small software workflow and a
//! `CommandExecutor` built from TOML, the way the binary builds one.

use jm::config::{ConfigLoader, Overrides, Settings};
use jm::tracker::InMemoryTracker;
use jm::CommandExecutor;
use std::fs;
use tempfile::TempDir;

/// Workflow shared by every issue type:
///
/// Open -> In Progress -> Testing -> Done, plus Reopen from Done.
pub fn workflow() -> InMemoryTracker {
    InMemoryTracker::new()
        .with_transition("Open", "11", "Start Progress", "In Progress")
        .with_transition("In Progress", "21", "Ready for Test", "Testing")
        .with_transition("In Progress", "22", "Stop Progress", "Open")
        .with_transition("Testing", "31", "Pass", "Done")
        .with_transition("Testing", "32", "Fail", "In Progress")
        .with_transition("Done", "41", "Reopen", "Open")
}

/// Test harness that provides an isolated tracker and configuration
pub struct TestHarness {
    _temp: TempDir,
    pub tracker: InMemoryTracker,
    pub executor: CommandExecutor<InMemoryTracker>,
}

impl TestHarness {
    /// Harness for project `APP` with the given project config file content.
    pub fn with_config(tracker: InMemoryTracker, config: &str) -> Self {
        Self::build(tracker, config, Overrides::default())
    }

    /// Same as `with_config`, in dry-run mode.
    #[allow(dead_code)]
    pub fn dry_run(tracker: InMemoryTracker, config: &str) -> Self {
        let overrides = Overrides {
            dry_run: Some(true),
            ..Overrides::default()
        };
        Self::build(tracker, config, overrides)
    }

    fn build(tracker: InMemoryTracker, config: &str, overrides: Overrides) -> Self {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".jiramule.toml");
        fs::write(&path, format!("[jira]\nproject = \"APP\"\n\n{}", config)).unwrap();

        let settings: Settings = ConfigLoader::new()
            .with_project_config(&path)
            .unwrap()
            .build()
            .resolve(&overrides)
            .unwrap();
        let executor = CommandExecutor::new(tracker.clone(), settings);

        Self {
            _temp: temp,
            tracker,
            executor,
        }
    }

    /// Run goto over `keys`; key expansion must succeed.
    #[allow(dead_code)]
    pub fn goto(&self, target: &str, keys: &[&str]) -> jm::GotoReport {
        let tokens: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        self.executor.goto(target, &tokens).unwrap()
    }

    #[allow(dead_code)]
    pub fn status(&self, key: &str) -> String {
        self.tracker.status_of(key).unwrap_or_default()
    }
}

#[test]
fn test_harness_loads_project_from_config() {
    let h = TestHarness::with_config(workflow(), "");
    assert_eq!(h.executor.settings().project.as_deref(), Some("APP"));
    assert!(h.executor.settings().transition_map.is_empty());
}
