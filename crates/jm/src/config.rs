//! Configuration file loading and parsing.
//!
//! `jm` reads TOML from two files, then applies environment variables and
//! command-line flags on top:
//!
//! 1. CLI flags (`--project`, `--dry-run`)
//! 2. Environment (`JM_URL`, `JM_PROJECT`, `JM_USER`, `JM_TOKEN`, `JM_DRY_RUN`)
//! 3. Project file (`--config <PATH>`, else `./.jiramule.toml`)
//! 4. User file (`<config dir>/jiramule/config.toml`, or `$JM_CONFIG_HOME/config.toml`)
//! 5. Defaults
//!
//! Missing files are not an error; malformed files are.

use crate::board::KanbanStyle;
use crate::transition_map::{GotoTable, TransitionMap};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Project-level configuration file name, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = ".jiramule.toml";

/// Configuration file name inside the user configuration directory.
pub const USER_CONFIG_FILE: &str = "config.toml";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_HOURS_PER_DAY: f64 = 8.0;
const DEFAULT_DAYS_PER_WEEK: f64 = 5.0;

/// One configuration file, every section optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JmConfig {
    /// Tracker connection settings.
    pub jira: Option<JiraConfig>,
    /// Tool behavior.
    pub tool: Option<ToolConfig>,
    /// Multi-hop goto paths: `[goto.<type>.<from>] <to> = [steps]`.
    pub goto: Option<GotoTable>,
    /// Work logging settings.
    pub worklog: Option<WorklogConfig>,
    /// Board styles.
    pub kanban: Option<KanbanConfig>,
}

/// `[jira]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraConfig {
    /// Base URL of the tracker, e.g. `https://example.atlassian.net`.
    pub url: Option<String>,
    /// Default project code for bare issue numbers.
    pub project: Option<String>,
    /// Login for Basic authentication (omit to send the token as a bearer token).
    pub user: Option<String>,
    /// API token or password.
    pub token: Option<String>,
    /// Request timeout in seconds (default: 30).
    pub timeout_secs: Option<u64>,
    /// Issues requested per search page (default: 100).
    pub page_size: Option<usize>,
}

/// `[tool]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolConfig {
    /// Compute and report, but never change anything in the tracker.
    pub dry_run: Option<bool>,
}

/// `[worklog]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorklogConfig {
    /// Length of a logged day (default: 8).
    pub hours_per_day: Option<f64>,
    /// Length of a logged week in days (default: 5).
    pub days_per_week: Option<f64>,
}

/// `[kanban]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KanbanConfig {
    /// Extra or replacement styles by name.
    pub styles: Option<HashMap<String, KanbanStyle>>,
}

impl JmConfig {
    /// Load a configuration file.
    ///
    /// Returns `None` if the file doesn't exist and an error if it exists but
    /// is malformed.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: JmConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(Some(config))
    }
}

/// Directory holding the user configuration file.
///
/// `JM_CONFIG_HOME` wins over the platform configuration directory.
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var_os("JM_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|dir| dir.join("jiramule")),
    }
}

// ============================================================
// Config Loader with Priority and Merging
// ============================================================

/// Builder for loading configuration from multiple files with priority.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    user_config: Option<JmConfig>,
    project_config: Option<JmConfig>,
    sources: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with only defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and add the user-level config (`<dir>/config.toml`).
    pub fn with_user_config(mut self, config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(USER_CONFIG_FILE);
        self.user_config = JmConfig::load(&path)?;
        if self.user_config.is_some() {
            self.sources.push(path);
        }
        Ok(self)
    }

    /// Load and add the project-level config file.
    pub fn with_project_config(mut self, path: &Path) -> Result<Self> {
        self.project_config = JmConfig::load(path)?;
        if self.project_config.is_some() {
            self.sources.push(path.to_path_buf());
        }
        Ok(self)
    }

    /// Build the effective configuration by merging all files.
    pub fn build(self) -> EffectiveConfig {
        EffectiveConfig {
            user_config: self.user_config,
            project_config: self.project_config,
            sources: self.sources,
        }
    }
}

/// Values that take priority over every file: environment and CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub project: Option<String>,
    pub user: Option<String>,
    pub token: Option<String>,
    pub dry_run: Option<bool>,
}

impl Overrides {
    /// Read `JM_URL`, `JM_PROJECT`, `JM_USER`, `JM_TOKEN` and `JM_DRY_RUN`.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        let dry_run = match var("JM_DRY_RUN") {
            Some(value) => Some(parse_flag("JM_DRY_RUN", &value)?),
            None => None,
        };

        Ok(Self {
            url: var("JM_URL"),
            project: var("JM_PROJECT"),
            user: var("JM_USER"),
            token: var("JM_TOKEN"),
            dry_run,
        })
    }

    /// Layer `other` on top of these overrides.
    pub fn merge(self, other: Overrides) -> Self {
        Self {
            url: other.url.or(self.url),
            project: other.project.or(self.project),
            user: other.user.or(self.user),
            token: other.token.or(self.token),
            dry_run: other.dry_run.or(self.dry_run),
        }
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        invalid => bail!(
            "Invalid {}: '{}'. Valid options: 'true', 'false', '1', '0'",
            name,
            invalid
        ),
    }
}

/// Tracker connection settings after merging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JiraSettings {
    pub url: Option<String>,
    pub user: Option<String>,
    #[serde(skip)]
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub page_size: usize,
}

impl Default for JiraSettings {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Work logging settings after merging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorklogSettings {
    pub hours_per_day: f64,
    pub days_per_week: f64,
}

impl Default for WorklogSettings {
    fn default() -> Self {
        Self {
            hours_per_day: DEFAULT_HOURS_PER_DAY,
            days_per_week: DEFAULT_DAYS_PER_WEEK,
        }
    }
}

/// Fully resolved configuration handed to commands at construction.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub jira: JiraSettings,
    /// Default project for bare issue numbers.
    pub project: Option<String>,
    pub dry_run: bool,
    pub transition_map: TransitionMap,
    pub worklog: WorklogSettings,
    /// Styles from configuration, on top of the built-in ones.
    pub kanban_styles: BTreeMap<String, KanbanStyle>,
    /// Files the settings were read from, lowest priority first.
    pub sources: Vec<PathBuf>,
}

impl Settings {
    /// The default project, or an error telling the operator how to set it.
    pub fn require_project(&self) -> Result<&str> {
        self.project.as_deref().context(
            "No project configured. Set [jira] project in .jiramule.toml, JM_PROJECT, or pass --project",
        )
    }
}

/// Merged configuration from all files.
///
/// When resolving a value, checks sources in order:
/// overrides > project > user > default
#[derive(Debug, Default)]
pub struct EffectiveConfig {
    user_config: Option<JmConfig>,
    project_config: Option<JmConfig>,
    sources: Vec<PathBuf>,
}

impl EffectiveConfig {
    /// Files lowest priority first.
    fn layers(&self) -> impl Iterator<Item = &JmConfig> {
        self.user_config.iter().chain(self.project_config.iter())
    }

    /// Highest-priority value of a setting across the files.
    fn pick<T, F>(&self, get: F) -> Option<T>
    where
        F: Fn(&JmConfig) -> Option<T>,
    {
        self.layers().filter_map(get).last()
    }

    /// Resolve the final settings.
    pub fn resolve(&self, overrides: &Overrides) -> Result<Settings> {
        let jira_value = |get: fn(&JiraConfig) -> Option<String>| {
            self.pick(|c| c.jira.as_ref().and_then(get))
        };

        let timeout_secs = self
            .pick(|c| c.jira.as_ref().and_then(|j| j.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            bail!("Invalid [jira] timeout_secs: must be greater than 0");
        }
        let page_size = self
            .pick(|c| c.jira.as_ref().and_then(|j| j.page_size))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            bail!("Invalid [jira] page_size: must be greater than 0");
        }

        let worklog = WorklogSettings {
            hours_per_day: self
                .pick(|c| c.worklog.as_ref().and_then(|w| w.hours_per_day))
                .unwrap_or(DEFAULT_HOURS_PER_DAY),
            days_per_week: self
                .pick(|c| c.worklog.as_ref().and_then(|w| w.days_per_week))
                .unwrap_or(DEFAULT_DAYS_PER_WEEK),
        };
        if worklog.hours_per_day <= 0.0 || worklog.days_per_week <= 0.0 {
            bail!("Invalid [worklog] settings: hours_per_day and days_per_week must be positive");
        }

        let mut transition_map = TransitionMap::new();
        let mut kanban_styles = BTreeMap::new();
        for layer in self.layers() {
            if let Some(ref table) = layer.goto {
                transition_map.extend(TransitionMap::from_table(table));
            }
            if let Some(styles) = layer.kanban.as_ref().and_then(|k| k.styles.as_ref()) {
                kanban_styles.extend(styles.clone());
            }
        }

        Ok(Settings {
            jira: JiraSettings {
                url: overrides.url.clone().or_else(|| jira_value(|j| j.url.clone())),
                user: overrides.user.clone().or_else(|| jira_value(|j| j.user.clone())),
                token: overrides
                    .token
                    .clone()
                    .or_else(|| jira_value(|j| j.token.clone())),
                timeout_secs,
                page_size,
            },
            project: overrides
                .project
                .clone()
                .or_else(|| jira_value(|j| j.project.clone())),
            dry_run: overrides
                .dry_run
                .or_else(|| self.pick(|c| c.tool.as_ref().and_then(|t| t.dry_run)))
                .unwrap_or(false),
            transition_map,
            worklog,
            kanban_styles,
            sources: self.sources.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(JmConfig::load(&temp.path().join("nope.toml")).unwrap().is_none());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "bad.toml", "[jira\nurl = ");
        let err = JmConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_defaults_without_files() {
        let settings = ConfigLoader::new()
            .build()
            .resolve(&Overrides::default())
            .unwrap();
        assert_eq!(settings.jira.timeout_secs, 30);
        assert_eq!(settings.jira.page_size, 100);
        assert!(!settings.dry_run);
        assert!(settings.project.is_none());
        assert!(settings.transition_map.is_empty());
        assert_eq!(settings.worklog, WorklogSettings::default());
    }

    #[test]
    fn test_project_file_overrides_user_file() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(
            user.path(),
            USER_CONFIG_FILE,
            r#"
[jira]
url = "https://user.example.com"
project = "USR"
token = "t0k3n"

[goto."*".Open]
Done = ["Close"]
Testing = ["Start", "Test"]
"#,
        );
        let project_file = write(
            project.path(),
            PROJECT_CONFIG_FILE,
            r#"
[jira]
project = "APP"

[tool]
dry_run = true

[goto."*".Open]
Done = ["Resolve"]
"#,
        );

        let effective = ConfigLoader::new()
            .with_user_config(user.path())
            .unwrap()
            .with_project_config(&project_file)
            .unwrap()
            .build();
        let settings = effective.resolve(&Overrides::default()).unwrap();

        assert_eq!(settings.project.as_deref(), Some("APP"));
        assert_eq!(settings.jira.url.as_deref(), Some("https://user.example.com"));
        assert_eq!(settings.jira.token.as_deref(), Some("t0k3n"));
        assert!(settings.dry_run);
        assert_eq!(
            settings.transition_map.resolve("Bug", "Open", "Done"),
            Some(&["Resolve".to_string()][..])
        );
        assert!(settings
            .transition_map
            .resolve("Bug", "Open", "Testing")
            .is_some());
        assert_eq!(settings.sources.len(), 2);
    }

    #[test]
    fn test_overrides_win_over_files() {
        let project = TempDir::new().unwrap();
        let project_file = write(
            project.path(),
            PROJECT_CONFIG_FILE,
            "[jira]\nproject = \"APP\"\n[tool]\ndry_run = true\n",
        );
        let effective = ConfigLoader::new()
            .with_project_config(&project_file)
            .unwrap()
            .build();

        let overrides = Overrides {
            project: Some("OPS".to_string()),
            dry_run: Some(false),
            ..Overrides::default()
        };
        let settings = effective.resolve(&overrides).unwrap();
        assert_eq!(settings.project.as_deref(), Some("OPS"));
        assert!(!settings.dry_run);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "c.toml", "[jira]\ntimeout_secs = 0\n");
        let effective = ConfigLoader::new()
            .with_project_config(&path)
            .unwrap()
            .build();
        assert!(effective.resolve(&Overrides::default()).is_err());

        let path = write(temp.path(), "w.toml", "[worklog]\nhours_per_day = 0.0\n");
        let effective = ConfigLoader::new()
            .with_project_config(&path)
            .unwrap()
            .build();
        assert!(effective.resolve(&Overrides::default()).is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("JM_DRY_RUN", "TRUE").unwrap());
        assert!(parse_flag("JM_DRY_RUN", "1").unwrap());
        assert!(!parse_flag("JM_DRY_RUN", "off").unwrap());
        assert!(parse_flag("JM_DRY_RUN", "maybe").is_err());
    }

    #[test]
    fn test_overrides_merge_prefers_later() {
        let env = Overrides {
            project: Some("ENV".to_string()),
            token: Some("env-token".to_string()),
            ..Overrides::default()
        };
        let cli = Overrides {
            project: Some("CLI".to_string()),
            ..Overrides::default()
        };
        let merged = env.merge(cli);
        assert_eq!(merged.project.as_deref(), Some("CLI"));
        assert_eq!(merged.token.as_deref(), Some("env-token"));
    }

    #[test]
    fn test_require_project_message() {
        let settings = Settings::default();
        let err = settings.require_project().unwrap_err();
        assert!(err.to_string().contains("--project"));
    }
}
