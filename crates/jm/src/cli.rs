//! Command-line interface definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// JiraMule: a command-line companion for Jira
///
/// Moves issues through their workflow (several transitions at a time when
/// needed), logs work, and shows progress and board reports.
///
/// Exit Codes:
///   0  - Command succeeded
///   1  - Generic error occurred
///   2  - Invalid arguments, usage or configuration error
///   3  - Issue not found
///   4  - Goto could not complete (missing transition map, broken step)
///   5  - Tracker refused the credentials
///  10  - Tracker unreachable or answered with an error
#[derive(Parser)]
#[command(name = "jm", version)]
#[command(about = "Command-line companion for Jira", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options accepted by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Compute and report, but do not change anything in Jira
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Project for bare issue numbers (overrides configuration)
    #[arg(short, long, global = true)]
    pub project: Option<String>,

    /// Configuration file to use instead of ./.jiramule.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output (for scripting)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log decisions to stderr (-v for info, -vv for debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Move issues to a status, making several transitions if needed
    ///
    /// A transition named (or numbered) exactly like the target is used
    /// directly. Otherwise the path is looked up in the [goto] section of the
    /// configuration by issue type and current status, e.g.
    ///
    ///   [goto.Bug.Open]
    ///   Done = ["In Progress", "Testing", "Done"]
    ///
    /// Use "*" as the issue type for paths shared by every type.
    ///
    /// Examples:
    ///   jm goto 'In Progress' BUG-4
    ///   jm goto Done 12 13 14
    #[command(alias = "move")]
    Goto {
        /// Status (or transition name or id) to reach
        target: String,

        /// Issue keys; bare numbers use the default project
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// List the transitions currently offered for an issue
    Transitions {
        /// Issue key; a bare number uses the default project
        key: String,
    },

    /// Report the transitions offered from each status of the project
    ///
    /// For every issue type and status, finds one issue in that status and
    /// lists what it can transition to. Useful when writing [goto] paths.
    #[command(name = "map-goto", alias = "mapGoto")]
    MapGoto,

    /// Print issue keys, expanded with the default project
    Keys {
        /// Keys or bare numbers; anything else is dropped
        keys: Vec<String>,
    },

    /// Log work spent on an issue
    ///
    /// Examples:
    ///   jm logwork BUG-42 1h 12m
    ///   jm logwork 42 1h --date 7-feb-2017
    ///   jm lw 42 30m --date yesterday -m "pairing"
    #[command(alias = "lw")]
    Logwork {
        /// Issue key; a bare number uses the default project
        key: String,

        /// Time spent, e.g. "1h 12m", "90m", "1.5h", "2d"
        #[arg(required = true)]
        time_spent: Vec<String>,

        /// Work log comment
        #[arg(short, long, default_value = "")]
        message: String,

        /// When the work was done (today, yesterday, YYYY-MM-DD, 7-feb-2017, RFC 3339)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show estimate, time spent and due date of your issues
    Progress {
        /// Only these issues
        keys: Vec<String>,

        /// Only issues in these statuses (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        status: Vec<String>,
    },

    /// Show a board of your issues, one column per query
    Kanban(BoardArgs),

    /// Show your issues as a status list (kanban --style status)
    Status(BoardArgs),

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Options shared by `kanban` and `status`.
#[derive(Args, Debug, Clone, Default)]
pub struct BoardArgs {
    /// Which style to use (empty, status, kanban, taskpaper, or configured)
    #[arg(short, long)]
    pub style: Option<String>,

    /// Do not restrict queries to your issues in the project
    #[arg(long)]
    pub raw: bool,

    /// Width of the terminal
    #[arg(short, long)]
    pub width: Option<usize>,

    /// Template for column headings
    #[arg(long)]
    pub heading: Option<String>,

    /// Template for items
    #[arg(long)]
    pub item: Option<String>,

    /// Add or replace a column (NAME=JQL)
    #[arg(short, long, value_name = "NAME=JQL")]
    pub column: Vec<String>,

    /// Fields to fetch (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub fields: Vec<String>,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show effective configuration from all sources
    ///
    /// Displays merged configuration with values from:
    /// 1. Command-line flags and JM_* environment variables - highest priority
    /// 2. Project config (--config, else ./.jiramule.toml)
    /// 3. User config (<config dir>/jiramule/config.toml)
    /// 4. Defaults - lowest priority
    Show,
}
