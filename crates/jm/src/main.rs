//! JiraMule
//!
//! A command-line companion for Jira. Moves issues through their workflow,
//! several transitions at a time when needed, logs work and draws progress
//! and board reports.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use jm::board::{self, DEFAULT_STYLE};
use jm::cli::{BoardArgs, Cli, Commands, ConfigCommands, GlobalArgs};
use jm::commands::{self, render_progress, CommandExecutor};
use jm::config::{self, ConfigLoader, Overrides, Settings, PROJECT_CONFIG_FILE};
use jm::errors;
use jm::goto::{GotoPath, GotoReport, StepStatus};
use jm::output::{ExitCode, JsonError, OutputContext};
use jm::tracker::{JiraClient, TrackerError};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let output = OutputContext::new(cli.global.quiet, cli.global.json);
    let command = command_name(&cli.command);

    let exit_code = match run(cli, &output) {
        Ok(code) => code,
        Err(e) => {
            if output.is_json() {
                let json_error = JsonError::from_error(&e, command);
                match json_error.to_json_string() {
                    Ok(text) => println!("{}", text),
                    Err(_) => eprintln!("Error: {}", e),
                }
            } else {
                // Nothing useful is left to do if stderr itself is gone.
                output.print_error(render_error(&e)).ok();
            }
            ExitCode::from_error(&e)
        }
    };

    if exit_code != ExitCode::Success {
        std::process::exit(exit_code.code());
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .init();
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Goto { .. } => "goto",
        Commands::Transitions { .. } => "transitions",
        Commands::MapGoto => "map-goto",
        Commands::Keys { .. } => "keys",
        Commands::Logwork { .. } => "logwork",
        Commands::Progress { .. } => "progress",
        Commands::Kanban(_) => "kanban",
        Commands::Status(_) => "status",
        Commands::Config(ConfigCommands::Show) => "config show",
    }
}

/// Human rendering of a failed command, with remedies where we have them.
fn render_error(error: &anyhow::Error) -> String {
    if let Some(TrackerError::MissingSetting(setting)) = error.downcast_ref::<TrackerError>() {
        return errors::missing_setting(setting).to_error_message();
    }
    if let Some(actionable) = error.downcast_ref::<errors::ActionableError>() {
        return actionable.to_error_message();
    }
    format!("Error: {:#}", error)
}

/// TOML has no null; unset values are left out of the human view.
fn without_nulls(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k, without_nulls(v)))
            .collect(),
        serde_json::Value::Array(items) => items.into_iter().map(without_nulls).collect(),
        other => other,
    }
}

fn load_settings(global: &GlobalArgs) -> Result<Settings> {
    let mut loader = ConfigLoader::new();
    if let Some(dir) = config::user_config_dir() {
        loader = loader.with_user_config(&dir)?;
    }
    let project_config = global
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    let effective = loader.with_project_config(&project_config)?.build();

    let flags = Overrides {
        project: global.project.clone(),
        dry_run: global.dry_run.then_some(true),
        ..Overrides::default()
    };
    let overrides = Overrides::from_env()?.merge(flags);

    let settings = effective.resolve(&overrides)?;
    debug!("configuration sources: {:?}", settings.sources);
    Ok(settings)
}

fn run(cli: Cli, output: &OutputContext) -> Result<ExitCode> {
    let settings = load_settings(&cli.global)?;

    // Commands that never talk to the tracker.
    match &cli.command {
        Commands::Keys { keys: tokens } => {
            let expanded = commands::expand_keys(&settings, tokens)?;
            if output.is_json() {
                output.print_json(&expanded, "keys")?;
            } else {
                for key in &expanded {
                    output.print_data(key)?;
                }
            }
            return Ok(ExitCode::Success);
        }
        Commands::Config(ConfigCommands::Show) => {
            let view = commands::config_view(&settings);
            if output.is_json() {
                output.print_json(&view, "config show")?;
            } else {
                output.print_data(toml::to_string_pretty(&without_nulls(view))?)?;
            }
            return Ok(ExitCode::Success);
        }
        _ => {}
    }

    let client = JiraClient::new(&settings.jira)?;
    let executor = CommandExecutor::new(client, settings);

    match cli.command {
        Commands::Goto { target, keys } => {
            let report = executor.goto(&target, &keys)?;
            print_goto(&report, output)?;
            Ok(report.exit_code())
        }
        Commands::Transitions { key } => {
            let (key, transitions) = executor.transitions(&key)?;
            if output.is_json() {
                output.print_json(
                    serde_json::json!({"key": key, "transitions": transitions}),
                    "transitions",
                )?;
            } else if transitions.is_empty() {
                output.print_info(format!("{} offers no transitions", key))?;
            } else {
                let width = transitions.iter().map(|t| t.id.len()).max().unwrap_or(0);
                for transition in &transitions {
                    output.print_data(format!(
                        "{:>width$}  {} -> {}",
                        transition.id,
                        transition.name,
                        transition.destination().unwrap_or("?"),
                        width = width
                    ))?;
                }
            }
            Ok(ExitCode::Success)
        }
        Commands::MapGoto => {
            let report = executor.map_goto()?;
            if output.is_json() {
                output.print_json(&report, "map-goto")?;
                return Ok(ExitCode::Success);
            }
            for issue_type in &report {
                output.print_data(format!("{}:", issue_type.name))?;
                for status in &issue_type.statuses {
                    match status.sample {
                        Some(ref sample) => {
                            output.print_data(format!("  {} (from {}):", status.name, sample))?
                        }
                        None => {
                            output.print_data(format!("  {}: no issue to sample", status.name))?;
                            continue;
                        }
                    }
                    for transition in &status.transitions {
                        output.print_data(format!(
                            "    {} -> {}",
                            transition.name,
                            transition.destination().unwrap_or("?")
                        ))?;
                    }
                }
            }
            Ok(ExitCode::Success)
        }
        Commands::Logwork {
            key,
            time_spent,
            message,
            date,
        } => {
            let result =
                executor.log_work(&key, &time_spent, &message, date.as_deref(), Local::now())?;
            if output.is_json() {
                output.print_json(&result, "logwork")?;
            } else {
                let verb = if result.dry_run { "Would log" } else { "Logged" };
                output.print_info(format!(
                    "{} {}s on {}",
                    verb, result.entry.time_spent_seconds, result.key
                ))?;
            }
            Ok(ExitCode::Success)
        }
        Commands::Progress { keys, status } => {
            let rows = executor.progress(&keys, &status, Local::now().date_naive())?;
            if output.is_json() {
                output.print_json(&rows, "progress")?;
            } else if rows.is_empty() {
                output.print_info("No matching issues")?;
            } else {
                output.print_data(render_progress(&rows))?;
            }
            Ok(ExitCode::Success)
        }
        Commands::Kanban(args) => run_board(&executor, DEFAULT_STYLE, &args, output, "kanban"),
        Commands::Status(args) => run_board(&executor, "status", &args, output, "status"),
        Commands::Keys { .. } | Commands::Config(_) => Ok(ExitCode::Success),
    }
}

fn run_board(
    executor: &CommandExecutor<JiraClient>,
    default_style: &str,
    args: &BoardArgs,
    output: &OutputContext,
    command: &str,
) -> Result<ExitCode> {
    let name = args.style.as_deref().unwrap_or(default_style);
    let style = executor.board_style(name, args)?;
    let columns = executor.board(&style, args.raw)?;

    if output.is_json() {
        output.print_json(&columns, command)?;
    } else {
        let width = args.width.unwrap_or_else(board::terminal_width);
        let rendered = board::render_board(&style, &columns, width)?;
        output.print_data(rendered.trim_end_matches('\n'))?;
    }
    Ok(ExitCode::Success)
}

fn print_goto(report: &GotoReport, output: &OutputContext) -> Result<()> {
    if output.is_json() {
        output.print_json(report.to_json(), "goto")?;
        return Ok(());
    }

    for result in &report.results {
        match result {
            Ok(outcome) => {
                let via = match outcome.path {
                    GotoPath::Direct => String::new(),
                    GotoPath::MultiHop { ref from, .. } => {
                        let steps: Vec<&str> =
                            outcome.steps.iter().map(|step| step.step.as_str()).collect();
                        format!(" from '{}' via {}", from, steps.join(" -> "))
                    }
                };
                let line = if report.dry_run {
                    let unverified = outcome
                        .steps
                        .iter()
                        .filter(|step| step.status == StepStatus::Unverified)
                        .count();
                    let note = if unverified > 0 {
                        format!(" ({} step(s) unverified)", unverified)
                    } else {
                        String::new()
                    };
                    format!("{}: would move to '{}'{}{}", outcome.key, outcome.target, via, note)
                } else {
                    format!("{}: moved to '{}'{}", outcome.key, outcome.target, via)
                };
                output.print_info(line)?;
            }
            Err(error) => {
                output.print_error(error.to_actionable())?;
            }
        }
    }

    if !report.is_success() {
        let failed = report.failures().count();
        output.print_warning(format!(
            "{} of {} issue(s) did not reach '{}'",
            failed,
            report.results.len(),
            report.target
        ))?;
    }
    Ok(())
}
