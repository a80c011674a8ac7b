// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;
use crate::types::TaskFailurePolicy;

/// Command-line arguments for `tinyci`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tinyci",
    version,
    about = "Poll git repositories and run build pipelines when they change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML, or JSON when it ends in `.json`).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Directory holding `pipelines/` and `history.json`.
    ///
    /// Overrides `[runner].workdir`.
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Time between poll cycles, e.g. `30s` or `5m`.
    ///
    /// Overrides `[runner].poll_interval`.
    #[arg(long, value_name = "DURATION", value_parser = crate::types::parse_duration)]
    pub interval: Option<std::time::Duration>,

    /// Run a single poll cycle and exit.
    #[arg(long)]
    pub once: bool,

    /// What to do when a task fails. Overrides `[runner].on_task_failure`.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub on_task_failure: Option<TaskFailureArg>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TINYCI_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate the config and print the pipelines without running
    /// anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum TaskFailureArg {
    Continue,
    Abort,
}

impl From<TaskFailureArg> for TaskFailurePolicy {
    fn from(arg: TaskFailureArg) -> Self {
        match arg {
            TaskFailureArg::Continue => TaskFailurePolicy::Continue,
            TaskFailureArg::Abort => TaskFailurePolicy::Abort,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
