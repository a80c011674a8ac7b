// src/exec/mod.rs

//! Process execution layer.
//!
//! Tasks run through a [`CommandExecutor`] rather than spawning processes
//! directly, so tests can swap in a scripted executor while production uses
//! [`ShellExecutor`] (`sh -c` / `cmd /C` via `tokio::process`).

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use crate::errors::Result;

pub mod shell;

pub use shell::ShellExecutor;

/// Boxed future returned by the collaborator traits (`CommandExecutor`,
/// `VersionControl`).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of running one command line to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal or timed out.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait abstracting how a task's command line is executed.
pub trait CommandExecutor: Send + Sync {
    /// Run `command_line` in `cwd` and wait for it to exit.
    ///
    /// `Err` means the command could not be started at all; a command that
    /// ran and failed is an `Ok` with a non-zero `exit_code`.
    fn run<'a>(
        &'a self,
        command_line: &'a str,
        cwd: &'a Path,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<CommandOutput>>;
}
