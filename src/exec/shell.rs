// src/exec/shell.rs

//! Shell-backed command executor.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::Result;

use super::{BoxFuture, CommandExecutor, CommandOutput};

/// Runs command lines through the platform shell and captures their output.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

/// Build a shell command appropriate for the platform.
fn shell_command(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command_line);
        c
    }
}

impl CommandExecutor for ShellExecutor {
    fn run<'a>(
        &'a self,
        command_line: &'a str,
        cwd: &'a Path,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<CommandOutput>> {
        Box::pin(async move {
            let mut cmd = shell_command(command_line);
            cmd.current_dir(cwd)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let child = cmd
                .spawn()
                .with_context(|| format!("spawning process for '{}'", command_line))?;

            let output = match timeout {
                Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                    Ok(res) => res,
                    Err(_) => {
                        // Dropping the future drops the child; kill_on_drop reaps it.
                        warn!(cmd = %command_line, ?limit, "command timed out; killed");
                        return Ok(CommandOutput {
                            timed_out: true,
                            ..CommandOutput::default()
                        });
                    }
                },
                None => child.wait_with_output().await,
            }
            .with_context(|| format!("waiting for process of '{}'", command_line))?;

            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

            for line in stdout.lines() {
                debug!(cmd = %command_line, "stdout: {}", line);
            }
            for line in stderr.lines() {
                debug!(cmd = %command_line, "stderr: {}", line);
            }

            Ok(CommandOutput {
                exit_code: output.status.code(),
                stdout,
                stderr,
                timed_out: false,
            })
        })
    }
}
