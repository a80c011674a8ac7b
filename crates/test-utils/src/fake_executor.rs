use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tinyci::errors::{CiError, Result};
use tinyci::exec::{BoxFuture, CommandExecutor, CommandOutput};
use tinyci::fs::FileSystem;

#[derive(Default)]
struct State {
    exit_codes: HashMap<String, i32>,
    spawn_errors: HashSet<String>,
    outputs: HashMap<String, Vec<(String, Vec<u8>)>>,
    calls: Vec<(String, PathBuf)>,
}

/// A fake executor that:
/// - records which command lines were "run" and in which directory
/// - exits 0 unless told otherwise for a given command line
/// - can write files into the working directory to simulate build outputs
#[derive(Clone, Default)]
pub struct FakeExecutor {
    fs: Option<Arc<dyn FileSystem>>,
    state: Arc<Mutex<State>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Needed for `writes_file`.
    pub fn with_fs(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs: Some(fs),
            state: Arc::default(),
        }
    }

    pub fn exit_code(&self, cmd: &str, code: i32) -> &Self {
        self.state.lock().unwrap().exit_codes.insert(cmd.to_string(), code);
        self
    }

    /// Make `cmd` fail to start at all.
    pub fn spawn_error(&self, cmd: &str) -> &Self {
        self.state.lock().unwrap().spawn_errors.insert(cmd.to_string());
        self
    }

    /// When `cmd` runs, write `rel_path` (relative to its cwd).
    pub fn writes_file(&self, cmd: &str, rel_path: &str, contents: &[u8]) -> &Self {
        self.state
            .lock()
            .unwrap()
            .outputs
            .entry(cmd.to_string())
            .or_default()
            .push((rel_path.to_string(), contents.to_vec()));
        self
    }

    /// Command lines in execution order.
    pub fn commands(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(cmd, _)| cmd.clone())
            .collect()
    }

    /// Working directories in execution order.
    pub fn dirs(&self) -> Vec<PathBuf> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(_, dir)| dir.clone())
            .collect()
    }
}

impl CommandExecutor for FakeExecutor {
    fn run<'a>(
        &'a self,
        command_line: &'a str,
        cwd: &'a Path,
        _timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<CommandOutput>> {
        Box::pin(async move {
            let (code, outputs) = {
                let mut guard = self.state.lock().unwrap();
                guard.calls.push((command_line.to_string(), cwd.to_path_buf()));
                if guard.spawn_errors.contains(command_line) {
                    return Err(CiError::Other(anyhow::anyhow!(
                        "spawning process for '{command_line}' failed"
                    )));
                }
                (
                    guard.exit_codes.get(command_line).copied().unwrap_or(0),
                    guard.outputs.get(command_line).cloned().unwrap_or_default(),
                )
            };

            if let Some(fs) = &self.fs {
                for (rel, contents) in outputs {
                    fs.write(&cwd.join(rel), &contents)?;
                }
            }

            Ok(CommandOutput {
                exit_code: Some(code),
                stdout: String::new(),
                stderr: String::new(),
                timed_out: false,
            })
        })
    }
}
