// src/history/store.rs

//! JSON-file backed run history.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::errors::{CiError, Result};
use crate::fs::FileSystem;

use super::{RunHistory, RunLog};

/// File name of the history inside the runner's work directory.
pub const HISTORY_FILE_NAME: &str = "history.json";

/// Persists [`RunHistory`] as a single JSON document.
///
/// Every `append` is a whole-file read-modify-write. The runner is the only
/// writer, so no locking is done.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    /// Store at `<workdir>/history.json`.
    pub fn in_workdir(fs: Arc<dyn FileSystem>, workdir: &Path) -> Self {
        Self::new(fs, workdir.join(HISTORY_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted history. A missing file is an empty history; a file
    /// that exists but cannot be parsed is an error, so it is never silently
    /// overwritten by the next `append`.
    pub fn load(&self) -> Result<RunHistory> {
        if !self.fs.exists(&self.path) {
            debug!(path = ?self.path, "no history file yet; starting empty");
            return Ok(RunHistory::new());
        }

        let contents = self.fs.read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(RunHistory::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            CiError::History(format!("malformed history file {:?}: {e}", self.path))
        })
    }

    /// Append `log` to the runs of `identity` and persist the whole history.
    pub fn append(&self, identity: &str, log: RunLog) -> Result<()> {
        let mut history = self.load()?;
        history.push(identity, log);

        let json = serde_json::to_string_pretty(&history)?;
        self.fs.write(&self.path, json.as_bytes())?;

        debug!(
            path = ?self.path,
            pipeline = identity,
            runs = history.runs(identity).len(),
            "history updated"
        );
        Ok(())
    }
}
