// src/history/mod.rs

//! Run history: the typed log records produced by a pipeline run and the
//! persisted, append-only history they end up in.
//!
//! Records are built bottom-up: a `TaskLog` is returned by the task runner,
//! collected into a `JobLog`, and so on up to the `RunLog`. Nothing mutates a
//! record after its runner has returned it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vcs::CommitId;

pub mod store;

pub use store::{HISTORY_FILE_NAME, HistoryStore};

/// Start/end timestamps of a unit of work plus the elapsed milliseconds
/// between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Measures a [`Timing`].
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: DateTime<Utc>,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self { start: Utc::now() }
    }

    /// Stop the clock. The end time never precedes the start time, even if
    /// the wall clock stepped backwards while the work ran.
    pub fn stop(self) -> Timing {
        let end = Utc::now().max(self.start);
        let elapsed_ms = (end - self.start).num_milliseconds().max(0) as u64;
        Timing {
            start_time: self.start,
            end_time: end,
            elapsed_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLog {
    pub cmd: String,
    #[serde(flatten)]
    pub timing: Timing,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobLog {
    pub name: String,
    #[serde(flatten)]
    pub timing: Timing,
    pub tasks: Vec<TaskLog>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageLog {
    pub name: String,
    #[serde(flatten)]
    pub timing: Timing,
    pub jobs: Vec<JobLog>,
}

/// Marker for a run that completed but hit a non-task problem (e.g. an
/// artifact copy failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub message: String,
}

/// One full execution of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLog {
    #[serde(flatten)]
    pub timing: Timing,
    pub commit_hash: CommitId,
    pub stages: Vec<StageLog>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
}

impl RunLog {
    /// All task logs of the run in execution order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskLog> {
        self.stages
            .iter()
            .flat_map(|s| s.jobs.iter())
            .flat_map(|j| j.tasks.iter())
    }

    pub fn failed_tasks(&self) -> usize {
        self.tasks()
            .filter(|t| t.status == TaskStatus::Failed)
            .count()
    }

    /// True when every task succeeded and no error marker was recorded.
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.failed_tasks() == 0
    }
}

/// Pipeline identity → runs in chronological (insertion) order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunHistory(BTreeMap<String, Vec<RunLog>>);

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self, identity: &str) -> &[RunLog] {
        self.0.get(identity).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn last_run(&self, identity: &str) -> Option<&RunLog> {
        self.runs(identity).last()
    }

    pub fn contains(&self, identity: &str) -> bool {
        !self.runs(identity).is_empty()
    }

    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Append-only: runs are never reordered or removed.
    pub fn push(&mut self, identity: &str, log: RunLog) {
        self.0.entry(identity.to_string()).or_default().push(log);
    }
}
