use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// What happens when a task exits non-zero.
///
/// - `Continue`: mark the task `failed` and keep running the remaining
///   tasks, jobs and stages. The run is still recorded (default).
/// - `Abort`: stop the pipeline at the first failing task; the in-progress
///   run is discarded and the runner exits with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFailurePolicy {
    Continue,
    Abort,
}

impl Default for TaskFailurePolicy {
    fn default() -> Self {
        TaskFailurePolicy::Continue
    }
}

impl FromStr for TaskFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(TaskFailurePolicy::Continue),
            "abort" => Ok(TaskFailurePolicy::Abort),
            other => Err(format!(
                "invalid on_task_failure: {other} (expected \"continue\" or \"abort\")"
            )),
        }
    }
}

/// What the poll loop does when cloning (or checking out) a pipeline fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneFailurePolicy {
    /// Stop the runner with a non-zero exit code.
    Abort,
    /// Log the failure and move on to the next pipeline.
    Skip,
}

impl Default for CloneFailurePolicy {
    fn default() -> Self {
        CloneFailurePolicy::Abort
    }
}

impl FromStr for CloneFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(CloneFailurePolicy::Abort),
            "skip" => Ok(CloneFailurePolicy::Skip),
            other => Err(format!(
                "invalid on_clone_failure: {other} (expected \"abort\" or \"skip\")"
            )),
        }
    }
}

/// Parse a duration string such as `"500ms"`, `"30s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
