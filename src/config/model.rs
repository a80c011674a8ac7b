// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::types::{CloneFailurePolicy, TaskFailurePolicy, parse_duration};

/// Configuration exactly as deserialized from disk, before validation.
///
/// ```toml
/// [runner]
/// workdir = "/var/lib/tinyci"
/// poll_interval = "60s"
/// on_task_failure = "continue"
///
/// [[pipelines]]
/// name = "Website"
/// package = "website"
/// src = "https://example.com/website.git"
/// vc = { branch = "main" }
///
/// [[pipelines.stages]]
/// name = "build"
///
/// [[pipelines.stages.jobs]]
/// name = "compile"
/// tasks = [{ cmd = "make" }, { cmd = "make test", timeout = "5m" }]
///
/// [[pipelines.artifacts]]
/// src = "dist/*.tar.gz"
/// dst = "release"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global runner behaviour from `[runner]`.
    #[serde(default)]
    pub runner: RunnerSection,

    /// Pipelines in declaration order.
    #[serde(default)]
    pub pipelines: Vec<PipelineDef>,
}

/// A validated pipeline set.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)` (see
/// `validate.rs`), so holders can rely on unique, path-safe identities and
/// well-formed durations.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    runner: RunnerSection,
    pipelines: Vec<PipelineDef>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(runner: RunnerSection, pipelines: Vec<PipelineDef>) -> Self {
        Self { runner, pipelines }
    }

    pub fn runner(&self) -> &RunnerSection {
        &self.runner
    }

    pub fn pipelines(&self) -> &[PipelineDef] {
        &self.pipelines
    }

    pub fn pipeline(&self, identity: &str) -> Option<&PipelineDef> {
        self.pipelines.iter().find(|p| p.identity() == identity)
    }
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// Base directory holding `pipelines/` and `history.json`.
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,

    /// Sleep between poll cycles, e.g. `"60s"`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    #[serde(default)]
    pub on_task_failure: TaskFailurePolicy,

    #[serde(default)]
    pub on_clone_failure: CloneFailurePolicy,
}

fn default_workdir() -> PathBuf {
    PathBuf::from(".")
}

fn default_poll_interval() -> String {
    "60s".to_string()
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            poll_interval: default_poll_interval(),
            on_task_failure: TaskFailurePolicy::default(),
            on_clone_failure: CloneFailurePolicy::default(),
        }
    }
}

impl RunnerSection {
    /// Parsed `poll_interval`. Validation guarantees this parses.
    pub fn poll_interval(&self) -> Duration {
        parse_duration(&self.poll_interval).unwrap_or(Duration::from_secs(60))
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

/// One `[[pipelines]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineDef {
    /// Display name.
    pub name: String,

    /// Identity, either `domain` or `package` (exactly one of them).
    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub package: Option<String>,

    /// Source repository URL.
    pub src: String,

    pub vc: VcSection,

    #[serde(default)]
    pub stages: Vec<StageDef>,

    #[serde(default)]
    pub artifacts: Vec<ArtifactDef>,
}

impl PipelineDef {
    /// Unique key used for the working directory and the history entry.
    pub fn identity(&self) -> &str {
        self.package
            .as_deref()
            .or(self.domain.as_deref())
            .unwrap_or_default()
    }

    pub fn branch(&self) -> &str {
        &self.vc.branch
    }

    pub fn has_artifacts(&self) -> bool {
        !self.artifacts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VcSection {
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StageDef {
    pub name: String,
    #[serde(default)]
    pub jobs: Vec<JobDef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobDef {
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<TaskDef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskDef {
    /// Shell command line.
    pub cmd: String,

    /// Optional upper bound on the command's run time, e.g. `"10m"`.
    /// No timeout when absent.
    #[serde(default)]
    pub timeout: Option<String>,
}

impl TaskDef {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            timeout: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
            .as_deref()
            .and_then(|s| parse_duration(s).ok())
    }
}

/// `[[pipelines.artifacts]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArtifactDef {
    /// Glob relative to the working copy, e.g. `"dist/*.bin"`.
    pub src: String,
    /// Directory relative to the pipeline's `artifacts/` directory.
    pub dst: String,
}
