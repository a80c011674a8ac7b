// src/engine/mod.rs

//! Top-level driver.
//!
//! The [`PollLoop`] asks the config source for the current pipelines, runs
//! the change detector over each, runs the ones that changed, then sleeps.
//! It is also where failure *policy* lives: components return typed errors
//! and the loop decides whether they end the process or just the pipeline.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::RunnerSection;
use crate::types::{CloneFailurePolicy, TaskFailurePolicy};

pub mod poll;

pub use poll::PollLoop;

/// Immutable runner settings, resolved once at startup from `[runner]` and
/// CLI overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerSettings {
    pub workdir: PathBuf,
    pub poll_interval: Duration,
    pub on_task_failure: TaskFailurePolicy,
    pub on_clone_failure: CloneFailurePolicy,
    /// Run a single cycle and return instead of polling forever.
    pub once: bool,
}

impl RunnerSettings {
    pub fn from_section(runner: &RunnerSection) -> Self {
        Self {
            workdir: runner.workdir.clone(),
            poll_interval: runner.poll_interval(),
            on_task_failure: runner.on_task_failure,
            on_clone_failure: runner.on_clone_failure,
            once: false,
        }
    }
}

/// What happened during one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Pipelines that ran and had their run recorded.
    pub ran: usize,
    /// Pipelines without new commits.
    pub unchanged: usize,
    /// Pipelines skipped because detection or cloning failed.
    pub failed: usize,
    /// True when the cycle was abandoned before looking at any pipeline.
    pub abandoned: bool,
}
