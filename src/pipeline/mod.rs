// src/pipeline/mod.rs

//! Pipeline execution hierarchy.
//!
//! - [`runner`]: `PipelineRunner`, which resets the working directory, clones,
//!   checks out, runs stages, exports artifacts and appends history.
//! - [`stage`], [`job`], [`task`]: the nested runners. Each one runs its
//!   children strictly in definition order and returns a finished log record.
//! - [`artifacts`]: `ArtifactExporter`.
//!
//! Layout on disk, relative to the runner's work directory:
//!
//! ```text
//! pipelines/<identity>/src                 fresh clone per run
//! pipelines/<identity>/artifacts/<dst>     exported files
//! ```

use std::path::{Path, PathBuf};

use crate::config::PipelineDef;
use crate::types::TaskFailurePolicy;

pub mod artifacts;
pub mod job;
pub mod runner;
pub mod stage;
pub mod task;

pub use artifacts::ArtifactExporter;
pub use job::run_job;
pub use runner::PipelineRunner;
pub use stage::run_stage;
pub use task::run_task;

pub const PIPELINES_DIR_NAME: &str = "pipelines";
pub const SRC_DIR_NAME: &str = "src";
pub const ARTIFACTS_DIR_NAME: &str = "artifacts";

/// `<workdir>/pipelines/<identity>`
pub fn pipeline_dir(workdir: &Path, identity: &str) -> PathBuf {
    workdir.join(PIPELINES_DIR_NAME).join(identity)
}

/// `<workdir>/pipelines/<identity>/src`
pub fn working_copy_dir(workdir: &Path, identity: &str) -> PathBuf {
    pipeline_dir(workdir, identity).join(SRC_DIR_NAME)
}

/// Per-run state handed down the stage/job/task hierarchy.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub identity: String,
    pub pipeline_dir: PathBuf,
    /// Working copy; every task runs here.
    pub src_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub on_task_failure: TaskFailurePolicy,
    /// Number of tasks that have failed so far in this run.
    pub failed_tasks: usize,
}

impl RunContext {
    pub fn new(workdir: &Path, pipeline: &PipelineDef, on_task_failure: TaskFailurePolicy) -> Self {
        let identity = pipeline.identity().to_string();
        let pipeline_dir = pipeline_dir(workdir, &identity);
        Self {
            src_dir: pipeline_dir.join(SRC_DIR_NAME),
            artifacts_dir: pipeline_dir.join(ARTIFACTS_DIR_NAME),
            pipeline_dir,
            identity,
            on_task_failure,
            failed_tasks: 0,
        }
    }
}
