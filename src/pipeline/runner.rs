// src/pipeline/runner.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::PipelineDef;
use crate::errors::{CiError, Result};
use crate::exec::CommandExecutor;
use crate::fs::FileSystem;
use crate::history::{HistoryStore, RunError, RunLog, Stopwatch};
use crate::types::TaskFailurePolicy;
use crate::vcs::{CommitId, VersionControl};

use super::RunContext;
use super::artifacts::ArtifactExporter;
use super::stage::run_stage;

/// Runs one pipeline end to end and records the result.
///
/// Each step finishes before the next starts:
///
/// 1. wipe and recreate `<workdir>/pipelines/<identity>`
/// 2. clone into `src/`
/// 3. check out the declared branch
/// 4. record the head commit
/// 5. run the stages in order
/// 6. export artifacts (only if every task succeeded)
/// 7. append the finished `RunLog` to the history
///
/// Failures in steps 1–4 are returned as errors and leave no history entry.
pub struct PipelineRunner {
    vcs: Arc<dyn VersionControl>,
    executor: Arc<dyn CommandExecutor>,
    fs: Arc<dyn FileSystem>,
    history: HistoryStore,
    exporter: ArtifactExporter,
    workdir: PathBuf,
    on_task_failure: TaskFailurePolicy,
}

impl PipelineRunner {
    pub fn new(
        vcs: Arc<dyn VersionControl>,
        executor: Arc<dyn CommandExecutor>,
        fs: Arc<dyn FileSystem>,
        history: HistoryStore,
        workdir: impl Into<PathBuf>,
        on_task_failure: TaskFailurePolicy,
    ) -> Self {
        Self {
            vcs,
            executor,
            exporter: ArtifactExporter::new(fs.clone()),
            fs,
            history,
            workdir: workdir.into(),
            on_task_failure,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Run `pipeline` and persist its `RunLog`.
    pub async fn run(&self, pipeline: &PipelineDef) -> Result<RunLog> {
        self.run_observed(pipeline, None).await
    }

    /// Like [`run`](Self::run), given the commit the change detector saw.
    ///
    /// The recorded `commitHash` is always the commit actually checked out by
    /// this run; if it differs from `observed` (a push landed in between) the
    /// difference is logged.
    pub async fn run_observed(
        &self,
        pipeline: &PipelineDef,
        observed: Option<&CommitId>,
    ) -> Result<RunLog> {
        let mut ctx = RunContext::new(&self.workdir, pipeline, self.on_task_failure);
        info!(pipeline = %ctx.identity, name = %pipeline.name, "PIPELINE");
        let watch = Stopwatch::start();

        self.reset_pipeline_dir(&ctx)?;
        let commit_hash = self.prepare_working_copy(&ctx, pipeline).await?;

        if let Some(observed) = observed {
            if *observed != commit_hash {
                info!(
                    pipeline = %ctx.identity,
                    observed = %observed,
                    building = %commit_hash,
                    "branch moved since change detection; building the newer commit"
                );
            }
        }

        let mut stages = Vec::with_capacity(pipeline.stages.len());
        for stage in &pipeline.stages {
            stages.push(run_stage(&mut ctx, self.executor.as_ref(), stage).await?);
        }

        let error = self.export_artifacts(&ctx, pipeline);

        let timing = watch.stop();
        info!(
            pipeline = %ctx.identity,
            elapsed_ms = timing.elapsed_ms,
            failed_tasks = ctx.failed_tasks,
            "END PIPELINE"
        );

        let log = RunLog {
            timing,
            commit_hash,
            stages,
            error,
        };
        self.history.append(&ctx.identity, log.clone())?;
        Ok(log)
    }

    /// Remove any previous working directory so nothing leaks across runs.
    fn reset_pipeline_dir(&self, ctx: &RunContext) -> Result<()> {
        if self.fs.exists(&ctx.pipeline_dir) {
            self.fs.remove_dir_all(&ctx.pipeline_dir)?;
        }
        self.fs.create_dir_all(&ctx.pipeline_dir)?;
        Ok(())
    }

    /// Clone, check out the branch and read the head commit.
    async fn prepare_working_copy(
        &self,
        ctx: &RunContext,
        pipeline: &PipelineDef,
    ) -> Result<CommitId> {
        if let Err(err) = self.vcs.clone_repo(&pipeline.src, &ctx.src_dir).await {
            error!(pipeline = %ctx.identity, url = %pipeline.src, error = %err, "git clone failed");
            return Err(CiError::Clone {
                pipeline: ctx.identity.clone(),
                url: pipeline.src.clone(),
                message: err.to_string(),
            });
        }

        let branch = pipeline.branch();
        self.vcs
            .checkout(&ctx.src_dir, branch)
            .await
            .map_err(|err| CiError::Checkout {
                pipeline: ctx.identity.clone(),
                reference: branch.to_string(),
                message: err.to_string(),
            })?;

        let commit = self
            .vcs
            .head_commit(&ctx.src_dir)
            .await
            .map_err(|err| CiError::HeadCommit {
                pipeline: ctx.identity.clone(),
                message: err.to_string(),
            })?;

        info!(pipeline = %ctx.identity, branch, commit = %commit, "checked out");
        Ok(commit)
    }

    /// Returns an error marker for the run log if the export itself failed.
    fn export_artifacts(&self, ctx: &RunContext, pipeline: &PipelineDef) -> Option<RunError> {
        if !pipeline.has_artifacts() {
            return None;
        }
        if ctx.failed_tasks > 0 {
            warn!(
                pipeline = %ctx.identity,
                failed_tasks = ctx.failed_tasks,
                "skipping artifact export because tasks failed"
            );
            return None;
        }

        match self.exporter.export(pipeline, &ctx.pipeline_dir) {
            Ok(_) => None,
            Err(err) => {
                error!(pipeline = %ctx.identity, error = %err, "artifact export failed");
                Some(RunError {
                    message: format!("artifact export failed: {err}"),
                })
            }
        }
    }
}
