// src/pipeline/stage.rs

use tracing::info;

use crate::config::StageDef;
use crate::errors::Result;
use crate::exec::CommandExecutor;
use crate::history::{StageLog, Stopwatch};

use super::RunContext;
use super::job::run_job;

/// Run the jobs of a stage in order.
pub async fn run_stage(
    ctx: &mut RunContext,
    executor: &dyn CommandExecutor,
    stage: &StageDef,
) -> Result<StageLog> {
    info!(pipeline = %ctx.identity, stage = %stage.name, "STAGE");
    let watch = Stopwatch::start();

    let mut jobs = Vec::with_capacity(stage.jobs.len());
    for job in &stage.jobs {
        jobs.push(run_job(ctx, executor, job).await?);
    }

    let timing = watch.stop();
    info!(
        pipeline = %ctx.identity,
        stage = %stage.name,
        elapsed_ms = timing.elapsed_ms,
        "END STAGE"
    );

    Ok(StageLog {
        name: stage.name.clone(),
        timing,
        jobs,
    })
}
