// src/pipeline/job.rs

use tracing::info;

use crate::config::JobDef;
use crate::errors::Result;
use crate::exec::CommandExecutor;
use crate::history::{JobLog, Stopwatch};

use super::RunContext;
use super::task::run_task;

/// Run the tasks of a job in order.
pub async fn run_job(
    ctx: &mut RunContext,
    executor: &dyn CommandExecutor,
    job: &JobDef,
) -> Result<JobLog> {
    info!(pipeline = %ctx.identity, job = %job.name, "JOB");
    let watch = Stopwatch::start();

    let mut tasks = Vec::with_capacity(job.tasks.len());
    for task in &job.tasks {
        tasks.push(run_task(ctx, executor, task).await?);
    }

    let timing = watch.stop();
    info!(pipeline = %ctx.identity, job = %job.name, elapsed_ms = timing.elapsed_ms, "END JOB");

    Ok(JobLog {
        name: job.name.clone(),
        timing,
        tasks,
    })
}
