// src/pipeline/task.rs

use tracing::{error, info, warn};

use crate::config::TaskDef;
use crate::errors::{CiError, Result};
use crate::exec::CommandExecutor;
use crate::history::{Stopwatch, TaskLog, TaskStatus};
use crate::types::TaskFailurePolicy;

use super::RunContext;

/// Run a single task in the working copy and return its log.
///
/// Exit code zero is `success`; a non-zero exit, a timeout, or a command that
/// could not be started is `failed`. Under `TaskFailurePolicy::Abort` a failed
/// task is returned as `CiError::TaskFailed` instead of a log.
pub async fn run_task(
    ctx: &mut RunContext,
    executor: &dyn CommandExecutor,
    task: &TaskDef,
) -> Result<TaskLog> {
    info!(pipeline = %ctx.identity, cmd = %task.cmd, "TASK");
    let watch = Stopwatch::start();

    let exit_code = match executor.run(&task.cmd, &ctx.src_dir, task.timeout()).await {
        Ok(output) if output.timed_out => {
            warn!(pipeline = %ctx.identity, cmd = %task.cmd, "task timed out");
            None
        }
        Ok(output) => output.exit_code,
        Err(err) => {
            error!(
                pipeline = %ctx.identity,
                cmd = %task.cmd,
                error = %err,
                "task could not be executed"
            );
            None
        }
    };

    let status = if exit_code == Some(0) {
        TaskStatus::Success
    } else {
        TaskStatus::Failed
    };
    let timing = watch.stop();

    if status == TaskStatus::Failed {
        ctx.failed_tasks += 1;
        error!(
            pipeline = %ctx.identity,
            cmd = %task.cmd,
            exit_code = ?exit_code,
            "executing the command failed"
        );
        if ctx.on_task_failure == TaskFailurePolicy::Abort {
            return Err(CiError::TaskFailed {
                pipeline: ctx.identity.clone(),
                cmd: task.cmd.clone(),
                exit_code,
            });
        }
    }

    info!(
        pipeline = %ctx.identity,
        cmd = %task.cmd,
        elapsed_ms = timing.elapsed_ms,
        status = ?status,
        "END TASK"
    );

    Ok(TaskLog {
        cmd: task.cmd.clone(),
        timing,
        status,
        exit_code,
    })
}
