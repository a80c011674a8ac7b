// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod history;
pub mod logging;
pub mod pipeline;
pub mod types;
pub mod vcs;
pub mod watch;

use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, FileConfigSource, load_and_validate};
use crate::engine::{PollLoop, RunnerSettings};
use crate::errors::Result;
use crate::exec::ShellExecutor;
use crate::fs::{FileSystem, RealFileSystem};
use crate::history::HistoryStore;
use crate::pipeline::PipelineRunner;
use crate::vcs::{GitClient, VersionControl};
use crate::watch::ChangeDetector;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the git availability check
/// - history store, change detector and pipeline runner
/// - the poll loop
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let settings = resolve_settings(&cfg, &args);
    debug!(?settings, "resolved runner settings");

    let vcs: Arc<dyn VersionControl> = Arc::new(GitClient::new());
    vcs.check_available().await?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    fs.create_dir_all(&settings.workdir)?;

    let history = HistoryStore::in_workdir(fs.clone(), &settings.workdir);
    info!(history = ?history.path(), workdir = ?settings.workdir, "tinyci starting");

    let detector = ChangeDetector::new(vcs.clone(), fs.clone(), settings.workdir.clone());
    let runner = PipelineRunner::new(
        vcs,
        Arc::new(ShellExecutor::new()),
        fs,
        history,
        settings.workdir.clone(),
        settings.on_task_failure,
    );

    let source = FileConfigSource::new(&args.config);
    PollLoop::new(source, detector, runner, settings).run().await
}

/// Combine `[runner]` with CLI overrides.
///
/// Runner settings are fixed for the lifetime of the process; only the
/// pipeline list is re-read every cycle.
pub fn resolve_settings(cfg: &ConfigFile, args: &CliArgs) -> RunnerSettings {
    let mut settings = RunnerSettings::from_section(cfg.runner());
    if let Some(workdir) = &args.workdir {
        settings.workdir = workdir.clone();
    }
    if let Some(interval) = args.interval {
        settings.poll_interval = interval;
    }
    if let Some(policy) = args.on_task_failure {
        settings.on_task_failure = policy.into();
    }
    settings.once = args.once;
    settings
}

/// Simple dry-run output: print pipelines, stages, jobs and commands.
fn print_dry_run(cfg: &ConfigFile) {
    let runner = cfg.runner();
    println!("tinyci dry-run");
    println!("  runner.workdir = {}", runner.workdir.display());
    println!("  runner.poll_interval = {}", runner.poll_interval);
    println!("  runner.on_task_failure = {:?}", runner.on_task_failure);
    println!("  runner.on_clone_failure = {:?}", runner.on_clone_failure);
    println!();

    println!("pipelines ({}):", cfg.pipelines().len());
    for pipeline in cfg.pipelines() {
        println!("  - {} [{}]", pipeline.name, pipeline.identity());
        println!("      src: {} (branch {})", pipeline.src, pipeline.branch());
        for stage in &pipeline.stages {
            println!("      stage: {}", stage.name);
            for job in &stage.jobs {
                println!("        job: {}", job.name);
                for task in &job.tasks {
                    match &task.timeout {
                        Some(t) => println!("          task: {} (timeout {t})", task.cmd),
                        None => println!("          task: {}", task.cmd),
                    }
                }
            }
        }
        for artifact in &pipeline.artifacts {
            println!("      artifact: {} -> {}", artifact.src, artifact.dst);
        }
    }

    debug!("dry-run complete (no execution)");
}
