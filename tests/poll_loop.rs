// tests/poll_loop.rs

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tinyci::config::{ConfigFile, ConfigSource};
use tinyci::engine::{CycleSummary, PollLoop, RunnerSettings};
use tinyci::errors::{CiError, Result as CiResult};
use tinyci::exec::{CommandExecutor, ShellExecutor};
use tinyci::fs::mock::MockFileSystem;
use tinyci::fs::{FileSystem, RealFileSystem};
use tinyci::history::{HistoryStore, TaskStatus};
use tinyci::pipeline::PipelineRunner;
use tinyci::types::{CloneFailurePolicy, TaskFailurePolicy};
use tinyci::watch::ChangeDetector;
use tinyci_test_utils::builders::{ConfigFileBuilder, PipelineBuilder, job};
use tinyci_test_utils::fake_executor::FakeExecutor;
use tinyci_test_utils::fake_vcs::FakeVcs;
use tinyci_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn settings(
    workdir: &Path,
    task: TaskFailurePolicy,
    clone: CloneFailurePolicy,
    once: bool,
) -> RunnerSettings {
    RunnerSettings {
        workdir: workdir.to_path_buf(),
        poll_interval: Duration::from_millis(10),
        on_task_failure: task,
        on_clone_failure: clone,
        once,
    }
}

fn poll_loop<S: ConfigSource>(
    source: S,
    fs: Arc<dyn FileSystem>,
    vcs: &FakeVcs,
    executor: Arc<dyn CommandExecutor>,
    settings: RunnerSettings,
) -> PollLoop<S> {
    let history = HistoryStore::in_workdir(fs.clone(), &settings.workdir);
    let detector =
        ChangeDetector::new(Arc::new(vcs.clone()), fs.clone(), settings.workdir.clone());
    let runner = PipelineRunner::new(
        Arc::new(vcs.clone()),
        executor,
        fs,
        history,
        settings.workdir.clone(),
        settings.on_task_failure,
    );
    PollLoop::new(source, detector, runner, settings)
}

/// Config source whose file can no longer be read.
struct BrokenSource;

impl ConfigSource for BrokenSource {
    fn load(&self) -> CiResult<ConfigFile> {
        Err(CiError::ConfigError("config file vanished".to_string()))
    }
}

#[cfg(unix)]
#[tokio::test]
async fn echo_pipeline_runs_once_per_commit() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let workdir = tmp.path().to_path_buf();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let vcs = FakeVcs::new(fs.clone());
    vcs.set_head("main", "aaa111");

    let cfg = ConfigFileBuilder::new()
        .workdir(&workdir)
        .with_pipeline(
            PipelineBuilder::new("P")
                .stage("S", vec![job("J", &["echo hello > out.txt"])])
                .build(),
        )
        .build();
    let ci = poll_loop(
        cfg,
        fs.clone(),
        &vcs,
        Arc::new(ShellExecutor::new()),
        settings(&workdir, TaskFailurePolicy::Continue, CloneFailurePolicy::Abort, true),
    );
    let history = HistoryStore::in_workdir(fs.clone(), &workdir);

    let first = ci.run_cycle().await?;
    assert_eq!(
        first,
        CycleSummary {
            ran: 1,
            ..CycleSummary::default()
        }
    );
    let runs = history.load()?.runs("P").to_vec();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].commit_hash.as_str(), "aaa111");
    let task = runs[0].tasks().next().unwrap();
    assert_eq!(task.cmd, "echo hello > out.txt");
    assert_eq!(task.status, TaskStatus::Success);
    assert_eq!(task.exit_code, Some(0));
    assert_eq!(
        std::fs::read_to_string(workdir.join("pipelines/P/src/out.txt"))?.trim(),
        "hello"
    );
    assert!(workdir.join("history.json").is_file());

    let second = ci.run_cycle().await?;
    assert_eq!(second.ran, 0);
    assert_eq!(second.unchanged, 1);
    assert_eq!(history.load()?.runs("P").len(), 1);

    vcs.set_head("main", "bbb222");
    let third = ci.run_cycle().await?;
    assert_eq!(third.ran, 1);
    let runs = history.load()?.runs("P").to_vec();
    let hashes: Vec<_> = runs.iter().map(|r| r.commit_hash.as_str()).collect();
    assert_eq!(hashes, vec!["aaa111", "bbb222"]);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn failing_shell_task_is_recorded_under_continue() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let workdir = tmp.path().to_path_buf();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let vcs = FakeVcs::new(fs.clone());
    vcs.set_head("main", "aaa111");

    let cfg = ConfigFileBuilder::new()
        .with_pipeline(
            PipelineBuilder::new("P")
                .stage("S", vec![job("J", &["exit 1", "echo still-running"])])
                .build(),
        )
        .build();
    let ci = poll_loop(
        cfg,
        fs.clone(),
        &vcs,
        Arc::new(ShellExecutor::new()),
        settings(&workdir, TaskFailurePolicy::Continue, CloneFailurePolicy::Abort, true),
    );

    assert_eq!(ci.run_cycle().await?.ran, 1);

    let history = HistoryStore::in_workdir(fs, &workdir).load()?;
    let run = history.last_run("P").unwrap();
    let statuses: Vec<_> = run.tasks().map(|t| (t.status, t.exit_code)).collect();
    assert_eq!(
        statuses,
        vec![(TaskStatus::Failed, Some(1)), (TaskStatus::Success, Some(0))]
    );
    Ok(())
}

#[tokio::test]
async fn abort_policy_ends_the_loop_without_recording() -> TestResult {
    init_tracing();
    let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
    let vcs = FakeVcs::new(fs.clone());
    vcs.set_head("main", "c1");
    let exec = FakeExecutor::new();
    exec.exit_code("exit 1", 1);

    let cfg = ConfigFileBuilder::new()
        .with_pipeline(
            PipelineBuilder::new("P")
                .stage("S", vec![job("J", &["exit 1", "echo never"])])
                .build(),
        )
        .build();
    let workdir = PathBuf::from("work");
    let ci = poll_loop(
        cfg,
        fs.clone(),
        &vcs,
        Arc::new(exec.clone()),
        settings(&workdir, TaskFailurePolicy::Abort, CloneFailurePolicy::Abort, false),
    );

    let err = ci.run_cycle().await.unwrap_err();

    assert!(matches!(err, CiError::TaskFailed { .. }));
    assert_eq!(exec.commands(), vec!["exit 1"]);
    assert!(!HistoryStore::in_workdir(fs, &workdir).load()?.contains("P"));
    Ok(())
}

fn two_pipelines(broken_url: &str) -> ConfigFile {
    ConfigFileBuilder::new()
        .with_pipeline(
            PipelineBuilder::new("broken")
                .src(broken_url)
                .stage("S", vec![job("J", &["make"])])
                .build(),
        )
        .with_pipeline(
            PipelineBuilder::new("healthy")
                .stage("S", vec![job("J", &["make"])])
                .build(),
        )
        .build()
}

#[tokio::test]
async fn clone_failure_aborts_by_default() -> TestResult {
    init_tracing();
    let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
    let vcs = FakeVcs::new(fs.clone());
    vcs.set_head("main", "c1");
    vcs.fail_clone_of("https://example.invalid/missing.git");
    let workdir = PathBuf::from("work");

    let ci = poll_loop(
        two_pipelines("https://example.invalid/missing.git"),
        fs.clone(),
        &vcs,
        Arc::new(FakeExecutor::new()),
        settings(&workdir, TaskFailurePolicy::Continue, CloneFailurePolicy::Abort, false),
    );

    let err = ci.run_cycle().await.unwrap_err();

    assert!(matches!(err, CiError::Clone { .. }));
    assert_eq!(vcs.clones(), 1);
    let history = HistoryStore::in_workdir(fs, &workdir).load()?;
    assert!(!history.contains("broken"));
    assert!(!history.contains("healthy"));
    Ok(())
}

#[tokio::test]
async fn clone_failure_skip_moves_on_to_next_pipeline() -> TestResult {
    init_tracing();
    let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
    let vcs = FakeVcs::new(fs.clone());
    vcs.set_head("main", "c1");
    vcs.fail_clone_of("https://example.invalid/missing.git");
    let workdir = PathBuf::from("work");

    let ci = poll_loop(
        two_pipelines("https://example.invalid/missing.git"),
        fs.clone(),
        &vcs,
        Arc::new(FakeExecutor::new()),
        settings(&workdir, TaskFailurePolicy::Continue, CloneFailurePolicy::Skip, false),
    );

    let summary = ci.run_cycle().await?;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.ran, 1);
    let history = HistoryStore::in_workdir(fs, &workdir).load()?;
    assert!(!history.contains("broken"));
    assert_eq!(history.runs("healthy").len(), 1);
    Ok(())
}

#[tokio::test]
async fn detection_error_skips_only_that_pipeline() -> TestResult {
    init_tracing();
    let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
    let vcs = FakeVcs::new(fs.clone());
    vcs.set_head("main", "c1");
    let workdir = PathBuf::from("work");
    let cycle_settings =
        settings(&workdir, TaskFailurePolicy::Continue, CloneFailurePolicy::Abort, false);

    let original = ConfigFileBuilder::new()
        .with_pipeline(PipelineBuilder::new("site").build())
        .build();
    let first = poll_loop(
        original,
        fs.clone(),
        &vcs,
        Arc::new(FakeExecutor::new()),
        cycle_settings.clone(),
    );
    assert_eq!(first.run_cycle().await?.ran, 1);

    // The config now points "site" at a branch the remote does not have.
    let edited = ConfigFileBuilder::new()
        .with_pipeline(PipelineBuilder::new("site").branch("gone").build())
        .with_pipeline(PipelineBuilder::new("api").build())
        .build();
    let second = poll_loop(
        edited,
        fs.clone(),
        &vcs,
        Arc::new(FakeExecutor::new()),
        cycle_settings,
    );
    let summary = second.run_cycle().await?;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.ran, 1);
    let history = HistoryStore::in_workdir(fs, &workdir).load()?;
    assert_eq!(history.runs("site").len(), 1);
    assert_eq!(history.runs("api").len(), 1);
    Ok(())
}

#[tokio::test]
async fn unreadable_config_abandons_cycle_when_polling() -> TestResult {
    init_tracing();
    let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
    let vcs = FakeVcs::new(fs.clone());
    let workdir = PathBuf::from("work");

    let ci = poll_loop(
        BrokenSource,
        fs,
        &vcs,
        Arc::new(FakeExecutor::new()),
        settings(&workdir, TaskFailurePolicy::Continue, CloneFailurePolicy::Abort, false),
    );

    let summary = ci.run_cycle().await?;

    assert!(summary.abandoned);
    assert_eq!(summary.ran + summary.unchanged + summary.failed, 0);
    assert!(vcs.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn unreadable_config_is_an_error_in_once_mode() {
    init_tracing();
    let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
    let vcs = FakeVcs::new(fs.clone());
    let workdir = PathBuf::from("work");

    let ci = poll_loop(
        BrokenSource,
        fs,
        &vcs,
        Arc::new(FakeExecutor::new()),
        settings(&workdir, TaskFailurePolicy::Continue, CloneFailurePolicy::Abort, true),
    );

    let result = ci.run().await;

    assert!(matches!(result, Err(CiError::ConfigError(_))));
}

#[tokio::test]
async fn once_mode_returns_after_a_single_cycle() -> TestResult {
    init_tracing();
    let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
    let vcs = FakeVcs::new(fs.clone());
    vcs.set_head("main", "c1");
    let workdir = PathBuf::from("work");
    let cfg = ConfigFileBuilder::new()
        .with_pipeline(PipelineBuilder::new("site").build())
        .build();

    poll_loop(
        cfg,
        fs.clone(),
        &vcs,
        Arc::new(FakeExecutor::new()),
        settings(&workdir, TaskFailurePolicy::Continue, CloneFailurePolicy::Abort, true),
    )
    .run()
    .await?;

    assert_eq!(vcs.clones(), 1);
    assert_eq!(HistoryStore::in_workdir(fs, &workdir).load()?.runs("site").len(), 1);
    Ok(())
}
