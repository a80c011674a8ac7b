// tests/execution_properties.rs

use std::path::Path;
use std::sync::Arc;

use proptest::prelude::*;
use tinyci::config::{JobDef, PipelineDef, TaskDef};
use tinyci::fs::mock::MockFileSystem;
use tinyci::history::{HistoryStore, RunLog, TaskStatus, Timing};
use tinyci::pipeline::PipelineRunner;
use tinyci::types::TaskFailurePolicy;
use tinyci_test_utils::builders::PipelineBuilder;
use tinyci_test_utils::fake_executor::FakeExecutor;
use tinyci_test_utils::fake_vcs::FakeVcs;

/// stages → jobs → tasks, each task being the exit code it should produce.
type Shape = Vec<Vec<Vec<i32>>>;

fn shape_strategy() -> impl Strategy<Value = Shape> {
    let exit_code = prop_oneof![4 => Just(0), 1 => 1..=3i32];
    let job = prop::collection::vec(exit_code, 0..4);
    let stage = prop::collection::vec(job, 0..3);
    prop::collection::vec(stage, 0..4)
}

fn cmd(stage: usize, job: usize, task: usize) -> String {
    format!("step s{stage} j{job} t{task}")
}

fn build_pipeline(shape: &Shape, exec: &FakeExecutor) -> PipelineDef {
    let mut builder = PipelineBuilder::new("prop");
    for (s, jobs) in shape.iter().enumerate() {
        let jobs = jobs
            .iter()
            .enumerate()
            .map(|(j, tasks)| JobDef {
                name: format!("job-{j}"),
                tasks: tasks
                    .iter()
                    .enumerate()
                    .map(|(t, code)| {
                        let line = cmd(s, j, t);
                        exec.exit_code(&line, *code);
                        TaskDef::new(line)
                    })
                    .collect(),
            })
            .collect();
        builder = builder.stage(&format!("stage-{s}"), jobs);
    }
    builder.build()
}

fn run(shape: &Shape) -> (RunLog, Vec<String>) {
    let fs = Arc::new(MockFileSystem::new());
    let vcs = FakeVcs::new(fs.clone());
    vcs.set_head("main", "abc");
    let exec = FakeExecutor::new();
    let pipeline = build_pipeline(shape, &exec);
    let runner = PipelineRunner::new(
        Arc::new(vcs),
        Arc::new(exec.clone()),
        fs.clone(),
        HistoryStore::in_workdir(fs, Path::new("work")),
        "work",
        TaskFailurePolicy::Continue,
    );

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let log = rt.block_on(runner.run(&pipeline)).unwrap();
    (log, exec.commands())
}

fn contains(outer: &Timing, inner: &Timing) -> bool {
    outer.start_time <= inner.start_time && inner.end_time <= outer.end_time
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn log_structure_matches_definition(shape in shape_strategy()) {
        let (log, executed) = run(&shape);

        prop_assert_eq!(log.stages.len(), shape.len());
        for (s, (stage, jobs)) in log.stages.iter().zip(&shape).enumerate() {
            prop_assert_eq!(&stage.name, &format!("stage-{s}"));
            prop_assert_eq!(stage.jobs.len(), jobs.len());
            for (j, (job, tasks)) in stage.jobs.iter().zip(jobs).enumerate() {
                prop_assert_eq!(&job.name, &format!("job-{j}"));
                prop_assert_eq!(job.tasks.len(), tasks.len());
                for (t, (task, code)) in job.tasks.iter().zip(tasks).enumerate() {
                    prop_assert_eq!(&task.cmd, &cmd(s, j, t));
                    prop_assert_eq!(task.exit_code, Some(*code));
                    let expected = if *code == 0 {
                        TaskStatus::Success
                    } else {
                        TaskStatus::Failed
                    };
                    prop_assert_eq!(task.status, expected);
                }
            }
        }

        // Every task ran exactly once, in definition order.
        let logged: Vec<String> = log.tasks().map(|t| t.cmd.clone()).collect();
        prop_assert_eq!(executed, logged);

        let failures = shape.iter().flatten().flatten().filter(|c| **c != 0).count();
        prop_assert_eq!(log.failed_tasks(), failures);
    }

    #[test]
    fn timings_are_consistent_and_nested(shape in shape_strategy()) {
        let (log, _) = run(&shape);

        let mut previous_end = log.timing.start_time;
        for stage in &log.stages {
            prop_assert!(contains(&log.timing, &stage.timing));
            prop_assert!(stage.timing.start_time >= previous_end);
            previous_end = stage.timing.end_time;
            for job in &stage.jobs {
                prop_assert!(contains(&stage.timing, &job.timing));
                for task in &job.tasks {
                    prop_assert!(contains(&job.timing, &task.timing));
                    prop_assert!(task.timing.end_time >= task.timing.start_time);
                    prop_assert_eq!(
                        task.timing.elapsed_ms as i64,
                        (task.timing.end_time - task.timing.start_time).num_milliseconds()
                    );
                }
            }
        }
    }
}
