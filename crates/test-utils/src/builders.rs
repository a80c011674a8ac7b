#![allow(dead_code)]

use std::path::PathBuf;

use tinyci::config::{
    ArtifactDef, ConfigFile, JobDef, PipelineDef, RawConfigFile, RunnerSection, StageDef,
    TaskDef, VcSection,
};
use tinyci::types::{CloneFailurePolicy, TaskFailurePolicy};

/// Build a job from plain command lines.
pub fn job(name: &str, cmds: &[&str]) -> JobDef {
    JobDef {
        name: name.to_string(),
        tasks: cmds.iter().map(|c| TaskDef::new(*c)).collect(),
    }
}

/// Builder for `PipelineDef` to simplify test setup.
///
/// Defaults: identity doubles as the display name and `package`, source URL
/// `https://example.invalid/<identity>.git`, branch `main`.
pub struct PipelineBuilder {
    pipeline: PipelineDef,
}

impl PipelineBuilder {
    pub fn new(identity: &str) -> Self {
        Self {
            pipeline: PipelineDef {
                name: identity.to_string(),
                domain: None,
                package: Some(identity.to_string()),
                src: format!("https://example.invalid/{identity}.git"),
                vc: VcSection {
                    branch: "main".to_string(),
                },
                stages: vec![],
                artifacts: vec![],
            },
        }
    }

    pub fn src(mut self, url: &str) -> Self {
        self.pipeline.src = url.to_string();
        self
    }

    pub fn branch(mut self, branch: &str) -> Self {
        self.pipeline.vc.branch = branch.to_string();
        self
    }

    pub fn stage(mut self, name: &str, jobs: Vec<JobDef>) -> Self {
        self.pipeline.stages.push(StageDef {
            name: name.to_string(),
            jobs,
        });
        self
    }

    pub fn artifact(mut self, src: &str, dst: &str) -> Self {
        self.pipeline.artifacts.push(ArtifactDef {
            src: src.to_string(),
            dst: dst.to_string(),
        });
        self
    }

    pub fn build(self) -> PipelineDef {
        self.pipeline
    }
}

/// Builder for `ConfigFile`.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                runner: RunnerSection::default(),
                pipelines: vec![],
            },
        }
    }

    pub fn with_pipeline(mut self, pipeline: PipelineDef) -> Self {
        self.config.pipelines.push(pipeline);
        self
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.runner.workdir = dir.into();
        self
    }

    pub fn poll_interval(mut self, interval: &str) -> Self {
        self.config.runner.poll_interval = interval.to_string();
        self
    }

    pub fn on_task_failure(mut self, policy: TaskFailurePolicy) -> Self {
        self.config.runner.on_task_failure = policy;
        self
    }

    pub fn on_clone_failure(mut self, policy: CloneFailurePolicy) -> Self {
        self.config.runner.on_clone_failure = policy;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
