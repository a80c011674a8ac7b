// src/config/validate.rs

use std::collections::HashSet;
use std::path::{Component, Path};

use crate::config::model::{ConfigFile, PipelineDef, RawConfigFile};
use crate::errors::{CiError, Result};
use crate::pipeline::artifacts::validate_pattern;
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CiError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.runner, raw.pipelines))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_pipelines(cfg)?;
    validate_runner_section(cfg)?;
    validate_identities(cfg)?;
    for pipeline in &cfg.pipelines {
        validate_pipeline(pipeline)?;
    }
    Ok(())
}

fn ensure_has_pipelines(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pipelines.is_empty() {
        return Err(CiError::ConfigError(
            "config must contain at least one [[pipelines]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_runner_section(cfg: &RawConfigFile) -> Result<()> {
    let interval = parse_duration(&cfg.runner.poll_interval)
        .map_err(|e| CiError::ConfigError(format!("[runner].poll_interval: {e}")))?;
    if interval.is_zero() {
        return Err(CiError::ConfigError(
            "[runner].poll_interval must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_identities(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();

    for pipeline in &cfg.pipelines {
        let identity = match (&pipeline.domain, &pipeline.package) {
            (Some(_), Some(_)) => {
                return Err(CiError::ConfigError(format!(
                    "pipeline '{}' sets both `domain` and `package`; use exactly one",
                    pipeline.name
                )));
            }
            (None, None) => {
                return Err(CiError::ConfigError(format!(
                    "pipeline '{}' needs a `domain` or `package` identity",
                    pipeline.name
                )));
            }
            (Some(id), None) | (None, Some(id)) => id.as_str(),
        };

        if !is_single_component(identity) {
            return Err(CiError::ConfigError(format!(
                "pipeline '{}' has identity '{}' which is not a plain directory name",
                pipeline.name, identity
            )));
        }

        if !seen.insert(identity) {
            return Err(CiError::ConfigError(format!(
                "duplicate pipeline identity '{}'",
                identity
            )));
        }
    }
    Ok(())
}

fn validate_pipeline(pipeline: &PipelineDef) -> Result<()> {
    let id = pipeline.identity();

    if pipeline.src.trim().is_empty() {
        return Err(CiError::ConfigError(format!(
            "pipeline '{id}' has an empty `src` repository URL"
        )));
    }
    if pipeline.vc.branch.trim().is_empty() {
        return Err(CiError::ConfigError(format!(
            "pipeline '{id}' has an empty `vc.branch`"
        )));
    }

    for stage in &pipeline.stages {
        for job in &stage.jobs {
            for task in &job.tasks {
                if task.cmd.trim().is_empty() {
                    return Err(CiError::ConfigError(format!(
                        "pipeline '{id}', stage '{}', job '{}' contains a task with an empty `cmd`",
                        stage.name, job.name
                    )));
                }
                if let Some(timeout) = &task.timeout {
                    parse_duration(timeout).map_err(|e| {
                        CiError::ConfigError(format!(
                            "pipeline '{id}', task '{}': invalid timeout: {e}",
                            task.cmd
                        ))
                    })?;
                }
            }
        }
    }

    for artifact in &pipeline.artifacts {
        if artifact.src.trim().is_empty() {
            return Err(CiError::ConfigError(format!(
                "pipeline '{id}' has an artifact with an empty `src`"
            )));
        }
        if !is_contained_relative(&artifact.src) {
            return Err(CiError::ConfigError(format!(
                "pipeline '{id}': artifact `src` '{}' must be a relative path inside the \
                 working copy",
                artifact.src
            )));
        }
        validate_pattern(&artifact.src)
            .map_err(|e| CiError::ConfigError(format!("pipeline '{id}': {e:#}")))?;
        if !is_contained_relative(&artifact.dst) {
            return Err(CiError::ConfigError(format!(
                "pipeline '{id}': artifact `dst` '{}' must be a relative path inside the \
                 artifact directory",
                artifact.dst
            )));
        }
    }

    Ok(())
}

fn is_single_component(s: &str) -> bool {
    let mut components = Path::new(s).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !s.contains(['/', '\\'])
}

fn is_contained_relative(s: &str) -> bool {
    Path::new(s)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
