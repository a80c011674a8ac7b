// src/watch/detector.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::config::PipelineDef;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::history::RunHistory;
use crate::pipeline::working_copy_dir;
use crate::vcs::{CommitId, VersionControl, tracking_ref};

/// Outcome of a change check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStatus {
    /// No run recorded for this pipeline yet.
    FirstRun,
    /// History exists but the working copy is missing; the next run clones.
    MissingWorkingCopy,
    Changed {
        previous: CommitId,
        current: CommitId,
    },
    Unchanged {
        current: CommitId,
    },
}

impl ChangeStatus {
    pub fn is_changed(&self) -> bool {
        !matches!(self, ChangeStatus::Unchanged { .. })
    }

    /// Head commit observed during the check, if one was read.
    pub fn current(&self) -> Option<&CommitId> {
        match self {
            ChangeStatus::Changed { current, .. } | ChangeStatus::Unchanged { current } => {
                Some(current)
            }
            ChangeStatus::FirstRun | ChangeStatus::MissingWorkingCopy => None,
        }
    }
}

/// Decides whether a pipeline has new commits since its last recorded run.
///
/// Only reads: it fetches remote refs into the existing working copy and
/// resolves the branch's remote-tracking ref. The files of the working copy
/// (which the last run's tasks may have modified) and the history are left
/// untouched.
pub struct ChangeDetector {
    vcs: Arc<dyn VersionControl>,
    fs: Arc<dyn FileSystem>,
    workdir: PathBuf,
}

impl ChangeDetector {
    pub fn new(
        vcs: Arc<dyn VersionControl>,
        fs: Arc<dyn FileSystem>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            vcs,
            fs,
            workdir: workdir.into(),
        }
    }

    pub async fn detect(
        &self,
        pipeline: &PipelineDef,
        history: &RunHistory,
    ) -> Result<ChangeStatus> {
        let identity = pipeline.identity();

        let Some(last) = history.last_run(identity) else {
            debug!(pipeline = identity, "no previous run recorded");
            return Ok(ChangeStatus::FirstRun);
        };

        let src_dir = working_copy_dir(&self.workdir, identity);
        if !self.fs.is_dir(&src_dir) {
            debug!(pipeline = identity, dir = ?src_dir, "working copy missing");
            return Ok(ChangeStatus::MissingWorkingCopy);
        }

        self.vcs.fetch(&src_dir).await?;
        let current = self
            .vcs
            .resolve(&src_dir, &tracking_ref(pipeline.branch()))
            .await?;

        debug!(
            pipeline = identity,
            last = %last.commit_hash,
            current = %current,
            "compared head with last run"
        );

        if current == last.commit_hash {
            Ok(ChangeStatus::Unchanged { current })
        } else {
            Ok(ChangeStatus::Changed {
                previous: last.commit_hash.clone(),
                current,
            })
        }
    }

    pub async fn has_changed(
        &self,
        pipeline: &PipelineDef,
        history: &RunHistory,
    ) -> Result<bool> {
        Ok(self.detect(pipeline, history).await?.is_changed())
    }
}
