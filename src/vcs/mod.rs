// src/vcs/mod.rs

//! Version-control client abstraction.
//!
//! The engine only needs a handful of operations on a working copy; they are
//! expressed by [`VersionControl`] so tests can script commit heads without a
//! real repository. [`GitClient`] is the production implementation.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::exec::BoxFuture;

pub mod git;

pub use git::GitClient;

/// Opaque revision identifier. Only equality is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommitId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CommitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Ref that tracks the remote state of `branch` in an existing working copy.
pub fn tracking_ref(branch: &str) -> String {
    format!("origin/{branch}")
}

/// Operations the engine performs against a source repository.
pub trait VersionControl: Send + Sync {
    /// Fail with `CiError::Environment` when the client cannot be used at all.
    fn check_available(&self) -> BoxFuture<'_, Result<()>>;

    /// Clone `repo_url` into `target_dir` (which must not exist yet or be empty).
    fn clone_repo<'a>(
        &'a self,
        repo_url: &'a str,
        target_dir: &'a Path,
    ) -> BoxFuture<'a, Result<()>>;

    /// Refresh remote-tracking refs without touching the checked-out files.
    fn fetch<'a>(&'a self, dir: &'a Path) -> BoxFuture<'a, Result<()>>;

    fn checkout<'a>(&'a self, dir: &'a Path, reference: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Commit currently checked out in `dir`.
    fn head_commit<'a>(&'a self, dir: &'a Path) -> BoxFuture<'a, Result<CommitId>>;

    /// Commit `reference` points at (e.g. `origin/main`), without touching
    /// the files of the working copy.
    fn resolve<'a>(
        &'a self,
        dir: &'a Path,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<CommitId>>;
}
