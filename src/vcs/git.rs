// src/vcs/git.rs

use std::ffi::OsString;
use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use crate::errors::{CiError, Result};
use crate::exec::BoxFuture;

use super::{CommitId, VersionControl};

/// `VersionControl` backed by the `git` command-line tool.
#[derive(Debug, Clone)]
pub struct GitClient {
    program: OsString,
}

impl Default for GitClient {
    fn default() -> Self {
        Self {
            program: OsString::from("git"),
        }
    }
}

impl GitClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git binary instead of the one on `PATH`.
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run git with `args` in `cwd`, returning trimmed stdout.
    async fn git(&self, cwd: &Path, args: Vec<OsString>) -> Result<String> {
        let command_line = format!(
            "git {}",
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        debug!(command = %command_line, cwd = ?cwd, "running git");

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(cwd)
            .output()
            .await
            .map_err(|e| CiError::Vcs {
                command: command_line.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CiError::Vcs {
                command: command_line,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn args(list: &[&str]) -> Vec<OsString> {
    list.iter().map(OsString::from).collect()
}

impl VersionControl for GitClient {
    fn check_available(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let cwd = std::env::temp_dir();
            self.git(&cwd, args(&["--version"]))
                .await
                .map(|version| debug!(%version, "git available"))
                .map_err(|e| CiError::Environment(format!("this runner requires git: {e}")))
        })
    }

    fn clone_repo<'a>(
        &'a self,
        repo_url: &'a str,
        target_dir: &'a Path,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            // git resolves the target against its cwd, so clone from the parent by name.
            let (cwd, target) = match (target_dir.parent(), target_dir.file_name()) {
                (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
                    (parent.to_path_buf(), name.to_owned())
                }
                _ => (std::env::current_dir()?, target_dir.as_os_str().to_owned()),
            };
            let mut argv = args(&["clone", "--quiet", repo_url]);
            argv.push(target);
            self.git(&cwd, argv).await.map(|_| ())
        })
    }

    fn fetch<'a>(&'a self, dir: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.git(dir, args(&["fetch", "--quiet", "origin"]))
                .await
                .map(|_| ())
        })
    }

    fn checkout<'a>(&'a self, dir: &'a Path, reference: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.git(dir, args(&["checkout", "--quiet", reference]))
                .await
                .map(|_| ())
        })
    }

    fn head_commit<'a>(&'a self, dir: &'a Path) -> BoxFuture<'a, Result<CommitId>> {
        self.resolve(dir, "HEAD")
    }

    fn resolve<'a>(
        &'a self,
        dir: &'a Path,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<CommitId>> {
        Box::pin(async move {
            let spec = format!("{reference}^{{commit}}");
            let commit = self
                .git(dir, args(&["rev-parse", "--verify", spec.as_str()]))
                .await?;
            Ok(CommitId::new(commit))
        })
    }
}
