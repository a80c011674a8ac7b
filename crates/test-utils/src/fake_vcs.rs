use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tinyci::errors::{CiError, Result};
use tinyci::exec::BoxFuture;
use tinyci::fs::FileSystem;
use tinyci::vcs::{CommitId, VersionControl};

#[derive(Default)]
struct State {
    heads: HashMap<String, CommitId>,
    repo_files: Vec<(String, Vec<u8>)>,
    failing_urls: HashSet<String>,
    checked_out: HashMap<PathBuf, String>,
    calls: Vec<String>,
}

/// Scriptable stand-in for git.
///
/// - `set_head(branch, commit)` moves a branch; both `branch` and
///   `origin/branch` resolve to it.
/// - A clone creates the target directory and writes the repo files through
///   the given `FileSystem`.
#[derive(Clone)]
pub struct FakeVcs {
    fs: Arc<dyn FileSystem>,
    state: Arc<Mutex<State>>,
}

fn vcs_error(command: &str, message: &str) -> CiError {
    CiError::Vcs {
        command: command.to_string(),
        message: message.to_string(),
    }
}

impl FakeVcs {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            state: Arc::default(),
        }
    }

    pub fn set_head(&self, branch: &str, commit: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .heads
            .insert(branch.to_string(), CommitId::from(commit));
        self
    }

    /// File present in every fresh clone.
    pub fn repo_file(&self, rel_path: &str, contents: &[u8]) -> &Self {
        self.state
            .lock()
            .unwrap()
            .repo_files
            .push((rel_path.to_string(), contents.to_vec()));
        self
    }

    pub fn fail_clone_of(&self, url: &str) -> &Self {
        self.state.lock().unwrap().failing_urls.insert(url.to_string());
        self
    }

    /// Operations performed so far, e.g. `"clone <url>"`, `"fetch"`,
    /// `"checkout main"`, `"resolve origin/main"`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clones(&self) -> usize {
        self.calls().iter().filter(|c| c.starts_with("clone ")).count()
    }
}

impl VersionControl for FakeVcs {
    fn check_available(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn clone_repo<'a>(
        &'a self,
        repo_url: &'a str,
        target_dir: &'a Path,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let files = {
                let mut guard = self.state.lock().unwrap();
                guard.calls.push(format!("clone {repo_url}"));
                if guard.failing_urls.contains(repo_url) {
                    return Err(vcs_error("git clone", "repository not found"));
                }
                guard.repo_files.clone()
            };

            self.fs.create_dir_all(target_dir)?;
            for (rel, contents) in files {
                self.fs.write(&target_dir.join(rel), &contents)?;
            }
            Ok(())
        })
    }

    fn fetch<'a>(&'a self, dir: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.state.lock().unwrap().calls.push("fetch".to_string());
            if !self.fs.is_dir(dir) {
                return Err(vcs_error("git fetch", "not a git repository"));
            }
            Ok(())
        })
    }

    fn checkout<'a>(&'a self, dir: &'a Path, reference: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut guard = self.state.lock().unwrap();
            guard.calls.push(format!("checkout {reference}"));
            let branch = reference.strip_prefix("origin/").unwrap_or(reference);
            if !guard.heads.contains_key(branch) {
                return Err(vcs_error("git checkout", "pathspec did not match"));
            }
            guard.checked_out.insert(dir.to_path_buf(), branch.to_string());
            Ok(())
        })
    }

    fn head_commit<'a>(&'a self, dir: &'a Path) -> BoxFuture<'a, Result<CommitId>> {
        Box::pin(async move {
            let guard = self.state.lock().unwrap();
            guard
                .checked_out
                .get(dir)
                .and_then(|branch| guard.heads.get(branch))
                .cloned()
                .ok_or_else(|| vcs_error("git rev-parse HEAD", "no commit checked out"))
        })
    }

    fn resolve<'a>(
        &'a self,
        _dir: &'a Path,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<CommitId>> {
        Box::pin(async move {
            let mut guard = self.state.lock().unwrap();
            guard.calls.push(format!("resolve {reference}"));
            let branch = reference.strip_prefix("origin/").unwrap_or(reference);
            guard
                .heads
                .get(branch)
                .cloned()
                .ok_or_else(|| vcs_error("git rev-parse", "unknown revision"))
        })
    }
}
