// src/pipeline/artifacts.rs

//! Copies build outputs out of the working copy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, info, warn};

use crate::config::{ArtifactDef, PipelineDef};
use crate::errors::Result;
use crate::fs::FileSystem;

use super::{ARTIFACTS_DIR_NAME, SRC_DIR_NAME};

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Exports the artifacts declared by a pipeline into
/// `<pipeline_dir>/artifacts/<dst>`.
///
/// Matched files are copied by file name only (directory structure is
/// flattened) and overwrite existing files of the same name. A pattern that
/// matches nothing, or whose directory does not exist, exports nothing but
/// still creates the destination directory.
#[derive(Debug, Clone)]
pub struct ArtifactExporter {
    fs: Arc<dyn FileSystem>,
}

impl ArtifactExporter {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Export every artifact of `pipeline`. Returns the number of files copied.
    pub fn export(&self, pipeline: &PipelineDef, pipeline_dir: &Path) -> Result<usize> {
        let src_dir = pipeline_dir.join(SRC_DIR_NAME);
        let artifacts_dir = pipeline_dir.join(ARTIFACTS_DIR_NAME);

        let mut copied = 0;
        for artifact in &pipeline.artifacts {
            copied += self.export_one(&src_dir, &artifacts_dir, artifact)?;
        }
        Ok(copied)
    }

    fn export_one(
        &self,
        src_dir: &Path,
        artifacts_dir: &Path,
        artifact: &ArtifactDef,
    ) -> Result<usize> {
        let files = match self.matching_files(src_dir, &artifact.src) {
            Ok(files) => files,
            Err(err) => {
                warn!(
                    pattern = %artifact.src,
                    error = %err,
                    "listing artifact files failed; nothing to export"
                );
                Vec::new()
            }
        };
        if files.is_empty() {
            warn!(pattern = %artifact.src, "artifact pattern matched no files");
        }

        let dest = artifacts_dir.join(&artifact.dst);
        self.fs.create_dir_all(&dest)?;

        for file in &files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let target = dest.join(name);
            debug!(from = ?file, to = ?target, "copying artifact");
            self.fs.copy(file, &target)?;
        }

        info!(
            pattern = %artifact.src,
            dst = %artifact.dst,
            files = files.len(),
            "artifacts exported"
        );
        Ok(files.len())
    }

    /// Files under `src_dir` matched by `pattern`, sorted.
    ///
    /// A pattern without glob metacharacters names a file (that file) or a
    /// directory (the files directly inside it). Otherwise `*` and `?` do not
    /// cross `/`, `**` does, and `.git` is never searched.
    pub fn matching_files(&self, src_dir: &Path, pattern: &str) -> AnyResult<Vec<PathBuf>> {
        let pattern = pattern.trim().trim_start_matches("./");

        if !pattern.contains(GLOB_META) {
            let path = src_dir.join(pattern);
            if self.fs.is_file(&path) {
                return Ok(vec![path]);
            }
            if self.fs.is_dir(&path) {
                let mut files: Vec<PathBuf> = self
                    .fs
                    .read_dir(&path)?
                    .into_iter()
                    .filter(|p| self.fs.is_file(p))
                    .collect();
                files.sort();
                return Ok(files);
            }
            anyhow::bail!("no such file or directory: {:?}", path);
        }

        let matcher = compile(pattern)?;
        let base = src_dir.join(literal_prefix(pattern));
        if !self.fs.is_dir(&base) {
            anyhow::bail!("no such directory: {:?}", base);
        }

        let mut files = Vec::new();
        let mut stack = vec![base];
        while let Some(dir) = stack.pop() {
            for path in self.fs.read_dir(&dir)? {
                if self.fs.is_dir(&path) {
                    if path.file_name().is_some_and(|n| n == ".git") {
                        continue;
                    }
                    stack.push(path);
                } else if self.fs.is_file(&path) {
                    if let Ok(rel) = path.strip_prefix(src_dir) {
                        let rel_str = rel.to_string_lossy().replace('\\', "/");
                        if matcher.is_match(&rel_str) {
                            files.push(path);
                        }
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

fn compile(pattern: &str) -> AnyResult<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid artifact pattern '{pattern}'"))?;
    Ok(glob.compile_matcher())
}

/// Leading path components of `pattern` that contain no glob syntax.
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    let mut parts = pattern.split('/').peekable();
    while let Some(part) = parts.next() {
        // The last component is the file pattern itself.
        if parts.peek().is_none() || part.contains(GLOB_META) {
            break;
        }
        prefix.push(part);
    }
    prefix
}

/// Check that `pattern` is a valid artifact glob.
pub fn validate_pattern(pattern: &str) -> AnyResult<()> {
    let pattern = pattern.trim().trim_start_matches("./");
    if pattern.contains(GLOB_META) {
        compile(pattern)?;
    }
    Ok(())
}
