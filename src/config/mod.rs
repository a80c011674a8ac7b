// src/config/mod.rs

//! Configuration loading and validation for tinyci.
//!
//! Responsibilities:
//! - Define the serde-backed pipeline model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate identities, durations and paths (`validate.rs`).
//! - Expose the result to the poll loop through [`ConfigSource`].

pub mod loader;
pub mod model;
pub mod validate;

use std::path::PathBuf;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ArtifactDef, ConfigFile, JobDef, PipelineDef, RawConfigFile, RunnerSection, StageDef,
    TaskDef, VcSection,
};

use crate::errors::Result;

/// Supplies the pipeline set for a poll cycle.
///
/// The poll loop asks for a fresh set every cycle so edits to the config file
/// are picked up without a restart.
pub trait ConfigSource: Send {
    fn load(&self) -> Result<ConfigFile>;
}

/// Reads and validates a config file on every call.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<ConfigFile> {
        load_and_validate(&self.path)
    }
}

/// A fixed, already-validated pipeline set.
impl ConfigSource for ConfigFile {
    fn load(&self) -> Result<ConfigFile> {
        Ok(self.clone())
    }
}
