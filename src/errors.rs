// src/errors.rs

//! Crate-wide error type.
//!
//! Components only *detect* failures and return them as `CiError`; what to do
//! about them (abort the process, skip the pipeline, retry next cycle) is
//! decided by the poll loop in [`crate::engine`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CiError {
    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("git clone of '{url}' failed for pipeline '{pipeline}': {message}")]
    Clone {
        pipeline: String,
        url: String,
        message: String,
    },

    #[error("checkout of '{reference}' failed for pipeline '{pipeline}': {message}")]
    Checkout {
        pipeline: String,
        reference: String,
        message: String,
    },

    #[error("reading head commit failed for pipeline '{pipeline}': {message}")]
    HeadCommit { pipeline: String, message: String },

    #[error("version control command `{command}` failed: {message}")]
    Vcs { command: String, message: String },

    #[error("task '{cmd}' failed in pipeline '{pipeline}' (exit code {exit_code:?})")]
    TaskFailed {
        pipeline: String,
        cmd: String,
        exit_code: Option<i32>,
    },

    #[error("History error: {0}")]
    History(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CiError {
    /// True for failures that happen while establishing the working copy
    /// (clone, checkout, head lookup). No `RunLog` exists yet for these.
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            CiError::Clone { .. } | CiError::Checkout { .. } | CiError::HeadCommit { .. }
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CiError>;
