// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// Files ending in `.json` are parsed as JSON, everything else as TOML. This
/// only deserializes; use [`load_and_validate`] for semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config: RawConfigFile = if is_json {
        serde_json::from_str(&contents)?
    } else {
        toml::from_str(&contents)?
    };

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// This is the entry point the poll loop uses on every cycle:
///
/// - Reads TOML (or JSON).
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks identities, durations, commands and artifact destinations.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Default config location: `Tinyci.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Tinyci.toml")
}
