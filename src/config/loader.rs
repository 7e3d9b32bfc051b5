// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{RawTaskFile, TaskFile};
use crate::errors::Result;

/// Load a task file from a given path without semantic validation.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] to
/// also check dependencies.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawTaskFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawTaskFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Load a task file and validate it:
///
/// - at least one task,
/// - `[scheduler]` sanity (`concurrency >= 1`),
/// - every `after` entry names a task, none names itself,
/// - no dependency cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<TaskFile> {
    let raw = load_from_path(&path)?;
    TaskFile::try_from(raw)
}

/// `Rundag.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Rundag.toml")
}
