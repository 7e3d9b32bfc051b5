// src/config/mod.rs

//! Configuration for rundag.
//!
//! - [`model`]: `SchedulerConfig` and the TOML task-file data model.
//! - [`loader`]: read a task file from disk.
//! - [`validate`]: unknown dependencies, self-dependencies, cycles.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{RawTaskFile, SchedulerConfig, TaskConfig, TaskFile};
pub use validate::validate_task_file;
