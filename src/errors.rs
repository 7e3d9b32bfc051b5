// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::engine::TaskId;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Duplicate task id: {0}")]
    DuplicateTaskId(TaskId),

    /// Raised at drain time when a blocked task waits on an id that was never
    /// registered. `stranded` lists every task left blocked, in registration
    /// order.
    #[error(
        "Unknown dependency: task '{task}' waits on unregistered task(s) {missing:?} \
         ({} task(s) left blocked)",
        stranded.len()
    )]
    UnknownDependency {
        task: TaskId,
        missing: Vec<TaskId>,
        stranded: Vec<TaskId>,
    },

    #[error("Cycle detected in task dependencies: {0:?}")]
    DependencyCycle(Vec<TaskId>),

    #[error("No tokio runtime: tasks must be added from within a tokio runtime")]
    NoRuntime,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SchedulerError>;
