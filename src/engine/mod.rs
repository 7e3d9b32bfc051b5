// src/engine/mod.rs

//! Async execution engine for rundag.
//!
//! This module ties the pure [`crate::dag::Scheduler`] to tokio:
//! - [`pool`] owns the scheduler behind one lock, launches executors and
//!   routes their settlement back into the core
//! - [`report`] summarises a drained pool
//!
//! Everything that decides *what* runs lives in `dag`; this layer only
//! decides *where* it runs.

/// Canonical task identifier used throughout the crate.
pub type TaskId = String;

/// How a task's execution settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The executor returned an error or panicked.
    Failed(String),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Per-task notifications, in the order the scheduler applied them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// The task took a concurrency slot and its executor is being launched.
    Dispatched { id: TaskId, priority: i64 },
    /// The task's executor finished.
    Settled { id: TaskId, outcome: TaskOutcome },
    /// The task will never run because `upstream` failed (block policy only).
    Skipped { id: TaskId, upstream: TaskId },
}

impl TaskEvent {
    pub fn task_id(&self) -> &str {
        match self {
            TaskEvent::Dispatched { id, .. }
            | TaskEvent::Settled { id, .. }
            | TaskEvent::Skipped { id, .. } => id,
        }
    }
}

pub mod pool;
pub mod report;

pub use pool::{PoolSnapshot, TaskPool, TaskSpec};
pub use report::DrainReport;
