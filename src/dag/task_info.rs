// src/dag/task_info.rs

//! Task metadata and per-task lifecycle state.

use crate::engine::{TaskId, TaskOutcome};

/// Lifecycle state of a registered task (internal).
///
/// `Blocked | Ready -> Running -> Succeeded | Failed`. Under the `block`
/// failure policy a task may also end in `Skipped` straight from `Blocked`.
/// No task ever moves back to an earlier state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Waiting on at least one unsettled dependency.
    Blocked,
    /// All dependencies settled; sitting in the ready queue.
    Ready,
    /// Popped from the ready queue and handed to the dispatcher.
    Running,
    Succeeded,
    Failed(String),
    /// Never ran because `upstream` failed (or was itself skipped).
    Skipped { upstream: TaskId },
}

impl RunState {
    /// Whether a dependent must be skipped because of this state, when the
    /// `block` failure policy is active.
    pub fn poisons_dependents(&self) -> bool {
        matches!(self, RunState::Failed(_) | RunState::Skipped { .. })
    }
}

/// Public, read-only view of a task's state.
///
/// Exposed for tests and diagnostics without leaking the internal
/// [`RunState`] payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    Blocked,
    Ready,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl From<&RunState> for TaskRunState {
    fn from(state: &RunState) -> Self {
        match state {
            RunState::Blocked => TaskRunState::Blocked,
            RunState::Ready => TaskRunState::Ready,
            RunState::Running => TaskRunState::Running,
            RunState::Succeeded => TaskRunState::Succeeded,
            RunState::Failed(_) => TaskRunState::Failed,
            RunState::Skipped { .. } => TaskRunState::Skipped,
        }
    }
}

impl From<&TaskOutcome> for RunState {
    fn from(outcome: &TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Success => RunState::Succeeded,
            TaskOutcome::Failed(msg) => RunState::Failed(msg.clone()),
        }
    }
}

/// Static task information captured at registration, plus lifecycle state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub id: TaskId,
    pub priority: i64,
    /// Registration sequence number; breaks priority ties (lower runs first).
    pub seq: u64,
    /// Direct dependencies, de-duplicated, in declaration order.
    pub deps: Vec<TaskId>,
    pub state: RunState,
}

/// A task the scheduler wants launched now, carrying its executor payload.
#[derive(Debug)]
pub struct ScheduledTask<T> {
    pub id: TaskId,
    pub priority: i64,
    pub seq: u64,
    pub payload: T,
}
