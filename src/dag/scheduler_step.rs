// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::engine::TaskId;

/// Structured result of settling one task.
///
/// Useful for tests that want to step the core by hand and make assertions
/// about what changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Tasks promoted into the ready queue by this settlement.
    pub newly_ready: Vec<TaskId>,
    /// Tasks skipped because this settlement was a failure under the `block`
    /// failure policy.
    pub newly_skipped: Vec<TaskId>,
    /// Whether nothing is ready and nothing is running after this step.
    pub quiescent: bool,
}
