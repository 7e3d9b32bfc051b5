// src/dag/mod.rs

//! Dependency bookkeeping and scheduling decisions.
//!
//! - [`registry`] stores each task's identity, priority and executor payload.
//! - [`graph`] holds pending-dependency counters and the dependents index.
//! - [`ready_queue`] orders runnable tasks by priority, then registration.
//! - [`scheduler`] is the pure state machine tying those together behind a
//!   concurrency limit.
//! - [`diagnostics`] explains tasks left blocked once nothing can run.
//! - [`task_info`] and [`scheduler_step`] hold the supporting types.

pub mod diagnostics;
pub mod graph;
pub mod ready_queue;
pub mod registry;
pub mod scheduler;
pub mod scheduler_step;
pub mod task_info;

pub use graph::DependencyGraph;
pub use ready_queue::ReadyQueue;
pub use registry::TaskRegistry;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskInfo, TaskRunState};
