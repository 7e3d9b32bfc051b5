// src/exec/mod.rs

//! Execution layer.
//!
//! - [`runner`] runs one executor in isolation and maps how it ended
//!   (success, error, panic) to a [`crate::engine::TaskOutcome`].
//! - [`command`] provides shell-command executors for the `rundag` binary,
//!   built on `tokio::process::Command`.

use std::future::Future;
use std::pin::Pin;

pub mod command;
pub mod runner;

pub use command::{run_shell_command, shell_executor};
pub use runner::run_job;

/// The future an executor produces.
pub type JobFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A zero-argument, run-once executor as stored by the scheduler.
pub type Job = Box<dyn FnOnce() -> JobFuture + Send>;

/// Erase a concrete executor closure into a [`Job`].
pub fn boxed_job<F, Fut>(executor: F) -> Job
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Box::new(move || Box::pin(executor()) as JobFuture)
}
