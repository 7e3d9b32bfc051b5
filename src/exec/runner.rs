// src/exec/runner.rs

//! Runs a single executor and turns however it ends into a [`TaskOutcome`].

use tracing::{debug, error};

use crate::engine::TaskOutcome;
use crate::exec::Job;

/// Run `job` to completion in its own tokio task.
///
/// The executor is isolated from the scheduler: an `Err` it returns and a
/// panic inside it both come back as [`TaskOutcome::Failed`], never as an
/// error or panic of the caller.
pub async fn run_job(task: &str, job: Job) -> TaskOutcome {
    debug!(task = %task, "executor started");

    // Call the closure inside the spawned task so that a panic while building
    // the future is caught as well.
    let handle = tokio::spawn(async move { job().await });

    match handle.await {
        Ok(Ok(())) => {
            debug!(task = %task, "executor finished");
            TaskOutcome::Success
        }
        Ok(Err(err)) => {
            let reason = format!("{err:#}");
            error!(task = %task, %reason, "task execution failed");
            TaskOutcome::Failed(reason)
        }
        Err(join_err) if join_err.is_panic() => {
            let reason = panic_message(join_err.into_panic());
            error!(task = %task, %reason, "task executor panicked");
            TaskOutcome::Failed(format!("executor panicked: {reason}"))
        }
        Err(join_err) => {
            error!(task = %task, error = %join_err, "task executor aborted");
            TaskOutcome::Failed(join_err.to_string())
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
