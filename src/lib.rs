// src/lib.rs

//! In-process task scheduler: a bounded number of async tasks run at once,
//! each only after its dependencies have settled, with higher-priority ready
//! tasks dispatched first (ties in registration order).
//!
//! ```no_run
//! # async fn demo() -> rundag::errors::Result<()> {
//! use rundag::TaskPool;
//!
//! let pool = TaskPool::with_concurrency(2)?;
//! pool.add_task("fetch", || async { anyhow::Ok(()) }, 1, Vec::<String>::new())?;
//! pool.add_task("build", || async { anyhow::Ok(()) }, 2, ["fetch"])?;
//! let report = pool.drain().await?;
//! assert_eq!(report.dispatch_order, ["fetch", "build"]);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use anyhow::{Result, bail};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{TaskFile, load_and_validate};
use crate::dag::Scheduler;
use crate::engine::{DrainReport, TaskEvent, TaskId, TaskOutcome, TaskSpec};
use crate::exec::shell_executor;

pub use crate::config::SchedulerConfig;
pub use crate::engine::TaskPool;
pub use crate::errors::SchedulerError;
pub use crate::types::FailurePolicy;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - task file loading and CLI overrides
/// - the task pool
/// - shell-command executors
/// - progress output and the final summary
pub async fn run(args: CliArgs) -> Result<()> {
    let mut file = load_and_validate(&args.config)?;

    if let Some(concurrency) = args.concurrency {
        file.scheduler.concurrency = concurrency;
    }
    if let Some(policy) = args.failure_policy {
        file.scheduler.failure_policy = policy.into();
    }
    file.scheduler.validate()?;

    if args.dry_run {
        print_dry_run(&file)?;
        return Ok(());
    }

    let pool = TaskPool::new(file.scheduler.clone())?;

    // Progress printer; ends when the pool (and its event sender) is dropped.
    let mut events = pool.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "progress output fell behind; some events not shown");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // One batch, so the first task in name order does not grab a slot
    // before higher-priority tasks are registered.
    pool.add_tasks(file.tasks().map(|(name, task)| {
        TaskSpec::new(
            name,
            shell_executor(name.to_string(), task.cmd.clone()),
            task.priority,
            task.after.iter().cloned(),
        )
    }))?;

    let report = pool.drain().await?;
    drop(pool);
    if let Err(e) = printer.await {
        warn!(error = %e, "progress printer stopped abnormally");
    }

    print_summary(&report);

    if !report.is_clean() {
        bail!(
            "{} task(s) failed, {} skipped",
            report.failed().len(),
            report.skipped.len()
        );
    }
    info!(tasks = report.outcomes.len(), "all tasks succeeded");
    Ok(())
}

/// Order in which tasks would be dispatched with a concurrency of one, every
/// task succeeding.
pub fn planned_order(file: &TaskFile) -> crate::errors::Result<Vec<TaskId>> {
    let mut sim: Scheduler<()> = Scheduler::new(1, file.scheduler.failure_policy)?;

    for (name, task) in file.tasks() {
        sim.register(name.to_string(), (), task.priority, task.after.clone())?;
    }

    let mut order = Vec::new();
    loop {
        let batch = sim.dispatch_ready();
        if batch.is_empty() {
            break;
        }
        for task in batch {
            sim.complete(&task.id, TaskOutcome::Success);
            order.push(task.id);
        }
    }

    sim.check_stranded()?;
    Ok(order)
}

/// Simple dry-run output: print tasks, priorities, deps and planned order.
fn print_dry_run(file: &TaskFile) -> Result<()> {
    println!("rundag dry-run");
    println!("  scheduler.concurrency = {}", file.scheduler.concurrency);
    println!(
        "  scheduler.failure_policy = {:?}",
        file.scheduler.failure_policy
    );
    println!();

    println!("tasks ({}):", file.task.len());
    for (name, task) in file.tasks() {
        println!("  - {name}");
        println!("      cmd: {}", task.cmd);
        println!("      priority: {}", task.priority);
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
    }
    println!();

    let order = planned_order(file)?;
    println!("dispatch order (concurrency 1):");
    for (i, name) in order.iter().enumerate() {
        println!("  {}. {name}", i + 1);
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn print_event(event: &TaskEvent) {
    match event {
        TaskEvent::Dispatched { id, priority } => println!("[start] {id} (priority {priority})"),
        TaskEvent::Settled {
            id,
            outcome: TaskOutcome::Success,
        } => println!("[done]  {id}"),
        TaskEvent::Settled {
            id,
            outcome: TaskOutcome::Failed(reason),
        } => println!("[fail]  {id}: {reason}"),
        TaskEvent::Skipped { id, upstream } => println!("[skip]  {id} (after {upstream} failed)"),
    }
}

fn print_summary(report: &DrainReport) {
    println!();
    println!(
        "{} succeeded, {} failed, {} skipped",
        report.succeeded().len(),
        report.failed().len(),
        report.skipped.len()
    );
    for (id, reason) in report.failed() {
        println!("  failed: {id}: {reason}");
    }
}
