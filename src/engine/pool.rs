// src/engine/pool.rs

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::dag::{ScheduledTask, Scheduler, TaskRunState};
use crate::engine::{DrainReport, TaskEvent, TaskId, TaskOutcome};
use crate::errors::{Result, SchedulerError};
use crate::exec::{Job, boxed_job, run_job};

/// A task ready to be handed to [`TaskPool::add_tasks`].
pub struct TaskSpec {
    pub id: TaskId,
    pub job: Job,
    pub priority: i64,
    pub dependencies: Vec<TaskId>,
}

impl TaskSpec {
    pub fn new<F, Fut, D, S>(
        id: impl Into<TaskId>,
        executor: F,
        priority: i64,
        dependencies: D,
    ) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
        D: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        Self {
            id: id.into(),
            job: boxed_job(executor),
            priority,
            dependencies: dependencies.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Point-in-time counters, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub concurrency_limit: usize,
    pub running: usize,
    pub ready: usize,
    pub blocked: usize,
    pub registered: usize,
}

struct Shared {
    /// The single synchronization boundary: registration, dispatch and
    /// settlement all mutate the core under this lock, never across an await.
    core: Mutex<Scheduler<Job>>,
    /// Bumped after every settlement so `drain` can re-check quiescence.
    settlements: watch::Sender<u64>,
    events: broadcast::Sender<TaskEvent>,
}

/// Concurrency-limited, dependency-ordered, priority-aware task pool.
///
/// This is the async shell around [`Scheduler`]: it stores executors in the
/// core, launches whatever the core dispatches on tokio, and feeds each
/// settlement back in, which may release and launch more work.
///
/// Cloning yields another handle to the same pool.
#[derive(Clone)]
pub struct TaskPool {
    shared: Arc<Shared>,
}

impl fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskPool")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl TaskPool {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        let core = Scheduler::new(config.concurrency, config.failure_policy)?;
        let (settlements, _) = watch::channel(0);
        let (events, _) = broadcast::channel(config.event_capacity);

        debug!(
            concurrency = config.concurrency,
            failure_policy = ?config.failure_policy,
            "task pool created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                settlements,
                events,
            }),
        })
    }

    /// Pool with the given concurrency limit and default settings otherwise.
    pub fn with_concurrency(limit: usize) -> Result<Self> {
        Self::new(SchedulerConfig::with_concurrency(limit))
    }

    /// Register a task.
    ///
    /// `dependencies` may name tasks that are not registered yet. If the task
    /// can run right away and a slot is free, its executor is launched before
    /// this returns.
    ///
    /// Fails with [`SchedulerError::DuplicateTaskId`] if `id` is taken, or
    /// [`SchedulerError::NoRuntime`] outside a tokio runtime. Either way the
    /// pool is left unchanged.
    pub fn add_task<F, Fut, D, S>(
        &self,
        id: impl Into<TaskId>,
        executor: F,
        priority: i64,
        dependencies: D,
    ) -> Result<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
        D: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        let runtime = current_runtime()?;
        let id = id.into();
        let deps: Vec<TaskId> = dependencies.into_iter().map(Into::into).collect();

        let scheduled = {
            let mut core = self.lock_core();
            let mark = core.timeline().len();
            core.register(id, boxed_job(executor), priority, deps)?;
            let scheduled = core.dispatch_ready();
            self.publish(&core, mark);
            scheduled
        };

        self.launch(&runtime, scheduled);
        Ok(())
    }

    /// Register several tasks as one step, dispatching only once all of them
    /// are in.
    ///
    /// Ready tasks from the batch compete on priority for the free slots,
    /// instead of the first one registered taking a free slot before the
    /// rest are seen. Stops at the first duplicate id: tasks before it stay
    /// registered and are dispatched, the rest of the batch is dropped.
    pub fn add_tasks<I>(&self, tasks: I) -> Result<()>
    where
        I: IntoIterator<Item = TaskSpec>,
    {
        let runtime = current_runtime()?;
        let (scheduled, outcome) = {
            let mut core = self.lock_core();
            let mark = core.timeline().len();
            let mut outcome = Ok(());
            for spec in tasks {
                let TaskSpec {
                    id,
                    job,
                    priority,
                    dependencies,
                } = spec;
                if let Err(e) = core.register(id, job, priority, dependencies) {
                    outcome = Err(e);
                    break;
                }
            }
            let scheduled = core.dispatch_ready();
            self.publish(&core, mark);
            (scheduled, outcome)
        };

        self.launch(&runtime, scheduled);
        outcome
    }

    /// Wait until nothing is ready and nothing is running.
    ///
    /// Returns a [`DrainReport`] of everything dispatched, settled or skipped
    /// since the previous successful drain, once every registered task has
    /// settled (or was skipped). If tasks are left blocked forever, reports
    /// them as [`SchedulerError::UnknownDependency`] or
    /// [`SchedulerError::DependencyCycle`] instead of hanging. In that case
    /// the events are kept: [`TaskPool::progress`] shows them, and
    /// registering the missing tasks and draining again resumes the stranded
    /// tasks and reports everything since the last successful drain.
    pub async fn drain(&self) -> Result<DrainReport> {
        let mut settlements = self.shared.settlements.subscribe();

        loop {
            {
                let mut core = self.lock_core();
                if core.is_quiescent() {
                    core.check_stranded()?;
                    let report = DrainReport::from_timeline(core.take_timeline());
                    info!(
                        tasks = core.task_count(),
                        settled = report.outcomes.len(),
                        skipped = report.skipped.len(),
                        "pool drained"
                    );
                    return Ok(report);
                }
                debug!(
                    running = core.running(),
                    ready = core.ready_len(),
                    "drain: waiting for in-flight tasks"
                );
            }

            if settlements.changed().await.is_err() {
                return Err(SchedulerError::Other(anyhow::anyhow!(
                    "settlement channel closed while draining"
                )));
            }
        }
    }

    /// Receive a [`TaskEvent`] for every dispatch, settlement and skip from
    /// now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.shared.events.subscribe()
    }

    /// Events since the last successful drain, without consuming them.
    ///
    /// After a drain fails on stranded tasks, this still shows how every
    /// task that did run ended.
    pub fn progress(&self) -> DrainReport {
        DrainReport::from_timeline(self.lock_core().timeline().to_vec())
    }

    pub fn state_of(&self, id: &str) -> Option<TaskRunState> {
        self.lock_core().state_of(id)
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let core = self.lock_core();
        PoolSnapshot {
            concurrency_limit: core.concurrency_limit(),
            running: core.running(),
            ready: core.ready_len(),
            blocked: core.blocked().count(),
            registered: core.task_count(),
        }
    }

    fn lock_core(&self) -> MutexGuard<'_, Scheduler<Job>> {
        // Executors never run under this lock, so a poisoned guard can only
        // come from a panic inside the scheduler itself; keep going.
        self.shared
            .core
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Broadcast timeline entries appended since `mark`. Called with the lock
    /// held so subscribers see events in the order they were applied.
    fn publish(&self, core: &Scheduler<Job>, mark: usize) {
        for event in &core.timeline()[mark..] {
            // No subscribers is fine.
            let _ = self.shared.events.send(event.clone());
        }
    }

    fn launch(&self, runtime: &Handle, tasks: Vec<ScheduledTask<Job>>) {
        for task in tasks {
            let pool = self.clone();
            let handle = runtime.clone();
            runtime.spawn(async move {
                let outcome = run_job(&task.id, task.payload).await;
                pool.settle(&handle, &task.id, outcome);
            });
        }
    }

    /// Completion path: settle in the core, release dependents, refill free
    /// slots, then launch.
    fn settle(&self, runtime: &Handle, id: &str, outcome: TaskOutcome) {
        let scheduled = {
            let mut core = self.lock_core();
            let mark = core.timeline().len();
            let step = core.complete(id, outcome);
            if !step.newly_ready.is_empty() || !step.newly_skipped.is_empty() {
                debug!(
                    task = %id,
                    released = ?step.newly_ready,
                    skipped = ?step.newly_skipped,
                    "settlement propagated"
                );
            }
            let scheduled = core.dispatch_ready();
            self.publish(&core, mark);
            scheduled
        };

        self.launch(runtime, scheduled);
        self.shared.settlements.send_modify(|n| *n += 1);
    }
}

/// Handle of the runtime the caller is on. Taken before the core is touched:
/// every task the core marks running must be launched.
fn current_runtime() -> Result<Handle> {
    Handle::try_current().map_err(|_| SchedulerError::NoRuntime)
}
