use tracing::{debug, info, warn};

use crate::dag::diagnostics::diagnose_stranded;
use crate::dag::graph::DependencyGraph;
use crate::dag::ready_queue::ReadyQueue;
use crate::dag::registry::TaskRegistry;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskEvent, TaskId, TaskOutcome};
use crate::errors::{Result, SchedulerError};
use crate::types::FailurePolicy;

/// Pure scheduling core.
///
/// Owns the registry, the dependency graph, the ready queue and the running
/// counter, and decides:
/// - when a registered task becomes ready (all dependencies settled)
/// - which ready task runs next (priority, then registration order)
/// - how many tasks may run at once (the concurrency limit)
/// - what a settlement releases (or skips, under [`FailurePolicy::Block`])
///
/// It never launches anything itself: [`Scheduler::dispatch_ready`] hands the
/// executor payloads back to the caller. It has no tokio types and performs
/// no IO, so it can be stepped by hand in tests.
#[derive(Debug)]
pub struct Scheduler<T> {
    registry: TaskRegistry<T>,
    graph: DependencyGraph,
    ready: ReadyQueue,
    concurrency_limit: usize,
    running: usize,
    failure_policy: FailurePolicy,
    /// Every dispatch, settlement and skip since the last
    /// [`Scheduler::take_timeline`], in the order it happened.
    timeline: Vec<TaskEvent>,
}

impl<T> Scheduler<T> {
    pub fn new(concurrency_limit: usize, failure_policy: FailurePolicy) -> Result<Self> {
        if concurrency_limit == 0 {
            return Err(SchedulerError::ConfigError(
                "concurrency limit must be >= 1 (got 0)".to_string(),
            ));
        }

        Ok(Self {
            registry: TaskRegistry::new(),
            graph: DependencyGraph::new(),
            ready: ReadyQueue::new(),
            concurrency_limit,
            running: 0,
            failure_policy,
            timeline: Vec::new(),
        })
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn running(&self) -> usize {
        self.running
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    pub fn task_count(&self) -> usize {
        self.registry.len()
    }

    pub fn lookup(&self, id: &str) -> Option<&TaskInfo> {
        self.registry.lookup(id)
    }

    pub fn state_of(&self, id: &str) -> Option<TaskRunState> {
        self.registry.lookup(id).map(|info| (&info.state).into())
    }

    pub fn pending_count(&self, id: &str) -> Option<usize> {
        self.graph.pending_count(id)
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn timeline(&self) -> &[TaskEvent] {
        &self.timeline
    }

    /// Hand over the events recorded so far and start a fresh timeline.
    pub fn take_timeline(&mut self) -> Vec<TaskEvent> {
        std::mem::take(&mut self.timeline)
    }

    /// Nothing is ready and nothing is running, so no further progress is
    /// possible without a new registration.
    pub fn is_quiescent(&self) -> bool {
        self.ready.is_empty() && self.running == 0
    }

    /// Tasks still `Blocked`, in registration order.
    pub fn blocked(&self) -> impl Iterator<Item = &TaskInfo> {
        self.registry
            .iter()
            .filter(|info| info.state == RunState::Blocked)
    }

    /// Once quiescent, explain any task left permanently blocked.
    ///
    /// Returns `Ok(())` when nothing is blocked, otherwise
    /// [`SchedulerError::UnknownDependency`] or
    /// [`SchedulerError::DependencyCycle`].
    pub fn check_stranded(&self) -> Result<()> {
        diagnose_stranded(&self.registry, &self.graph)
    }

    /// Register a task and its dependencies.
    ///
    /// A task with no unsettled dependencies goes straight into the ready
    /// queue. Under [`FailurePolicy::Block`] a task depending on a failed or
    /// skipped task is skipped on the spot.
    ///
    /// Fails with [`SchedulerError::DuplicateTaskId`] without touching any
    /// state if `id` is already registered.
    pub fn register(
        &mut self,
        id: TaskId,
        payload: T,
        priority: i64,
        deps: Vec<TaskId>,
    ) -> Result<TaskRunState> {
        let deps = dedup_preserving_order(deps);

        let poisoned_by = match self.failure_policy {
            FailurePolicy::Block => deps
                .iter()
                .find(|d| {
                    self.registry
                        .lookup(d)
                        .is_some_and(|info| info.state.poisons_dependents())
                })
                .cloned(),
            FailurePolicy::Release => None,
        };

        let seq = self.registry.register(id.clone(), payload, priority, deps.clone())?;
        let pending = self.graph.declare_dependencies(&id, &deps);

        if let Some(upstream) = poisoned_by {
            self.skip_from(&id, upstream);
        } else if pending == 0 {
            self.mark_ready(&id, priority, seq);
        }

        Ok(self.state_of(&id).unwrap_or(TaskRunState::Blocked))
    }

    /// Pop ready tasks while there is a free slot, mark them `Running` and
    /// return them for launch.
    pub fn dispatch_ready(&mut self) -> Vec<ScheduledTask<T>> {
        let mut scheduled = Vec::new();

        while self.running < self.concurrency_limit {
            let Some(id) = self.ready.pop_highest() else {
                break;
            };

            let Some(payload) = self.registry.take_payload(&id) else {
                warn!(task = %id, "ready task has no executor left; skipping dispatch");
                continue;
            };

            let Some(info) = self.registry.lookup_mut(&id) else {
                warn!(task = %id, "ready task missing from registry");
                continue;
            };

            info.state = RunState::Running;
            self.running += 1;

            info!(
                task = %info.id,
                priority = info.priority,
                running = self.running,
                limit = self.concurrency_limit,
                "dispatching task"
            );

            self.timeline.push(TaskEvent::Dispatched {
                id: info.id.clone(),
                priority: info.priority,
            });

            scheduled.push(ScheduledTask {
                id: info.id.clone(),
                priority: info.priority,
                seq: info.seq,
                payload,
            });
        }

        scheduled
    }

    /// Settle a running task and propagate to its dependents.
    ///
    /// Frees the concurrency slot, then either promotes dependents whose
    /// last dependency this was, or (failure under [`FailurePolicy::Block`])
    /// skips every transitive dependent still waiting. Settlements for tasks
    /// that are not `Running` are ignored.
    pub fn complete(&mut self, id: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(info) = self.registry.lookup_mut(id) else {
            warn!(task = %id, "completion for unknown task; ignoring");
            return self.idle_step();
        };

        if info.state != RunState::Running {
            warn!(
                task = %id,
                state = ?info.state,
                "completion for task that is not running; ignoring"
            );
            return self.idle_step();
        }

        info.state = RunState::from(&outcome);
        self.running -= 1;

        match &outcome {
            TaskOutcome::Success => {
                info!(task = %id, running = self.running, "task succeeded");
            }
            TaskOutcome::Failed(reason) => {
                warn!(
                    task = %id,
                    running = self.running,
                    policy = ?self.failure_policy,
                    %reason,
                    "task failed"
                );
            }
        }

        self.timeline.push(TaskEvent::Settled {
            id: id.to_string(),
            outcome: outcome.clone(),
        });

        let released = self.graph.resolve_completion(id);
        let mut step = SchedulerStep::default();

        if !outcome.is_success() && self.failure_policy == FailurePolicy::Block {
            step.newly_skipped = self.skip_dependents_of(id);
        } else {
            for dependent in released {
                let Some(info) = self.registry.lookup(&dependent) else {
                    continue;
                };
                if info.state != RunState::Blocked {
                    continue;
                }
                let (priority, seq) = (info.priority, info.seq);
                self.mark_ready(&dependent, priority, seq);
                step.newly_ready.push(dependent);
            }
        }

        step.quiescent = self.is_quiescent();
        step
    }

    fn idle_step(&self) -> SchedulerStep {
        SchedulerStep {
            quiescent: self.is_quiescent(),
            ..SchedulerStep::default()
        }
    }

    fn mark_ready(&mut self, id: &str, priority: i64, seq: u64) {
        if let Some(info) = self.registry.lookup_mut(id) {
            info.state = RunState::Ready;
        }
        debug!(task = %id, priority, seq, "dependencies settled; task ready");
        self.ready.push(id.to_string(), priority, seq);
    }

    /// Skip every still-blocked task downstream of `root`.
    fn skip_dependents_of(&mut self, root: &str) -> Vec<TaskId> {
        let mut newly_skipped = Vec::new();
        let mut stack: Vec<(TaskId, TaskId)> = self
            .graph
            .dependents_of(root)
            .iter()
            .map(|d| (d.clone(), root.to_string()))
            .collect();

        while let Some((id, upstream)) = stack.pop() {
            if self.mark_skipped(&id, upstream) {
                stack.extend(
                    self.graph
                        .dependents_of(&id)
                        .iter()
                        .map(|d| (d.clone(), id.clone())),
                );
                newly_skipped.push(id);
            }
        }

        newly_skipped
    }

    /// Skip `id` (a freshly registered task) and everything already waiting
    /// on it.
    fn skip_from(&mut self, id: &str, upstream: TaskId) {
        if self.mark_skipped(id, upstream) {
            self.skip_dependents_of(id);
        }
    }

    /// Returns `true` if the task was blocked and is now skipped.
    fn mark_skipped(&mut self, id: &str, upstream: TaskId) -> bool {
        let Some(info) = self.registry.lookup_mut(id) else {
            return false;
        };
        if info.state != RunState::Blocked {
            return false;
        }

        info!(task = %id, upstream = %upstream, "skipping task after upstream failure");
        info.state = RunState::Skipped {
            upstream: upstream.clone(),
        };
        self.timeline.push(TaskEvent::Skipped {
            id: id.to_string(),
            upstream,
        });
        // Skipped counts as settled so later registrations do not wait on it.
        self.graph.resolve_completion(id);
        true
    }
}

fn dedup_preserving_order(deps: Vec<TaskId>) -> Vec<TaskId> {
    let mut seen = std::collections::HashSet::new();
    deps.into_iter().filter(|d| seen.insert(d.clone())).collect()
}
