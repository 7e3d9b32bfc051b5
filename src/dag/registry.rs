// src/dag/registry.rs

//! Task registry: identity, priority and executor payload of every task.

use std::collections::HashMap;

use tracing::debug;

use crate::dag::task_info::{RunState, TaskInfo};
use crate::engine::TaskId;
use crate::errors::{Result, SchedulerError};

#[derive(Debug)]
struct TaskEntry<T> {
    info: TaskInfo,
    /// Taken exactly once, when the task is dispatched.
    payload: Option<T>,
}

/// Owns every registered task. Ids are unique for the lifetime of the
/// registry; a settled task keeps its entry so later registrations can see
/// how it ended.
#[derive(Debug)]
pub struct TaskRegistry<T> {
    tasks: HashMap<TaskId, TaskEntry<T>>,
    /// Ids in registration order.
    order: Vec<TaskId>,
    next_seq: u64,
}

impl<T> Default for TaskRegistry<T> {
    fn default() -> Self {
        Self {
            tasks: HashMap::new(),
            order: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<T> TaskRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new task in the `Blocked` state and return its sequence number.
    ///
    /// Fails with [`SchedulerError::DuplicateTaskId`] if `id` is already
    /// present, in which case nothing is stored.
    pub fn register(
        &mut self,
        id: TaskId,
        payload: T,
        priority: i64,
        deps: Vec<TaskId>,
    ) -> Result<u64> {
        if self.tasks.contains_key(&id) {
            return Err(SchedulerError::DuplicateTaskId(id));
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        debug!(task = %id, priority, seq, ?deps, "registered task");

        self.order.push(id.clone());
        self.tasks.insert(
            id.clone(),
            TaskEntry {
                info: TaskInfo {
                    id,
                    priority,
                    seq,
                    deps,
                    state: RunState::Blocked,
                },
                payload: Some(payload),
            },
        );

        Ok(seq)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn lookup(&self, id: &str) -> Option<&TaskInfo> {
        self.tasks.get(id).map(|e| &e.info)
    }

    pub fn lookup_mut(&mut self, id: &str) -> Option<&mut TaskInfo> {
        self.tasks.get_mut(id).map(|e| &mut e.info)
    }

    /// Take the executor payload out of a task. Returns `None` if the task is
    /// unknown or was already dispatched.
    pub fn take_payload(&mut self, id: &str) -> Option<T> {
        self.tasks.get_mut(id).and_then(|e| e.payload.take())
    }

    /// All tasks, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskInfo> {
        self.order
            .iter()
            .filter_map(|id| self.tasks.get(id).map(|e| &e.info))
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }
}
