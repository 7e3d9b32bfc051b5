// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::engine::TaskId;

/// Pending-dependency counters plus the reverse (dependents) index.
///
/// Entries are created lazily, so `dependents` may hold an id that has not
/// been registered yet: a task may name a dependency before that dependency
/// exists, and it resolves once the dependency is registered and settles.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Unresolved dependency count per registered task.
    pending: HashMap<TaskId, usize>,
    /// Direct dependencies, as declared.
    deps: HashMap<TaskId, Vec<TaskId>>,
    /// Direct dependents: tasks that named the key as a dependency.
    dependents: HashMap<TaskId, Vec<TaskId>>,
    /// Tasks whose settlement has already been propagated.
    settled: HashSet<TaskId>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`'s dependencies and return its initial pending count.
    ///
    /// Every dependency is indexed as a dependent edge, but only those that
    /// have not settled yet count as pending.
    pub fn declare_dependencies(&mut self, id: &str, deps: &[TaskId]) -> usize {
        for dep in deps {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .push(id.to_string());
        }

        let pending = deps.iter().filter(|d| !self.settled.contains(*d)).count();
        self.pending.insert(id.to_string(), pending);
        self.deps.insert(id.to_string(), deps.to_vec());

        debug!(task = %id, deps = deps.len(), pending, "declared dependencies");
        pending
    }

    /// Propagate the settlement of `id` to its dependents.
    ///
    /// Decrements the pending count of each dependent and returns those whose
    /// count just reached zero, in the order they were registered. A second
    /// call for the same id is a no-op and returns nothing.
    pub fn resolve_completion(&mut self, id: &str) -> Vec<TaskId> {
        if !self.settled.insert(id.to_string()) {
            return Vec::new();
        }

        let Some(dependents) = self.dependents.get(id) else {
            return Vec::new();
        };

        let mut released = Vec::new();
        for dependent in dependents {
            if let Some(count) = self.pending.get_mut(dependent) {
                if *count == 0 {
                    continue;
                }
                *count -= 1;
                if *count == 0 {
                    released.push(dependent.clone());
                }
            }
        }

        released
    }

    pub fn pending_count(&self, id: &str) -> Option<usize> {
        self.pending.get(id).copied()
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, id: &str) -> &[TaskId] {
        self.deps.get(id).map(|d| d.as_slice()).unwrap_or(&[])
    }

    /// Immediate dependents of a task (registered or not).
    pub fn dependents_of(&self, id: &str) -> &[TaskId] {
        self.dependents
            .get(id)
            .map(|d| d.as_slice())
            .unwrap_or(&[])
    }

    /// Dependencies of `id` that have not settled yet.
    pub fn unresolved_dependencies_of(&self, id: &str) -> Vec<&TaskId> {
        self.dependencies_of(id)
            .iter()
            .filter(|d| !self.settled.contains(*d))
            .collect()
    }
}
