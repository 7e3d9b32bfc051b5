// src/dag/diagnostics.rs

//! Explains why tasks are still blocked once the scheduler has gone quiet.
//!
//! At quiescence nothing is ready and nothing is running, so a blocked task
//! can only be waiting on:
//! - an id that was never registered, or
//! - another blocked task, and following those edges must end either at a
//!   task with an unregistered dependency or inside a cycle.

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::dag::graph::DependencyGraph;
use crate::dag::registry::TaskRegistry;
use crate::dag::task_info::RunState;
use crate::engine::TaskId;
use crate::errors::{Result, SchedulerError};

/// Report stranded tasks as a structured error.
///
/// Unknown dependencies take precedence over cycles; the earliest-registered
/// offender is named.
pub fn diagnose_stranded<T>(registry: &TaskRegistry<T>, graph: &DependencyGraph) -> Result<()> {
    let stranded: Vec<&TaskId> = registry
        .iter()
        .filter(|info| info.state == RunState::Blocked)
        .map(|info| &info.id)
        .collect();

    if stranded.is_empty() {
        return Ok(());
    }

    warn!(count = stranded.len(), ?stranded, "tasks left blocked at drain");

    for id in &stranded {
        let missing: Vec<TaskId> = graph
            .unresolved_dependencies_of(id)
            .into_iter()
            .filter(|dep| !registry.contains(dep))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(SchedulerError::UnknownDependency {
                task: (*id).clone(),
                missing,
                stranded: stranded.iter().map(|s| (*s).clone()).collect(),
            });
        }
    }

    Err(SchedulerError::DependencyCycle(find_cycle(
        registry, graph, &stranded,
    )))
}

/// Find a dependency cycle among the stranded tasks.
///
/// Edge direction: dep -> task, restricted to unresolved edges between
/// stranded tasks. Members are returned in registration order.
fn find_cycle<T>(
    registry: &TaskRegistry<T>,
    graph: &DependencyGraph,
    stranded: &[&TaskId],
) -> Vec<TaskId> {
    let mut dag: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in stranded {
        dag.add_node(id.as_str());
    }
    for id in stranded {
        for dep in graph.unresolved_dependencies_of(id) {
            if dag.contains_node(dep.as_str()) {
                dag.add_edge(dep.as_str(), id.as_str(), ());
            }
        }
    }

    let seq_of = |id: &str| registry.lookup(id).map(|i| i.seq).unwrap_or(u64::MAX);

    let mut cycles: Vec<Vec<&str>> = tarjan_scc(&dag)
        .into_iter()
        .filter(|scc| scc.len() > 1 || dag.contains_edge(scc[0], scc[0]))
        .collect();

    for scc in cycles.iter_mut() {
        scc.sort_by_key(|id| seq_of(*id));
    }
    cycles.sort_by_key(|scc| seq_of(scc[0]));

    match cycles.into_iter().next() {
        Some(cycle) => cycle.into_iter().map(str::to_string).collect(),
        // Unreachable when every dependency is registered; report everything.
        None => stranded.iter().map(|s| (*s).clone()).collect(),
    }
}
