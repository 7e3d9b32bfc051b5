// src/engine/report.rs

use crate::engine::{TaskEvent, TaskId, TaskOutcome};

/// What happened to tasks between two successful drains.
///
/// A second drain reports only the work dispatched, settled or skipped
/// after the first one returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Task ids in the order they took a concurrency slot.
    pub dispatch_order: Vec<TaskId>,
    /// Outcomes in the order tasks settled.
    pub outcomes: Vec<(TaskId, TaskOutcome)>,
    /// Tasks that never ran because an upstream task failed (block policy).
    pub skipped: Vec<TaskId>,
    /// Every dispatch, settlement and skip, interleaved as they happened.
    pub timeline: Vec<TaskEvent>,
}

impl DrainReport {
    pub fn from_timeline(timeline: Vec<TaskEvent>) -> Self {
        let mut report = DrainReport::default();

        for event in &timeline {
            match event {
                TaskEvent::Dispatched { id, .. } => report.dispatch_order.push(id.clone()),
                TaskEvent::Settled { id, outcome } => {
                    report.outcomes.push((id.clone(), outcome.clone()))
                }
                TaskEvent::Skipped { id, .. } => report.skipped.push(id.clone()),
            }
        }

        report.timeline = timeline;
        report
    }

    pub fn succeeded(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_success())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Failed tasks with their failure message.
    pub fn failed(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(id, o)| match o {
                TaskOutcome::Failed(msg) => Some((id.as_str(), msg.as_str())),
                TaskOutcome::Success => None,
            })
            .collect()
    }

    pub fn outcome_of(&self, id: &str) -> Option<&TaskOutcome> {
        self.outcomes
            .iter()
            .find(|(task, _)| task == id)
            .map(|(_, o)| o)
    }

    /// `true` if every task that was dispatched succeeded and none was skipped.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.outcomes.iter().all(|(_, o)| o.is_success())
    }
}
