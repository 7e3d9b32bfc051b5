// src/dag/ready_queue.rs

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::engine::TaskId;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ReadyEntry {
    priority: i64,
    seq: u64,
    id: TaskId,
}

impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority wins, then the lower (earlier) sequence.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Tasks with no unresolved dependencies that have not been dispatched yet.
///
/// Pops in strictly descending priority; equal priorities come out in
/// ascending registration sequence (first registered, first served).
#[derive(Debug, Default)]
pub struct ReadyQueue {
    heap: BinaryHeap<ReadyEntry>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: TaskId, priority: i64, seq: u64) {
        self.heap.push(ReadyEntry { priority, seq, id });
    }

    pub fn pop_highest(&mut self) -> Option<TaskId> {
        self.heap.pop().map(|e| e.id)
    }

    pub fn peek_highest(&self) -> Option<&str> {
        self.heap.peek().map(|e| e.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
