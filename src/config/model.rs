use std::collections::BTreeMap;

use serde::Deserialize;

use crate::errors::{Result, SchedulerError};
use crate::types::FailurePolicy;

/// Settings for a [`crate::engine::TaskPool`].
///
/// Also the `[scheduler]` section of a task file:
///
/// ```toml
/// [scheduler]
/// concurrency = 2
/// failure_policy = "release"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of tasks running at once. Must be >= 1.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// `"release"` (default) or `"block"`; see [`FailurePolicy`].
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Buffer size of the task event broadcast channel. Slow subscribers
    /// lag past this many events.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_concurrency() -> usize {
    1
}

fn default_event_capacity() -> usize {
    256
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            failure_policy: FailurePolicy::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl SchedulerConfig {
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Self::default()
        }
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(SchedulerError::ConfigError(
                "[scheduler].concurrency must be >= 1 (got 0)".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(SchedulerError::ConfigError(
                "[scheduler].event_capacity must be >= 1 (got 0)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Task file exactly as deserialized, before semantic validation.
///
/// ```toml
/// [scheduler]
/// concurrency = 2
///
/// [task.fetch]
/// cmd = "git fetch"
///
/// [task.build]
/// cmd = "make"
/// priority = 2
/// after = ["fetch"]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTaskFile {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// All tasks from `[task.<name>]`, keyed by task id.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A validated task file: at least one task, every `after` entry names a
/// task, and the dependencies form a DAG.
///
/// Construct with `TaskFile::try_from(raw)` or
/// [`crate::config::load_and_validate`].
#[derive(Debug, Clone)]
pub struct TaskFile {
    pub scheduler: SchedulerConfig,
    pub task: BTreeMap<String, TaskConfig>,
}

impl TaskFile {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerConfig,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self { scheduler, task }
    }

    /// Tasks in registration order (task id order).
    pub fn tasks(&self) -> impl Iterator<Item = (&str, &TaskConfig)> {
        self.task.iter().map(|(name, cfg)| (name.as_str(), cfg))
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Shell command to execute.
    pub cmd: String,

    /// Higher runs first among ready tasks. Defaults to 0.
    #[serde(default)]
    pub priority: i64,

    /// Tasks that must settle before this one may start.
    #[serde(default)]
    pub after: Vec<String>,
}
