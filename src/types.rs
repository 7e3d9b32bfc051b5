use std::str::FromStr;

use serde::Deserialize;

/// What a failed task means for the tasks that depend on it.
///
/// - `Release`: a failure still counts as "settled"; dependents are released
///   and run as if the dependency had succeeded (default behaviour).
/// - `Block`: dependents of a failed task, and their dependents in turn, are
///   skipped and never run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    Release,
    Block,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Release
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "release" => Ok(FailurePolicy::Release),
            "block" => Ok(FailurePolicy::Block),
            other => Err(format!(
                "invalid failure_policy: {other} (expected \"release\" or \"block\")"
            )),
        }
    }
}
