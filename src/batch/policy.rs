//! What a batch does with per-item failures.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Per-item failure handling.
///
/// Failures never stop a batch under `Ignore` or `Collect`. `Abort` ends the
/// batch at the first item that failed outright; degraded items (an account
/// created without its avatar) are collected but do not abort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log at debug level and move on.
    #[default]
    Ignore,
    /// Keep every failure in the batch result.
    Collect,
    /// Stop at the first failed item.
    Abort,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Ignore => "ignore",
            FailurePolicy::Collect => "collect",
            FailurePolicy::Abort => "abort",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(FailurePolicy::Ignore),
            "collect" => Ok(FailurePolicy::Collect),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(format!(
                "unknown failure policy '{}': expected ignore, collect or abort",
                other
            )),
        }
    }
}

/// How one work item ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded,
    /// Done, but an optional step failed.
    Degraded(String),
    /// Nothing to do for this item.
    Skipped(String),
    Failed(String),
}

/// Severity of a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Degraded,
    Failed,
}

/// A failure kept by [`FailurePolicy::Collect`] or [`FailurePolicy::Abort`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Zero-based position of the item in the batch.
    pub index: usize,
    pub label: String,
    pub kind: FailureKind,
    pub reason: String,
}
