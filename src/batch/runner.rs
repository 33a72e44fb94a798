//! Batch execution state machine.
//!
//! ```text
//! Idle --begin--> Running --complete--> Completed
//!   |                |
//!   +--refuse--+     +--record (Abort policy)--+
//!              v                               v
//!           Aborted <--------------------------+
//! ```
//!
//! The runner counts outcomes, forwards every attempt to the progress
//! observer and applies the [`FailurePolicy`]. It does not do any work itself.

use serde::Serialize;

use super::policy::{FailureKind, FailurePolicy, ItemFailure, ItemOutcome};
use super::progress::ProgressObserver;
use crate::error::BatchError;

/// Lifecycle state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Aborted,
}

impl BatchState {
    pub fn can_transition(self, to: BatchState) -> bool {
        matches!(
            (self, to),
            (BatchState::Idle, BatchState::Running)
                | (BatchState::Idle, BatchState::Aborted)
                | (BatchState::Running, BatchState::Completed)
                | (BatchState::Running, BatchState::Aborted)
        )
    }
}

/// Summary of a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub label: String,
    /// Items planned when the batch began.
    pub total: usize,
    pub attempted: usize,
    /// Items that succeeded, degraded ones included.
    pub succeeded: usize,
    pub skipped: usize,
    /// Failures kept by the policy. Always empty under [`FailurePolicy::Ignore`].
    pub failures: Vec<ItemFailure>,
    /// Operator-facing success notice.
    pub message: String,
}

/// Drives one batch from `Idle` to `Completed` or `Aborted`.
pub struct BatchRunner<'a> {
    label: String,
    policy: FailurePolicy,
    observer: &'a mut dyn ProgressObserver,
    state: BatchState,
    total: usize,
    attempted: usize,
    succeeded: usize,
    skipped: usize,
    failures: Vec<ItemFailure>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        label: impl Into<String>,
        policy: FailurePolicy,
        observer: &'a mut dyn ProgressObserver,
    ) -> Self {
        Self {
            label: label.into(),
            policy,
            observer,
            state: BatchState::Idle,
            total: 0,
            attempted: 0,
            succeeded: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    /// Starts the batch with `total` planned items.
    pub fn begin(&mut self, total: usize) -> Result<(), BatchError> {
        self.transition(BatchState::Running)?;
        self.total = total;
        self.observer.on_start(&self.label, total);
        Ok(())
    }

    /// Refuses the batch before any work, returning the error to surface.
    ///
    /// The observer sees an abort but no start or ticks.
    pub fn refuse(&mut self, error: impl Into<BatchError>) -> BatchError {
        let error = error.into();
        if self.transition(BatchState::Aborted).is_ok() {
            self.observer.on_abort(&error);
        }
        error
    }

    /// Records the outcome of the next item.
    ///
    /// Returns [`BatchError::ItemAborted`] when the policy stops the batch.
    pub fn record(
        &mut self,
        label: impl Into<String>,
        outcome: ItemOutcome,
    ) -> Result<(), BatchError> {
        if self.state != BatchState::Running {
            return Err(self.invalid(BatchState::Running));
        }

        let index = self.attempted;
        self.attempted += 1;
        self.observer.on_tick();

        let label = label.into();
        let (kind, reason) = match outcome {
            ItemOutcome::Succeeded => {
                self.succeeded += 1;
                return Ok(());
            }
            ItemOutcome::Skipped(reason) => {
                self.skipped += 1;
                tracing::debug!(batch = %self.label, item = %label, reason = %reason, "Item skipped");
                return Ok(());
            }
            ItemOutcome::Degraded(reason) => {
                self.succeeded += 1;
                (FailureKind::Degraded, reason)
            }
            ItemOutcome::Failed(reason) => (FailureKind::Failed, reason),
        };

        tracing::debug!(
            batch = %self.label,
            item = %label,
            kind = ?kind,
            reason = %reason,
            "Item did not fully succeed"
        );

        match self.policy {
            FailurePolicy::Ignore => Ok(()),
            FailurePolicy::Collect => {
                self.failures.push(ItemFailure {
                    index,
                    label,
                    kind,
                    reason,
                });
                Ok(())
            }
            FailurePolicy::Abort => {
                self.failures.push(ItemFailure {
                    index,
                    label: label.clone(),
                    kind,
                    reason: reason.clone(),
                });
                if kind == FailureKind::Degraded {
                    return Ok(());
                }
                self.transition(BatchState::Aborted)?;
                let error = BatchError::ItemAborted {
                    index,
                    label,
                    reason,
                };
                self.observer.on_abort(&error);
                Err(error)
            }
        }
    }

    /// Finishes the batch with its success notice.
    pub fn complete(mut self, message: impl Into<String>) -> Result<BatchResult, BatchError> {
        self.transition(BatchState::Completed)?;
        let result = BatchResult {
            label: self.label.clone(),
            total: self.total,
            attempted: self.attempted,
            succeeded: self.succeeded,
            skipped: self.skipped,
            failures: std::mem::take(&mut self.failures),
            message: message.into(),
        };
        self.observer.on_finish(&result);
        Ok(result)
    }

    fn transition(&mut self, to: BatchState) -> Result<(), BatchError> {
        if !self.state.can_transition(to) {
            return Err(self.invalid(to));
        }
        self.state = to;
        Ok(())
    }

    fn invalid(&self, to: BatchState) -> BatchError {
        BatchError::InvalidTransition {
            from: format!("{:?}", self.state),
            to: format!("{:?}", to),
        }
    }
}
