//! Batch execution: state machine, failure policy and progress reporting.

pub mod policy;
pub mod progress;
pub mod runner;

pub use policy::{FailureKind, FailurePolicy, ItemFailure, ItemOutcome};
pub use progress::{
    ConsoleProgress, ProgressObserver, ProgressStyle, SilentProgress, TracingProgress,
};
pub use runner::{BatchResult, BatchRunner, BatchState};
