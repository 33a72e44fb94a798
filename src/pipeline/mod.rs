//! The two batch pipelines.
//!
//! - [`AccountPipeline`] creates accounts with avatars (`users generate`)
//! - [`FieldDataPipeline`] fills every custom field of every user (`users generate_data`)
//!
//! Both run strictly in sequence, one item at a time, and report through a
//! [`crate::batch::ProgressObserver`] supplied by the caller.

pub mod accounts;
pub mod field_data;

pub use accounts::{attempt_count, AccountPipeline, GenerateAccounts, DEFAULT_ACCOUNT_COUNT};
pub use field_data::FieldDataPipeline;
