//! userforge: synthetic accounts and profile data for a user directory.
//!
//! This library provides the pieces behind the `userforge` CLI: random value
//! synthesis for custom profile fields, account provisioning with avatars,
//! and the batch runner that drives both over a [`store::UserStore`].

// Core modules
pub mod avatar;
pub mod batch;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod enumerator;
pub mod error;
pub mod pipeline;
pub mod provision;
pub mod store;
pub mod synth;

// Re-export commonly used types
pub use batch::{BatchResult, FailurePolicy};
pub use config::{ConfigError, ForgeConfig};
pub use error::{AvatarError, BatchError, PreconditionError, StoreError};
