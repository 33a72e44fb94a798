//! Command-line interface for userforge.
//!
//! Provides the `users` batch commands plus field catalog and site management.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
