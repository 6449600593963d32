//! Tooling Layer
//!
//! Command-line interface and output formatting for the `roomwatch` binary.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands};
