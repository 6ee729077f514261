//! CLI, configuration resolution and commands
//!
//! This crate provides the `wp-ics-gen` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{CliError, CliResult};
