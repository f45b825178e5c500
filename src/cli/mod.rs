//! CLI module for modshelf
//!
//! Provides the command-line interface:
//! - init: write a default configuration file
//! - serve: boot the catalogue server

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{init, run, run_command, serve, Config};
pub use errors::{CliError, CliResult};
