//! Command-line interface: `run`, `scan`, and `check-tools` subcommands.

mod commands;

pub use commands::{Cli, Commands, run_command};
