//! CLI module for commentd
//!
//! Provides command-line interface for:
//! - serve: Run the HTTP server
//! - check: Replay and verify the comment log
//! - compact: Drop superseded records from the log
//! - export / import: Move comments in and out as JSON

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{build_service, check, compact, export, import, run, run_command, serve};
pub use errors::{CliError, CliResult};
pub use io::{read_json_file, write_response};
