//! CLI module for aerosearch
//!
//! Provides command-line access to:
//! - resolve: one-shot query resolution
//! - columns: one-shot column selection resolution
//! - batch: line-delimited JSON requests from stdin

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{batch, columns, resolve, run, run_command, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_requests, write_error, write_response};
