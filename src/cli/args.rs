//! CLI argument definitions using clap
//!
//! Commands:
//! - aerosearch resolve --config <path> --query <text>
//! - aerosearch columns --config <path> --column <text>...
//! - aerosearch batch --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aerosearch - Resolve search queries into typed filter trees
#[derive(Parser, Debug)]
#[command(name = "aerosearch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a single query and exit
    Resolve {
        /// Path to configuration file; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Query text; omit to resolve only the implicit filters
        #[arg(long)]
        query: Option<String>,
    },

    /// Resolve a column selection and exit
    Columns {
        /// Path to configuration file; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Column or function text, repeatable
        #[arg(long = "column")]
        columns: Vec<String>,
    },

    /// Resolve one JSON request per stdin line until EOF
    Batch {
        /// Path to configuration file; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
