//! CLI command implementations
//!
//! Every resolution gets a fresh resolver against the span registry. A
//! rejected query is written as an error response; only configuration
//! and I/O failures abort a command.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::observability::{log_event, Event, ResolverMetrics};
use crate::registry::{span_definitions, ColumnDefinitions};
use crate::resolver::{RequestParams, ResolvedColumn, ResolverConfig, SearchResolver};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_requests, write_error, write_response};

/// Error code for a batch line that is not a valid request
const BAD_REQUEST: &str = "AERO_CLI_BAD_REQUEST";

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Resolver options (optional, defaults apply)
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Request scope every query is resolved against
    #[serde(default)]
    pub params: RequestParams,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file, or defaults when no path is given
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> CliResult<()> {
        if self.resolver.max_tag_key_length == 0 {
            return Err(CliError::config_error("max_tag_key_length must be > 0"));
        }

        if self.resolver.max_query_terms == 0 {
            return Err(CliError::config_error("max_query_terms must be > 0"));
        }

        if let (Some(start), Some(end)) = (self.params.start, self.params.end) {
            if start > end {
                return Err(CliError::config_error(format!(
                    "Invalid time range: start {} is after end {}",
                    start, end
                )));
            }
        }

        Ok(())
    }
}

/// One line of batch input
#[derive(Debug, Clone, Default, Deserialize)]
struct BatchRequest {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    columns: Option<Vec<String>>,
}

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let stdout = io::stdout();
    let mut output = stdout.lock();

    match cmd {
        Command::Resolve { config, query } => {
            resolve(config.as_deref(), query.as_deref(), &mut output)
        }
        Command::Columns { config, columns: selected } => {
            let selected: Vec<&str> = selected.iter().map(String::as_str).collect();
            columns(config.as_deref(), &selected, &mut output)
        }
        Command::Batch { config } => {
            let stdin = io::stdin();
            batch(config.as_deref(), stdin.lock(), &mut output)
        }
    }
}

/// Resolve one query and write the filter trees
pub fn resolve<W: Write>(
    config_path: Option<&Path>,
    query: Option<&str>,
    output: &mut W,
) -> CliResult<()> {
    let config = Config::load_or_default(config_path)?;
    let registry = span_definitions();
    let metrics = Arc::new(ResolverMetrics::new());
    resolve_one(&config, &registry, &metrics, query, output)
}

/// Resolve a column selection and write the resolved columns
pub fn columns<W: Write>(
    config_path: Option<&Path>,
    selected: &[&str],
    output: &mut W,
) -> CliResult<()> {
    let config = Config::load_or_default(config_path)?;
    let registry = span_definitions();
    let metrics = Arc::new(ResolverMetrics::new());
    columns_one(&config, &registry, &metrics, selected, output)
}

/// Resolve line-delimited requests until the input ends
pub fn batch<R: BufRead, W: Write>(
    config_path: Option<&Path>,
    input: R,
    output: &mut W,
) -> CliResult<()> {
    let config = Config::load_or_default(config_path)?;
    let registry = span_definitions();
    let metrics = Arc::new(ResolverMetrics::new());

    for request in read_requests(input) {
        let request = match request.and_then(|value| {
            serde_json::from_value::<BatchRequest>(value).map_err(CliError::from)
        }) {
            Ok(request) => request,
            Err(e) => {
                write_error(output, BAD_REQUEST, e.message())?;
                continue;
            }
        };

        match &request.columns {
            Some(selected) => {
                let selected: Vec<&str> = selected.iter().map(String::as_str).collect();
                columns_one(&config, &registry, &metrics, &selected, output)?;
            }
            None => resolve_one(&config, &registry, &metrics, request.query.as_deref(), output)?,
        }
    }

    let snapshot = metrics.snapshot();
    log_event(
        Event::BatchComplete,
        &[
            ("queries_resolved", &snapshot.queries_resolved.to_string()),
            ("queries_rejected", &snapshot.queries_rejected.to_string()),
        ],
    );
    Ok(())
}

fn resolve_one<W: Write>(
    config: &Config,
    registry: &ColumnDefinitions,
    metrics: &Arc<ResolverMetrics>,
    query: Option<&str>,
    output: &mut W,
) -> CliResult<()> {
    let resolver = SearchResolver::new(&config.params, config.resolver.clone(), registry)
        .with_metrics(Arc::clone(metrics));

    match resolver.resolve_query(query) {
        Ok(resolved) => write_response(output, &resolved),
        Err(e) => write_error(output, e.code(), e.message()),
    }
}

fn columns_one<W: Write>(
    config: &Config,
    registry: &ColumnDefinitions,
    metrics: &Arc<ResolverMetrics>,
    selected: &[&str],
    output: &mut W,
) -> CliResult<()> {
    let resolver = SearchResolver::new(&config.params, config.resolver.clone(), registry)
        .with_metrics(Arc::clone(metrics));

    let resolved = match resolver.resolve_columns(selected) {
        Ok(resolved) => resolved,
        Err(e) => return write_error(output, e.code(), e.message()),
    };

    let columns: Vec<_> = resolved
        .columns
        .iter()
        .map(|column| match column {
            ResolvedColumn::Attribute(attribute) => json!({
                "kind": "attribute",
                "public_alias": attribute.public_alias,
                "search_type": attribute.search_type,
                "key": attribute.proto_definition(),
            }),
            ResolvedColumn::Function(function) => json!({
                "kind": "function",
                "public_alias": function.public_alias,
                "search_type": function.search_type,
            }),
        })
        .collect();
    let contexts = resolver.resolve_contexts(&resolved.contexts);

    write_response(
        output,
        &json!({
            "columns": columns,
            "contexts": contexts,
        }),
    )
}
