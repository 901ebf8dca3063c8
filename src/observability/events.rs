//! Observable search resolution events

use std::fmt;

use super::logger::Severity;

/// Events emitted while resolving a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Query text received
    ResolveBegin,
    /// Filter trees built
    ResolveComplete,
    /// Query rejected with an error
    QueryRejected,
    /// Column text resolved (cache miss)
    ColumnResolved,
    /// Function call resolved (cache miss)
    FunctionResolved,
    /// Column selection resolved
    ColumnsResolved,
    /// Line-delimited batch drained
    BatchComplete,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ResolveBegin => "SEARCH_RESOLVE_BEGIN",
            Event::ResolveComplete => "SEARCH_RESOLVE_COMPLETE",
            Event::QueryRejected => "SEARCH_QUERY_REJECTED",
            Event::ColumnResolved => "COLUMN_RESOLVED",
            Event::FunctionResolved => "FUNCTION_RESOLVED",
            Event::ColumnsResolved => "COLUMNS_RESOLVED",
            Event::BatchComplete => "SEARCH_BATCH_COMPLETE",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryRejected => Severity::Warn,
            Event::ResolveComplete | Event::ColumnsResolved | Event::BatchComplete => {
                Severity::Info
            }
            Event::ResolveBegin | Event::ColumnResolved | Event::FunctionResolved => {
                Severity::Trace
            }
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
