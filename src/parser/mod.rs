//! # Search Grammar
//!
//! Turns raw query text into the ordered term sequence the resolver
//! consumes. The resolver only depends on the [`SearchParser`] trait;
//! [`EventSearchParser`] is the grammar shipped with the crate.

mod grammar;
pub mod matcher;

use thiserror::Error;

use crate::search::{ParsedTerm, SearchError, SearchResult, SearchType};

pub use grammar::{EventSearchParser, MAX_GROUP_DEPTH};
pub use matcher::{match_function, match_tag, parse_arguments, FunctionMatch, TagMatch};

/// Offending token and its 0-based column in the query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLocator {
    pub token: String,
    pub column: usize,
}

/// Grammar errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Malformed query text
    #[error("{message}")]
    Syntax {
        message: String,
        locator: Option<ParseLocator>,
    },

    /// The field-type callback rejected a key
    #[error(transparent)]
    Search(#[from] SearchError),
}

impl ParseError {
    /// Create a syntax error pointing at a token
    pub fn syntax(message: impl Into<String>, token: impl Into<String>, column: usize) -> Self {
        ParseError::Syntax {
            message: message.into(),
            locator: Some(ParseLocator {
                token: token.into(),
                column,
            }),
        }
    }

    /// Create a syntax error without a locator
    pub fn unlocated(message: impl Into<String>) -> Self {
        ParseError::Syntax {
            message: message.into(),
            locator: None,
        }
    }

    /// Rewraps the error as the resolver surfaces it
    pub fn into_search_error(self, query: &str) -> SearchError {
        match self {
            ParseError::Syntax {
                locator: Some(locator),
                ..
            } => SearchError::invalid(format!(
                "Parse error: {} (column {})",
                locator.token, locator.column
            )),
            ParseError::Syntax { locator: None, .. } => {
                SearchError::invalid(format!("Parse error for: {}", query))
            }
            ParseError::Search(err) => err,
        }
    }
}

/// Grammar collaborator used by the resolver
pub trait SearchParser {
    /// Parses `query`, asking `get_field_type` for the declared type of
    /// each plain key so values can be typed
    fn parse(
        &self,
        query: &str,
        get_field_type: &dyn Fn(&str) -> SearchResult<SearchType>,
    ) -> Result<Vec<ParsedTerm>, ParseError>;
}
