//! # Search Errors
//!
//! Every resolution failure is terminal and surfaces a single error kind
//! carrying the human-readable reason.

use thiserror::Error;

/// Result type for search resolution
pub type SearchResult<T> = Result<T, SearchError>;

/// Search resolution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The query is malformed, references something unknown, or carries
    /// a value that does not fit the column it targets
    #[error("{0}")]
    InvalidSearchQuery(String),
}

impl SearchError {
    /// Create an invalid search query error
    pub fn invalid(message: impl Into<String>) -> Self {
        SearchError::InvalidSearchQuery(message.into())
    }

    /// Returns the message surfaced to the caller
    pub fn message(&self) -> &str {
        match self {
            SearchError::InvalidSearchQuery(message) => message,
        }
    }

    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::InvalidSearchQuery(_) => "AERO_INVALID_SEARCH_QUERY",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            SearchError::InvalidSearchQuery(_) => 400,
        }
    }
}
