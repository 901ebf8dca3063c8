//! Column types, comparison operators and typed wire values

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{SearchError, SearchResult};

/// Declared type of a searchable column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    String,
    Integer,
    Double,
    Boolean,
}

impl SearchType {
    /// Returns the type label used in error messages and by the grammar
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::String => "string",
            SearchType::Integer => "integer",
            SearchType::Double => "double",
            SearchType::Boolean => "boolean",
        }
    }

    /// Maps a declared tag type (`tags[name,type]`) to a search type
    pub fn from_tag_type(label: &str) -> Option<Self> {
        match label {
            "string" => Some(SearchType::String),
            "number" | "double" => Some(SearchType::Double),
            "integer" => Some(SearchType::Integer),
            "boolean" => Some(SearchType::Boolean),
            _ => None,
        }
    }

    /// Returns true for integer and double columns
    pub fn is_numeric(&self) -> bool {
        matches!(self, SearchType::Integer | SearchType::Double)
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comparison operators understood by the downstream query service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    Like,
    NotLike,
    In,
    NotIn,
}

impl Operator {
    /// Looks up a search operator in the fixed operator table.
    ///
    /// `LIKE`/`NOT LIKE` are not in the table; they are only reachable
    /// through wildcard values.
    pub fn from_search_operator(operator: &str) -> SearchResult<Self> {
        match operator {
            "=" => Ok(Operator::Equals),
            "!=" => Ok(Operator::NotEquals),
            "<" => Ok(Operator::LessThan),
            "<=" => Ok(Operator::LessThanOrEquals),
            ">" => Ok(Operator::GreaterThan),
            ">=" => Ok(Operator::GreaterThanOrEquals),
            "IN" => Ok(Operator::In),
            "NOT IN" => Ok(Operator::NotIn),
            other => Err(SearchError::invalid(format!("Unknown operator: {}", other))),
        }
    }

    /// Returns true for `IN`/`NOT IN`
    pub fn is_in_family(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "EQUALS",
            Operator::NotEquals => "NOT_EQUALS",
            Operator::LessThan => "LESS_THAN",
            Operator::LessThanOrEquals => "LESS_THAN_OR_EQUALS",
            Operator::GreaterThan => "GREATER_THAN",
            Operator::GreaterThanOrEquals => "GREATER_THAN_OR_EQUALS",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT_LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT_IN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed value attached to a row-level comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    StringScalar(String),
    StringArray(Vec<String>),
    IntScalar(i64),
    IntArray(Vec<i64>),
    DoubleScalar(f64),
    DoubleArray(Vec<f64>),
    BoolScalar(bool),
}

impl TypedValue {
    /// Returns true for the array variants
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            TypedValue::StringArray(_) | TypedValue::IntArray(_) | TypedValue::DoubleArray(_)
        )
    }
}
