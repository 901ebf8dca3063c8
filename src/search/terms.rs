//! Parsed search terms handed over by the grammar parser

use std::fmt;

use serde_json::Value;

use super::wildcard;

/// Explicit boolean connective between two terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOperator {
    And,
    Or,
}

impl BooleanOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BooleanOperator::And => "AND",
            BooleanOperator::Or => "OR",
        }
    }
}

impl fmt::Display for BooleanOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw value of a term: a scalar or a list, exactly as parsed
#[derive(Debug, Clone, PartialEq)]
pub struct SearchValue {
    pub raw_value: Value,
}

impl SearchValue {
    pub fn new(raw_value: Value) -> Self {
        Self { raw_value }
    }

    /// Returns true if the value is a string carrying an unescaped `*`
    pub fn is_wildcard(&self) -> bool {
        match &self.raw_value {
            Value::String(s) => wildcard::is_wildcard(s),
            _ => false,
        }
    }

    /// Returns true if the value is exactly the empty string
    pub fn is_empty_string(&self) -> bool {
        matches!(&self.raw_value, Value::String(s) if s.is_empty())
    }
}

/// A row-level comparison: `key <operator> value`
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFilter {
    pub key: String,
    pub operator: String,
    pub value: SearchValue,
}

impl SearchFilter {
    pub fn new(key: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            operator: operator.into(),
            value: SearchValue::new(value),
        }
    }
}

/// A post-aggregation comparison: `function(args) <operator> number`
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateFilter {
    pub key: String,
    pub operator: String,
    pub value: SearchValue,
}

impl AggregateFilter {
    pub fn new(key: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            operator: operator.into(),
            value: SearchValue::new(value),
        }
    }
}

/// One element of a parsed query at a single nesting level
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedTerm {
    Comparison(SearchFilter),
    AggregateComparison(AggregateFilter),
    ParenGroup(Vec<ParsedTerm>),
    Connective(BooleanOperator),
}

impl ParsedTerm {
    /// Returns the connective if this term is one
    pub fn connective(&self) -> Option<BooleanOperator> {
        match self {
            ParsedTerm::Connective(op) => Some(*op),
            _ => None,
        }
    }

    /// Returns true if this term requires tree building
    /// (a group or an explicit connective)
    pub fn is_structural(&self) -> bool {
        matches!(self, ParsedTerm::ParenGroup(_) | ParsedTerm::Connective(_))
    }
}
