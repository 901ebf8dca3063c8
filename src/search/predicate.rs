//! # Predicate IR
//!
//! Output of resolution: a row-level predicate tree ("where") and a
//! post-aggregation predicate tree ("having"). Trees are built once and
//! never mutated; `And`/`Or` nodes always hold at least two children.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::{Operator, SearchType, TypedValue};

/// Reference to a stored attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeKey {
    /// Internal attribute name
    pub name: String,
    #[serde(rename = "type")]
    pub search_type: SearchType,
}

impl AttributeKey {
    pub fn new(name: impl Into<String>, search_type: SearchType) -> Self {
        Self {
            name: name.into(),
            search_type,
        }
    }
}

/// Aggregation functions supported by the downstream service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationFunction {
    Count,
    CountUnique,
    Sum,
    Avg,
    Min,
    Max,
    P50,
    P75,
    P90,
    P95,
    P99,
}

impl AggregationFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationFunction::Count => "count",
            AggregationFunction::CountUnique => "count_unique",
            AggregationFunction::Sum => "sum",
            AggregationFunction::Avg => "avg",
            AggregationFunction::Min => "min",
            AggregationFunction::Max => "max",
            AggregationFunction::P50 => "p50",
            AggregationFunction::P75 => "p75",
            AggregationFunction::P90 => "p90",
            AggregationFunction::P95 => "p95",
            AggregationFunction::P99 => "p99",
        }
    }
}

impl fmt::Display for AggregationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An aggregation applied over an attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeAggregation {
    pub aggregate: AggregationFunction,
    /// Aggregated attribute; `None` aggregates over rows
    pub key: Option<AttributeKey>,
    /// Public alias of the aggregate, e.g. `count()`
    pub label: String,
}

/// Arithmetic between two aggregations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// A computed column over aggregations. Not an aggregation reference
/// itself, so it cannot appear in a "having" tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub op: FormulaOperator,
    pub left: AttributeAggregation,
    pub right: AttributeAggregation,
    pub label: String,
}

/// Row-level comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonFilter {
    pub key: AttributeKey,
    pub op: Operator,
    pub value: TypedValue,
}

/// Row-level predicate tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateNode {
    Comparison(ComparisonFilter),
    Exists(AttributeKey),
    Not(Box<PredicateNode>),
    And(Vec<PredicateNode>),
    Or(Vec<PredicateNode>),
}

impl PredicateNode {
    pub fn comparison(key: AttributeKey, op: Operator, value: TypedValue) -> Self {
        PredicateNode::Comparison(ComparisonFilter { key, op, value })
    }

    pub fn not(inner: PredicateNode) -> Self {
        PredicateNode::Not(Box::new(inner))
    }

    /// ANDs the nodes together; a single node is returned unwrapped
    pub fn all(mut nodes: Vec<PredicateNode>) -> Option<Self> {
        match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(PredicateNode::And(nodes)),
        }
    }

    /// ORs the nodes together; a single node is returned unwrapped
    pub fn any(mut nodes: Vec<PredicateNode>) -> Option<Self> {
        match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(PredicateNode::Or(nodes)),
        }
    }
}

/// Post-aggregation comparison. Values are always numeric scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationComparison {
    pub aggregation: AttributeAggregation,
    pub op: Operator,
    pub value: f64,
}

/// Post-aggregation predicate tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregatePredicateNode {
    Comparison(AggregationComparison),
    And(Vec<AggregatePredicateNode>),
    Or(Vec<AggregatePredicateNode>),
}

impl AggregatePredicateNode {
    pub fn comparison(aggregation: AttributeAggregation, op: Operator, value: f64) -> Self {
        AggregatePredicateNode::Comparison(AggregationComparison {
            aggregation,
            op,
            value,
        })
    }

    pub fn all(mut nodes: Vec<AggregatePredicateNode>) -> Option<Self> {
        match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(AggregatePredicateNode::And(nodes)),
        }
    }
}
