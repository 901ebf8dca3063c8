//! Search data model
//!
//! Parsed terms coming in, typed predicate trees going out, and the single
//! error kind shared by every stage of resolution.

mod errors;
mod predicate;
mod terms;
mod types;
pub mod wildcard;

pub use errors::{SearchError, SearchResult};
pub use predicate::{
    AggregatePredicateNode, AggregationComparison, AggregationFunction, AttributeAggregation,
    AttributeKey, ComparisonFilter, Formula, FormulaOperator, PredicateNode,
};
pub use terms::{AggregateFilter, BooleanOperator, ParsedTerm, SearchFilter, SearchValue};
pub use types::{Operator, SearchType, TypedValue};
