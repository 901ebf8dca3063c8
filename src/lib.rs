//! aerosearch - Search query resolution for event stores
//!
//! Turns search text such as `span.op:db AND p95(span.duration):>250`
//! into typed row-level and post-aggregation filter trees.

pub mod cli;
pub mod observability;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod search;

pub use registry::{span_definitions, ColumnDefinitions, SearchRegistry};
pub use resolver::{RequestParams, ResolvedQuery, ResolverConfig, SearchResolver};
pub use search::{SearchError, SearchResult};
