//! # Search Query Resolver
//!
//! Turns query text into two typed filter trees (row-level "where" and
//! post-aggregation "having") plus the virtual column contexts to attach
//! to the outgoing request.
//!
//! ```text
//! query ─▶ SearchParser ─▶ tree ─▶ terms ─▶ { columns, virtual_columns, coerce }
//!                                                          │
//!                               environment filter ─▶ ResolvedQuery
//! ```
//!
//! A [`SearchResolver`] memoizes every column and function it resolves.
//! Build one per request; it is not meant to be shared across threads.

mod coerce;
mod columns;
mod config;
mod resolver;
mod terms;
mod tree;
mod virtual_columns;

pub use coerce::{coerce_value, value_shape};
pub use columns::ResolvedColumn;
pub use config::{
    Project, RequestParams, ResolverConfig, MAX_NESTING_DEPTH, MAX_QUERY_TERMS, MAX_TAG_KEY_LENGTH,
};
pub use resolver::{AttributeEntry, ResolvedColumns, ResolvedQuery, SearchResolver};
pub use virtual_columns::translate_value;
