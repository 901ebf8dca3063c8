//! Search registry
//!
//! The caller-supplied catalogue of what a query may reference: plain
//! columns, functions and virtual columns. The resolver only reads it.

mod column;
mod context;
mod definitions;
mod function;
pub mod spans;

pub use column::{hex_id_validator, ColumnDefinition, ResolvedAttribute, ValidateFn};
pub use context::{
    ContextConstructorFn, TermResolverFn, VirtualColumnContext, VirtualColumnDefinition,
};
pub use definitions::{ColumnDefinitions, SearchRegistry};
pub use function::{
    ArgumentDefinition, FunctionDefinition, FunctionProto, ResolveFunctionFn, ResolvedFunction,
};
pub use spans::span_definitions;
