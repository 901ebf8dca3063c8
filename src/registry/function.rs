//! Function definitions: aggregates and formulas callable from a query

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::search::{
    AggregationFunction, AttributeAggregation, Formula, SearchResult, SearchType,
};

use super::column::ResolvedAttribute;

/// Hook turning a validated call into its final resolved form.
///
/// Receives the alias, the decided search type and the single forwarded
/// argument (if any).
pub type ResolveFunctionFn = Arc<
    dyn Fn(&str, SearchType, Option<&ResolvedAttribute>) -> SearchResult<ResolvedFunction>
        + Send
        + Sync,
>;

/// A formal argument of a function
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgumentDefinition {
    /// Accepted in the call but never resolved or forwarded
    pub ignored: bool,
    /// Used when the call omits this argument
    pub default_arg: Option<String>,
    /// Permitted types of the resolved argument; `None` allows any
    pub allowed_types: Option<BTreeSet<SearchType>>,
}

impl ArgumentDefinition {
    /// A mandatory argument of any type
    pub fn required() -> Self {
        Self::default()
    }

    /// An argument that is accepted and dropped
    pub fn ignored() -> Self {
        Self {
            ignored: true,
            ..Self::default()
        }
    }

    pub fn with_default(mut self, default_arg: impl Into<String>) -> Self {
        self.default_arg = Some(default_arg.into());
        self
    }

    pub fn with_allowed_types(mut self, types: impl IntoIterator<Item = SearchType>) -> Self {
        self.allowed_types = Some(types.into_iter().collect());
        self
    }

    /// Returns true if the argument must be supplied by the caller
    pub fn is_required(&self) -> bool {
        !self.ignored && self.default_arg.is_none()
    }

    /// Returns true if `search_type` is permitted
    pub fn allows(&self, search_type: SearchType) -> bool {
        self.allowed_types
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&search_type))
    }
}

/// What a resolved function emits into the wire query
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionProto {
    Aggregation(AttributeAggregation),
    Formula(Formula),
}

/// Output of function resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFunction {
    pub public_alias: String,
    pub search_type: SearchType,
    pub proto_definition: FunctionProto,
}

impl ResolvedFunction {
    /// Returns the aggregation reference, or `None` for formulas
    pub fn aggregation(&self) -> Option<&AttributeAggregation> {
        match &self.proto_definition {
            FunctionProto::Aggregation(aggregation) => Some(aggregation),
            FunctionProto::Formula(_) => None,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregation().is_some()
    }
}

/// A function callable from a query, e.g. `p95(span.duration)`
#[derive(Clone)]
pub struct FunctionDefinition {
    pub arguments: Vec<ArgumentDefinition>,
    /// Take the search type from the single resolved argument
    pub infer_search_type_from_arguments: bool,
    pub default_search_type: SearchType,
    resolver: ResolveFunctionFn,
}

impl FunctionDefinition {
    pub fn new(
        arguments: Vec<ArgumentDefinition>,
        default_search_type: SearchType,
        infer_search_type_from_arguments: bool,
        resolver: ResolveFunctionFn,
    ) -> Self {
        Self {
            arguments,
            infer_search_type_from_arguments,
            default_search_type,
            resolver,
        }
    }

    /// A plain aggregation over the (optional) single argument
    pub fn aggregation(
        aggregate: AggregationFunction,
        arguments: Vec<ArgumentDefinition>,
        default_search_type: SearchType,
        infer_search_type_from_arguments: bool,
    ) -> Self {
        let resolver: ResolveFunctionFn = Arc::new(
            move |alias: &str,
                  search_type: SearchType,
                  argument: Option<&ResolvedAttribute>|
                  -> SearchResult<ResolvedFunction> {
                Ok(ResolvedFunction {
                    public_alias: alias.to_string(),
                    search_type,
                    proto_definition: FunctionProto::Aggregation(AttributeAggregation {
                        aggregate,
                        key: argument.map(ResolvedAttribute::proto_definition),
                        label: alias.to_string(),
                    }),
                })
            },
        );
        Self::new(
            arguments,
            default_search_type,
            infer_search_type_from_arguments,
            resolver,
        )
    }

    /// A formula built by `build` from the alias and forwarded argument
    pub fn formula<F>(arguments: Vec<ArgumentDefinition>, default_search_type: SearchType, build: F) -> Self
    where
        F: Fn(&str, Option<&ResolvedAttribute>) -> SearchResult<Formula> + Send + Sync + 'static,
    {
        let resolver: ResolveFunctionFn = Arc::new(
            move |alias: &str,
                  search_type: SearchType,
                  argument: Option<&ResolvedAttribute>|
                  -> SearchResult<ResolvedFunction> {
                Ok(ResolvedFunction {
                    public_alias: alias.to_string(),
                    search_type,
                    proto_definition: FunctionProto::Formula(build(alias, argument)?),
                })
            },
        );
        Self::new(arguments, default_search_type, false, resolver)
    }

    /// Number of arguments a call must supply
    pub fn required_argument_count(&self) -> usize {
        self.arguments.iter().filter(|a| a.is_required()).count()
    }

    /// Invokes the resolve hook
    pub fn resolve(
        &self,
        alias: &str,
        search_type: SearchType,
        argument: Option<&ResolvedAttribute>,
    ) -> SearchResult<ResolvedFunction> {
        (self.resolver)(alias, search_type, argument)
    }
}

impl fmt::Debug for FunctionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDefinition")
            .field("arguments", &self.arguments)
            .field("infer_search_type_from_arguments", &self.infer_search_type_from_arguments)
            .field("default_search_type", &self.default_search_type)
            .finish_non_exhaustive()
    }
}
