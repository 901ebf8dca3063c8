//! # Search Resolver
//!
//! Entry point of query resolution. One instance serves one request: it
//! owns the attribute and function caches, which live and die with it.
//!
//! The caches sit behind `RefCell` so that the parser's field-type
//! callback can resolve columns through a shared borrow while the
//! resolver drives the parse. An instance is therefore not `Sync`.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::observability::{log_event, Event, ResolverMetrics};
use crate::parser::{EventSearchParser, SearchParser};
use crate::registry::{
    ResolvedAttribute, ResolvedFunction, SearchRegistry, VirtualColumnContext,
    VirtualColumnDefinition,
};
use crate::search::{
    AggregatePredicateNode, Operator, ParsedTerm, PredicateNode, SearchResult, SearchType,
    TypedValue,
};

use super::columns::ResolvedColumn;
use super::config::{RequestParams, ResolverConfig};
use super::tree::Conditions;

static DEFAULT_PARSER: EventSearchParser = EventSearchParser;

/// Column that receives the implicit environment filter
const ENVIRONMENT_COLUMN: &str = "environment";

/// Cached result of attribute resolution
pub type AttributeEntry = (Arc<ResolvedAttribute>, Option<Arc<VirtualColumnDefinition>>);

/// Both filter trees and the contexts to attach to the outgoing query
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedQuery {
    pub where_filter: Option<PredicateNode>,
    pub having_filter: Option<AggregatePredicateNode>,
    pub contexts: Vec<VirtualColumnContext>,
}

/// Resolved column selection
#[derive(Debug, Clone, Default)]
pub struct ResolvedColumns {
    pub columns: Vec<ResolvedColumn>,
    /// Virtual column definition per column, in the same order
    pub contexts: Vec<Option<Arc<VirtualColumnDefinition>>>,
}

/// Resolves search queries and column selections against a registry
pub struct SearchResolver<'a> {
    pub(crate) params: &'a RequestParams,
    pub(crate) config: ResolverConfig,
    pub(crate) definitions: &'a dyn SearchRegistry,
    parser: &'a dyn SearchParser,
    pub(crate) metrics: Arc<ResolverMetrics>,
    pub(crate) attribute_cache: RefCell<HashMap<String, AttributeEntry>>,
    pub(crate) function_cache: RefCell<HashMap<String, Arc<ResolvedFunction>>>,
}

impl<'a> SearchResolver<'a> {
    /// Creates a resolver using the built-in query grammar
    pub fn new(
        params: &'a RequestParams,
        config: ResolverConfig,
        definitions: &'a dyn SearchRegistry,
    ) -> Self {
        Self {
            params,
            config,
            definitions,
            parser: &DEFAULT_PARSER,
            metrics: Arc::new(ResolverMetrics::new()),
            attribute_cache: RefCell::new(HashMap::new()),
            function_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Replaces the query grammar
    pub fn with_parser(mut self, parser: &'a dyn SearchParser) -> Self {
        self.parser = parser;
        self
    }

    /// Reports into a shared metrics registry
    pub fn with_metrics(mut self, metrics: Arc<ResolverMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn params(&self) -> &RequestParams {
        self.params
    }

    pub fn metrics(&self) -> &Arc<ResolverMetrics> {
        &self.metrics
    }

    /// Resolves query text into where/having trees and contexts.
    ///
    /// An absent query still receives the environment filter.
    pub fn resolve_query(&self, query: Option<&str>) -> SearchResult<ResolvedQuery> {
        let text = query.unwrap_or("");
        log_event(Event::ResolveBegin, &[("query", text)]);

        match self.resolve_query_inner(query) {
            Ok(resolved) => {
                self.metrics.increment_queries_resolved();
                log_event(
                    Event::ResolveComplete,
                    &[
                        ("query", text),
                        ("has_where", bool_str(resolved.where_filter.is_some())),
                        ("has_having", bool_str(resolved.having_filter.is_some())),
                        ("contexts", &resolved.contexts.len().to_string()),
                    ],
                );
                Ok(resolved)
            }
            Err(err) => {
                self.metrics.increment_queries_rejected();
                log_event(
                    Event::QueryRejected,
                    &[("query", text), ("reason", err.message())],
                );
                Err(err)
            }
        }
    }

    fn resolve_query_inner(&self, query: Option<&str>) -> SearchResult<ResolvedQuery> {
        let conditions = match query {
            None => Conditions::default(),
            Some(text) => {
                let get_field_type = |column: &str| -> SearchResult<SearchType> {
                    self.resolve_column(column)
                        .map(|(column, _)| column.search_type())
                };
                let terms = self
                    .parser
                    .parse(text, &get_field_type)
                    .map_err(|err| err.into_search_error(text))?;
                self.check_query_limits(&terms)?;

                if terms.iter().any(ParsedTerm::is_structural) {
                    let terms: Vec<&ParsedTerm> = terms.iter().collect();
                    self.resolve_boolean_conditions(&terms)?
                } else {
                    self.resolve_flat_conditions(&terms)?
                }
            }
        };

        let where_filter = match (self.resolve_environment_filter()?, conditions.where_filter) {
            (None, user) => user,
            (Some(environment), None) => Some(environment),
            (Some(environment), Some(user)) => Some(PredicateNode::And(vec![environment, user])),
        };

        Ok(ResolvedQuery {
            where_filter,
            having_filter: conditions.having_filter,
            contexts: self.resolve_contexts(&conditions.contexts),
        })
    }

    /// OR of equality filters on the configured environments
    fn resolve_environment_filter(&self) -> SearchResult<Option<PredicateNode>> {
        let environments = self.params.environment_names();
        if environments.is_empty() {
            return Ok(None);
        }

        let attribute = match self.resolve_column(ENVIRONMENT_COLUMN)? {
            (ResolvedColumn::Attribute(attribute), None) => attribute,
            _ => return Ok(None),
        };
        let key = attribute.proto_definition();

        let filters = environments
            .into_iter()
            .map(|environment| {
                PredicateNode::comparison(
                    key.clone(),
                    Operator::Equals,
                    TypedValue::StringScalar(environment.to_string()),
                )
            })
            .collect();
        Ok(PredicateNode::any(filters))
    }

    /// Resolves a column selection, injecting identifier columns when
    /// auto fields are enabled
    pub fn resolve_columns(&self, selected_columns: &[&str]) -> SearchResult<ResolvedColumns> {
        let mut resolved = ResolvedColumns::default();
        let mut has_aggregates = false;

        for column in selected_columns {
            let (column, context) = self.resolve_column(column)?;
            has_aggregates |= column.is_function();
            resolved.columns.push(column);
            resolved.contexts.push(context);
        }

        if self.config.auto_fields {
            let mut has_id = selected_columns.contains(&"id");
            if !has_aggregates && !has_id {
                self.push_column(&mut resolved, "id")?;
                has_id = true;
            }
            if has_id && !selected_columns.contains(&"project.id") {
                self.push_column(&mut resolved, "project.name")?;
            }
        }

        log_event(
            Event::ColumnsResolved,
            &[
                ("requested", &selected_columns.len().to_string()),
                ("resolved", &resolved.columns.len().to_string()),
            ],
        );
        Ok(resolved)
    }

    fn push_column(&self, resolved: &mut ResolvedColumns, column: &str) -> SearchResult<()> {
        let (column, context) = self.resolve_column(column)?;
        resolved.columns.push(column);
        resolved.contexts.push(context);
        Ok(())
    }

    /// Materializes contexts, dropping empty ones and duplicates by
    /// target column (first wins)
    pub fn resolve_contexts(
        &self,
        contexts: &[Option<Arc<VirtualColumnDefinition>>],
    ) -> Vec<VirtualColumnContext> {
        let mut seen = HashSet::new();
        contexts
            .iter()
            .flatten()
            .map(|definition| definition.construct(self.params))
            .filter(|context| !context.is_empty())
            .filter(|context| seen.insert(context.to_column_name.clone()))
            .collect()
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::span_definitions;
    use crate::resolver::Project;
    use crate::search::{AttributeKey, ComparisonFilter};

    fn params() -> RequestParams {
        RequestParams::new(1).with_projects(vec![
            Project::new(10, "backend"),
            Project::new(11, "frontend"),
        ])
    }

    #[test]
    fn test_absent_query() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);
        assert_eq!(resolver.resolve_query(None).unwrap(), ResolvedQuery::default());
    }

    #[test]
    fn test_empty_query() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);
        assert_eq!(resolver.resolve_query(Some("")).unwrap(), ResolvedQuery::default());
    }

    #[test]
    fn test_environment_only() {
        let params = params().with_environments(vec![Some("prod".into()), None]);
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        let resolved = resolver.resolve_query(None).unwrap();
        assert_eq!(
            resolved.where_filter,
            Some(PredicateNode::Comparison(ComparisonFilter {
                key: AttributeKey::new("sentry.environment", SearchType::String),
                op: Operator::Equals,
                value: TypedValue::StringScalar("prod".into()),
            }))
        );
    }

    #[test]
    fn test_metrics_count_outcomes() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        resolver.resolve_query(Some("span.op:db")).unwrap();
        resolver.resolve_query(Some("nope(span.op):>1")).unwrap_err();

        let snapshot = resolver.metrics().snapshot();
        assert_eq!(snapshot.queries_resolved, 1);
        assert_eq!(snapshot.queries_rejected, 1);
    }

    #[test]
    fn test_contexts_deduplicated() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        let project = defs.virtual_column("project").cloned();
        let slug = defs.virtual_column("project.slug").cloned();
        let contexts = resolver.resolve_contexts(&[None, project.clone(), slug, project]);
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].to_column_name, "project");
        assert_eq!(contexts[1].to_column_name, "project.slug");
    }

    #[test]
    fn test_empty_contexts_dropped() {
        let params = RequestParams::new(1);
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        let project = defs.virtual_column("project").cloned();
        assert!(resolver.resolve_contexts(&[project]).is_empty());
    }
}
