//! Term resolution: one parsed comparison into one predicate node

use std::sync::Arc;

use serde_json::Value;

use crate::registry::{ResolvedAttribute, VirtualColumnDefinition};
use crate::search::wildcard::glob_to_like;
use crate::search::{
    AggregateFilter, AggregatePredicateNode, Operator, PredicateNode, SearchError, SearchFilter,
    SearchResult,
};

use super::coerce::coerce_value;
use super::columns::ResolvedColumn;
use super::resolver::SearchResolver;
use super::virtual_columns::translate_value;

impl<'a> SearchResolver<'a> {
    /// Resolves a row-level comparison. The virtual column definition of
    /// the key, if any, is returned so its context can be attached.
    pub fn resolve_term(
        &self,
        term: &SearchFilter,
    ) -> SearchResult<(PredicateNode, Option<Arc<VirtualColumnDefinition>>)> {
        let (column, context_definition) = self.resolve_column(&term.key)?;
        let attribute = match column {
            ResolvedColumn::Attribute(attribute) => attribute,
            ResolvedColumn::Function(_) => {
                return Err(SearchError::invalid(format!(
                    "{} is not valid search term",
                    term.key
                )))
            }
        };

        let (attribute, value) = match &context_definition {
            Some(definition) => {
                if term.value.is_wildcard() {
                    return Err(SearchError::invalid(format!(
                        "Wildcards are not supported on {}",
                        term.key
                    )));
                }
                self.translate_virtual_term(term, definition)?
            }
            None => (attribute, term.value.raw_value.clone()),
        };

        let (operator, value) = if term.value.is_wildcard() {
            let operator = match term.operator.as_str() {
                "=" => Operator::Like,
                "!=" => Operator::NotLike,
                other => {
                    return Err(SearchError::invalid(format!(
                        "Cannot use a wildcard with the {} operator on {}",
                        other, term.key
                    )))
                }
            };
            let pattern = value.as_str().map(glob_to_like).unwrap_or_default();
            (operator, Value::String(pattern))
        } else {
            (Operator::from_search_operator(&term.operator)?, value)
        };

        if context_definition.is_none() && term.value.is_empty_string() {
            let exists = PredicateNode::Exists(attribute.proto_definition());
            match operator {
                Operator::Equals => return Ok((PredicateNode::not(exists), None)),
                Operator::NotEquals => return Ok((exists, None)),
                _ => {}
            }
        }

        let value = coerce_value(&attribute, operator, &value)?;
        Ok((
            PredicateNode::comparison(attribute.proto_definition(), operator, value),
            context_definition,
        ))
    }

    /// Translates human values and reroutes the filter onto the column
    /// holding the internal values
    fn translate_virtual_term(
        &self,
        term: &SearchFilter,
        definition: &VirtualColumnDefinition,
    ) -> SearchResult<(Arc<ResolvedAttribute>, Value)> {
        let context = definition.construct(self.params);
        let target = definition
            .filter_column
            .as_deref()
            .unwrap_or(&context.from_column_name);
        let (target, _) = self.resolve_attribute(target)?;

        let value = translate_value(&term.key, &term.value.raw_value, &context, target.search_type)?;
        match &definition.term_resolver {
            Some(term_resolver) => term_resolver(target, value),
            None => Ok((target, value)),
        }
    }

    /// Resolves a post-aggregation comparison
    pub fn resolve_aggregate_term(
        &self,
        term: &AggregateFilter,
    ) -> SearchResult<AggregatePredicateNode> {
        let (column, _) = self.resolve_column(&term.key)?;
        let aggregation = column
            .function()
            .and_then(|function| function.aggregation())
            .cloned()
            .ok_or_else(|| SearchError::invalid(format!("{} is not an aggregate", term.key)))?;

        let operator = Operator::from_search_operator(&term.operator)?;
        let value = term.value.raw_value.as_f64().ok_or_else(|| {
            SearchError::invalid(format!(
                "{} must be compared to a number, got {}",
                term.key, term.value.raw_value
            ))
        })?;
        Ok(AggregatePredicateNode::comparison(aggregation, operator, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{span_definitions, ColumnDefinitions, VirtualColumnContext};
    use crate::resolver::{Project, RequestParams, ResolverConfig};
    use crate::search::{AggregationFunction, AttributeKey, SearchType, TypedValue};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn params() -> RequestParams {
        RequestParams::new(1).with_projects(vec![
            Project::new(10, "backend"),
            Project::new(11, "frontend"),
        ])
    }

    fn key(name: &str, search_type: SearchType) -> AttributeKey {
        AttributeKey::new(name, search_type)
    }

    #[test]
    fn test_plain_comparison() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        let (node, context) = resolver
            .resolve_term(&SearchFilter::new("span.duration", ">", json!(100.0)))
            .unwrap();
        assert_eq!(
            node,
            PredicateNode::comparison(
                key("sentry.duration_ms", SearchType::Double),
                Operator::GreaterThan,
                TypedValue::DoubleScalar(100.0)
            )
        );
        assert!(context.is_none());
    }

    #[test]
    fn test_wildcard_becomes_like() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        let (node, _) = resolver
            .resolve_term(&SearchFilter::new("span.description", "!=", json!("SELECT *_x")))
            .unwrap();
        assert_eq!(
            node,
            PredicateNode::comparison(
                key("sentry.description", SearchType::String),
                Operator::NotLike,
                TypedValue::StringScalar("SELECT %\\_x".into())
            )
        );
    }

    #[test]
    fn test_wildcard_with_ordering_operator() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        let result = resolver.resolve_term(&SearchFilter::new("span.op", ">", json!("db*")));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_string_existence() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);
        let exists = PredicateNode::Exists(key("sentry.status", SearchType::String));

        let (node, _) = resolver
            .resolve_term(&SearchFilter::new("status", "=", json!("")))
            .unwrap();
        assert_eq!(node, PredicateNode::not(exists.clone()));

        let (node, _) = resolver
            .resolve_term(&SearchFilter::new("status", "!=", json!("")))
            .unwrap();
        assert_eq!(node, exists);
    }

    #[test]
    fn test_empty_string_skips_validator() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        let (node, _) = resolver
            .resolve_term(&SearchFilter::new("trace", "!=", json!("")))
            .unwrap();
        assert_eq!(node, PredicateNode::Exists(key("sentry.trace_id", SearchType::String)));
    }

    #[test]
    fn test_virtual_column_reroutes() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        let (node, context) = resolver
            .resolve_term(&SearchFilter::new("project", "IN", json!(["backend", "frontend"])))
            .unwrap();
        assert_eq!(
            node,
            PredicateNode::comparison(
                key("sentry.project_id", SearchType::Integer),
                Operator::In,
                TypedValue::IntArray(vec![10, 11])
            )
        );
        assert!(context.is_some());
    }

    #[test]
    fn test_virtual_column_rejects_wildcard() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        let err = resolver
            .resolve_term(&SearchFilter::new("project.slug", "=", json!("back*")))
            .unwrap_err();
        assert_eq!(err.message(), "Wildcards are not supported on project.slug");
    }

    #[test]
    fn test_filter_column_and_term_resolver() {
        let tiers = crate::registry::VirtualColumnDefinition::new(|_| {
            VirtualColumnContext::new(
                "tier.code",
                "tier",
                BTreeMap::from([("g".to_string(), "gold".to_string())]),
            )
        })
        .with_filter_column("tier.raw")
        .with_term_resolver(Arc::new(
            |column: Arc<ResolvedAttribute>, value: Value| -> SearchResult<(Arc<ResolvedAttribute>, Value)> {
                let upper = value.as_str().unwrap_or_default().to_uppercase();
                Ok((column, Value::String(upper)))
            },
        ));
        let defs = ColumnDefinitions::new()
            .with_column(ResolvedAttribute::new("tier.raw", "billing.tier", SearchType::String))
            .with_virtual_column("tier", tiers);
        let params = RequestParams::new(1);
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        let (node, _) = resolver
            .resolve_term(&SearchFilter::new("tier", "=", json!("gold")))
            .unwrap();
        assert_eq!(
            node,
            PredicateNode::comparison(
                key("billing.tier", SearchType::String),
                Operator::Equals,
                TypedValue::StringScalar("G".into())
            )
        );
    }

    #[test]
    fn test_function_is_not_a_search_term() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        let err = resolver
            .resolve_term(&SearchFilter::new("count()", ">", json!(1.0)))
            .unwrap_err();
        assert_eq!(err.message(), "count() is not valid search term");
    }

    #[test]
    fn test_unknown_operator() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        let err = resolver
            .resolve_term(&SearchFilter::new("status", "~", json!("ok")))
            .unwrap_err();
        assert_eq!(err.message(), "Unknown operator: ~");
    }

    #[test]
    fn test_aggregate_term() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        let node = resolver
            .resolve_aggregate_term(&AggregateFilter::new("p95(span.duration)", "<=", json!(250.0)))
            .unwrap();
        match node {
            AggregatePredicateNode::Comparison(comparison) => {
                assert_eq!(comparison.aggregation.aggregate, AggregationFunction::P95);
                assert_eq!(comparison.op, Operator::LessThanOrEquals);
                assert_eq!(comparison.value, 250.0);
            }
            other => panic!("unexpected node: {:?}", other),
        }
    }

    #[test]
    fn test_formula_is_not_an_aggregate() {
        let params = params();
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);

        let err = resolver
            .resolve_aggregate_term(&AggregateFilter::new("failure_rate()", ">", json!(0.5)))
            .unwrap_err();
        assert_eq!(err.message(), "failure_rate() is not an aggregate");
    }
}
