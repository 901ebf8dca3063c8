//! Column and function resolution
//!
//! Both lookups are memoized per resolver instance, keyed by the verbatim
//! column text. A hit returns the shared handle without consulting the
//! registry again.

use std::sync::Arc;

use crate::observability::{log_event, Event};
use crate::parser::{match_function, match_tag, parse_arguments, FunctionMatch, TagMatch};
use crate::registry::{ResolvedAttribute, ResolvedFunction, VirtualColumnDefinition};
use crate::search::wildcard::is_wildcard;
use crate::search::{SearchError, SearchResult, SearchType};

use super::resolver::{AttributeEntry, SearchResolver};

/// Tag namespace reserved for attributes the platform itself writes
const RESERVED_TAG_PREFIX: &str = "sentry_tags.";
/// Internal namespace the reserved tags are stored under
const INTERNAL_TAG_PREFIX: &str = "sentry.";

/// A resolved column reference: a plain attribute or a function call
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedColumn {
    Attribute(Arc<ResolvedAttribute>),
    Function(Arc<ResolvedFunction>),
}

impl ResolvedColumn {
    pub fn search_type(&self) -> SearchType {
        match self {
            ResolvedColumn::Attribute(attribute) => attribute.search_type,
            ResolvedColumn::Function(function) => function.search_type,
        }
    }

    pub fn public_alias(&self) -> &str {
        match self {
            ResolvedColumn::Attribute(attribute) => &attribute.public_alias,
            ResolvedColumn::Function(function) => &function.public_alias,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, ResolvedColumn::Function(_))
    }

    pub fn attribute(&self) -> Option<&Arc<ResolvedAttribute>> {
        match self {
            ResolvedColumn::Attribute(attribute) => Some(attribute),
            ResolvedColumn::Function(_) => None,
        }
    }

    pub fn function(&self) -> Option<&Arc<ResolvedFunction>> {
        match self {
            ResolvedColumn::Function(function) => Some(function),
            ResolvedColumn::Attribute(_) => None,
        }
    }
}

impl<'a> SearchResolver<'a> {
    /// Resolves column text, dispatching on function-call syntax
    pub fn resolve_column(
        &self,
        column: &str,
    ) -> SearchResult<(ResolvedColumn, Option<Arc<VirtualColumnDefinition>>)> {
        match match_function(column) {
            Some(matched) => {
                let function = self.resolve_aggregate(column, Some(matched))?;
                Ok((ResolvedColumn::Function(function), None))
            }
            None => {
                let (attribute, context) = self.resolve_attribute(column)?;
                Ok((ResolvedColumn::Attribute(attribute), context))
            }
        }
    }

    /// Resolves a plain column: virtual column, declared column, then
    /// free-form tag
    pub fn resolve_attribute(&self, column: &str) -> SearchResult<AttributeEntry> {
        let cached = self.attribute_cache.borrow().get(column).cloned();
        self.metrics.record_attribute_lookup(cached.is_some());
        if let Some(entry) = cached {
            return Ok(entry);
        }

        let virtual_column = self.definitions.virtual_column(column);
        let entry: AttributeEntry = if let Some(definition) = virtual_column {
            (
                Arc::new(ResolvedAttribute::new(column, column, SearchType::String)),
                Some(Arc::clone(definition)),
            )
        } else if let Some(definition) = self.definitions.column(column) {
            (Arc::new(definition.clone()), None)
        } else {
            (Arc::new(self.resolve_tag(column)?), None)
        };

        log_event(
            Event::ColumnResolved,
            &[
                ("column", column),
                ("internal_name", &entry.0.internal_name),
                ("type", entry.0.search_type.as_str()),
                ("virtual", if entry.1.is_some() { "true" } else { "false" }),
            ],
        );

        self.attribute_cache
            .borrow_mut()
            .insert(column.to_string(), entry.clone());
        Ok(entry)
    }

    /// Free-form tag, `name`, `tags[name]` or `tags[name,type]`
    fn resolve_tag(&self, column: &str) -> SearchResult<ResolvedAttribute> {
        let max_length = self.config.max_tag_key_length;
        if column.chars().count() > max_length {
            return Err(SearchError::invalid(format!(
                "{} is too long, can be a maximum of {} characters",
                column, max_length
            )));
        }

        let (name, search_type) = match match_tag(column) {
            Some(TagMatch {
                name,
                type_label: Some(label),
            }) => {
                let search_type = SearchType::from_tag_type(label.trim()).ok_or_else(|| {
                    SearchError::invalid(format!("Unsupported type {} in {}", label.trim(), column))
                })?;
                (name, search_type)
            }
            Some(TagMatch {
                name,
                type_label: None,
            }) => (name, SearchType::String),
            None => (column.to_string(), SearchType::String),
        };

        let internal_name = match name.strip_prefix(RESERVED_TAG_PREFIX) {
            Some(rest) => format!("{}{}", INTERNAL_TAG_PREFIX, rest),
            None => name,
        };
        Ok(ResolvedAttribute::new(column, internal_name, search_type))
    }

    /// Resolves a function call such as `p95(span.duration) as slow`
    pub fn resolve_aggregate(
        &self,
        column: &str,
        matched: Option<FunctionMatch>,
    ) -> SearchResult<Arc<ResolvedFunction>> {
        let cached = self.function_cache.borrow().get(column).cloned();
        self.metrics.record_function_lookup(cached.is_some());
        if let Some(function) = cached {
            return Ok(function);
        }

        let matched = match matched {
            Some(matched) => matched,
            None => match_function(column).ok_or_else(|| {
                SearchError::invalid(format!("{} is not a function", column))
            })?,
        };
        let name = matched.function.as_str();
        let definition = self
            .definitions
            .function(name)
            .ok_or_else(|| SearchError::invalid(format!("Unknown function {}", name)))?;

        let supplied = parse_arguments(&matched.columns);
        let required = definition.required_argument_count();
        let arity_error = || {
            SearchError::invalid(format!(
                "Invalid number of arguments for {}, was expecting {} arguments",
                name, required
            ))
        };
        if supplied.len() < required {
            return Err(arity_error());
        }
        if supplied.len() > definition.arguments.len() {
            return Err(SearchError::invalid(format!(
                "Too many arguments for {}, was expecting at most {} arguments",
                name,
                definition.arguments.len()
            )));
        }

        let mut arguments = Vec::new();
        for (index, formal) in definition.arguments.iter().enumerate() {
            if formal.ignored {
                continue;
            }
            let argument = match (supplied.get(index), &formal.default_arg) {
                (Some(argument), _) => argument.as_str(),
                (None, Some(default_arg)) => default_arg.as_str(),
                (None, None) => return Err(arity_error()),
            };
            if is_wildcard(argument) {
                return Err(SearchError::invalid(format!(
                    "Wildcards are not supported in arguments of {}",
                    name
                )));
            }

            let (attribute, _) = self.resolve_attribute(argument)?;
            if !formal.allows(attribute.search_type) {
                let allowed = formal
                    .allowed_types
                    .iter()
                    .flatten()
                    .map(SearchType::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(SearchError::invalid(format!(
                    "{} is invalid for argument {} of {}: {} is not one of {}",
                    argument,
                    index + 1,
                    name,
                    attribute.search_type.as_str(),
                    allowed
                )));
            }
            arguments.push(attribute);
        }

        if arguments.len() > 1 {
            return Err(SearchError::invalid("Cannot use more than one argument"));
        }
        let argument = arguments.pop();

        let search_type = match &argument {
            Some(argument) if definition.infer_search_type_from_arguments => argument.search_type,
            _ => definition.default_search_type,
        };
        let alias = matched.alias.as_deref().unwrap_or(column);
        let function = Arc::new(definition.resolve(alias, search_type, argument.as_deref())?);

        log_event(
            Event::FunctionResolved,
            &[
                ("column", column),
                ("function", name),
                ("type", search_type.as_str()),
            ],
        );

        self.function_cache
            .borrow_mut()
            .insert(column.to_string(), Arc::clone(&function));
        Ok(function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{span_definitions, ColumnDefinitions, FunctionProto};
    use crate::resolver::{RequestParams, ResolverConfig};
    use crate::search::{AggregationFunction, AttributeKey};

    fn with_resolver<F: FnOnce(&SearchResolver<'_>)>(f: F) {
        let params = RequestParams::new(1);
        let defs = span_definitions();
        let resolver = SearchResolver::new(&params, ResolverConfig::default(), &defs);
        f(&resolver);
    }

    #[test]
    fn test_declared_column() {
        with_resolver(|resolver| {
            let (attribute, context) = resolver.resolve_attribute("span.op").unwrap();
            assert_eq!(attribute.internal_name, "sentry.op");
            assert!(context.is_none());
        });
    }

    #[test]
    fn test_virtual_column_is_string_with_context() {
        with_resolver(|resolver| {
            let (attribute, context) = resolver.resolve_attribute("project").unwrap();
            assert_eq!(attribute.search_type, SearchType::String);
            assert!(context.is_some());
        });
    }

    #[test]
    fn test_free_form_tags() {
        with_resolver(|resolver| {
            let (plain, _) = resolver.resolve_attribute("browser").unwrap();
            assert_eq!(plain.internal_name, "browser");
            assert_eq!(plain.search_type, SearchType::String);

            let (untyped, _) = resolver.resolve_attribute("tags[browser]").unwrap();
            assert_eq!(untyped.internal_name, "browser");
            assert_eq!(untyped.public_alias, "tags[browser]");

            let (typed, _) = resolver.resolve_attribute("tags[retries,number]").unwrap();
            assert_eq!(typed.internal_name, "retries");
            assert_eq!(typed.search_type, SearchType::Double);

            let (typed, _) = resolver.resolve_attribute("tags[cached, boolean]").unwrap();
            assert_eq!(typed.search_type, SearchType::Boolean);
        });
    }

    #[test]
    fn test_reserved_tag_prefix_rewritten() {
        with_resolver(|resolver| {
            let (attribute, _) = resolver.resolve_attribute("sentry_tags.release").unwrap();
            assert_eq!(attribute.internal_name, "sentry.release");
        });
    }

    #[test]
    fn test_unknown_tag_type() {
        with_resolver(|resolver| {
            let err = resolver.resolve_attribute("tags[foo,date]").unwrap_err();
            assert_eq!(err.message(), "Unsupported type date in tags[foo,date]");
        });
    }

    #[test]
    fn test_tag_too_long_checked_first() {
        let params = RequestParams::new(1);
        let defs = ColumnDefinitions::new();
        let config = ResolverConfig::default().with_max_tag_key_length(10);
        let resolver = SearchResolver::new(&params, config, &defs);

        let err = resolver.resolve_attribute("tags[abcdef,date]").unwrap_err();
        assert_eq!(
            err.message(),
            "tags[abcdef,date] is too long, can be a maximum of 10 characters"
        );
    }

    #[test]
    fn test_attribute_cache_hit() {
        with_resolver(|resolver| {
            let (first, _) = resolver.resolve_attribute("browser").unwrap();
            let (second, _) = resolver.resolve_attribute("browser").unwrap();
            assert!(Arc::ptr_eq(&first, &second));

            let snapshot = resolver.metrics().snapshot();
            assert_eq!(snapshot.attribute_cache_misses, 1);
            assert_eq!(snapshot.attribute_cache_hits, 1);
        });
    }

    #[test]
    fn test_aggregate_with_default_argument() {
        with_resolver(|resolver| {
            let function = resolver.resolve_aggregate("count()", None).unwrap();
            assert_eq!(function.public_alias, "count()");
            assert_eq!(function.search_type, SearchType::Integer);

            let aggregation = function.aggregation().unwrap();
            assert_eq!(aggregation.aggregate, AggregationFunction::Count);
            assert_eq!(
                aggregation.key,
                Some(AttributeKey::new("sentry.duration_ms", SearchType::Double))
            );
        });
    }

    #[test]
    fn test_aggregate_alias() {
        with_resolver(|resolver| {
            let function = resolver
                .resolve_aggregate("p95(span.duration) as slow", None)
                .unwrap();
            assert_eq!(function.public_alias, "slow");
            assert_eq!(function.aggregation().unwrap().label, "slow");
        });
    }

    #[test]
    fn test_aggregate_type_inference() {
        with_resolver(|resolver| {
            let sum = resolver.resolve_aggregate("sum(project.id)", None).unwrap();
            assert_eq!(sum.search_type, SearchType::Integer);

            let avg = resolver.resolve_aggregate("avg(project.id)", None).unwrap();
            assert_eq!(avg.search_type, SearchType::Double);
        });
    }

    #[test]
    fn test_unknown_function() {
        with_resolver(|resolver| {
            let err = resolver.resolve_aggregate("frobnicate()", None).unwrap_err();
            assert_eq!(err.message(), "Unknown function frobnicate");
        });
    }

    #[test]
    fn test_missing_required_argument() {
        with_resolver(|resolver| {
            resolver.resolve_aggregate("count()", None).unwrap();
            let err = resolver.resolve_aggregate("p95()", None).unwrap_err();
            assert_eq!(
                err.message(),
                "Invalid number of arguments for p95, was expecting 1 arguments"
            );
        });
    }

    #[test]
    fn test_too_many_arguments() {
        with_resolver(|resolver| {
            let err = resolver
                .resolve_aggregate("p95(span.duration, span.self_time)", None)
                .unwrap_err();
            assert!(err.message().starts_with("Too many arguments for p95"));
        });
    }

    #[test]
    fn test_argument_type_not_allowed() {
        with_resolver(|resolver| {
            let err = resolver.resolve_aggregate("avg(span.op)", None).unwrap_err();
            assert_eq!(
                err.message(),
                "span.op is invalid for argument 1 of avg: string is not one of integer, double"
            );
        });
    }

    #[test]
    fn test_wildcard_argument_rejected() {
        with_resolver(|resolver| {
            assert!(resolver.resolve_aggregate("count_unique(span.*)", None).is_err());
        });
    }

    #[test]
    fn test_formula() {
        with_resolver(|resolver| {
            let function = resolver.resolve_aggregate("failure_rate()", None).unwrap();
            assert!(!function.is_aggregate());
            assert!(matches!(function.proto_definition, FunctionProto::Formula(_)));
        });
    }

    #[test]
    fn test_resolve_column_dispatch() {
        with_resolver(|resolver| {
            let (column, _) = resolver.resolve_column("max(span.duration)").unwrap();
            assert!(column.is_function());
            assert_eq!(column.search_type(), SearchType::Double);

            let (column, _) = resolver.resolve_column("status").unwrap();
            assert!(!column.is_function());
            assert_eq!(column.public_alias(), "status");
        });
    }
}
