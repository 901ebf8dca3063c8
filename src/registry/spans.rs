//! Ready-made registry for searching spans

use std::collections::BTreeMap;

use crate::resolver::RequestParams;
use crate::search::{
    AggregationFunction, AttributeAggregation, AttributeKey, Formula, FormulaOperator, SearchType,
};

use super::column::{hex_id_validator, ResolvedAttribute};
use super::context::{VirtualColumnContext, VirtualColumnDefinition};
use super::definitions::ColumnDefinitions;
use super::function::{ArgumentDefinition, FunctionDefinition};

const NUMERIC: [SearchType; 2] = [SearchType::Integer, SearchType::Double];

/// Builds the span column, function and virtual column registry
pub fn span_definitions() -> ColumnDefinitions {
    let mut defs = ColumnDefinitions::new()
        .with_column(
            ResolvedAttribute::new("id", "sentry.span_id", SearchType::String)
                .with_validator(hex_id_validator(16)),
        )
        .with_column(
            ResolvedAttribute::new("trace", "sentry.trace_id", SearchType::String)
                .with_validator(hex_id_validator(32)),
        )
        .with_column(ResolvedAttribute::new("project.id", "sentry.project_id", SearchType::Integer))
        .with_column(ResolvedAttribute::new("span.op", "sentry.op", SearchType::String))
        .with_column(ResolvedAttribute::new(
            "span.description",
            "sentry.description",
            SearchType::String,
        ))
        .with_column(ResolvedAttribute::new(
            "span.duration",
            "sentry.duration_ms",
            SearchType::Double,
        ))
        .with_column(ResolvedAttribute::new(
            "span.self_time",
            "sentry.exclusive_time_ms",
            SearchType::Double,
        ))
        .with_column(ResolvedAttribute::new("status", "sentry.status", SearchType::String))
        .with_column(ResolvedAttribute::new(
            "is_transaction",
            "sentry.is_segment",
            SearchType::Boolean,
        ))
        .with_column(ResolvedAttribute::new(
            "environment",
            "sentry.environment",
            SearchType::String,
        ))
        .with_column(ResolvedAttribute::new("timestamp", "sentry.timestamp", SearchType::Double));

    for name in ["project", "project.name", "project.slug"] {
        defs = defs.with_virtual_column(name, project_context(name));
    }

    defs = defs
        .with_function(
            "count",
            FunctionDefinition::aggregation(
                AggregationFunction::Count,
                vec![ArgumentDefinition::required()
                    .with_default("span.duration")
                    .with_allowed_types(NUMERIC)],
                SearchType::Integer,
                false,
            ),
        )
        .with_function(
            "count_unique",
            FunctionDefinition::aggregation(
                AggregationFunction::CountUnique,
                vec![ArgumentDefinition::required()],
                SearchType::Integer,
                false,
            ),
        );

    let numeric_aggregates = [
        ("sum", AggregationFunction::Sum, true),
        ("min", AggregationFunction::Min, true),
        ("max", AggregationFunction::Max, true),
        ("avg", AggregationFunction::Avg, false),
        ("p50", AggregationFunction::P50, false),
        ("p75", AggregationFunction::P75, false),
        ("p90", AggregationFunction::P90, false),
        ("p95", AggregationFunction::P95, false),
        ("p99", AggregationFunction::P99, false),
    ];
    for (name, aggregate, infer) in numeric_aggregates {
        defs = defs.with_function(
            name,
            FunctionDefinition::aggregation(
                aggregate,
                vec![ArgumentDefinition::required().with_allowed_types(NUMERIC)],
                SearchType::Double,
                infer,
            ),
        );
    }

    defs.with_function(
        "failure_rate",
        FunctionDefinition::formula(vec![], SearchType::Double, |alias, _| {
            Ok(Formula {
                op: FormulaOperator::Divide,
                left: AttributeAggregation {
                    aggregate: AggregationFunction::Sum,
                    key: Some(AttributeKey::new("sentry.is_failure", SearchType::Integer)),
                    label: format!("{}_failures", alias),
                },
                right: AttributeAggregation {
                    aggregate: AggregationFunction::Count,
                    key: None,
                    label: format!("{}_total", alias),
                },
                label: alias.to_string(),
            })
        }),
    )
}

/// Project slugs keyed by project id, exposed under `name`
fn project_context(name: &'static str) -> VirtualColumnDefinition {
    VirtualColumnDefinition::new(move |params: &RequestParams| {
        let value_map: BTreeMap<String, String> = params
            .projects
            .iter()
            .map(|project| (project.id.to_string(), project.slug.clone()))
            .collect();
        VirtualColumnContext::new("project.id", name, value_map)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SearchRegistry;
    use crate::resolver::Project;

    #[test]
    fn test_span_registry_contents() {
        let defs = span_definitions();
        assert_eq!(defs.column("span.op").unwrap().internal_name, "sentry.op");
        assert_eq!(defs.function("count").unwrap().required_argument_count(), 0);
        assert_eq!(defs.function("p95").unwrap().required_argument_count(), 1);
        assert!(defs.virtual_column("project.slug").is_some());
    }

    #[test]
    fn test_project_context_uses_request_projects() {
        let defs = span_definitions();
        let params = RequestParams::default().with_projects(vec![
            Project::new(1, "backend"),
            Project::new(2, "frontend"),
        ]);

        let context = defs.virtual_column("project").unwrap().construct(&params);
        assert_eq!(context.from_column_name, "project.id");
        assert_eq!(context.to_column_name, "project");
        assert_eq!(context.value_map.get("2").map(String::as_str), Some("frontend"));
    }
}
