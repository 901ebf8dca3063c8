//! Virtual column value translation
//!
//! Users filter a virtual column by its human values (`project:backend`);
//! the stored column only knows the internal ones (`project.id:42`). The
//! lookup table comes from the request-scoped context.

use std::collections::HashMap;

use serde_json::Value;

use crate::registry::VirtualColumnContext;
use crate::search::{SearchError, SearchResult, SearchType};

/// Number of valid choices listed in an "invalid value" error
const MAX_LISTED_CHOICES: usize = 5;

/// Translates a scalar or list of human values into internal values
/// typed for `target_type`. The shape of the value is preserved.
pub fn translate_value(
    key: &str,
    value: &Value,
    context: &VirtualColumnContext,
    target_type: SearchType,
) -> SearchResult<Value> {
    let reverse = context.reverse_map();
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| translate_scalar(key, item, context, &reverse, target_type))
            .collect::<SearchResult<Vec<_>>>()
            .map(Value::Array),
        other => translate_scalar(key, other, context, &reverse, target_type),
    }
}

fn translate_scalar(
    key: &str,
    value: &Value,
    context: &VirtualColumnContext,
    reverse: &HashMap<&str, &str>,
    target_type: SearchType,
) -> SearchResult<Value> {
    let human = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(SearchError::invalid(format!(
                "Invalid value {} for {}",
                other, key
            )))
        }
    };

    if context.default_value.as_deref() == Some(human.as_str()) {
        return Err(SearchError::invalid(format!(
            "Filtering {} by {} is not supported",
            key, human
        )));
    }

    match reverse.get(human.as_str()) {
        Some(internal) => typed_internal(key, internal, target_type),
        None => Err(SearchError::invalid(format!(
            "Invalid value {} for {}, must be one of: {}",
            human,
            key,
            listed_choices(context)
        ))),
    }
}

/// Internal values are stored as text; numeric targets get numbers
fn typed_internal(key: &str, internal: &str, target_type: SearchType) -> SearchResult<Value> {
    let invalid = || {
        SearchError::invalid(format!(
            "{} maps to {}, which is not a valid {} value",
            key,
            internal,
            target_type.as_str()
        ))
    };
    match target_type {
        SearchType::Integer => internal
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid()),
        SearchType::Double => internal
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid),
        SearchType::String | SearchType::Boolean => Ok(Value::String(internal.to_string())),
    }
}

fn listed_choices(context: &VirtualColumnContext) -> String {
    let choices = context.human_values();
    let mut listed = choices
        .iter()
        .take(MAX_LISTED_CHOICES)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    if choices.len() > MAX_LISTED_CHOICES {
        listed.push_str(", ...");
    }
    listed
}
