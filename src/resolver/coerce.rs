//! Value coercion
//!
//! Turns a raw term value into the typed wire value for a column. There
//! is no lenient path: a value whose shape does not fit the column's
//! declared type is rejected.

use serde_json::Value;

use crate::registry::ResolvedAttribute;
use crate::search::{Operator, SearchError, SearchResult, SearchType, TypedValue};

const TRUTHY: [&str; 2] = ["true", "1"];
const FALSY: [&str; 2] = ["false", "0"];

/// Coerces `value` for a comparison against `column` with `operator`
pub fn coerce_value(
    column: &ResolvedAttribute,
    operator: Operator,
    value: &Value,
) -> SearchResult<TypedValue> {
    column.validate(value)?;

    let in_family = operator.is_in_family();
    match column.search_type {
        SearchType::String => {
            if in_family {
                string_list(value)
                    .map(TypedValue::StringArray)
                    .ok_or_else(|| mismatch(column, "list of strings", value))
            } else {
                scalar_text(value)
                    .map(TypedValue::StringScalar)
                    .ok_or_else(|| mismatch(column, "string", value))
            }
        }
        SearchType::Integer => {
            if in_family {
                number_list(value)
                    .map(|items| TypedValue::IntArray(items.into_iter().map(|n| n as i64).collect()))
                    .ok_or_else(|| mismatch(column, "list of integers", value))
            } else {
                value
                    .as_f64()
                    .map(|n| TypedValue::IntScalar(n as i64))
                    .ok_or_else(|| mismatch(column, "integer", value))
            }
        }
        SearchType::Double => {
            if in_family {
                number_list(value)
                    .map(TypedValue::DoubleArray)
                    .ok_or_else(|| mismatch(column, "list of numbers", value))
            } else {
                value
                    .as_f64()
                    .map(TypedValue::DoubleScalar)
                    .ok_or_else(|| mismatch(column, "number", value))
            }
        }
        SearchType::Boolean => {
            if in_family {
                return Err(SearchError::invalid(format!(
                    "{} cannot be used with an IN filter",
                    column.public_alias
                )));
            }
            let text = value
                .as_str()
                .ok_or_else(|| mismatch(column, "boolean", value))?
                .to_lowercase();
            if TRUTHY.contains(&text.as_str()) {
                Ok(TypedValue::BoolScalar(true))
            } else if FALSY.contains(&text.as_str()) {
                Ok(TypedValue::BoolScalar(false))
            } else {
                Err(SearchError::invalid(format!(
                    "{} is not a valid boolean value for {}, expected one of: {}",
                    text,
                    column.public_alias,
                    TRUTHY.iter().chain(FALSY.iter()).copied().collect::<Vec<_>>().join(", ")
                )))
            }
        }
    }
}

/// Runtime shape of a raw value, for error messages
pub fn value_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn mismatch(column: &ResolvedAttribute, expected: &str, value: &Value) -> SearchError {
    SearchError::invalid(format!(
        "{} expects a {} value, but got a {}: {}",
        column.public_alias,
        expected,
        value_shape(value),
        value
    ))
}

/// Strings as-is, numbers rendered as text; lists are not scalars
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn number_list(value: &Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(Value::as_f64).collect()
}
