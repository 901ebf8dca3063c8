//! # Virtual Columns
//!
//! A virtual column has no stored values of its own. Its values are
//! translated through a lookup table materialized for the current request
//! (e.g. project slug ↔ project id) and the filter is rerouted onto the
//! column the table maps from.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resolver::RequestParams;
use crate::search::SearchResult;

use super::column::ResolvedAttribute;

/// Materializes the lookup table for a request
pub type ContextConstructorFn = Arc<dyn Fn(&RequestParams) -> VirtualColumnContext + Send + Sync>;

/// Post-processes a translated term: receives the rerouted column and the
/// translated value, returns the pair to filter on
pub type TermResolverFn = Arc<
    dyn Fn(Arc<ResolvedAttribute>, Value) -> SearchResult<(Arc<ResolvedAttribute>, Value)>
        + Send
        + Sync,
>;

/// Request-scoped value map attached to the outgoing query so the
/// downstream service can label raw values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualColumnContext {
    /// Public alias of the column holding the internal values
    pub from_column_name: String,
    /// Virtual column the labels are exposed as; identity for dedup.
    /// Serialized as `target_column_name`.
    #[serde(rename = "target_column_name", alias = "to_column_name")]
    pub to_column_name: String,
    /// Internal value → human value
    pub value_map: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl VirtualColumnContext {
    pub fn new(
        from_column_name: impl Into<String>,
        to_column_name: impl Into<String>,
        value_map: BTreeMap<String, String>,
    ) -> Self {
        Self {
            from_column_name: from_column_name.into(),
            to_column_name: to_column_name.into(),
            value_map,
            default_value: None,
        }
    }

    pub fn with_default_value(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// Returns true if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.value_map.is_empty()
    }

    /// Human value → internal value
    pub fn reverse_map(&self) -> HashMap<&str, &str> {
        self.value_map
            .iter()
            .map(|(internal, human)| (human.as_str(), internal.as_str()))
            .collect()
    }

    /// Human values in sorted order
    pub fn human_values(&self) -> Vec<&str> {
        let mut values: Vec<&str> = self.value_map.values().map(String::as_str).collect();
        values.sort_unstable();
        values
    }
}

/// Registry entry for a virtual column
#[derive(Clone)]
pub struct VirtualColumnDefinition {
    constructor: ContextConstructorFn,
    /// Sentinel standing for "no mapped value"
    pub default_value: Option<String>,
    pub term_resolver: Option<TermResolverFn>,
    /// Column to filter on instead of the context's `from_column_name`
    pub filter_column: Option<String>,
}

impl VirtualColumnDefinition {
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn(&RequestParams) -> VirtualColumnContext + Send + Sync + 'static,
    {
        Self {
            constructor: Arc::new(constructor),
            default_value: None,
            term_resolver: None,
            filter_column: None,
        }
    }

    pub fn with_default_value(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    pub fn with_term_resolver(mut self, term_resolver: TermResolverFn) -> Self {
        self.term_resolver = Some(term_resolver);
        self
    }

    pub fn with_filter_column(mut self, filter_column: impl Into<String>) -> Self {
        self.filter_column = Some(filter_column.into());
        self
    }

    /// Materializes the context for the current request
    pub fn construct(&self, params: &RequestParams) -> VirtualColumnContext {
        let context = (self.constructor)(params);
        match (&context.default_value, &self.default_value) {
            (None, Some(default_value)) => context.with_default_value(default_value.clone()),
            _ => context,
        }
    }
}

impl fmt::Debug for VirtualColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualColumnDefinition")
            .field("default_value", &self.default_value)
            .field("has_term_resolver", &self.term_resolver.is_some())
            .field("filter_column", &self.filter_column)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_class() -> VirtualColumnDefinition {
        VirtualColumnDefinition::new(|_params| {
            let value_map = BTreeMap::from([
                ("1".to_string(), "low".to_string()),
                ("2".to_string(), "medium".to_string()),
                ("3".to_string(), "high".to_string()),
            ]);
            VirtualColumnContext::new("device.class.code", "device.class", value_map)
        })
        .with_default_value("Unknown")
    }

    #[test]
    fn test_construct_carries_default_value() {
        let context = device_class().construct(&RequestParams::default());
        assert_eq!(context.default_value.as_deref(), Some("Unknown"));
        assert_eq!(context.to_column_name, "device.class");
        assert!(!context.is_empty());
    }

    #[test]
    fn test_reverse_map() {
        let context = device_class().construct(&RequestParams::default());
        let reverse = context.reverse_map();
        assert_eq!(reverse.get("medium"), Some(&"2"));
        assert_eq!(reverse.get("2"), None);
    }

    #[test]
    fn test_human_values_sorted() {
        let context = device_class().construct(&RequestParams::default());
        assert_eq!(context.human_values(), vec!["high", "low", "medium"]);
    }

    #[test]
    fn test_wire_names_target_column() {
        let context = device_class().construct(&RequestParams::default());
        let wire = serde_json::to_value(&context).unwrap();

        assert_eq!(wire["target_column_name"], "device.class");
        assert_eq!(wire["from_column_name"], "device.class.code");
        assert_eq!(wire["value_map"]["2"], "medium");
        assert!(wire.get("to_column_name").is_none());

        let decoded: VirtualColumnContext = serde_json::from_value(wire).unwrap();
        assert_eq!(decoded, context);
    }

    #[test]
    fn test_deserialize_accepts_to_column_name() {
        let decoded: VirtualColumnContext = serde_json::from_str(
            r#"{"from_column_name": "a", "to_column_name": "b", "value_map": {}}"#,
        )
        .unwrap();
        assert_eq!(decoded.to_column_name, "b");
    }
}
