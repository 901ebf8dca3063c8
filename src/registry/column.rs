//! Column definitions and resolved attributes

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::search::{AttributeKey, SearchError, SearchResult, SearchType};

/// Validation hook run on a raw value before it is coerced
pub type ValidateFn = Arc<dyn Fn(&Value) -> SearchResult<()> + Send + Sync>;

/// A searchable attribute: the public alias users type and the internal
/// attribute it maps to
#[derive(Clone)]
pub struct ResolvedAttribute {
    /// Name users type in queries
    pub public_alias: String,
    /// Name of the stored attribute
    pub internal_name: String,
    /// Declared value type
    pub search_type: SearchType,
    validator: Option<ValidateFn>,
}

/// Registry entries are resolved attributes already
pub type ColumnDefinition = ResolvedAttribute;

impl ResolvedAttribute {
    pub fn new(
        public_alias: impl Into<String>,
        internal_name: impl Into<String>,
        search_type: SearchType,
    ) -> Self {
        Self {
            public_alias: public_alias.into(),
            internal_name: internal_name.into(),
            search_type,
            validator: None,
        }
    }

    /// Attaches a validation hook
    pub fn with_validator(mut self, validator: ValidateFn) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Returns the attribute key emitted into the wire filter
    pub fn proto_definition(&self) -> AttributeKey {
        AttributeKey::new(self.internal_name.clone(), self.search_type)
    }

    /// Runs the validation hook, if any
    pub fn validate(&self, value: &Value) -> SearchResult<()> {
        match &self.validator {
            Some(validator) => validator(value),
            None => Ok(()),
        }
    }
}

impl PartialEq for ResolvedAttribute {
    fn eq(&self, other: &Self) -> bool {
        self.public_alias == other.public_alias
            && self.internal_name == other.internal_name
            && self.search_type == other.search_type
    }
}

impl fmt::Debug for ResolvedAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedAttribute")
            .field("public_alias", &self.public_alias)
            .field("internal_name", &self.internal_name)
            .field("search_type", &self.search_type)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

/// Validator accepting lowercase hex identifiers of an exact length,
/// either as a scalar or as every element of a list
pub fn hex_id_validator(length: usize) -> ValidateFn {
    Arc::new(move |value: &Value| {
        let check = |item: &Value| -> SearchResult<()> {
            match item.as_str() {
                Some(s) if s.len() == length && s.chars().all(|c| c.is_ascii_hexdigit()) => Ok(()),
                _ => Err(SearchError::invalid(format!(
                    "{} is not a valid id, expected {} hex characters",
                    item, length
                ))),
            }
        };

        match value {
            Value::Array(items) => items.iter().try_for_each(check),
            other => check(other),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_proto_definition() {
        let attr = ResolvedAttribute::new("span.op", "sentry.op", SearchType::String);
        assert_eq!(attr.proto_definition(), AttributeKey::new("sentry.op", SearchType::String));
    }

    #[test]
    fn test_no_validator_accepts_everything() {
        let attr = ResolvedAttribute::new("a", "a", SearchType::String);
        assert!(attr.validate(&json!("anything")).is_ok());
    }

    #[test]
    fn test_hex_id_validator() {
        let attr = ResolvedAttribute::new("id", "sentry.span_id", SearchType::String)
            .with_validator(hex_id_validator(16));

        assert!(attr.validate(&json!("0123456789abcdef")).is_ok());
        assert!(attr.validate(&json!(["0123456789abcdef", "fedcba9876543210"])).is_ok());
        assert!(attr.validate(&json!("xyz")).is_err());
        assert!(attr.validate(&json!(["0123456789abcdef", "nope"])).is_err());
        assert!(attr.validate(&json!(12.0)).is_err());
    }

    #[test]
    fn test_equality_ignores_validator() {
        let a = ResolvedAttribute::new("id", "sentry.span_id", SearchType::String);
        let b = a.clone().with_validator(hex_id_validator(16));
        assert_eq!(a, b);
    }
}
