//! Resolver Configuration
//!
//! Options recognized by the resolver and the request scope it resolves
//! against. Both are supplied at construction and never change afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default maximum length of a free-form tag key
pub const MAX_TAG_KEY_LENGTH: usize = 200;

/// Default maximum number of parsed terms in one query
pub const MAX_QUERY_TERMS: usize = 1000;

/// Default maximum parenthesis nesting in one query
pub const MAX_NESTING_DEPTH: usize = 32;

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Resolve aggregate ("having") terms; when false they are dropped
    /// (default: true)
    #[serde(default = "default_use_aggregate_conditions")]
    pub use_aggregate_conditions: bool,

    /// Inject `id`/`project.name` into column selections (default: false)
    #[serde(default)]
    pub auto_fields: bool,

    /// Longest accepted free-form tag key (default: 200)
    #[serde(default = "default_max_tag_key_length")]
    pub max_tag_key_length: usize,

    /// Most terms a query may hold, counting connectives and groups
    /// (default: 1000)
    #[serde(default = "default_max_query_terms")]
    pub max_query_terms: usize,

    /// Most nested parenthesis groups a query may hold (default: 32)
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

fn default_use_aggregate_conditions() -> bool {
    true
}

fn default_max_tag_key_length() -> usize {
    MAX_TAG_KEY_LENGTH
}

fn default_max_query_terms() -> usize {
    MAX_QUERY_TERMS
}

fn default_max_nesting_depth() -> usize {
    MAX_NESTING_DEPTH
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            use_aggregate_conditions: default_use_aggregate_conditions(),
            auto_fields: false,
            max_tag_key_length: default_max_tag_key_length(),
            max_query_terms: default_max_query_terms(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

impl ResolverConfig {
    pub fn with_aggregate_conditions(mut self, enabled: bool) -> Self {
        self.use_aggregate_conditions = enabled;
        self
    }

    pub fn with_auto_fields(mut self, enabled: bool) -> Self {
        self.auto_fields = enabled;
        self
    }

    pub fn with_max_tag_key_length(mut self, length: usize) -> Self {
        self.max_tag_key_length = length;
        self
    }

    pub fn with_max_query_terms(mut self, terms: usize) -> Self {
        self.max_query_terms = terms;
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }
}

/// A project visible to the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub slug: String,
}

impl Project {
    pub fn new(id: u64, slug: impl Into<String>) -> Self {
        Self {
            id,
            slug: slug.into(),
        }
    }
}

/// Request scope a query is resolved against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestParams {
    pub organization_id: Option<u64>,
    #[serde(default)]
    pub projects: Vec<Project>,
    /// Selected environments; `None` entries stand for "no environment"
    #[serde(default)]
    pub environments: Vec<Option<String>>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl RequestParams {
    pub fn new(organization_id: u64) -> Self {
        Self {
            organization_id: Some(organization_id),
            ..Default::default()
        }
    }

    pub fn with_projects(mut self, projects: Vec<Project>) -> Self {
        self.projects = projects;
        self
    }

    pub fn with_environments(mut self, environments: Vec<Option<String>>) -> Self {
        self.environments = environments;
        self
    }

    pub fn with_time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn project_ids(&self) -> Vec<u64> {
        self.projects.iter().map(|p| p.id).collect()
    }

    /// Environment names with the `None` entries dropped
    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.iter().flatten().map(String::as_str).collect()
    }
}
