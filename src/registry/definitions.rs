//! Registry of searchable columns, functions and virtual columns

use std::collections::HashMap;
use std::sync::Arc;

use super::column::ColumnDefinition;
use super::context::VirtualColumnDefinition;
use super::function::FunctionDefinition;

/// Read-only registry consulted by the resolver
pub trait SearchRegistry {
    /// Looks up a declared column by public alias
    fn column(&self, alias: &str) -> Option<&ColumnDefinition>;
    /// Looks up a function by name
    fn function(&self, name: &str) -> Option<&FunctionDefinition>;
    /// Looks up a virtual column by name
    fn virtual_column(&self, name: &str) -> Option<&Arc<VirtualColumnDefinition>>;
}

/// HashMap-backed registry
#[derive(Debug, Clone, Default)]
pub struct ColumnDefinitions {
    columns: HashMap<String, ColumnDefinition>,
    functions: HashMap<String, FunctionDefinition>,
    contexts: HashMap<String, Arc<VirtualColumnDefinition>>,
}

impl ColumnDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a column under its public alias
    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.insert(column.public_alias.clone(), column);
        self
    }

    pub fn with_function(mut self, name: impl Into<String>, function: FunctionDefinition) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    pub fn with_virtual_column(
        mut self,
        name: impl Into<String>,
        definition: VirtualColumnDefinition,
    ) -> Self {
        self.contexts.insert(name.into(), Arc::new(definition));
        self
    }

    /// Number of declared columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

impl SearchRegistry for ColumnDefinitions {
    fn column(&self, alias: &str) -> Option<&ColumnDefinition> {
        self.columns.get(alias)
    }

    fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }

    fn virtual_column(&self, name: &str) -> Option<&Arc<VirtualColumnDefinition>> {
        self.contexts.get(name)
    }
}
