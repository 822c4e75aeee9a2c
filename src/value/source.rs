//! Enumerable data sources and the provider seam that binds them at execution
//! time.

use crate::expression::ExecutionError;
use crate::types::{Type, TypeInfo};
use crate::value::Value;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// No data source is registered for the requested element type
#[derive(Error, Debug, Clone, PartialEq)]
#[error("No queryable source registered for element type {0}")]
pub struct NotSupportedError(pub String);

/// Live, enumerable data source
pub trait QuerySource: Send + Sync + fmt::Debug {
    fn element_type(&self) -> &Type;

    fn enumerate(&self) -> Result<Vec<Value>, ExecutionError>;
}

/// Data source over a fixed list of values
#[derive(Debug)]
pub struct InMemorySource {
    element_type: Type,
    items: Vec<Value>,
}

impl InMemorySource {
    pub fn new(element_type: Type, items: Vec<Value>) -> Self {
        Self {
            element_type,
            items,
        }
    }

    pub fn shared(element_type: Type, items: Vec<Value>) -> Arc<dyn QuerySource> {
        Arc::new(Self::new(element_type, items))
    }
}

impl QuerySource for InMemorySource {
    fn element_type(&self) -> &Type {
        &self.element_type
    }

    fn enumerate(&self) -> Result<Vec<Value>, ExecutionError> {
        Ok(self.items.clone())
    }
}

/// Serializable placeholder for a live data source
pub use crate::ast::ResourceDescriptor;

/// Maps an element type descriptor to the source that serves it
pub trait SourceProvider: Send + Sync {
    fn provide(&self, element_type: &TypeInfo) -> Result<Arc<dyn QuerySource>, NotSupportedError>;
}

impl<F> SourceProvider for F
where
    F: Fn(&TypeInfo) -> Option<Arc<dyn QuerySource>> + Send + Sync,
{
    fn provide(&self, element_type: &TypeInfo) -> Result<Arc<dyn QuerySource>, NotSupportedError> {
        self(element_type).ok_or_else(|| NotSupportedError(element_type.to_string()))
    }
}

/// Provider keyed by element type
#[derive(Default)]
pub struct SourceRegistry {
    sources: DashMap<TypeInfo, Arc<dyn QuerySource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, source: Arc<dyn QuerySource>) {
        self.sources
            .insert(TypeInfo::from(source.element_type()), source);
    }
}

impl SourceProvider for SourceRegistry {
    fn provide(&self, element_type: &TypeInfo) -> Result<Arc<dyn QuerySource>, NotSupportedError> {
        self.sources
            .get(element_type)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| NotSupportedError(element_type.to_string()))
    }
}
