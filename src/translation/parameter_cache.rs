use crate::expression::Parameter;
use crate::types::Type;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Source of native parameters for AST parameter references.
///
/// Returning the same handle for the same `(type, name)` is what turns the
/// name-based parameters of the AST back into identity-bound ones.
pub trait ParameterStore {
    fn parameter(&mut self, ty: &Type, name: &str) -> Parameter;
}

/// Per-translation cache
#[derive(Debug, Default)]
pub struct ParameterCache {
    parameters: HashMap<(String, String), Parameter>,
}

impl ParameterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl ParameterStore for ParameterCache {
    fn parameter(&mut self, ty: &Type, name: &str) -> Parameter {
        self.parameters
            .entry((ty.name().to_string(), name.to_string()))
            .or_insert_with(|| Parameter::new(name, ty.clone()))
            .clone()
    }
}

/// Cache shared by several translations, possibly on different threads, so
/// that trees translated separately agree on parameter identity
#[derive(Debug, Default)]
pub struct SharedParameterCache {
    inner: Mutex<ParameterCache>,
}

impl SharedParameterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl ParameterStore for &SharedParameterCache {
    fn parameter(&mut self, ty: &Type, name: &str) -> Parameter {
        self.inner.lock().parameter(ty, name)
    }
}
