use crate::types::{Type, TypeInfo};
use serde::{Deserialize, Serialize};

/// Stands in for a live data source while a query is in transit. Carries the
/// element type only; the receiving side binds a real source through a
/// [`SourceProvider`](crate::value::SourceProvider).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub element_type: TypeInfo,
}

impl ResourceDescriptor {
    pub fn new(element_type: &Type) -> Self {
        Self {
            element_type: TypeInfo::from(element_type),
        }
    }
}
