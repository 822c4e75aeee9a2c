//! Boxed, type-tagged caller values snapshotted by partial evaluation.

use crate::graph::GraphValue;
use crate::types::TypeInfo;
use serde::{Deserialize, Serialize};

/// Scalar variable query argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableQueryArgument {
    pub value: Box<GraphValue>,
    pub ty: TypeInfo,
}

impl VariableQueryArgument {
    pub fn new(value: GraphValue, ty: TypeInfo) -> Self {
        Self {
            value: Box::new(value),
            ty,
        }
    }
}

/// Homogeneous list argument. Elements share one type descriptor instead of
/// each carrying its own box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableQueryArgumentList {
    pub values: Vec<GraphValue>,
    pub element_type: TypeInfo,
}

impl VariableQueryArgumentList {
    pub fn new(values: Vec<GraphValue>, element_type: TypeInfo) -> Self {
        Self {
            values,
            element_type,
        }
    }
}

/// Name of the scalar wrapper type
pub const ARGUMENT_TYPE: &str = "VariableQueryArgument";

/// Name of the list wrapper type
pub const ARGUMENT_LIST_TYPE: &str = "VariableQueryArgumentList";
