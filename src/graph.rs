//! Schema-neutral value graph.
//!
//! Results and constants travel as `GraphValue`s: plain data, ordered
//! property bags and nested expression trees. The [`mapper`] converts between
//! native values and graphs.

pub mod mapper;

pub use mapper::{DynamicObjectMapper, MappingError, ValueMapper};

use crate::ast::{Expression, ResourceDescriptor, VariableQueryArgument, VariableQueryArgumentList};
use crate::types::TypeInfo;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Char(char),
    String(String),
    List(Vec<GraphValue>),
    Object(DynamicObject),
    Expression(Box<Expression>),
    Resource(ResourceDescriptor),
    Argument(VariableQueryArgument),
    ArgumentList(VariableQueryArgumentList),
}

impl GraphValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            GraphValue::Null => "null",
            GraphValue::Bool(_) => "bool",
            GraphValue::Int(_) => "int",
            GraphValue::Long(_) => "long",
            GraphValue::Double(_) => "double",
            GraphValue::Char(_) => "char",
            GraphValue::String(_) => "string",
            GraphValue::List(_) => "list",
            GraphValue::Object(_) => "object",
            GraphValue::Expression(_) => "expression",
            GraphValue::Resource(_) => "resource",
            GraphValue::Argument(_) => "argument",
            GraphValue::ArgumentList(_) => "argument list",
        }
    }
}

/// Ordered property bag, optionally tagged with the type it was mapped from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DynamicObject {
    pub type_info: Option<TypeInfo>,
    pub properties: Vec<Property>,
}

impl DynamicObject {
    pub fn new(type_info: Option<TypeInfo>) -> Self {
        Self {
            type_info,
            properties: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: GraphValue) -> Self {
        self.properties.push(Property {
            name: name.into(),
            value,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&GraphValue> {
        self.properties
            .iter()
            .find(|property| property.name == name)
            .map(|property| &property.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: GraphValue,
}

impl fmt::Display for GraphValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphValue::Null => write!(f, "null"),
            GraphValue::Bool(b) => write!(f, "{}", b),
            GraphValue::Int(i) => write!(f, "{}", i),
            GraphValue::Long(l) => write!(f, "{}L", l),
            GraphValue::Double(d) => write!(f, "{:?}", d),
            GraphValue::Char(c) => write!(f, "'{}'", c),
            GraphValue::String(s) => write!(f, "\"{}\"", s),
            GraphValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            GraphValue::Object(object) => {
                if let Some(ty) = &object.type_info {
                    write!(f, "{} ", ty)?;
                }
                write!(f, "{{ ")?;
                for (i, property) in object.properties.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", property.name, property.value)?;
                }
                write!(f, " }}")
            }
            GraphValue::Expression(expr) => write!(f, "{}", expr),
            GraphValue::Resource(resource) => write!(f, "Resource<{}>", resource.element_type),
            GraphValue::Argument(argument) => write!(f, "{}", argument.value),
            GraphValue::ArgumentList(list) => {
                write!(f, "{}", GraphValue::List(list.values.clone()))
            }
        }
    }
}
