//! Native runtime values.
//!
//! This module provides:
//! - `Value`, the result of evaluating a native expression
//! - compiled closures, quoted expressions and deferred sequences
//! - record instances
//! - data sources and the provider that binds them

pub mod function;
pub mod record;
pub mod source;

pub use function::{Function, LazySequence, QuotedExpr, SortKey, SortSpec};
pub use record::Record;
pub use source::{
    InMemorySource, NotSupportedError, QuerySource, ResourceDescriptor, SourceProvider,
    SourceRegistry,
};

use crate::expression::ExecutionError;
use crate::types::{Type, TypeKind};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Char(char),
    String(String),
    Array(Vec<Value>),
    Record(Arc<Record>),
    /// Ordered name/value pairs
    Dynamic(Vec<(String, Value)>),
    Queryable(Arc<dyn QuerySource>),
    Resource(ResourceDescriptor),
    Sequence(LazySequence),
    Function(Function),
    Expression(QuotedExpr),
    /// Payload of a `VariableQueryArgument<T>`
    Argument(Box<Value>),
    /// Payload of a `VariableQueryArgumentList<T>`
    ArgumentList(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i as i64),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Long(l) => Some(*l as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Live values that cannot be expressed as data
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            Value::Queryable(_) | Value::Sequence(_) | Value::Function(_)
        )
    }

    /// Name of the runtime kind, for diagnostics
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "Boolean".to_string(),
            Value::Int(_) => "Int32".to_string(),
            Value::Long(_) => "Int64".to_string(),
            Value::Double(_) => "Double".to_string(),
            Value::Char(_) => "Char".to_string(),
            Value::String(_) => "String".to_string(),
            Value::Array(_) => "Array".to_string(),
            Value::Record(record) => record.ty().name().to_string(),
            Value::Dynamic(_) => "DynamicObject".to_string(),
            Value::Queryable(source) => format!("Queryable<{}>", source.element_type()),
            Value::Resource(resource) => format!("Resource<{}>", resource.element_type),
            Value::Sequence(_) => "Sequence".to_string(),
            Value::Function(_) => "Function".to_string(),
            Value::Expression(_) => "Expression".to_string(),
            Value::Argument(_) => "VariableQueryArgument".to_string(),
            Value::ArgumentList(_) => "VariableQueryArgumentList".to_string(),
        }
    }

    /// Whether this value is an instance of `ty`. Null is an instance of nothing.
    pub fn is_instance_of(&self, ty: &Type) -> bool {
        match (ty.kind(), self) {
            (_, Value::Null) => false,
            (TypeKind::Object, _) => true,
            (TypeKind::Nullable(inner), value) => value.is_instance_of(inner),
            (TypeKind::Boolean, Value::Bool(_))
            | (TypeKind::Int32, Value::Int(_))
            | (TypeKind::Int64, Value::Long(_))
            | (TypeKind::Double, Value::Double(_))
            | (TypeKind::Char, Value::Char(_))
            | (TypeKind::String, Value::String(_))
            | (TypeKind::DynamicObject, Value::Dynamic(_)) => true,
            (TypeKind::Record(_), Value::Record(record)) => record.ty() == ty,
            (TypeKind::Exception, Value::Record(_) | Value::String(_)) => true,
            (TypeKind::Array(_) | TypeKind::List(_), Value::Array(_)) => true,
            (
                TypeKind::Seq(_),
                Value::Array(_) | Value::Sequence(_) | Value::Queryable(_),
            ) => true,
            (TypeKind::Queryable(_), Value::Queryable(_) | Value::Sequence(_)) => true,
            (TypeKind::Func { .. }, Value::Function(_))
            | (TypeKind::Expression(_), Value::Expression(_)) => true,
            (TypeKind::VariableQueryArgument(_), Value::Argument(_))
            | (TypeKind::VariableQueryArgumentList(_), Value::ArgumentList(_)) => true,
            _ => false,
        }
    }

    /// Ordering used by comparison operators. `None` when the values are not
    /// comparable with each other.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Long(_), Value::Int(_) | Value::Long(_)) => {
                Some(self.as_i64()?.cmp(&other.as_i64()?))
            }
            (
                Value::Int(_) | Value::Long(_) | Value::Double(_),
                Value::Int(_) | Value::Long(_) | Value::Double(_),
            ) => self.as_f64()?.partial_cmp(&other.as_f64()?),
            _ => None,
        }
    }

    /// Total ordering for sorting: null first, incomparable values equal
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            _ => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }

    /// Forces deferred sequences and enumerates sources into an array
    pub fn materialize(self) -> Result<Value, ExecutionError> {
        match self {
            Value::Sequence(sequence) => Ok(Value::Array(sequence.force()?)),
            Value::Queryable(source) => Ok(Value::Array(source.enumerate()?)),
            other => Ok(other),
        }
    }

    /// Items of any sequence-shaped value
    pub fn enumerate(&self) -> Result<Vec<Value>, ExecutionError> {
        match self {
            Value::Array(items) | Value::ArgumentList(items) => Ok(items.clone()),
            Value::Sequence(sequence) => sequence.force(),
            Value::Queryable(source) => source.enumerate(),
            Value::Argument(inner) => inner.enumerate(),
            Value::Null => Err(ExecutionError::NullReference("source".to_string())),
            other => Err(ExecutionError::InvalidCast {
                value: other.to_string(),
                target: "Seq".to_string(),
            }),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (
                Value::Int(_) | Value::Long(_) | Value::Double(_),
                Value::Int(_) | Value::Long(_) | Value::Double(_),
            ) => self.compare(other) == Some(Ordering::Equal),
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::ArgumentList(a), Value::ArgumentList(b)) => a == b,
            (Value::Argument(a), Value::Argument(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Dynamic(a), Value::Dynamic(b)) => a == b,
            (Value::Resource(a), Value::Resource(b)) => a == b,
            (Value::Queryable(a), Value::Queryable(b)) => Arc::ptr_eq(a, b),
            (Value::Sequence(a), Value::Sequence(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Expression(a), Value::Expression(b)) => Arc::ptr_eq(&a.expr, &b.expr),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item)?;
            }
            write!(f, "]")
        }

        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}L", l),
            Value::Double(d) => write!(f, "{:?}", d),
            Value::Char(c) => write!(f, "'{}'", c),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Array(items) => list(f, items),
            Value::Record(record) => {
                write!(f, "{} {{ ", record.ty())?;
                for (i, (name, value)) in record.named_fields().into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", name, value)?;
                }
                write!(f, " }}")
            }
            Value::Dynamic(properties) => {
                write!(f, "{{ ")?;
                for (i, (name, value)) in properties.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", name, value)?;
                }
                write!(f, " }}")
            }
            Value::Queryable(source) => write!(f, "Queryable<{}>", source.element_type()),
            Value::Resource(resource) => write!(f, "Resource<{}>", resource.element_type),
            Value::Sequence(_) => write!(f, "<sequence>"),
            Value::Function(function) => write!(f, "<function/{}>", function.arity()),
            Value::Expression(quoted) => write!(f, "{}", quoted.expr),
            Value::Argument(value) => write!(f, "VariableQueryArgument({})", value),
            Value::ArgumentList(values) => {
                write!(f, "VariableQueryArgumentList")?;
                list(f, values)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_equality_across_widths() {
        assert_eq!(Value::Int(3), Value::Long(3));
        assert_eq!(Value::Int(3), Value::Double(3.0));
        assert_ne!(Value::Int(3), Value::from("3"));
    }

    #[test]
    fn test_compare() {
        assert_eq!(Value::Int(1).compare(&Value::Long(2)), Some(Ordering::Less));
        assert_eq!(
            Value::from("b").compare(&Value::from("a")),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::from("b").compare(&Value::Int(1)), None);
        assert_eq!(Value::Null.sort_cmp(&Value::Int(0)), Ordering::Less);
    }

    #[test]
    fn test_instance_of() {
        let product = Type::record("Product", vec![("Name", Type::string())]);
        let record = Value::Record(Arc::new(Record::new(
            product.clone(),
            vec![Value::from("A")],
        )));
        assert!(record.is_instance_of(&product));
        assert!(record.is_instance_of(&Type::object()));
        assert!(!Value::Null.is_instance_of(&Type::object()));
        assert!(Value::Int(1).is_instance_of(&Type::nullable(Type::int32())));
        assert!(!Value::Int(1).is_instance_of(&Type::string()));
    }

    #[test]
    fn test_materialize_sequence() {
        let sequence = Value::Sequence(LazySequence::new(|| Ok(vec![Value::Int(1), Value::Int(2)])));
        assert_eq!(
            sequence.materialize().unwrap(),
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_display() {
        let product = Type::record(
            "Product",
            vec![("Name", Type::string()), ("Price", Type::int32())],
        );
        let record = Value::Record(Arc::new(Record::new(
            product,
            vec![Value::from("A"), Value::Int(1)],
        )));
        assert_eq!(record.to_string(), "Product { Name = \"A\", Price = 1 }");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
    }
}
