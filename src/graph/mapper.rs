//! Native value <-> value graph mapping.

use crate::expression::ExecutionError;
use crate::graph::{DynamicObject, GraphValue, Property};
use crate::types::{Type, TypeInfo, TypeKind, TypeResolver};
use crate::value::{Record, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("Value of kind {0} cannot be mapped to a value graph")]
    NotMappable(String),

    #[error("Cannot map {found} to {expected}")]
    TypeMismatch { expected: String, found: String },

    #[error("Enumeration failed while mapping: {0}")]
    Enumeration(#[source] ExecutionError),
}

/// Converts between native values and value graphs
pub trait ValueMapper: Send + Sync {
    fn map_to_graph(&self, value: &Value) -> Result<GraphValue, MappingError>;

    fn map_from_graph(&self, graph: &GraphValue, target: &Type) -> Result<Value, MappingError>;
}

/// Maps records to tagged [`DynamicObject`]s and back.
///
/// Shared record instances are mapped once per call. Records are rebuilt by
/// property name: extra properties are ignored and missing ones become null.
#[derive(Default)]
pub struct DynamicObjectMapper {
    resolver: Option<Arc<dyn TypeResolver>>,
}

impl DynamicObjectMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapper that rebuilds records from the type tag of untyped targets
    pub fn with_resolver(resolver: Arc<dyn TypeResolver>) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }

    fn to_graph(
        &self,
        value: &Value,
        seen: &mut HashMap<usize, GraphValue>,
    ) -> Result<GraphValue, MappingError> {
        Ok(match value {
            Value::Null => GraphValue::Null,
            Value::Bool(b) => GraphValue::Bool(*b),
            Value::Int(i) => GraphValue::Int(*i),
            Value::Long(l) => GraphValue::Long(*l),
            Value::Double(d) => GraphValue::Double(*d),
            Value::Char(c) => GraphValue::Char(*c),
            Value::String(s) => GraphValue::String(s.clone()),
            Value::Array(items) | Value::ArgumentList(items) => self.list(items, seen)?,
            Value::Sequence(sequence) => {
                let items = sequence.force().map_err(MappingError::Enumeration)?;
                self.list(&items, seen)?
            }
            Value::Queryable(source) => {
                let items = source.enumerate().map_err(MappingError::Enumeration)?;
                self.list(&items, seen)?
            }
            Value::Record(record) => {
                let key = Arc::as_ptr(record) as usize;
                if let Some(mapped) = seen.get(&key) {
                    return Ok(mapped.clone());
                }
                let type_info = if record.ty().is_anonymous() {
                    None
                } else {
                    Some(TypeInfo::from(record.ty()))
                };
                let mut object = DynamicObject::new(type_info);
                for (name, field) in record.named_fields() {
                    object.properties.push(Property {
                        name: name.to_string(),
                        value: self.to_graph(field, seen)?,
                    });
                }
                let mapped = GraphValue::Object(object);
                seen.insert(key, mapped.clone());
                mapped
            }
            Value::Dynamic(properties) => {
                let mut object = DynamicObject::new(None);
                for (name, property) in properties {
                    object.properties.push(Property {
                        name: name.clone(),
                        value: self.to_graph(property, seen)?,
                    });
                }
                GraphValue::Object(object)
            }
            Value::Resource(resource) => GraphValue::Resource(resource.clone()),
            Value::Argument(inner) => self.to_graph(inner, seen)?,
            Value::Function(_) | Value::Expression(_) => {
                return Err(MappingError::NotMappable(value.type_name()))
            }
        })
    }

    fn list(
        &self,
        items: &[Value],
        seen: &mut HashMap<usize, GraphValue>,
    ) -> Result<GraphValue, MappingError> {
        Ok(GraphValue::List(
            items
                .iter()
                .map(|item| self.to_graph(item, seen))
                .collect::<Result<_, _>>()?,
        ))
    }

    /// Natural mapping when the target type says nothing
    fn untyped(&self, graph: &GraphValue) -> Result<Value, MappingError> {
        Ok(match graph {
            GraphValue::Null => Value::Null,
            GraphValue::Bool(b) => Value::Bool(*b),
            GraphValue::Int(i) => Value::Int(*i),
            GraphValue::Long(l) => Value::Long(*l),
            GraphValue::Double(d) => Value::Double(*d),
            GraphValue::Char(c) => Value::Char(*c),
            GraphValue::String(s) => Value::String(s.clone()),
            GraphValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.untyped(item))
                    .collect::<Result<_, _>>()?,
            ),
            GraphValue::Object(object) => {
                let record_type = match (&object.type_info, &self.resolver) {
                    (Some(info), Some(resolver)) => resolver
                        .resolve_type(info)
                        .ok()
                        .filter(|ty| ty.record_shape().is_some()),
                    _ => None,
                };
                match record_type {
                    Some(ty) => self.record(object, &ty)?,
                    None => Value::Dynamic(
                        object
                            .properties
                            .iter()
                            .map(|p| Ok((p.name.clone(), self.untyped(&p.value)?)))
                            .collect::<Result<_, MappingError>>()?,
                    ),
                }
            }
            GraphValue::Resource(resource) => Value::Resource(resource.clone()),
            GraphValue::Argument(argument) => {
                Value::Argument(Box::new(self.untyped(&argument.value)?))
            }
            GraphValue::ArgumentList(list) => Value::ArgumentList(
                list.values
                    .iter()
                    .map(|item| self.untyped(item))
                    .collect::<Result<_, _>>()?,
            ),
            GraphValue::Expression(_) => {
                return Err(MappingError::NotMappable(graph.kind_name().to_string()))
            }
        })
    }

    fn record(&self, object: &DynamicObject, ty: &Type) -> Result<Value, MappingError> {
        let shape = ty.record_shape().ok_or_else(|| MappingError::TypeMismatch {
            expected: ty.name().to_string(),
            found: "object".to_string(),
        })?;
        let fields = shape
            .fields
            .iter()
            .map(|(name, field_type)| match object.get(name) {
                Some(value) => self.map_from_graph(value, field_type),
                None => Ok(Value::Null),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Record(Arc::new(Record::new(ty.clone(), fields))))
    }
}

impl ValueMapper for DynamicObjectMapper {
    fn map_to_graph(&self, value: &Value) -> Result<GraphValue, MappingError> {
        self.to_graph(value, &mut HashMap::new())
    }

    fn map_from_graph(&self, graph: &GraphValue, target: &Type) -> Result<Value, MappingError> {
        let mismatch = || MappingError::TypeMismatch {
            expected: target.name().to_string(),
            found: graph.kind_name().to_string(),
        };
        match (target.kind(), graph) {
            (TypeKind::Object, _) => self.untyped(graph),
            (TypeKind::Nullable(_), GraphValue::Null) => Ok(Value::Null),
            (TypeKind::Nullable(inner), _) => self.map_from_graph(graph, inner),
            (TypeKind::Boolean, GraphValue::Bool(b)) => Ok(Value::Bool(*b)),
            (TypeKind::Int32, GraphValue::Int(i)) => Ok(Value::Int(*i)),
            (TypeKind::Int32, GraphValue::Long(l)) => {
                i32::try_from(*l).map(Value::Int).map_err(|_| mismatch())
            }
            (TypeKind::Int64, GraphValue::Int(i)) => Ok(Value::Long(*i as i64)),
            (TypeKind::Int64, GraphValue::Long(l)) => Ok(Value::Long(*l)),
            (TypeKind::Double, GraphValue::Int(i)) => Ok(Value::Double(*i as f64)),
            (TypeKind::Double, GraphValue::Long(l)) => Ok(Value::Double(*l as f64)),
            (TypeKind::Double, GraphValue::Double(d)) => Ok(Value::Double(*d)),
            (TypeKind::Char, GraphValue::Char(c)) => Ok(Value::Char(*c)),
            (TypeKind::String, GraphValue::String(s)) => Ok(Value::String(s.clone())),
            (
                TypeKind::Array(element)
                | TypeKind::List(element)
                | TypeKind::Seq(element)
                | TypeKind::Queryable(element),
                GraphValue::List(items),
            ) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| self.map_from_graph(item, element))
                    .collect::<Result<_, _>>()?,
            )),
            (TypeKind::Record(_), GraphValue::Object(object)) => self.record(object, target),
            (TypeKind::DynamicObject, GraphValue::Object(_)) => self.untyped(graph),
            (TypeKind::VariableQueryArgument(inner), GraphValue::Argument(argument)) => Ok(
                Value::Argument(Box::new(self.map_from_graph(&argument.value, inner)?)),
            ),
            (TypeKind::VariableQueryArgumentList(element), GraphValue::ArgumentList(list)) => {
                Ok(Value::ArgumentList(
                    list.values
                        .iter()
                        .map(|item| self.map_from_graph(item, element))
                        .collect::<Result<_, _>>()?,
                ))
            }
            (TypeKind::Queryable(_), GraphValue::Resource(resource)) => {
                Ok(Value::Resource(resource.clone()))
            }
            // reference types and strings accept null
            (
                TypeKind::String
                | TypeKind::Record(_)
                | TypeKind::DynamicObject
                | TypeKind::Array(_)
                | TypeKind::List(_)
                | TypeKind::Seq(_)
                | TypeKind::Queryable(_),
                GraphValue::Null,
            ) => Ok(Value::Null),
            _ => Err(mismatch()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::LazySequence;

    fn product_type() -> Type {
        Type::record(
            "Product",
            vec![("Name", Type::string()), ("Price", Type::int32())],
        )
    }

    fn product(name: &str, price: i32) -> Value {
        Value::Record(Arc::new(Record::new(
            product_type(),
            vec![Value::from(name), Value::Int(price)],
        )))
    }

    #[test]
    fn test_record_round_trip() {
        let mapper = DynamicObjectMapper::new();
        let graph = mapper.map_to_graph(&product("A", 1)).unwrap();
        let GraphValue::Object(object) = &graph else {
            panic!("expected object");
        };
        assert_eq!(object.type_info, Some(TypeInfo::new("Product")));
        assert_eq!(object.get("Price"), Some(&GraphValue::Int(1)));

        let back = mapper.map_from_graph(&graph, &product_type()).unwrap();
        assert_eq!(back, product("A", 1));
    }

    #[test]
    fn test_extra_properties_ignored_and_missing_become_null() {
        let mapper = DynamicObjectMapper::new();
        let graph = GraphValue::Object(
            DynamicObject::new(None)
                .with("Name", GraphValue::String("A".to_string()))
                .with("Color", GraphValue::String("red".to_string())),
        );
        let value = mapper.map_from_graph(&graph, &product_type()).unwrap();
        let Value::Record(record) = value else {
            panic!("expected record");
        };
        assert_eq!(record.field("Name"), Some(&Value::from("A")));
        assert_eq!(record.field("Price"), Some(&Value::Null));
    }

    #[test]
    fn test_shared_record_is_mapped_once() {
        let shared = product("A", 1);
        let mapper = DynamicObjectMapper::new();
        let graph = mapper
            .map_to_graph(&Value::Array(vec![shared.clone(), shared]))
            .unwrap();
        let GraphValue::List(items) = graph else {
            panic!("expected list");
        };
        assert_eq!(items[0], items[1]);
    }

    #[test]
    fn test_sequence_is_materialized() {
        let mapper = DynamicObjectMapper::new();
        let sequence = Value::Sequence(LazySequence::new(|| Ok(vec![Value::Int(1)])));
        assert_eq!(
            mapper.map_to_graph(&sequence).unwrap(),
            GraphValue::List(vec![GraphValue::Int(1)])
        );
    }

    #[test]
    fn test_functions_are_not_mappable() {
        let mapper = DynamicObjectMapper::new();
        let function = Value::Function(crate::value::Function::new(0, |_| Ok(Value::Null)));
        assert!(matches!(
            mapper.map_to_graph(&function),
            Err(MappingError::NotMappable(_))
        ));
    }

    #[test]
    fn test_numeric_widening() {
        let mapper = DynamicObjectMapper::new();
        assert_eq!(
            mapper
                .map_from_graph(&GraphValue::Int(3), &Type::double())
                .unwrap(),
            Value::Double(3.0)
        );
        assert!(mapper
            .map_from_graph(&GraphValue::Double(3.5), &Type::int32())
            .is_err());
    }

    #[test]
    fn test_untyped_object_uses_resolver() {
        let registry = crate::types::TypeRegistry::new();
        registry.register_type(product_type());
        let mapper = DynamicObjectMapper::with_resolver(Arc::new(registry));
        let graph = mapper.map_to_graph(&product("B", 2)).unwrap();
        assert_eq!(
            mapper.map_from_graph(&graph, &Type::object()).unwrap(),
            product("B", 2)
        );
    }
}
