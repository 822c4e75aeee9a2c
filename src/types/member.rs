//! Member, method and constructor handles.

use crate::expression::ExecutionError;
use crate::types::ty::{Type, TypeKind};
use crate::value::{Record, Value};
use std::fmt;
use std::sync::Arc;

/// Executable body of a method. Receives the instance (for instance methods)
/// and the already evaluated arguments.
pub type MethodImpl =
    Arc<dyn Fn(Option<&Value>, &[Value]) -> Result<Value, ExecutionError> + Send + Sync>;

/// Wraps a closure as a [`MethodImpl`], fixing its higher-ranked signature
pub fn method_impl<F>(f: F) -> MethodImpl
where
    F: Fn(Option<&Value>, &[Value]) -> Result<Value, ExecutionError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Getter of a static member
pub type StaticGetter = Arc<dyn Fn() -> Value + Send + Sync>;

/// Field or property handle
#[derive(Clone)]
pub struct Member {
    pub declaring_type: Type,
    pub name: String,
    pub ty: Type,
    pub getter: Option<StaticGetter>,
}

impl Member {
    pub fn new(declaring_type: Type, name: impl Into<String>, ty: Type) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            ty,
            getter: None,
        }
    }

    pub fn new_static(
        declaring_type: Type,
        name: impl Into<String>,
        ty: Type,
        getter: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            ty,
            getter: Some(Arc::new(getter)),
        }
    }

    /// Looks up an instance member of `declaring` by name.
    ///
    /// Covers record fields, the payload of variable query arguments and the
    /// `Length`/`Count` of strings and arrays. Dynamic object members are
    /// typed `Object` since their shape is only known at run time.
    pub fn find(declaring: &Type, name: &str) -> Option<Member> {
        let ty = match (declaring.kind(), name) {
            (TypeKind::Record(shape), _) => shape.field_type(name)?.clone(),
            (TypeKind::DynamicObject, _) => Type::object(),
            (TypeKind::VariableQueryArgument(inner), "Value") => inner.clone(),
            (TypeKind::VariableQueryArgumentList(element), "Values") => {
                Type::array(element.clone())
            }
            (TypeKind::String, "Length") => Type::int32(),
            (TypeKind::Array(_) | TypeKind::List(_), "Length" | "Count") => Type::int32(),
            _ => return None,
        };
        Some(Member::new(declaring.clone(), name, ty))
    }

    /// `VariableQueryArgument<T>.Value`
    pub fn argument_value(inner: &Type) -> Member {
        Member::new(Type::variable_argument(inner.clone()), "Value", inner.clone())
    }

    /// `VariableQueryArgumentList<T>.Values`
    pub fn argument_values(element: &Type) -> Member {
        Member::new(
            Type::variable_argument_list(element.clone()),
            "Values",
            Type::array(element.clone()),
        )
    }

    pub fn is_static(&self) -> bool {
        self.getter.is_some()
    }

    /// Reads the member off an instance, or through the static getter
    pub fn get(&self, instance: Option<&Value>) -> Result<Value, ExecutionError> {
        if let Some(getter) = &self.getter {
            return Ok(getter());
        }
        let instance = instance.ok_or_else(|| ExecutionError::MissingMember {
            type_name: self.declaring_type.name().to_string(),
            member: self.name.clone(),
        })?;
        let missing = || ExecutionError::MissingMember {
            type_name: instance.type_name(),
            member: self.name.clone(),
        };
        match (instance, self.name.as_str()) {
            (Value::Null, _) => Err(ExecutionError::NullReference(self.name.clone())),
            (Value::Record(record), name) => record.field(name).cloned().ok_or_else(missing),
            (Value::Dynamic(properties), name) => properties
                .iter()
                .find(|(property, _)| property == name)
                .map(|(_, value)| value.clone())
                .ok_or_else(missing),
            (Value::Argument(value), "Value") => Ok((**value).clone()),
            (Value::ArgumentList(values), "Values") => Ok(Value::Array(values.clone())),
            (Value::String(s), "Length") => Ok(Value::Int(s.chars().count() as i32)),
            (Value::Array(items), "Length" | "Count") => Ok(Value::Int(items.len() as i32)),
            _ => Err(missing()),
        }
    }

    /// Returns a copy of `instance` with this member replaced by `value`
    pub fn set(&self, instance: &Value, value: Value) -> Result<Value, ExecutionError> {
        match instance {
            Value::Record(record) => Ok(Value::Record(Arc::new(
                record.with_field(&self.name, value)?,
            ))),
            Value::Dynamic(properties) => {
                let mut properties = properties.clone();
                match properties.iter_mut().find(|(name, _)| *name == self.name) {
                    Some((_, slot)) => *slot = value,
                    None => properties.push((self.name.clone(), value)),
                }
                Ok(Value::Dynamic(properties))
            }
            Value::Null => Err(ExecutionError::NullReference(self.name.clone())),
            other => Err(ExecutionError::MissingMember {
                type_name: other.type_name(),
                member: self.name.clone(),
            }),
        }
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.declaring_type == other.declaring_type && self.name == other.name && self.ty == other.ty
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Member({}.{}: {})", self.declaring_type, self.name, self.ty)
    }
}

struct MethodDef {
    declaring_type: Type,
    name: String,
    generic_arguments: Vec<Type>,
    parameter_types: Vec<Type>,
    return_type: Type,
    is_static: bool,
    implementation: MethodImpl,
}

/// Closed (fully instantiated) method handle
#[derive(Clone)]
pub struct Method(Arc<MethodDef>);

impl Method {
    pub fn new_static(
        declaring_type: Type,
        name: impl Into<String>,
        generic_arguments: Vec<Type>,
        parameter_types: Vec<Type>,
        return_type: Type,
        implementation: MethodImpl,
    ) -> Self {
        Method(Arc::new(MethodDef {
            declaring_type,
            name: name.into(),
            generic_arguments,
            parameter_types,
            return_type,
            is_static: true,
            implementation,
        }))
    }

    pub fn new_instance(
        declaring_type: Type,
        name: impl Into<String>,
        parameter_types: Vec<Type>,
        return_type: Type,
        implementation: MethodImpl,
    ) -> Self {
        Method(Arc::new(MethodDef {
            declaring_type,
            name: name.into(),
            generic_arguments: Vec::new(),
            parameter_types,
            return_type,
            is_static: false,
            implementation,
        }))
    }

    pub fn declaring_type(&self) -> &Type {
        &self.0.declaring_type
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn generic_arguments(&self) -> &[Type] {
        &self.0.generic_arguments
    }

    pub fn parameter_types(&self) -> &[Type] {
        &self.0.parameter_types
    }

    pub fn return_type(&self) -> &Type {
        &self.0.return_type
    }

    pub fn is_static(&self) -> bool {
        self.0.is_static
    }

    pub fn invoke(&self, instance: Option<&Value>, arguments: &[Value]) -> Result<Value, ExecutionError> {
        if arguments.len() != self.0.parameter_types.len() {
            return Err(ExecutionError::ArgumentCount {
                callee: self.name().to_string(),
                expected: self.0.parameter_types.len(),
                actual: arguments.len(),
            });
        }
        if !self.0.is_static && matches!(instance, None | Some(Value::Null)) {
            return Err(ExecutionError::NullReference(self.name().to_string()));
        }
        (self.0.implementation)(instance, arguments)
    }
}

impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.declaring_type == other.0.declaring_type
                && self.0.name == other.0.name
                && self.0.generic_arguments == other.0.generic_arguments
                && self.0.parameter_types == other.0.parameter_types)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method({})", self)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0.declaring_type, self.0.name)?;
        if !self.0.generic_arguments.is_empty() {
            let args: Vec<&str> = self.0.generic_arguments.iter().map(|t| t.name()).collect();
            write!(f, "<{}>", args.join(","))?;
        }
        Ok(())
    }
}

/// Signature-producing factory for a possibly generic method.
///
/// `instantiate` receives the declaring type (so `List<T>.Add` sees its `T`)
/// and the method's own generic arguments.
#[derive(Clone)]
pub struct MethodTemplate {
    pub declaring_type: Type,
    pub name: String,
    pub generic_arity: usize,
    pub parameter_count: usize,
    pub instantiate: Arc<dyn Fn(&Type, &[Type]) -> Method + Send + Sync>,
}

impl MethodTemplate {
    pub fn new(
        declaring_type: Type,
        name: impl Into<String>,
        generic_arity: usize,
        parameter_count: usize,
        instantiate: impl Fn(&Type, &[Type]) -> Method + Send + Sync + 'static,
    ) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            generic_arity,
            parameter_count,
            instantiate: Arc::new(instantiate),
        }
    }

    /// Template for a non-generic method
    pub fn fixed(method: Method) -> Self {
        let declaring_type = method.declaring_type().clone();
        let name = method.name().to_string();
        let parameter_count = method.parameter_types().len();
        Self::new(declaring_type, name, 0, parameter_count, move |_, _| method.clone())
    }

    pub fn instantiate(&self, declaring: &Type, generic_arguments: &[Type]) -> Method {
        (self.instantiate)(declaring, generic_arguments)
    }
}

impl fmt::Debug for MethodTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MethodTemplate({}.{}`{}/{})",
            self.declaring_type, self.name, self.generic_arity, self.parameter_count
        )
    }
}

/// Constructor handle
#[derive(Debug, Clone, PartialEq)]
pub struct Constructor {
    pub declaring_type: Type,
    pub parameter_types: Vec<Type>,
}

impl Constructor {
    pub fn new(declaring_type: Type, parameter_types: Vec<Type>) -> Self {
        Self {
            declaring_type,
            parameter_types,
        }
    }

    /// Positional constructor over all record fields
    pub fn for_record(record_type: &Type) -> Option<Self> {
        let shape = record_type.record_shape()?;
        Some(Self::new(
            record_type.clone(),
            shape.fields.iter().map(|(_, ty)| ty.clone()).collect(),
        ))
    }

    /// Builds a value. `members` names the member each argument initialises,
    /// which dynamic objects require and records may use instead of position.
    pub fn construct(
        &self,
        arguments: Vec<Value>,
        members: Option<&[Member]>,
    ) -> Result<Value, ExecutionError> {
        if arguments.len() != self.parameter_types.len() {
            return Err(ExecutionError::ArgumentCount {
                callee: format!("new {}", self.declaring_type),
                expected: self.parameter_types.len(),
                actual: arguments.len(),
            });
        }
        match self.declaring_type.kind() {
            TypeKind::Record(shape) => {
                let fields = match members {
                    Some(members) => {
                        let mut fields = vec![Value::Null; shape.fields.len()];
                        for (member, value) in members.iter().zip(arguments) {
                            let index = shape.field_index(&member.name).ok_or_else(|| {
                                ExecutionError::MissingMember {
                                    type_name: shape.name.clone(),
                                    member: member.name.clone(),
                                }
                            })?;
                            fields[index] = value;
                        }
                        fields
                    }
                    None if arguments.len() == shape.fields.len() => arguments,
                    None => {
                        return Err(ExecutionError::ArgumentCount {
                            callee: format!("new {}", shape.name),
                            expected: shape.fields.len(),
                            actual: arguments.len(),
                        })
                    }
                };
                Ok(Value::Record(Arc::new(Record::new(
                    self.declaring_type.clone(),
                    fields,
                ))))
            }
            TypeKind::DynamicObject => {
                let members = members.unwrap_or(&[]);
                if members.len() != arguments.len() {
                    return Err(ExecutionError::ArgumentCount {
                        callee: "new DynamicObject".to_string(),
                        expected: members.len(),
                        actual: arguments.len(),
                    });
                }
                Ok(Value::Dynamic(
                    members
                        .iter()
                        .map(|m| m.name.clone())
                        .zip(arguments)
                        .collect(),
                ))
            }
            TypeKind::List(_) | TypeKind::Array(_) if arguments.is_empty() => {
                Ok(Value::Array(Vec::new()))
            }
            _ => Err(ExecutionError::NotSupported(format!(
                "constructing {}",
                self.declaring_type
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_type() -> Type {
        Type::record(
            "Product",
            vec![("Name", Type::string()), ("Price", Type::int32())],
        )
    }

    #[test]
    fn test_find_record_field() {
        let member = Member::find(&product_type(), "Price").unwrap();
        assert_eq!(member.ty, Type::int32());
        assert!(Member::find(&product_type(), "Weight").is_none());
    }

    #[test]
    fn test_get_record_field() {
        let ty = product_type();
        let ctor = Constructor::for_record(&ty).unwrap();
        let product = ctor
            .construct(vec![Value::from("A"), Value::Int(1)], None)
            .unwrap();
        let price = Member::find(&ty, "Price").unwrap();
        assert_eq!(price.get(Some(&product)).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_get_on_null_is_null_reference() {
        let price = Member::find(&product_type(), "Price").unwrap();
        assert!(matches!(
            price.get(Some(&Value::Null)),
            Err(ExecutionError::NullReference(_))
        ));
    }

    #[test]
    fn test_construct_dynamic_object_by_members() {
        let dynamic = Type::dynamic_object();
        let ctor = Constructor::new(dynamic.clone(), vec![Type::string(), Type::int32()]);
        let members = vec![
            Member::new(dynamic.clone(), "Name", Type::object()),
            Member::new(dynamic, "Price", Type::object()),
        ];
        let value = ctor
            .construct(vec![Value::from("A"), Value::Int(3)], Some(&members))
            .unwrap();
        assert_eq!(
            value,
            Value::Dynamic(vec![
                ("Name".to_string(), Value::from("A")),
                ("Price".to_string(), Value::Int(3)),
            ])
        );
    }

    #[test]
    fn test_set_returns_updated_copy() {
        let ty = product_type();
        let ctor = Constructor::for_record(&ty).unwrap();
        let product = ctor
            .construct(vec![Value::from("A"), Value::Int(1)], None)
            .unwrap();
        let price = Member::find(&ty, "Price").unwrap();
        let updated = price.set(&product, Value::Int(7)).unwrap();
        assert_eq!(price.get(Some(&updated)).unwrap(), Value::Int(7));
        assert_eq!(price.get(Some(&product)).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_invoke_checks_argument_count() {
        let method = Method::new_static(
            Type::static_class("Math"),
            "Abs",
            Vec::new(),
            vec![Type::int32()],
            Type::int32(),
            method_impl(|_, args| Ok(args[0].clone())),
        );
        assert!(matches!(
            method.invoke(None, &[]),
            Err(ExecutionError::ArgumentCount { expected: 1, actual: 0, .. })
        ));
        assert_eq!(method.invoke(None, &[Value::Int(4)]).unwrap(), Value::Int(4));
    }
}
