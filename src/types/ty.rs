//! Runtime type handles.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Shape of a record type: an ordered list of named, typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordShape {
    pub name: String,
    pub fields: Vec<(String, Type)>,
    /// Compiler-synthesised projection records have no nameable type on the
    /// receiving side and are shipped as dynamic objects instead.
    pub anonymous: bool,
}

impl RecordShape {
    /// Position of a field in construction order
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(field, _)| field == name)
    }

    /// Declared type of a field
    pub fn field_type(&self, name: &str) -> Option<&Type> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty)
    }
}

/// The kinds of types a native expression can be typed with
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Void,
    Boolean,
    Int32,
    Int64,
    Double,
    Char,
    String,
    Object,
    Exception,
    DynamicObject,
    Nullable(Type),
    Array(Type),
    List(Type),
    Seq(Type),
    Queryable(Type),
    Func { parameters: Vec<Type>, result: Type },
    Expression(Type),
    Record(RecordShape),
    /// Holder of static methods only (`Queryable`, `Math`, ...)
    StaticClass(String),
    VariableQueryArgument(Type),
    VariableQueryArgumentList(Type),
}

struct TypeDef {
    kind: TypeKind,
    name: String,
}

/// Runtime type handle.
///
/// Cloning is cheap. Two handles are equal when their canonical names are
/// equal, so independently constructed `Seq<Int32>` handles compare equal.
#[derive(Clone)]
pub struct Type(Arc<TypeDef>);

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        let name = canonical_name(&kind);
        Type(Arc::new(TypeDef { kind, name }))
    }

    pub fn void() -> Self {
        Self::new(TypeKind::Void)
    }

    pub fn boolean() -> Self {
        Self::new(TypeKind::Boolean)
    }

    pub fn int32() -> Self {
        Self::new(TypeKind::Int32)
    }

    pub fn int64() -> Self {
        Self::new(TypeKind::Int64)
    }

    pub fn double() -> Self {
        Self::new(TypeKind::Double)
    }

    pub fn char() -> Self {
        Self::new(TypeKind::Char)
    }

    pub fn string() -> Self {
        Self::new(TypeKind::String)
    }

    pub fn object() -> Self {
        Self::new(TypeKind::Object)
    }

    pub fn exception() -> Self {
        Self::new(TypeKind::Exception)
    }

    pub fn dynamic_object() -> Self {
        Self::new(TypeKind::DynamicObject)
    }

    pub fn nullable(inner: Type) -> Self {
        Self::new(TypeKind::Nullable(inner))
    }

    pub fn array(element: Type) -> Self {
        Self::new(TypeKind::Array(element))
    }

    pub fn list(element: Type) -> Self {
        Self::new(TypeKind::List(element))
    }

    pub fn seq(element: Type) -> Self {
        Self::new(TypeKind::Seq(element))
    }

    pub fn queryable(element: Type) -> Self {
        Self::new(TypeKind::Queryable(element))
    }

    pub fn func(parameters: Vec<Type>, result: Type) -> Self {
        Self::new(TypeKind::Func { parameters, result })
    }

    /// Type of a quoted lambda of the given function type
    pub fn expression(func: Type) -> Self {
        Self::new(TypeKind::Expression(func))
    }

    pub fn static_class(name: impl Into<String>) -> Self {
        Self::new(TypeKind::StaticClass(name.into()))
    }

    pub fn variable_argument(inner: Type) -> Self {
        Self::new(TypeKind::VariableQueryArgument(inner))
    }

    pub fn variable_argument_list(element: Type) -> Self {
        Self::new(TypeKind::VariableQueryArgumentList(element))
    }

    /// Named record type with ordered fields
    pub fn record(name: impl Into<String>, fields: Vec<(&str, Type)>) -> Self {
        Self::new(TypeKind::Record(RecordShape {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(field, ty)| (field.to_string(), ty))
                .collect(),
            anonymous: false,
        }))
    }

    /// Compiler-synthesised projection record
    pub fn anonymous(fields: Vec<(&str, Type)>) -> Self {
        let names: Vec<&str> = fields.iter().map(|(field, _)| *field).collect();
        Self::new(TypeKind::Record(RecordShape {
            name: format!("<>Anonymous{{{}}}", names.join(",")),
            fields: fields
                .into_iter()
                .map(|(field, ty)| (field.to_string(), ty))
                .collect(),
            anonymous: true,
        }))
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    /// Canonical name, e.g. `Seq<Product>`
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind(), TypeKind::Void)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.kind(), TypeKind::Boolean)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.kind(),
            TypeKind::Int32 | TypeKind::Int64 | TypeKind::Double
        )
    }

    pub fn is_queryable(&self) -> bool {
        matches!(self.kind(), TypeKind::Queryable(_))
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self.kind(), TypeKind::Record(shape) if shape.anonymous)
    }

    pub fn is_variable_argument(&self) -> bool {
        matches!(
            self.kind(),
            TypeKind::VariableQueryArgument(_) | TypeKind::VariableQueryArgumentList(_)
        )
    }

    pub fn record_shape(&self) -> Option<&RecordShape> {
        match self.kind() {
            TypeKind::Record(shape) => Some(shape),
            _ => None,
        }
    }

    /// Element type of any sequence-shaped type
    pub fn element_type(&self) -> Option<&Type> {
        match self.kind() {
            TypeKind::Array(element)
            | TypeKind::List(element)
            | TypeKind::Seq(element)
            | TypeKind::Queryable(element)
            | TypeKind::VariableQueryArgumentList(element) => Some(element),
            _ => None,
        }
    }

    /// Function signature of a `Func` or of a quoted `Expression<Func>`
    pub fn function_signature(&self) -> Option<(&[Type], &Type)> {
        match self.kind() {
            TypeKind::Func { parameters, result } => Some((parameters, result)),
            TypeKind::Expression(inner) => inner.function_signature(),
            _ => None,
        }
    }

    /// Generic arguments in declaration order
    pub fn generic_arguments(&self) -> Vec<Type> {
        match self.kind() {
            TypeKind::Nullable(t)
            | TypeKind::Array(t)
            | TypeKind::List(t)
            | TypeKind::Seq(t)
            | TypeKind::Queryable(t)
            | TypeKind::Expression(t)
            | TypeKind::VariableQueryArgument(t)
            | TypeKind::VariableQueryArgumentList(t) => vec![t.clone()],
            TypeKind::Func { parameters, result } => {
                let mut args = parameters.clone();
                args.push(result.clone());
                args
            }
            _ => Vec::new(),
        }
    }

    /// Whether a value of type `other` may be used where `self` is expected
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        if self == other {
            return true;
        }
        match (self.kind(), other.kind()) {
            (TypeKind::Object, _) => !other.is_void(),
            (TypeKind::Nullable(inner), _) => inner == other,
            (
                TypeKind::Seq(target),
                TypeKind::Seq(source)
                | TypeKind::Array(source)
                | TypeKind::List(source)
                | TypeKind::Queryable(source),
            ) => target.is_assignable_from(source),
            (
                TypeKind::Func { parameters, result },
                TypeKind::Func {
                    parameters: other_parameters,
                    result: other_result,
                },
            ) => parameters == other_parameters && result.is_assignable_from(other_result),
            (TypeKind::Expression(target), TypeKind::Expression(source)) => {
                target.is_assignable_from(source)
            }
            (TypeKind::Exception, TypeKind::Record(_)) => true,
            _ => false,
        }
    }
}

fn canonical_name(kind: &TypeKind) -> String {
    let generic = |base: &str, args: &[&Type]| {
        let args: Vec<&str> = args.iter().map(|t| t.name()).collect();
        format!("{}<{}>", base, args.join(","))
    };
    match kind {
        TypeKind::Void => "Void".to_string(),
        TypeKind::Boolean => "Boolean".to_string(),
        TypeKind::Int32 => "Int32".to_string(),
        TypeKind::Int64 => "Int64".to_string(),
        TypeKind::Double => "Double".to_string(),
        TypeKind::Char => "Char".to_string(),
        TypeKind::String => "String".to_string(),
        TypeKind::Object => "Object".to_string(),
        TypeKind::Exception => "Exception".to_string(),
        TypeKind::DynamicObject => "DynamicObject".to_string(),
        TypeKind::Nullable(t) => generic("Nullable", &[t]),
        TypeKind::Array(t) => generic("Array", &[t]),
        TypeKind::List(t) => generic("List", &[t]),
        TypeKind::Seq(t) => generic("Seq", &[t]),
        TypeKind::Queryable(t) => generic("Queryable", &[t]),
        TypeKind::Func { parameters, result } => {
            let mut args: Vec<&Type> = parameters.iter().collect();
            args.push(result);
            generic("Func", &args)
        }
        TypeKind::Expression(t) => generic("Expression", &[t]),
        TypeKind::Record(shape) => shape.name.clone(),
        TypeKind::StaticClass(name) => name.clone(),
        TypeKind::VariableQueryArgument(t) => generic("VariableQueryArgument", &[t]),
        TypeKind::VariableQueryArgumentList(t) => generic("VariableQueryArgumentList", &[t]),
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.name())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names() {
        assert_eq!(Type::int32().name(), "Int32");
        assert_eq!(Type::seq(Type::string()).name(), "Seq<String>");
        assert_eq!(
            Type::func(vec![Type::int32()], Type::boolean()).name(),
            "Func<Int32,Boolean>"
        );
        assert_eq!(
            Type::anonymous(vec![("Name", Type::string()), ("Price", Type::int32())]).name(),
            "<>Anonymous{Name,Price}"
        );
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(Type::seq(Type::int32()), Type::seq(Type::int32()));
        assert_ne!(Type::seq(Type::int32()), Type::array(Type::int32()));
    }

    #[test]
    fn test_assignability() {
        let product = Type::record("Product", vec![("Name", Type::string())]);

        assert!(Type::object().is_assignable_from(&Type::int32()));
        assert!(!Type::object().is_assignable_from(&Type::void()));
        assert!(Type::nullable(Type::int32()).is_assignable_from(&Type::int32()));
        assert!(Type::seq(product.clone()).is_assignable_from(&Type::queryable(product.clone())));
        assert!(Type::seq(product.clone()).is_assignable_from(&Type::array(product.clone())));
        assert!(Type::seq(Type::object()).is_assignable_from(&Type::list(product.clone())));
        assert!(!Type::array(product.clone()).is_assignable_from(&Type::seq(product)));
        assert!(!Type::int32().is_assignable_from(&Type::int64()));
    }

    #[test]
    fn test_func_result_covariance() {
        let narrow = Type::func(vec![Type::int32()], Type::string());
        let wide = Type::func(vec![Type::int32()], Type::object());
        assert!(wide.is_assignable_from(&narrow));
        assert!(!narrow.is_assignable_from(&wide));
    }

    #[test]
    fn test_element_and_signature() {
        let quoted = Type::expression(Type::func(vec![Type::int32()], Type::boolean()));
        let (params, result) = quoted.function_signature().unwrap();
        assert_eq!(params, &[Type::int32()]);
        assert_eq!(result, &Type::boolean());
        assert_eq!(
            Type::queryable(Type::string()).element_type(),
            Some(&Type::string())
        );
        assert_eq!(Type::string().element_type(), None);
    }
}
