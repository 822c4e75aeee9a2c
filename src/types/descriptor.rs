//! Serializable stand-ins for runtime type and member handles.
//!
//! Descriptors carry names and signatures only. They are never executable and
//! are turned back into handles by a [`TypeResolver`](super::TypeResolver).

use crate::types::member::{Constructor, Member, Method};
use crate::types::ty::{Type, TypeKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type descriptor: a base name plus generic arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    pub generic_arguments: Vec<TypeInfo>,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generic_arguments: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, generic_arguments: Vec<TypeInfo>) -> Self {
        Self {
            name: name.into(),
            generic_arguments,
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.generic_arguments.is_empty()
    }
}

impl From<&Type> for TypeInfo {
    fn from(ty: &Type) -> Self {
        let name = match ty.kind() {
            TypeKind::Nullable(_) => "Nullable",
            TypeKind::Array(_) => "Array",
            TypeKind::List(_) => "List",
            TypeKind::Seq(_) => "Seq",
            TypeKind::Queryable(_) => "Queryable",
            TypeKind::Func { .. } => "Func",
            TypeKind::Expression(_) => "Expression",
            TypeKind::VariableQueryArgument(_) => "VariableQueryArgument",
            TypeKind::VariableQueryArgumentList(_) => "VariableQueryArgumentList",
            // projection records cannot be named on the receiving side
            TypeKind::Record(shape) if shape.anonymous => "DynamicObject",
            _ => ty.name(),
        };
        TypeInfo {
            name: name.to_string(),
            generic_arguments: ty.generic_arguments().iter().map(TypeInfo::from).collect(),
        }
    }
}

impl From<Type> for TypeInfo {
    fn from(ty: Type) -> Self {
        TypeInfo::from(&ty)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.is_generic() {
            write!(f, "<")?;
            for (i, arg) in self.generic_arguments.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

/// Field or property descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberInfo {
    pub declaring_type: TypeInfo,
    pub name: String,
    pub member_type: TypeInfo,
}

impl From<&Member> for MemberInfo {
    fn from(member: &Member) -> Self {
        MemberInfo {
            declaring_type: TypeInfo::from(&member.declaring_type),
            name: member.name.clone(),
            member_type: TypeInfo::from(&member.ty),
        }
    }
}

impl fmt::Display for MemberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.name)
    }
}

/// Method descriptor. Generic methods carry their generic arguments so the
/// resolver can instantiate the same closed method on the other side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodInfo {
    pub declaring_type: TypeInfo,
    pub name: String,
    pub generic_arguments: Vec<TypeInfo>,
    pub parameter_types: Vec<TypeInfo>,
}

impl From<&Method> for MethodInfo {
    fn from(method: &Method) -> Self {
        MethodInfo {
            declaring_type: TypeInfo::from(method.declaring_type()),
            name: method.name().to_string(),
            generic_arguments: method
                .generic_arguments()
                .iter()
                .map(TypeInfo::from)
                .collect(),
            parameter_types: method.parameter_types().iter().map(TypeInfo::from).collect(),
        }
    }
}

impl fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.name)?;
        if !self.generic_arguments.is_empty() {
            let args: Vec<String> = self.generic_arguments.iter().map(|a| a.to_string()).collect();
            write!(f, "<{}>", args.join(","))?;
        }
        let params: Vec<String> = self.parameter_types.iter().map(|p| p.to_string()).collect();
        write!(f, "({})", params.join(", "))
    }
}

/// Constructor descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstructorInfo {
    pub declaring_type: TypeInfo,
    pub parameter_types: Vec<TypeInfo>,
}

impl From<&Constructor> for ConstructorInfo {
    fn from(constructor: &Constructor) -> Self {
        ConstructorInfo {
            declaring_type: TypeInfo::from(&constructor.declaring_type),
            parameter_types: constructor
                .parameter_types
                .iter()
                .map(TypeInfo::from)
                .collect(),
        }
    }
}

impl fmt::Display for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameter_types.iter().map(|p| p.to_string()).collect();
        write!(f, "new {}({})", self.declaring_type, params.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_info_from_generic_type() {
        let product = Type::record("Product", vec![("Name", Type::string())]);
        let info = TypeInfo::from(&Type::queryable(product));
        assert_eq!(info.name, "Queryable");
        assert_eq!(info.generic_arguments, vec![TypeInfo::new("Product")]);
        assert_eq!(info.to_string(), "Queryable<Product>");
    }

    #[test]
    fn test_anonymous_record_describes_as_dynamic_object() {
        let anonymous = Type::anonymous(vec![("Name", Type::string())]);
        assert_eq!(TypeInfo::from(&anonymous), TypeInfo::new("DynamicObject"));
    }

    #[test]
    fn test_func_type_info_lists_parameters_then_result() {
        let info = TypeInfo::from(&Type::func(vec![Type::int32()], Type::boolean()));
        assert_eq!(info.to_string(), "Func<Int32,Boolean>");
    }
}
