use crate::ast::argument::{ARGUMENT_LIST_TYPE, ARGUMENT_TYPE};
use crate::ast::{ConstantExpression, Expression, Rewriter};
use crate::graph::{DynamicObject, GraphValue, Property};
use crate::types::{MemberInfo, TypeInfo};
use std::convert::Infallible;

/// Drops the generic argument of `VariableQueryArgument<T>` descriptors.
///
/// The payload keeps its own type descriptor, so nothing is lost: the
/// receiving side rebuilds the generic form with [`restore_argument_types`].
pub fn erase_argument_types(expr: Expression) -> Expression {
    ArgumentTypes { erase: true }
        .rewrite(expr)
        .unwrap_or_else(|never| match never {})
}

/// Rebuilds `VariableQueryArgument<T>` descriptors from the payload type
pub fn restore_argument_types(expr: Expression) -> Expression {
    ArgumentTypes { erase: false }
        .rewrite(expr)
        .unwrap_or_else(|never| match never {})
}

fn is_argument_type(info: &TypeInfo) -> bool {
    info.name == ARGUMENT_TYPE || info.name == ARGUMENT_LIST_TYPE
}

struct ArgumentTypes {
    erase: bool,
}

impl ArgumentTypes {
    fn constant_type(&self, ty: TypeInfo, value: &GraphValue) -> TypeInfo {
        if !is_argument_type(&ty) {
            return ty;
        }
        if self.erase {
            return TypeInfo::new(ty.name);
        }
        if ty.is_generic() {
            return ty;
        }
        match value {
            GraphValue::Argument(argument) => {
                TypeInfo::generic(ARGUMENT_TYPE, vec![argument.ty.clone()])
            }
            GraphValue::ArgumentList(list) => {
                TypeInfo::generic(ARGUMENT_LIST_TYPE, vec![list.element_type.clone()])
            }
            _ => ty,
        }
    }

    fn graph(&mut self, value: GraphValue) -> GraphValue {
        match value {
            GraphValue::Expression(nested) => {
                GraphValue::Expression(Box::new(self.rewrite_or_keep(*nested)))
            }
            GraphValue::List(items) => {
                GraphValue::List(items.into_iter().map(|item| self.graph(item)).collect())
            }
            GraphValue::Object(object) => GraphValue::Object(DynamicObject {
                type_info: object.type_info,
                properties: object
                    .properties
                    .into_iter()
                    .map(|property| Property {
                        name: property.name,
                        value: self.graph(property.value),
                    })
                    .collect(),
            }),
            GraphValue::Argument(mut argument) => {
                argument.value = Box::new(self.graph(*argument.value));
                GraphValue::Argument(argument)
            }
            other => other,
        }
    }

    fn rewrite_or_keep(&mut self, expr: Expression) -> Expression {
        self.rewrite(expr).unwrap_or_else(|never| match never {})
    }
}

impl Rewriter for ArgumentTypes {
    type Error = Infallible;

    fn rewrite_constant(
        &mut self,
        constant: ConstantExpression,
    ) -> Result<ConstantExpression, Infallible> {
        let ty = self.constant_type(constant.ty, &constant.value);
        let value = self.graph(constant.value);
        Ok(ConstantExpression::new(value, ty))
    }

    fn rewrite_member(
        &mut self,
        instance: Option<&Expression>,
        member: MemberInfo,
    ) -> Result<MemberInfo, Infallible> {
        if !is_argument_type(&member.declaring_type) {
            return Ok(member);
        }
        if self.erase {
            return Ok(MemberInfo {
                declaring_type: TypeInfo::new(member.declaring_type.name),
                name: member.name,
                member_type: TypeInfo::new("Object"),
            });
        }
        if member.declaring_type.is_generic() {
            return Ok(member);
        }
        // the instance constant was restored before its member
        let Some(Expression::Constant(constant)) = instance else {
            return Ok(member);
        };
        let declaring_type = constant.ty.clone();
        let member_type = match (declaring_type.name.as_str(), declaring_type.generic_arguments.first()) {
            (ARGUMENT_TYPE, Some(inner)) => inner.clone(),
            (ARGUMENT_LIST_TYPE, Some(element)) => TypeInfo::generic("Array", vec![element.clone()]),
            _ => return Ok(member),
        };
        Ok(MemberInfo {
            declaring_type,
            name: member.name,
            member_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ElementInit, MemberBinding, VariableQueryArgument, VariableQueryArgumentList};
    use crate::types::{ConstructorInfo, MethodInfo};

    fn argument_read() -> Expression {
        let int = TypeInfo::new("Int32");
        let generic = TypeInfo::generic(ARGUMENT_TYPE, vec![int.clone()]);
        Expression::MemberAccess {
            instance: Some(Box::new(Expression::constant(
                GraphValue::Argument(VariableQueryArgument::new(GraphValue::Int(10), int.clone())),
                generic.clone(),
            ))),
            member: MemberInfo {
                declaring_type: generic,
                name: "Value".to_string(),
                member_type: int,
            },
        }
    }

    #[test]
    fn test_erase_then_restore() {
        let original = argument_read();
        let erased = erase_argument_types(original.clone());
        let Expression::MemberAccess { instance, member } = &erased else {
            panic!("expected member access");
        };
        assert_eq!(member.declaring_type, TypeInfo::new(ARGUMENT_TYPE));
        assert!(matches!(
            instance.as_deref(),
            Some(Expression::Constant(c)) if !c.ty.is_generic()
        ));
        assert_eq!(restore_argument_types(erased), original);
    }

    #[test]
    fn test_idempotent() {
        let erased = erase_argument_types(argument_read());
        assert_eq!(erase_argument_types(erased.clone()), erased);
        let restored = restore_argument_types(erased);
        assert_eq!(restore_argument_types(restored.clone()), restored);
    }

    #[test]
    fn test_list_argument() {
        let int = TypeInfo::new("Int32");
        let list = Expression::MemberAccess {
            instance: Some(Box::new(Expression::constant(
                GraphValue::ArgumentList(VariableQueryArgumentList::new(
                    vec![GraphValue::Int(1), GraphValue::Int(2)],
                    int.clone(),
                )),
                TypeInfo::new(ARGUMENT_LIST_TYPE),
            ))),
            member: MemberInfo {
                declaring_type: TypeInfo::new(ARGUMENT_LIST_TYPE),
                name: "Values".to_string(),
                member_type: TypeInfo::new("Object"),
            },
        };
        let Expression::MemberAccess { member, .. } = restore_argument_types(list) else {
            panic!("expected member access");
        };
        assert_eq!(
            member.member_type,
            TypeInfo::generic("Array", vec![int.clone()])
        );
        assert_eq!(
            member.declaring_type,
            TypeInfo::generic(ARGUMENT_LIST_TYPE, vec![int])
        );
    }

    #[test]
    fn test_reaches_nested_expression_constants() {
        let nested = Expression::constant(
            GraphValue::Expression(Box::new(argument_read())),
            TypeInfo::new("Expression"),
        );
        let erased = erase_argument_types(nested.clone());
        assert_ne!(erased, nested);
        assert_eq!(restore_argument_types(erased), nested);
    }

    fn erased_read() -> Expression {
        erase_argument_types(argument_read())
    }

    #[test]
    fn test_reaches_member_init_bindings() {
        let product = TypeInfo::new("Product");
        let init = Expression::MemberInit {
            new: Box::new(Expression::New {
                constructor: ConstructorInfo {
                    declaring_type: product.clone(),
                    parameter_types: Vec::new(),
                },
                arguments: Vec::new(),
                members: None,
            }),
            bindings: vec![MemberBinding::Assignment {
                member: MemberInfo {
                    declaring_type: product,
                    name: "Price".to_string(),
                    member_type: TypeInfo::new("Int32"),
                },
                expression: argument_read(),
            }],
        };
        let erased = erase_argument_types(init.clone());
        let Expression::MemberInit { bindings, .. } = &erased else {
            panic!("expected member init");
        };
        let [MemberBinding::Assignment { expression, .. }] = bindings.as_slice() else {
            panic!("expected one assignment");
        };
        assert_eq!(*expression, erased_read());
        assert_eq!(restore_argument_types(erased), init);
    }

    #[test]
    fn test_reaches_list_init_arguments() {
        let list = TypeInfo::generic("List", vec![TypeInfo::new("Int32")]);
        let init = Expression::ListInit {
            new: Box::new(Expression::New {
                constructor: ConstructorInfo {
                    declaring_type: list.clone(),
                    parameter_types: Vec::new(),
                },
                arguments: Vec::new(),
                members: None,
            }),
            initializers: vec![ElementInit {
                add_method: MethodInfo {
                    declaring_type: list,
                    name: "Add".to_string(),
                    generic_arguments: Vec::new(),
                    parameter_types: vec![TypeInfo::new("Int32")],
                },
                arguments: vec![argument_read()],
            }],
        };
        let erased = erase_argument_types(init.clone());
        let Expression::ListInit { initializers, .. } = &erased else {
            panic!("expected list init");
        };
        assert_eq!(initializers[0].arguments, vec![erased_read()]);
        assert_eq!(restore_argument_types(erased), init);
    }
}
