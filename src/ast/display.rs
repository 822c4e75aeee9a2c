use crate::ast::node::{ConstantExpression, ElementInit, Expression, MemberBinding};
use crate::ast::operator::UnaryOperator;
use crate::graph::GraphValue;
use std::fmt;

fn comma_separated<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for ConstantExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            GraphValue::Resource(resource) => write!(f, "Resource<{}>", resource.element_type),
            GraphValue::Argument(argument) => write!(f, "Arg({})", argument.value),
            value => write!(f, "{}", value),
        }
    }
}

fn element_inits(f: &mut fmt::Formatter<'_>, initializers: &[ElementInit]) -> fmt::Result {
    for (i, init) in initializers.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}(", init.add_method.name)?;
        comma_separated(f, &init.arguments)?;
        write!(f, ")")?;
    }
    Ok(())
}

fn member_bindings(f: &mut fmt::Formatter<'_>, bindings: &[MemberBinding]) -> fmt::Result {
    for (i, binding) in bindings.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match binding {
            MemberBinding::Assignment { member, expression } => {
                write!(f, "{} = {}", member.name, expression)?
            }
            MemberBinding::Member { member, bindings } => {
                write!(f, "{} = {{ ", member.name)?;
                member_bindings(f, bindings)?;
                write!(f, " }}")?;
            }
            MemberBinding::List {
                member,
                initializers,
            } => {
                write!(f, "{} = {{ ", member.name)?;
                element_inits(f, initializers)?;
                write!(f, " }}")?;
            }
        }
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(constant) => write!(f, "{}", constant),
            Expression::Parameter(parameter) => write!(f, "{}", parameter.name),
            Expression::MemberAccess { instance, member } => match instance {
                Some(instance) => write!(f, "{}.{}", instance, member.name),
                None => write!(f, "{}.{}", member.declaring_type, member.name),
            },
            Expression::MethodCall {
                instance,
                method,
                arguments,
            } => {
                match instance {
                    Some(instance) => write!(f, "{}.{}(", instance, method.name)?,
                    None => write!(f, "{}.{}(", method.declaring_type.name, method.name)?,
                }
                comma_separated(f, arguments)?;
                write!(f, ")")
            }
            Expression::Binary {
                op, left, right, ..
            } => write!(f, "({} {} {})", left, op.as_str(), right),
            Expression::Unary {
                op, operand, ty, ..
            } => match (op, ty) {
                (UnaryOperator::Convert, Some(ty)) => write!(f, "(({}){})", ty, operand),
                (UnaryOperator::TypeAs, Some(ty)) => write!(f, "({} as {})", operand, ty),
                (UnaryOperator::Quote, _) => write!(f, "{}", operand),
                (UnaryOperator::IsNull, _) => write!(f, "({} == null)", operand),
                (UnaryOperator::IsNotNull, _) => write!(f, "({} != null)", operand),
                (UnaryOperator::ArrayLength, _) => write!(f, "{}.Length", operand),
                (UnaryOperator::Throw, _) => write!(f, "throw {}", operand),
                (op, _) => write!(f, "{}{}", op.as_str(), operand),
            },
            Expression::Conditional {
                test,
                if_true,
                if_false,
            } => write!(f, "({} ? {} : {})", test, if_true, if_false),
            Expression::Lambda(lambda) => {
                if lambda.parameters.len() == 1 {
                    write!(f, "{}", lambda.parameters[0].name)?;
                } else {
                    let names: Vec<&str> =
                        lambda.parameters.iter().map(|p| p.name.as_str()).collect();
                    write!(f, "({})", names.join(", "))?;
                }
                write!(f, " => {}", lambda.body)
            }
            Expression::New {
                constructor,
                arguments,
                members,
            } => match members {
                Some(members) => {
                    write!(f, "new {} {{ ", constructor.declaring_type)?;
                    for (i, (member, argument)) in members.iter().zip(arguments).enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{} = {}", member.name, argument)?;
                    }
                    write!(f, " }}")
                }
                None => {
                    write!(f, "new {}(", constructor.declaring_type)?;
                    comma_separated(f, arguments)?;
                    write!(f, ")")
                }
            },
            Expression::NewArray {
                element_type,
                items,
            } => {
                write!(f, "new {}[] {{ ", element_type)?;
                comma_separated(f, items)?;
                write!(f, " }}")
            }
            Expression::ListInit { new, initializers } => {
                write!(f, "{} {{ ", new)?;
                element_inits(f, initializers)?;
                write!(f, " }}")
            }
            Expression::MemberInit { new, bindings } => {
                write!(f, "{} {{ ", new)?;
                member_bindings(f, bindings)?;
                write!(f, " }}")
            }
            Expression::Collection { items, .. } => {
                write!(f, "[")?;
                comma_separated(f, items)?;
                write!(f, "]")
            }
            Expression::Block { expressions, .. } => {
                write!(f, "{{ ")?;
                for expr in expressions {
                    write!(f, "{}; ", expr)?;
                }
                write!(f, "}}")
            }
            Expression::TypeTest { operand, ty } => write!(f, "({} is {})", operand, ty),
            Expression::Try {
                body,
                handlers,
                finally,
                fault,
                ..
            } => {
                write!(f, "try {{ {} }}", body)?;
                for handler in handlers {
                    write!(f, " catch ({}) {{ {} }}", handler.test, handler.body)?;
                }
                if let Some(fault) = fault {
                    write!(f, " fault {{ {} }}", fault)?;
                }
                if let Some(finally) = finally {
                    write!(f, " finally {{ {} }}", finally)?;
                }
                Ok(())
            }
            Expression::Switch {
                value,
                cases,
                default,
                ..
            } => {
                write!(f, "switch ({}) {{ ", value)?;
                for case in cases {
                    write!(f, "case ")?;
                    comma_separated(f, &case.test_values)?;
                    write!(f, ": {}; ", case.body)?;
                }
                if let Some(default) = default {
                    write!(f, "default: {}; ", default)?;
                }
                write!(f, "}}")
            }
            Expression::Goto { kind, target, value } => {
                write!(f, "{:?} L{}", kind, target.id)?;
                if let Some(value) = value {
                    write!(f, " {}", value)?;
                }
                Ok(())
            }
            Expression::Label { target, .. } => write!(f, "L{}:", target.id),
            Expression::Loop { body, .. } => write!(f, "loop {{ {} }}", body),
            Expression::Invoke { target, arguments } => {
                write!(f, "{}(", target)?;
                comma_separated(f, arguments)?;
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, LambdaExpression, ParameterExpression};
    use crate::types::{MemberInfo, TypeInfo};

    #[test]
    fn test_display_lambda() {
        let p = ParameterExpression::new("p", TypeInfo::new("Product"));
        let expr = Expression::Lambda(LambdaExpression {
            parameters: vec![p.clone()],
            body: Box::new(Expression::Binary {
                op: BinaryOperator::GreaterThan,
                left: Box::new(Expression::MemberAccess {
                    instance: Some(Box::new(Expression::Parameter(p))),
                    member: MemberInfo {
                        declaring_type: TypeInfo::new("Product"),
                        name: "Price".to_string(),
                        member_type: TypeInfo::new("Int32"),
                    },
                }),
                right: Box::new(Expression::constant(
                    GraphValue::Int(10),
                    TypeInfo::new("Int32"),
                )),
                method: None,
                conversion: None,
            }),
        });
        assert_eq!(expr.to_string(), "p => (p.Price > 10)");
    }
}
