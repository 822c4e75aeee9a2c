//! Query AST -> native expression.

use crate::ast::{self, Expression};
use crate::error::Result;
use crate::expression::{
    BinaryOperator, CatchBlock, ElementInit, Expr, LabelTarget, LambdaExpr, MemberBinding,
    SwitchCase, UnaryOperator,
};
use crate::graph::{DynamicObjectMapper, GraphValue, ValueMapper};
use crate::translation::{ParameterCache, ParameterStore, UnsupportedExpression};
use crate::types::{MethodInfo, ResolutionError, Type, TypeInfo, TypeKind, TypeResolver};
use crate::value::{QuotedExpr, Value};
use std::collections::HashMap;

/// Rebuilds a native expression with a fresh parameter cache
pub fn to_native(expr: &Expression, resolver: &dyn TypeResolver) -> Result<Expr> {
    let mut cache = ParameterCache::new();
    to_native_with(expr, resolver, &mut cache)
}

/// Rebuilds a native expression, taking parameters from `parameters`
pub fn to_native_with(
    expr: &Expression,
    resolver: &dyn TypeResolver,
    parameters: &mut dyn ParameterStore,
) -> Result<Expr> {
    NativeTranslator::new(resolver, parameters).translate(expr)
}

/// Resolves every descriptor of an AST and rebuilds the native tree.
///
/// Parameters come from the store, so every reference to `(type, name)` is
/// the same native parameter. Arguments are fitted to the resolved
/// signatures: bare lambdas are quoted where an `Expression<F>` is expected
/// and assignable arguments get an explicit conversion.
pub struct NativeTranslator<'a> {
    resolver: &'a dyn TypeResolver,
    parameters: &'a mut dyn ParameterStore,
    labels: HashMap<u32, LabelTarget>,
    mapper: DynamicObjectMapper,
}

impl<'a> NativeTranslator<'a> {
    pub fn new(resolver: &'a dyn TypeResolver, parameters: &'a mut dyn ParameterStore) -> Self {
        Self {
            resolver,
            parameters,
            labels: HashMap::new(),
            mapper: DynamicObjectMapper::new(),
        }
    }

    pub fn translate(&mut self, expr: &Expression) -> Result<Expr> {
        Ok(match expr {
            Expression::Constant(constant) => {
                let ty = self.resolver.resolve_type(&constant.ty)?;
                Expr::Constant {
                    value: self.value(&constant.value, &ty)?,
                    ty,
                }
            }

            Expression::Parameter(parameter) => Expr::Parameter(self.parameter(parameter)?),

            Expression::MemberAccess { instance, member } => Expr::Member {
                instance: self.optional(instance.as_deref())?,
                member: self.resolver.resolve_member(member)?,
            },

            Expression::MethodCall {
                instance,
                method,
                arguments,
            } => {
                let resolved = self.resolver.resolve_method(method)?;
                let instance = self.optional(instance.as_deref())?;
                let arguments = self.fit_all(arguments, resolved.parameter_types(), method)?;
                Expr::Call {
                    instance,
                    method: resolved,
                    arguments,
                }
            }

            Expression::Binary {
                op,
                left,
                right,
                method,
                conversion,
            } => match op {
                ast::BinaryOperator::StringContains => self.string_predicate("Contains", left, right)?,
                ast::BinaryOperator::StringStartsWith => {
                    self.string_predicate("StartsWith", left, right)?
                }
                ast::BinaryOperator::StringEndsWith => {
                    self.string_predicate("EndsWith", left, right)?
                }
                ast::BinaryOperator::In => self.membership(left, right)?,
                op => Expr::Binary {
                    op: binary_operator(*op)?,
                    left: self.boxed(left)?,
                    right: self.boxed(right)?,
                    method: method
                        .as_ref()
                        .map(|m| self.resolver.resolve_method(m))
                        .transpose()?,
                    conversion: conversion
                        .as_ref()
                        .map(|lambda| self.lambda(lambda))
                        .transpose()?,
                },
            },

            Expression::Unary {
                op,
                operand,
                ty,
                method,
            } => {
                let operand = self.translate(operand)?;
                let method = method
                    .as_ref()
                    .map(|m| self.resolver.resolve_method(m))
                    .transpose()?;
                match op {
                    ast::UnaryOperator::IsNull | ast::UnaryOperator::IsNotNull => {
                        let null = Expr::null(operand.ty());
                        let op = if *op == ast::UnaryOperator::IsNull {
                            BinaryOperator::Equal
                        } else {
                            BinaryOperator::NotEqual
                        };
                        Expr::binary(op, operand, null)
                    }
                    ast::UnaryOperator::Quote => match operand {
                        Expr::Lambda(lambda) => Expr::quote(lambda),
                        operand => Expr::Unary {
                            op: UnaryOperator::Quote,
                            ty: Type::expression(operand.ty()),
                            operand: Box::new(operand),
                            method,
                        },
                    },
                    op => {
                        let op = unary_operator(*op)?;
                        let ty = match ty {
                            Some(info) => self.resolver.resolve_type(info)?,
                            None => match op {
                                UnaryOperator::ArrayLength => Type::int32(),
                                UnaryOperator::Throw => Type::void(),
                                _ => operand.ty(),
                            },
                        };
                        Expr::Unary {
                            op,
                            operand: Box::new(operand),
                            ty,
                            method,
                        }
                    }
                }
            }

            Expression::Conditional {
                test,
                if_true,
                if_false,
            } => Expr::Conditional {
                test: self.boxed(test)?,
                if_true: self.boxed(if_true)?,
                if_false: self.boxed(if_false)?,
            },

            Expression::Lambda(lambda) => Expr::Lambda(self.lambda(lambda)?),

            Expression::New {
                constructor,
                arguments,
                members,
            } => {
                let resolved = self.resolver.resolve_constructor(constructor)?;
                let arguments = self.fit_all(
                    arguments,
                    &resolved.parameter_types,
                    &constructor.to_string(),
                )?;
                let members = members
                    .as_ref()
                    .map(|members| {
                        members
                            .iter()
                            .map(|member| self.resolver.resolve_member(member))
                            .collect::<std::result::Result<Vec<_>, _>>()
                    })
                    .transpose()?;
                Expr::New {
                    constructor: resolved,
                    arguments,
                    members,
                }
            }

            Expression::NewArray {
                element_type,
                items,
            } => Expr::NewArray {
                element_type: self.resolver.resolve_type(element_type)?,
                items: self.all(items)?,
            },

            Expression::ListInit { new, initializers } => Expr::ListInit {
                new: self.boxed(new)?,
                initializers: self.initializers(initializers)?,
            },

            Expression::MemberInit { new, bindings } => Expr::MemberInit {
                new: self.boxed(new)?,
                bindings: self.bindings(bindings)?,
            },

            Expression::Collection {
                element_type,
                items,
            } => {
                let element = self.resolver.resolve_type(element_type)?;
                Expr::Constant {
                    value: self.collection(items)?,
                    ty: Type::array(element),
                }
            }

            Expression::Block {
                ty,
                variables,
                expressions,
            } => Expr::Block {
                ty: self.resolver.resolve_type(ty)?,
                variables: variables
                    .iter()
                    .map(|v| self.parameter(v))
                    .collect::<Result<_>>()?,
                expressions: self.all(expressions)?,
            },

            Expression::TypeTest { operand, ty } => Expr::TypeIs {
                operand: self.boxed(operand)?,
                ty: self.resolver.resolve_type(ty)?,
            },

            Expression::Try {
                ty,
                body,
                handlers,
                finally,
                fault,
            } => Expr::Try {
                ty: self.resolver.resolve_type(ty)?,
                body: self.boxed(body)?,
                handlers: handlers
                    .iter()
                    .map(|handler| {
                        Ok(CatchBlock {
                            test: self.resolver.resolve_type(&handler.test)?,
                            variable: handler
                                .variable
                                .as_ref()
                                .map(|v| self.parameter(v))
                                .transpose()?,
                            filter: handler
                                .filter
                                .as_ref()
                                .map(|f| self.translate(f))
                                .transpose()?,
                            body: self.translate(&handler.body)?,
                        })
                    })
                    .collect::<Result<_>>()?,
                finally: self.optional(finally.as_deref())?,
                fault: self.optional(fault.as_deref())?,
            },

            Expression::Switch {
                ty,
                value,
                comparison,
                cases,
                default,
            } => Expr::Switch {
                ty: self.resolver.resolve_type(ty)?,
                value: self.boxed(value)?,
                comparison: comparison
                    .as_ref()
                    .map(|m| self.resolver.resolve_method(m))
                    .transpose()?,
                cases: cases
                    .iter()
                    .map(|case| {
                        Ok(SwitchCase {
                            test_values: self.all(&case.test_values)?,
                            body: self.translate(&case.body)?,
                        })
                    })
                    .collect::<Result<_>>()?,
                default: self.optional(default.as_deref())?,
            },

            Expression::Goto {
                kind,
                target,
                value,
            } => Expr::Goto {
                kind: *kind,
                target: self.label(target)?,
                value: self.optional(value.as_deref())?,
            },

            Expression::Label { target, default } => Expr::Label {
                target: self.label(target)?,
                default: self.optional(default.as_deref())?,
            },

            Expression::Loop {
                body,
                break_label,
                continue_label,
            } => Expr::Loop {
                body: self.boxed(body)?,
                break_label: break_label.as_ref().map(|l| self.label(l)).transpose()?,
                continue_label: continue_label.as_ref().map(|l| self.label(l)).transpose()?,
            },

            Expression::Invoke { target, arguments } => Expr::Invoke {
                target: self.boxed(target)?,
                arguments: self.all(arguments)?,
            },
        })
    }

    fn boxed(&mut self, expr: &Expression) -> Result<Box<Expr>> {
        self.translate(expr).map(Box::new)
    }

    fn optional(&mut self, expr: Option<&Expression>) -> Result<Option<Box<Expr>>> {
        expr.map(|e| self.boxed(e)).transpose()
    }

    fn all(&mut self, exprs: &[Expression]) -> Result<Vec<Expr>> {
        exprs.iter().map(|e| self.translate(e)).collect()
    }

    fn parameter(&mut self, parameter: &ast::ParameterExpression) -> Result<crate::expression::Parameter> {
        let ty = self.resolver.resolve_type(&parameter.ty)?;
        Ok(self.parameters.parameter(&ty, &parameter.name))
    }

    fn lambda(&mut self, lambda: &ast::LambdaExpression) -> Result<LambdaExpr> {
        let parameters = lambda
            .parameters
            .iter()
            .map(|p| self.parameter(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(LambdaExpr::new(parameters, self.translate(&lambda.body)?))
    }

    fn label(&mut self, target: &ast::LabelTarget) -> Result<LabelTarget> {
        if let Some(label) = self.labels.get(&target.id) {
            return Ok(label.clone());
        }
        let ty = self.resolver.resolve_type(&target.ty)?;
        let label = LabelTarget::new(target.name.as_deref(), ty);
        self.labels.insert(target.id, label.clone());
        Ok(label)
    }

    fn initializers(&mut self, initializers: &[ast::ElementInit]) -> Result<Vec<ElementInit>> {
        initializers
            .iter()
            .map(|init| {
                let add_method = self.resolver.resolve_method(&init.add_method)?;
                let arguments =
                    self.fit_all(&init.arguments, add_method.parameter_types(), &init.add_method)?;
                Ok(ElementInit {
                    add_method,
                    arguments,
                })
            })
            .collect()
    }

    fn bindings(&mut self, bindings: &[ast::MemberBinding]) -> Result<Vec<MemberBinding>> {
        bindings
            .iter()
            .map(|binding| {
                Ok(match binding {
                    ast::MemberBinding::Assignment { member, expression } => {
                        MemberBinding::Assignment {
                            member: self.resolver.resolve_member(member)?,
                            expression: self.translate(expression)?,
                        }
                    }
                    ast::MemberBinding::Member { member, bindings } => MemberBinding::Member {
                        member: self.resolver.resolve_member(member)?,
                        bindings: self.bindings(bindings)?,
                    },
                    ast::MemberBinding::List {
                        member,
                        initializers,
                    } => MemberBinding::List {
                        member: self.resolver.resolve_member(member)?,
                        initializers: self.initializers(initializers)?,
                    },
                })
            })
            .collect()
    }

    fn fit_all(
        &mut self,
        arguments: &[Expression],
        parameter_types: &[Type],
        callee: &dyn std::fmt::Display,
    ) -> Result<Vec<Expr>> {
        if arguments.len() != parameter_types.len() {
            return Err(ResolutionError::SignatureMismatch {
                callee: callee.to_string(),
                expected: format!("{} arguments", parameter_types.len()),
                actual: format!("{} arguments", arguments.len()),
            }
            .into());
        }
        arguments
            .iter()
            .zip(parameter_types)
            .map(|(argument, expected)| {
                let argument = self.translate(argument)?;
                fit(argument, expected, callee)
            })
            .collect()
    }

    fn string_predicate(&mut self, name: &str, left: &Expression, right: &Expression) -> Result<Expr> {
        let string = TypeInfo::new("String");
        let method = self.resolver.resolve_method(&MethodInfo {
            declaring_type: string.clone(),
            name: name.to_string(),
            generic_arguments: Vec::new(),
            parameter_types: vec![string],
        })?;
        let instance = self.translate(left)?;
        let argument = self.translate(right)?;
        Ok(Expr::call(Some(instance), method, vec![argument]))
    }

    /// `item in [..]` -> `Enumerable.Contains<T>(constant, item)`
    fn membership(&mut self, left: &Expression, right: &Expression) -> Result<Expr> {
        let item = self.translate(left)?;
        let (element, values) = match right {
            Expression::Collection {
                element_type,
                items,
            } => (self.resolver.resolve_type(element_type)?, self.collection(items)?),
            other => {
                let collection = self.translate(other)?;
                let ty = collection.ty();
                let element = ty.element_type().cloned().ok_or_else(|| {
                    UnsupportedExpression::new(other.to_string(), "right operand of In is not a collection")
                })?;
                let sequence = Type::seq(element.clone());
                let method = self.contains_method(&element, &sequence)?;
                let collection = fit(collection, &sequence, &"Enumerable.Contains")?;
                return Ok(Expr::call(None, method, vec![collection, item]));
            }
        };
        let sequence = Type::seq(element.clone());
        let method = self.contains_method(&element, &sequence)?;
        Ok(Expr::call(
            None,
            method,
            vec![Expr::constant(values, sequence), item],
        ))
    }

    fn contains_method(&self, element: &Type, sequence: &Type) -> Result<crate::types::Method> {
        let element_info = TypeInfo::from(element);
        Ok(self.resolver.resolve_method(&MethodInfo {
            declaring_type: TypeInfo::new("Enumerable"),
            name: "Contains".to_string(),
            generic_arguments: vec![element_info.clone()],
            parameter_types: vec![TypeInfo::from(sequence), element_info],
        })?)
    }

    fn collection(&mut self, items: &[ast::ConstantExpression]) -> Result<Value> {
        items
            .iter()
            .map(|item| {
                let ty = self.resolver.resolve_type(&item.ty)?;
                self.value(&item.value, &ty)
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    /// Type-guided conversion of a constant's payload
    fn value(&mut self, graph: &GraphValue, ty: &Type) -> Result<Value> {
        Ok(match graph {
            GraphValue::Expression(nested) => {
                let labels = std::mem::take(&mut self.labels);
                let expr = self.translate(nested);
                self.labels = labels;
                Value::Expression(QuotedExpr::closed(expr?))
            }
            GraphValue::Argument(argument) => {
                let inner = self.resolver.resolve_type(&argument.ty)?;
                Value::Argument(Box::new(self.value(&argument.value, &inner)?))
            }
            GraphValue::ArgumentList(list) => {
                let element = self.resolver.resolve_type(&list.element_type)?;
                Value::ArgumentList(
                    list.values
                        .iter()
                        .map(|item| self.value(item, &element))
                        .collect::<Result<_>>()?,
                )
            }
            GraphValue::Resource(resource) => Value::Resource(resource.clone()),
            GraphValue::List(items) => match ty.element_type() {
                Some(element) if !matches!(ty.kind(), TypeKind::VariableQueryArgumentList(_)) => {
                    let element = element.clone();
                    Value::Array(
                        items
                            .iter()
                            .map(|item| self.value(item, &element))
                            .collect::<Result<_>>()?,
                    )
                }
                _ => self.mapper.map_from_graph(graph, ty)?,
            },
            other => self.mapper.map_from_graph(other, ty)?,
        })
    }
}

/// Fits `argument` to a parameter of type `expected`
fn fit(argument: Expr, expected: &Type, callee: &dyn std::fmt::Display) -> Result<Expr> {
    let actual = argument.ty();
    if &actual == expected {
        return Ok(argument);
    }
    let argument = match (expected.kind(), argument) {
        (TypeKind::Expression(_), Expr::Lambda(lambda)) => {
            let quoted = Expr::quote(lambda);
            if expected.is_assignable_from(&quoted.ty()) {
                log::trace!("quoted lambda argument of {}", callee);
                return Ok(quoted);
            }
            quoted
        }
        (_, argument) => argument,
    };
    let actual = argument.ty();
    if expected.is_assignable_from(&actual) {
        log::trace!("converted argument of {} from {} to {}", callee, actual, expected);
        return Ok(Expr::convert(argument, expected.clone()));
    }
    Err(ResolutionError::SignatureMismatch {
        callee: callee.to_string(),
        expected: expected.name().to_string(),
        actual: actual.name().to_string(),
    }
    .into())
}

fn binary_operator(op: ast::BinaryOperator) -> Result<BinaryOperator> {
    use ast::BinaryOperator as Ast;
    Ok(match op {
        Ast::Add => BinaryOperator::Add,
        Ast::Subtract => BinaryOperator::Subtract,
        Ast::Multiply => BinaryOperator::Multiply,
        Ast::Divide => BinaryOperator::Divide,
        Ast::Modulo => BinaryOperator::Modulo,
        Ast::Power => BinaryOperator::Power,
        Ast::Equal => BinaryOperator::Equal,
        Ast::NotEqual => BinaryOperator::NotEqual,
        Ast::LessThan => BinaryOperator::LessThan,
        Ast::LessThanOrEqual => BinaryOperator::LessThanOrEqual,
        Ast::GreaterThan => BinaryOperator::GreaterThan,
        Ast::GreaterThanOrEqual => BinaryOperator::GreaterThanOrEqual,
        Ast::And => BinaryOperator::AndAlso,
        Ast::Or => BinaryOperator::OrElse,
        Ast::BitwiseAnd => BinaryOperator::And,
        Ast::BitwiseOr => BinaryOperator::Or,
        Ast::ExclusiveOr => BinaryOperator::ExclusiveOr,
        Ast::LeftShift => BinaryOperator::LeftShift,
        Ast::RightShift => BinaryOperator::RightShift,
        Ast::Coalesce => BinaryOperator::Coalesce,
        Ast::ArrayIndex => BinaryOperator::ArrayIndex,
        Ast::Assign => BinaryOperator::Assign,
        Ast::StringContains | Ast::StringStartsWith | Ast::StringEndsWith | Ast::In => {
            return Err(lowered(op.as_str()));
        }
    })
}

fn unary_operator(op: ast::UnaryOperator) -> Result<UnaryOperator> {
    use ast::UnaryOperator as Ast;
    Ok(match op {
        Ast::Not => UnaryOperator::Not,
        Ast::Negate => UnaryOperator::Negate,
        Ast::UnaryPlus => UnaryOperator::UnaryPlus,
        Ast::Convert => UnaryOperator::Convert,
        Ast::TypeAs => UnaryOperator::TypeAs,
        Ast::ArrayLength => UnaryOperator::ArrayLength,
        Ast::Quote => UnaryOperator::Quote,
        Ast::Throw => UnaryOperator::Throw,
        Ast::IsNull | Ast::IsNotNull => return Err(lowered(op.as_str())),
    })
}

/// Operators that only exist on the wire and are rewritten into calls or
/// comparisons by the translator itself
fn lowered(op: &str) -> crate::error::Error {
    UnsupportedExpression::new(op, "operator has no native counterpart").into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslationOptions;
    use crate::error::Error;
    use crate::expression::{evaluate, evaluate_in, Parameter, Scope};
    use crate::translation::{to_ast, SharedParameterCache};
    use crate::types::{ConstructorInfo, MemberInfo, TypeRegistry};

    fn int_info() -> TypeInfo {
        TypeInfo::new("Int32")
    }

    fn int_constant(value: i32) -> Expression {
        Expression::constant(GraphValue::Int(value), int_info())
    }

    #[test]
    fn test_parameters_unify_by_type_and_name() {
        let registry = TypeRegistry::with_builtins();
        let x = Expression::parameter("x", int_info());
        let lambda = Expression::Lambda(ast::LambdaExpression {
            parameters: vec![ast::ParameterExpression::new("x", int_info())],
            body: Box::new(Expression::Binary {
                op: ast::BinaryOperator::Add,
                left: Box::new(x.clone()),
                right: Box::new(x),
                method: None,
                conversion: None,
            }),
        });
        let native = to_native(&lambda, &registry).unwrap();
        let Expr::Lambda(lambda) = &native else {
            panic!("expected lambda");
        };
        let Expr::Binary { left, right, .. } = lambda.body.as_ref() else {
            panic!("expected binary");
        };
        let (Expr::Parameter(a), Expr::Parameter(b)) = (left.as_ref(), right.as_ref()) else {
            panic!("expected parameters");
        };
        assert_eq!(a, b);
        assert_eq!(a, &lambda.parameters[0]);

        let function = crate::expression::compile_lambda(lambda, &Scope::new());
        assert_eq!(function.call(&[Value::Int(4)]).unwrap(), Value::Int(8));
    }

    #[test]
    fn test_shared_cache_spans_translations() {
        let registry = TypeRegistry::with_builtins();
        let shared = SharedParameterCache::new();
        let x = Expression::parameter("x", int_info());
        let mut store = &shared;
        let first = to_native_with(&x, &registry, &mut store).unwrap();
        let second = to_native_with(&x, &registry, &mut store).unwrap();
        let (Expr::Parameter(a), Expr::Parameter(b)) = (first, second) else {
            panic!("expected parameters");
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_null_test_lowers_to_comparison() {
        let registry = TypeRegistry::with_builtins();
        let expr = Expression::Unary {
            op: ast::UnaryOperator::IsNull,
            operand: Box::new(Expression::constant(GraphValue::Null, TypeInfo::new("String"))),
            ty: None,
            method: None,
        };
        let native = to_native(&expr, &registry).unwrap();
        assert!(matches!(
            native,
            Expr::Binary {
                op: BinaryOperator::Equal,
                ..
            }
        ));
        assert_eq!(evaluate(&native).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_string_operator_lowers_to_call() {
        let registry = TypeRegistry::with_builtins();
        let expr = Expression::Binary {
            op: ast::BinaryOperator::StringEndsWith,
            left: Box::new(Expression::constant(
                GraphValue::String("Widget".to_string()),
                TypeInfo::new("String"),
            )),
            right: Box::new(Expression::constant(
                GraphValue::String("get".to_string()),
                TypeInfo::new("String"),
            )),
            method: None,
            conversion: None,
        };
        let native = to_native(&expr, &registry).unwrap();
        assert!(matches!(native, Expr::Call { .. }));
        assert_eq!(evaluate(&native).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_in_lowers_to_contains() {
        let registry = TypeRegistry::with_builtins();
        let n = Expression::parameter("n", int_info());
        let expr = Expression::Binary {
            op: ast::BinaryOperator::In,
            left: Box::new(n),
            right: Box::new(Expression::Collection {
                element_type: int_info(),
                items: vec![
                    ast::ConstantExpression::new(GraphValue::Int(1), int_info()),
                    ast::ConstantExpression::new(GraphValue::Int(5), int_info()),
                ],
            }),
            method: None,
            conversion: None,
        };
        let native = to_native(&expr, &registry).unwrap();
        let Expr::Call { arguments, .. } = &native else {
            panic!("expected call");
        };
        let Expr::Parameter(n) = &arguments[1] else {
            panic!("expected parameter");
        };
        let scope = Scope::new().extend([(n.clone(), Value::Int(5))]);
        assert_eq!(evaluate_in(&native, &scope).unwrap(), Value::Bool(true));

        // and back again
        let ast = to_ast(
            &native,
            &TranslationOptions {
                evaluate_locally: false,
                ..TranslationOptions::default()
            },
        )
        .unwrap();
        assert_eq!(ast, expr);
    }

    #[test]
    fn test_unknown_descriptors_fail_resolution() {
        let registry = TypeRegistry::with_builtins();
        let expr = Expression::parameter("c", TypeInfo::new("Customer"));
        assert!(matches!(
            to_native(&expr, &registry),
            Err(crate::Error::Resolution(ResolutionError::UnknownType(_)))
        ));

        let call = Expression::MethodCall {
            instance: None,
            method: MethodInfo {
                declaring_type: TypeInfo::new("Math"),
                name: "Cbrt".to_string(),
                generic_arguments: Vec::new(),
                parameter_types: vec![TypeInfo::new("Double")],
            },
            arguments: vec![Expression::constant(GraphValue::Double(8.0), TypeInfo::new("Double"))],
        };
        assert!(matches!(
            to_native(&call, &registry),
            Err(crate::Error::Resolution(ResolutionError::UnknownMethod(_)))
        ));
    }

    #[test]
    fn test_lambda_argument_is_quoted() {
        let registry = TypeRegistry::with_builtins();
        let product = Type::record("Product", vec![("Price", Type::int32())]);
        registry.register_type(product.clone());
        let where_ = registry
            .method("Queryable", "Where", &[product.clone()], 2)
            .unwrap();
        let product_info = TypeInfo::from(&product);
        let p = ast::ParameterExpression::new("p", product_info.clone());
        let call = Expression::MethodCall {
            instance: None,
            method: MethodInfo::from(&where_),
            arguments: vec![
                Expression::constant(
                    GraphValue::Resource(ast::ResourceDescriptor::new(&product)),
                    TypeInfo::from(&Type::queryable(product.clone())),
                ),
                Expression::Lambda(ast::LambdaExpression {
                    parameters: vec![p.clone()],
                    body: Box::new(Expression::Binary {
                        op: ast::BinaryOperator::GreaterThan,
                        left: Box::new(Expression::MemberAccess {
                            instance: Some(Box::new(Expression::Parameter(p))),
                            member: MemberInfo {
                                declaring_type: product_info,
                                name: "Price".to_string(),
                                member_type: int_info(),
                            },
                        }),
                        right: Box::new(int_constant(10)),
                        method: None,
                        conversion: None,
                    }),
                }),
            ],
        };
        let native = to_native(&call, &registry).unwrap();
        let Expr::Call { arguments, .. } = &native else {
            panic!("expected call");
        };
        assert!(matches!(
            arguments[1],
            Expr::Unary {
                op: UnaryOperator::Quote,
                ..
            }
        ));
        assert!(crate::expression::TypeChecker::new().validate(&native).is_ok());
    }

    #[test]
    fn test_signature_mismatch() {
        let registry = TypeRegistry::with_builtins();
        let call = Expression::MethodCall {
            instance: None,
            method: MethodInfo {
                declaring_type: TypeInfo::new("Math"),
                name: "Sqrt".to_string(),
                generic_arguments: Vec::new(),
                parameter_types: vec![TypeInfo::new("Double")],
            },
            arguments: vec![Expression::constant(
                GraphValue::String("nine".to_string()),
                TypeInfo::new("String"),
            )],
        };
        assert!(matches!(
            to_native(&call, &registry),
            Err(crate::Error::Resolution(ResolutionError::SignatureMismatch { .. }))
        ));
    }

    #[test]
    fn test_dynamic_object_construction() {
        let registry = TypeRegistry::with_builtins();
        let name = MemberInfo {
            declaring_type: TypeInfo::new("DynamicObject"),
            name: "Name".to_string(),
            member_type: TypeInfo::new("String"),
        };
        let expr = Expression::New {
            constructor: ConstructorInfo {
                declaring_type: TypeInfo::new("DynamicObject"),
                parameter_types: vec![TypeInfo::new("String")],
            },
            arguments: vec![Expression::constant(
                GraphValue::String("A".to_string()),
                TypeInfo::new("String"),
            )],
            members: Some(vec![name]),
        };
        let native = to_native(&expr, &registry).unwrap();
        assert_eq!(
            evaluate(&native).unwrap(),
            Value::Dynamic(vec![("Name".to_string(), Value::from("A"))])
        );
    }

    #[test]
    fn test_labels_share_identity_by_id() {
        let registry = TypeRegistry::with_builtins();
        let label = ast::LabelTarget {
            id: 3,
            name: Some("end".to_string()),
            ty: int_info(),
        };
        let expr = Expression::Block {
            ty: int_info(),
            variables: Vec::new(),
            expressions: vec![
                Expression::Goto {
                    kind: ast::GotoKind::Goto,
                    target: label.clone(),
                    value: Some(Box::new(int_constant(7))),
                },
                Expression::Label {
                    target: label,
                    default: Some(Box::new(int_constant(0))),
                },
            ],
        };
        let native = to_native(&expr, &registry).unwrap();
        assert_eq!(evaluate(&native).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_parameter_identity_survives_round_trip() {
        let registry = TypeRegistry::with_builtins();
        let x = Parameter::new("x", Type::int32());
        let expr = Expr::lambda(
            vec![x.clone()],
            Expr::binary(BinaryOperator::Multiply, Expr::parameter(&x), Expr::parameter(&x)),
        );
        let options = TranslationOptions::default();
        let native = to_native(&to_ast(&expr, &options).unwrap(), &registry).unwrap();
        let Expr::Lambda(lambda) = native else {
            panic!("expected lambda");
        };
        let function = crate::expression::compile_lambda(&lambda, &Scope::new());
        assert_eq!(function.call(&[Value::Int(6)]).unwrap(), Value::Int(36));
    }

    #[test]
    fn test_wire_only_operators_have_no_direct_mapping() {
        assert_eq!(binary_operator(ast::BinaryOperator::Add).unwrap(), BinaryOperator::Add);
        for op in [
            ast::BinaryOperator::In,
            ast::BinaryOperator::StringContains,
            ast::BinaryOperator::StringStartsWith,
            ast::BinaryOperator::StringEndsWith,
        ] {
            assert!(matches!(binary_operator(op), Err(Error::Unsupported(_))));
        }
        assert_eq!(unary_operator(ast::UnaryOperator::Throw).unwrap(), UnaryOperator::Throw);
        for op in [ast::UnaryOperator::IsNull, ast::UnaryOperator::IsNotNull] {
            assert!(matches!(unary_operator(op), Err(Error::Unsupported(_))));
        }
    }
}
