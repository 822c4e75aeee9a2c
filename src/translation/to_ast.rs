//! Native expression -> query AST.

use crate::ast::{self, Expression, ParameterExpression};
use crate::config::TranslationOptions;
use crate::error::Result;
use crate::expression::{BinaryOperator, Expr, LambdaExpr, LabelTarget, Parameter, UnaryOperator};
use crate::graph::{DynamicObjectMapper, GraphValue, ValueMapper};
use crate::partial_eval::PartialEvaluator;
use crate::translation::UnsupportedExpression;
use crate::types::{ConstructorInfo, MemberInfo, MethodInfo, Type, TypeInfo, TypeKind};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Translates `expr` into the query AST, partially evaluating it first when
/// `options.evaluate_locally` is set
pub fn to_ast(expr: &Expr, options: &TranslationOptions) -> Result<Expression> {
    if options.evaluate_locally {
        let evaluated = PartialEvaluator::new()
            .wrap_captured_variables(options.wrap_captured_variables)
            .evaluate(expr)?;
        AstTranslator::new().translate(&evaluated)
    } else {
        AstTranslator::new().translate(expr)
    }
}

/// Recursive descent from [`Expr`] to [`Expression`].
///
/// Parameters in scope are tracked so that a distinct parameter reusing the
/// `(type, name)` of one that is still visible gets a fresh name; the
/// receiving side unifies parameters by that key.
pub struct AstTranslator {
    mapper: Arc<dyn ValueMapper>,
    scope: Vec<(Parameter, ParameterExpression)>,
    labels: HashMap<usize, ast::LabelTarget>,
    next_label: u32,
}

impl Default for AstTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl AstTranslator {
    pub fn new() -> Self {
        Self::with_mapper(Arc::new(DynamicObjectMapper::new()))
    }

    pub fn with_mapper(mapper: Arc<dyn ValueMapper>) -> Self {
        Self {
            mapper,
            scope: Vec::new(),
            labels: HashMap::new(),
            next_label: 0,
        }
    }

    pub fn translate(&mut self, expr: &Expr) -> Result<Expression> {
        Ok(match expr {
            Expr::Constant { value, ty } => Expression::Constant(self.constant(value, ty)?),

            Expr::Parameter(parameter) => Expression::Parameter(self.reference(parameter)),

            Expr::Member { instance, member } => Expression::MemberAccess {
                instance: self.optional(instance.as_deref())?,
                member: MemberInfo::from(member),
            },

            Expr::Call {
                instance,
                method,
                arguments,
            } => {
                if let Some(rewritten) = self.rewrite_call(instance.as_deref(), method, arguments)? {
                    return Ok(rewritten);
                }
                Expression::MethodCall {
                    instance: self.optional(instance.as_deref())?,
                    method: MethodInfo::from(method),
                    arguments: self.all(arguments)?,
                }
            }

            Expr::Binary {
                op,
                left,
                right,
                method,
                conversion,
            } => {
                if method.is_none() && conversion.is_none() {
                    if let Some(simplified) = self.simplify_equality(*op, left, right)? {
                        return Ok(simplified);
                    }
                }
                Expression::Binary {
                    op: binary_operator(*op),
                    left: self.boxed(left)?,
                    right: self.boxed(right)?,
                    method: method.as_ref().map(MethodInfo::from),
                    conversion: match conversion {
                        Some(lambda) => Some(Box::new(self.lambda(lambda)?)),
                        None => None,
                    },
                }
            }

            Expr::Unary {
                op,
                operand,
                ty,
                method,
            } => Expression::Unary {
                op: unary_operator(*op),
                operand: self.boxed(operand)?,
                ty: match op {
                    UnaryOperator::Convert | UnaryOperator::TypeAs | UnaryOperator::Throw => {
                        Some(TypeInfo::from(ty))
                    }
                    _ => None,
                },
                method: method.as_ref().map(MethodInfo::from),
            },

            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => Expression::Conditional {
                test: self.boxed(test)?,
                if_true: self.boxed(if_true)?,
                if_false: self.boxed(if_false)?,
            },

            Expr::Lambda(lambda) => Expression::Lambda(self.lambda(lambda)?),

            Expr::New {
                constructor,
                arguments,
                members,
            } => {
                if constructor.declaring_type.is_anonymous() {
                    log::trace!("projection {} becomes a dynamic object", constructor.declaring_type);
                }
                Expression::New {
                    constructor: ConstructorInfo::from(constructor),
                    arguments: self.all(arguments)?,
                    members: members
                        .as_ref()
                        .map(|members| members.iter().map(MemberInfo::from).collect()),
                }
            }

            Expr::NewArray {
                element_type,
                items,
            } => Expression::NewArray {
                element_type: TypeInfo::from(element_type),
                items: self.all(items)?,
            },

            Expr::ListInit { new, initializers } => Expression::ListInit {
                new: self.boxed(new)?,
                initializers: self.initializers(initializers)?,
            },

            Expr::MemberInit { new, bindings } => Expression::MemberInit {
                new: self.boxed(new)?,
                bindings: self.bindings(bindings)?,
            },

            Expr::Block {
                ty,
                variables,
                expressions,
            } => {
                let mark = self.scope.len();
                let variables = variables.iter().map(|v| self.declare(v)).collect();
                let expressions = self.all(expressions);
                self.scope.truncate(mark);
                Expression::Block {
                    ty: TypeInfo::from(ty),
                    variables,
                    expressions: expressions?,
                }
            }

            Expr::TypeIs { operand, ty } => Expression::TypeTest {
                operand: self.boxed(operand)?,
                ty: TypeInfo::from(ty),
            },

            Expr::Try {
                ty,
                body,
                handlers,
                finally,
                fault,
            } => Expression::Try {
                ty: TypeInfo::from(ty),
                body: self.boxed(body)?,
                handlers: handlers
                    .iter()
                    .map(|handler| self.handler(handler))
                    .collect::<Result<_>>()?,
                finally: self.optional(finally.as_deref())?,
                fault: self.optional(fault.as_deref())?,
            },

            Expr::Switch {
                ty,
                value,
                comparison,
                cases,
                default,
            } => Expression::Switch {
                ty: TypeInfo::from(ty),
                value: self.boxed(value)?,
                comparison: comparison.as_ref().map(MethodInfo::from),
                cases: cases
                    .iter()
                    .map(|case| {
                        Ok(ast::SwitchCase {
                            test_values: self.all(&case.test_values)?,
                            body: self.translate(&case.body)?,
                        })
                    })
                    .collect::<Result<_>>()?,
                default: self.optional(default.as_deref())?,
            },

            Expr::Goto {
                kind,
                target,
                value,
            } => Expression::Goto {
                kind: *kind,
                target: self.label(target),
                value: self.optional(value.as_deref())?,
            },

            Expr::Label { target, default } => Expression::Label {
                target: self.label(target),
                default: self.optional(default.as_deref())?,
            },

            Expr::Loop {
                body,
                break_label,
                continue_label,
            } => Expression::Loop {
                body: self.boxed(body)?,
                break_label: break_label.as_ref().map(|label| self.label(label)),
                continue_label: continue_label.as_ref().map(|label| self.label(label)),
            },

            Expr::Invoke { target, arguments } => Expression::Invoke {
                target: self.boxed(target)?,
                arguments: self.all(arguments)?,
            },
        })
    }

    fn boxed(&mut self, expr: &Expr) -> Result<Box<Expression>> {
        self.translate(expr).map(Box::new)
    }

    fn optional(&mut self, expr: Option<&Expr>) -> Result<Option<Box<Expression>>> {
        expr.map(|e| self.boxed(e)).transpose()
    }

    fn all(&mut self, exprs: &[Expr]) -> Result<Vec<Expression>> {
        exprs.iter().map(|e| self.translate(e)).collect()
    }

    fn declare(&mut self, parameter: &Parameter) -> ParameterExpression {
        let ty = TypeInfo::from(parameter.ty());
        let mut name = parameter.name().to_string();
        let mut suffix = 0;
        while self
            .scope
            .iter()
            .any(|(visible, e)| visible != parameter && e.name == name && e.ty == ty)
        {
            suffix += 1;
            name = format!("{}{}", parameter.name(), suffix);
        }
        if suffix > 0 {
            log::warn!(
                "parameter {} shadows another parameter of type {}, renamed to {}",
                parameter.name(),
                ty,
                name
            );
        }
        let expression = ParameterExpression::new(name, ty);
        self.scope.push((parameter.clone(), expression.clone()));
        expression
    }

    fn reference(&self, parameter: &Parameter) -> ParameterExpression {
        self.scope
            .iter()
            .rev()
            .find(|(visible, _)| visible == parameter)
            .map(|(_, expression)| expression.clone())
            .unwrap_or_else(|| {
                ParameterExpression::new(parameter.name(), TypeInfo::from(parameter.ty()))
            })
    }

    fn lambda(&mut self, lambda: &LambdaExpr) -> Result<ast::LambdaExpression> {
        let mark = self.scope.len();
        let parameters = lambda.parameters.iter().map(|p| self.declare(p)).collect();
        let body = self.boxed(&lambda.body);
        self.scope.truncate(mark);
        Ok(ast::LambdaExpression {
            parameters,
            body: body?,
        })
    }

    fn handler(&mut self, handler: &crate::expression::CatchBlock) -> Result<ast::CatchBlock> {
        let mark = self.scope.len();
        let variable = handler.variable.as_ref().map(|v| self.declare(v));
        let filter = handler.filter.as_ref().map(|f| self.translate(f)).transpose();
        let body = self.translate(&handler.body);
        self.scope.truncate(mark);
        Ok(ast::CatchBlock {
            test: TypeInfo::from(&handler.test),
            variable,
            filter: filter?,
            body: body?,
        })
    }

    fn label(&mut self, target: &LabelTarget) -> ast::LabelTarget {
        if let Some(label) = self.labels.get(&target.id()) {
            return label.clone();
        }
        let label = ast::LabelTarget {
            id: self.next_label,
            name: target.name().map(str::to_string),
            ty: TypeInfo::from(target.ty()),
        };
        self.next_label += 1;
        self.labels.insert(target.id(), label.clone());
        label
    }

    fn initializers(
        &mut self,
        initializers: &[crate::expression::ElementInit],
    ) -> Result<Vec<ast::ElementInit>> {
        initializers
            .iter()
            .map(|init| {
                Ok(ast::ElementInit {
                    add_method: MethodInfo::from(&init.add_method),
                    arguments: self.all(&init.arguments)?,
                })
            })
            .collect()
    }

    fn bindings(
        &mut self,
        bindings: &[crate::expression::MemberBinding],
    ) -> Result<Vec<ast::MemberBinding>> {
        use crate::expression::MemberBinding;
        bindings
            .iter()
            .map(|binding| {
                Ok(match binding {
                    MemberBinding::Assignment { member, expression } => {
                        ast::MemberBinding::Assignment {
                            member: MemberInfo::from(member),
                            expression: self.translate(expression)?,
                        }
                    }
                    MemberBinding::Member { member, bindings } => ast::MemberBinding::Member {
                        member: MemberInfo::from(member),
                        bindings: self.bindings(bindings)?,
                    },
                    MemberBinding::List {
                        member,
                        initializers,
                    } => ast::MemberBinding::List {
                        member: MemberInfo::from(member),
                        initializers: self.initializers(initializers)?,
                    },
                })
            })
            .collect()
    }

    /// Call shapes that travel as dedicated nodes: constant-name indexers,
    /// string predicates and membership in a constant collection
    fn rewrite_call(
        &mut self,
        instance: Option<&Expr>,
        method: &crate::types::Method,
        arguments: &[Expr],
    ) -> Result<Option<Expression>> {
        match (instance, method.name(), arguments) {
            (Some(instance), "get_Item", [Expr::Constant { value: Value::String(name), .. }]) => {
                log::trace!("indexer [{}] becomes a member access", name);
                Ok(Some(Expression::MemberAccess {
                    instance: Some(self.boxed(instance)?),
                    member: MemberInfo {
                        declaring_type: TypeInfo::from(&instance.ty()),
                        name: name.clone(),
                        member_type: TypeInfo::from(method.return_type()),
                    },
                }))
            }
            (Some(instance), name, [argument])
                if matches!(method.declaring_type().kind(), TypeKind::String) =>
            {
                let op = match name {
                    "Contains" => ast::BinaryOperator::StringContains,
                    "StartsWith" => ast::BinaryOperator::StringStartsWith,
                    "EndsWith" => ast::BinaryOperator::StringEndsWith,
                    _ => return Ok(None),
                };
                log::trace!("string method {} becomes operator {}", name, op.as_str());
                Ok(Some(Expression::Binary {
                    op,
                    left: self.boxed(instance)?,
                    right: self.boxed(argument)?,
                    method: None,
                    conversion: None,
                }))
            }
            (
                None,
                "Contains",
                [Expr::Constant {
                    value: Value::Array(items),
                    ty,
                }, item],
            ) => {
                let element_type = method
                    .generic_arguments()
                    .first()
                    .or_else(|| ty.element_type())
                    .cloned()
                    .unwrap_or_else(Type::object);
                let element_info = TypeInfo::from(&element_type);
                let items = items
                    .iter()
                    .map(|value| {
                        Ok(ast::ConstantExpression::new(
                            self.graph(value)?,
                            element_info.clone(),
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?;
                log::trace!("membership test over {} constants becomes In", items.len());
                Ok(Some(Expression::Binary {
                    op: ast::BinaryOperator::In,
                    left: self.boxed(item)?,
                    right: Box::new(Expression::Collection {
                        element_type: element_info,
                        items,
                    }),
                    method: None,
                    conversion: None,
                }))
            }
            _ => Ok(None),
        }
    }

    /// `x == true` -> `x`, `x != true` -> `!x`, `x == null` -> `IsNull(x)`
    fn simplify_equality(
        &mut self,
        op: BinaryOperator,
        left: &Expr,
        right: &Expr,
    ) -> Result<Option<Expression>> {
        let equal = match op {
            BinaryOperator::Equal => true,
            BinaryOperator::NotEqual => false,
            _ => return Ok(None),
        };
        let boolean_constant = |constant: &Expr, other: &Expr| match constant {
            Expr::Constant {
                value: Value::Bool(b),
                ..
            } if other.ty().is_boolean() => Some(*b),
            _ => None,
        };
        let (other, flag) = match (boolean_constant(right, left), boolean_constant(left, right)) {
            (Some(flag), _) => (left, flag),
            (None, Some(flag)) => (right, flag),
            (None, None) => {
                let is_null = |e: &Expr| {
                    matches!(
                        e,
                        Expr::Constant {
                            value: Value::Null,
                            ..
                        }
                    )
                };
                let other = if is_null(right) {
                    left
                } else if is_null(left) {
                    right
                } else {
                    return Ok(None);
                };
                log::trace!("null comparison becomes a null test");
                return Ok(Some(Expression::Unary {
                    op: if equal {
                        ast::UnaryOperator::IsNull
                    } else {
                        ast::UnaryOperator::IsNotNull
                    },
                    operand: self.boxed(other)?,
                    ty: None,
                    method: None,
                }));
            }
        };
        log::trace!("comparison with boolean constant simplified");
        let operand = self.translate(other)?;
        Ok(Some(if equal == flag {
            operand
        } else {
            Expression::Unary {
                op: ast::UnaryOperator::Not,
                operand: Box::new(operand),
                ty: None,
                method: None,
            }
        }))
    }

    fn constant(&mut self, value: &Value, ty: &Type) -> Result<ast::ConstantExpression> {
        let graph = match (value, ty.kind()) {
            (Value::Argument(inner), TypeKind::VariableQueryArgument(inner_type)) => {
                GraphValue::Argument(ast::VariableQueryArgument::new(
                    self.graph(inner)?,
                    TypeInfo::from(inner_type),
                ))
            }
            (Value::ArgumentList(items), TypeKind::VariableQueryArgumentList(element)) => {
                GraphValue::ArgumentList(ast::VariableQueryArgumentList::new(
                    items
                        .iter()
                        .map(|item| self.graph(item))
                        .collect::<Result<_>>()?,
                    TypeInfo::from(element),
                ))
            }
            _ => self.graph(value)?,
        };
        Ok(ast::ConstantExpression::new(graph, TypeInfo::from(ty)))
    }

    fn graph(&mut self, value: &Value) -> Result<GraphValue> {
        Ok(match value {
            Value::Function(_) | Value::Queryable(_) | Value::Sequence(_) => {
                return Err(UnsupportedExpression::new(
                    value.to_string(),
                    format!("a live {} cannot be serialized", value.type_name()),
                )
                .into())
            }
            Value::Expression(quoted) => {
                let labels = std::mem::take(&mut self.labels);
                let nested = self.translate(&quoted.expr);
                self.labels = labels;
                GraphValue::Expression(Box::new(nested?))
            }
            Value::Array(items) => GraphValue::List(
                items
                    .iter()
                    .map(|item| self.graph(item))
                    .collect::<Result<_>>()?,
            ),
            Value::Argument(inner) => GraphValue::Argument(ast::VariableQueryArgument::new(
                self.graph(inner)?,
                TypeInfo::new("Object"),
            )),
            Value::ArgumentList(items) => {
                GraphValue::ArgumentList(ast::VariableQueryArgumentList::new(
                    items
                        .iter()
                        .map(|item| self.graph(item))
                        .collect::<Result<_>>()?,
                    TypeInfo::new("Object"),
                ))
            }
            other => self.mapper.map_to_graph(other)?,
        })
    }
}

fn binary_operator(op: BinaryOperator) -> ast::BinaryOperator {
    use ast::BinaryOperator as Ast;
    match op {
        BinaryOperator::Add => Ast::Add,
        BinaryOperator::Subtract => Ast::Subtract,
        BinaryOperator::Multiply => Ast::Multiply,
        BinaryOperator::Divide => Ast::Divide,
        BinaryOperator::Modulo => Ast::Modulo,
        BinaryOperator::Power => Ast::Power,
        BinaryOperator::Equal => Ast::Equal,
        BinaryOperator::NotEqual => Ast::NotEqual,
        BinaryOperator::LessThan => Ast::LessThan,
        BinaryOperator::LessThanOrEqual => Ast::LessThanOrEqual,
        BinaryOperator::GreaterThan => Ast::GreaterThan,
        BinaryOperator::GreaterThanOrEqual => Ast::GreaterThanOrEqual,
        BinaryOperator::AndAlso => Ast::And,
        BinaryOperator::OrElse => Ast::Or,
        BinaryOperator::And => Ast::BitwiseAnd,
        BinaryOperator::Or => Ast::BitwiseOr,
        BinaryOperator::ExclusiveOr => Ast::ExclusiveOr,
        BinaryOperator::LeftShift => Ast::LeftShift,
        BinaryOperator::RightShift => Ast::RightShift,
        BinaryOperator::Coalesce => Ast::Coalesce,
        BinaryOperator::ArrayIndex => Ast::ArrayIndex,
        BinaryOperator::Assign => Ast::Assign,
    }
}

fn unary_operator(op: UnaryOperator) -> ast::UnaryOperator {
    use ast::UnaryOperator as Ast;
    match op {
        UnaryOperator::Not => Ast::Not,
        UnaryOperator::Negate => Ast::Negate,
        UnaryOperator::UnaryPlus => Ast::UnaryPlus,
        UnaryOperator::Convert => Ast::Convert,
        UnaryOperator::TypeAs => Ast::TypeAs,
        UnaryOperator::ArrayLength => Ast::ArrayLength,
        UnaryOperator::Quote => Ast::Quote,
        UnaryOperator::Throw => Ast::Throw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Member, TypeRegistry};
    use crate::value::{Function, QuotedExpr};

    fn untranslated(expr: &Expr) -> Result<Expression> {
        AstTranslator::new().translate(expr)
    }

    fn flag() -> Parameter {
        Parameter::new("x", Type::boolean())
    }

    #[test]
    fn test_equality_with_true_simplifies_to_operand() {
        let x = flag();
        let expr = Expr::binary(BinaryOperator::Equal, Expr::parameter(&x), Expr::boolean(true));
        assert_eq!(
            untranslated(&expr).unwrap(),
            Expression::parameter("x", TypeInfo::new("Boolean"))
        );

        let expr = Expr::binary(BinaryOperator::NotEqual, Expr::boolean(false), Expr::parameter(&x));
        assert_eq!(
            untranslated(&expr).unwrap(),
            Expression::parameter("x", TypeInfo::new("Boolean"))
        );
    }

    #[test]
    fn test_equality_with_false_negates() {
        let x = flag();
        let expr = Expr::binary(BinaryOperator::Equal, Expr::parameter(&x), Expr::boolean(false));
        assert!(matches!(
            untranslated(&expr).unwrap(),
            Expression::Unary {
                op: ast::UnaryOperator::Not,
                ..
            }
        ));
    }

    #[test]
    fn test_null_comparison_becomes_null_test() {
        let s = Parameter::new("s", Type::string());
        let expr = Expr::binary(
            BinaryOperator::Equal,
            Expr::null(Type::string()),
            Expr::parameter(&s),
        );
        let Expression::Unary { op, operand, .. } = untranslated(&expr).unwrap() else {
            panic!("expected unary");
        };
        assert_eq!(op, ast::UnaryOperator::IsNull);
        assert_eq!(*operand, Expression::parameter("s", TypeInfo::new("String")));

        let expr = Expr::binary(
            BinaryOperator::NotEqual,
            Expr::parameter(&s),
            Expr::null(Type::string()),
        );
        assert!(matches!(
            untranslated(&expr).unwrap(),
            Expression::Unary {
                op: ast::UnaryOperator::IsNotNull,
                ..
            }
        ));
    }

    #[test]
    fn test_string_predicate_becomes_operator() {
        let registry = TypeRegistry::with_builtins();
        let s = Parameter::new("s", Type::string());
        let starts_with = registry.method("String", "StartsWith", &[], 1).unwrap();
        let expr = Expr::call(Some(Expr::parameter(&s)), starts_with, vec![Expr::string("A")]);
        assert!(matches!(
            untranslated(&expr).unwrap(),
            Expression::Binary {
                op: ast::BinaryOperator::StringStartsWith,
                ..
            }
        ));
    }

    #[test]
    fn test_constant_membership_becomes_in() {
        let registry = TypeRegistry::with_builtins();
        let contains = registry
            .method("Enumerable", "Contains", &[Type::int32()], 2)
            .unwrap();
        let n = Parameter::new("n", Type::int32());
        let expr = Expr::call(
            None,
            contains,
            vec![
                Expr::constant(Value::from(vec![1, 2, 3]), Type::array(Type::int32())),
                Expr::parameter(&n),
            ],
        );
        let Expression::Binary { op, right, .. } = untranslated(&expr).unwrap() else {
            panic!("expected binary");
        };
        assert_eq!(op, ast::BinaryOperator::In);
        let Expression::Collection {
            element_type,
            items,
        } = *right
        else {
            panic!("expected collection");
        };
        assert_eq!(element_type, TypeInfo::new("Int32"));
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].value, GraphValue::Int(3));
    }

    #[test]
    fn test_indexer_becomes_member_access() {
        let registry = TypeRegistry::with_builtins();
        let item = registry.method("DynamicObject", "get_Item", &[], 1).unwrap();
        let d = Parameter::new("d", Type::dynamic_object());
        let expr = Expr::call(Some(Expr::parameter(&d)), item, vec![Expr::string("Name")]);
        let Expression::MemberAccess { member, .. } = untranslated(&expr).unwrap() else {
            panic!("expected member access");
        };
        assert_eq!(member.declaring_type, TypeInfo::new("DynamicObject"));
        assert_eq!(member.name, "Name");
    }

    #[test]
    fn test_anonymous_projection_becomes_dynamic_object() {
        let anonymous = Type::anonymous(vec![("Name", Type::string())]);
        let member = Member::find(&anonymous, "Name").unwrap();
        let expr = Expr::New {
            constructor: crate::types::Constructor::new(anonymous, vec![Type::string()]),
            arguments: vec![Expr::string("A")],
            members: Some(vec![member]),
        };
        let Expression::New {
            constructor,
            members,
            ..
        } = untranslated(&expr).unwrap()
        else {
            panic!("expected new");
        };
        assert_eq!(constructor.declaring_type, TypeInfo::new("DynamicObject"));
        assert_eq!(
            members.unwrap()[0].declaring_type,
            TypeInfo::new("DynamicObject")
        );
    }

    #[test]
    fn test_shadowing_parameter_is_renamed() {
        let outer = Parameter::new("x", Type::int32());
        let inner = Parameter::new("x", Type::int32());
        let expr = Expr::lambda(
            vec![outer.clone()],
            Expr::lambda(
                vec![inner.clone()],
                Expr::binary(
                    BinaryOperator::Add,
                    Expr::parameter(&outer),
                    Expr::parameter(&inner),
                ),
            ),
        );
        let Expression::Lambda(lambda) = untranslated(&expr).unwrap() else {
            panic!("expected lambda");
        };
        let Expression::Lambda(nested) = *lambda.body else {
            panic!("expected nested lambda");
        };
        assert_eq!(lambda.parameters[0].name, "x");
        assert_eq!(nested.parameters[0].name, "x1");
        let Expression::Binary { left, right, .. } = *nested.body else {
            panic!("expected binary");
        };
        assert_eq!(*left, Expression::parameter("x", TypeInfo::new("Int32")));
        assert_eq!(*right, Expression::parameter("x1", TypeInfo::new("Int32")));
    }

    #[test]
    fn test_closure_constant_is_unsupported() {
        let function = Function::new(1, |args| Ok(args[0].clone()));
        let expr = Expr::invoke(
            Expr::constant(
                Value::Function(function),
                Type::func(vec![Type::int32()], Type::int32()),
            ),
            vec![Expr::int(10)],
        );
        assert!(matches!(
            untranslated(&expr),
            Err(crate::Error::Unsupported(_))
        ));
        // local evaluation removes the closure before translation
        let folded = to_ast(&expr, &TranslationOptions::default()).unwrap();
        assert_eq!(
            folded,
            Expression::constant(GraphValue::Int(10), TypeInfo::new("Int32"))
        );
    }

    #[test]
    fn test_nested_expression_constant() {
        let x = Parameter::new("x", Type::int32());
        let quoted = QuotedExpr::closed(Expr::lambda(vec![x.clone()], Expr::parameter(&x)));
        let ty = Type::expression(Type::func(vec![Type::int32()], Type::int32()));
        let expr = Expr::constant(Value::Expression(quoted), ty);
        let Expression::Constant(constant) = untranslated(&expr).unwrap() else {
            panic!("expected constant");
        };
        assert!(matches!(constant.value, GraphValue::Expression(_)));
    }

    #[test]
    fn test_labels_get_sequential_ids() {
        let done = LabelTarget::new(Some("done"), Type::void());
        let expr = Expr::Loop {
            body: Box::new(Expr::Goto {
                kind: ast::GotoKind::Break,
                target: done.clone(),
                value: None,
            }),
            break_label: Some(done),
            continue_label: Some(LabelTarget::new(None, Type::void())),
        };
        let Expression::Loop {
            body,
            break_label,
            continue_label,
        } = untranslated(&expr).unwrap()
        else {
            panic!("expected loop");
        };
        let Expression::Goto { target, .. } = *body else {
            panic!("expected goto");
        };
        assert_eq!(target.id, 0);
        assert_eq!(break_label.unwrap().id, 0);
        assert_eq!(continue_label.unwrap().id, 1);
    }
}
