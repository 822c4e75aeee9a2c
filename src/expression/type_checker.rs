//! Static types and validation for native expressions.

use crate::expression::error::{ExecutionError, ExecutionResult};
use crate::expression::expr::{ElementInit, Expr, MemberBinding};
use crate::expression::operator::BinaryOperator;
use crate::types::{Type, TypeKind};

impl Expr {
    /// Static result type of this expression
    pub fn ty(&self) -> Type {
        match self {
            Expr::Constant { ty, .. } => ty.clone(),
            Expr::Parameter(parameter) => parameter.ty().clone(),
            Expr::Member { member, .. } => member.ty.clone(),
            Expr::Call { method, .. } => method.return_type().clone(),
            Expr::Binary {
                op,
                left,
                right,
                method,
                conversion,
            } => {
                if let Some(method) = method {
                    return method.return_type().clone();
                }
                binary_type(*op, &left.ty(), &right.ty(), conversion.as_ref().map(|c| c.body.ty()))
            }
            Expr::Unary { ty, .. } => ty.clone(),
            Expr::Conditional { if_true, .. } => if_true.ty(),
            Expr::Lambda(lambda) => lambda.ty(),
            Expr::New { constructor, .. } => constructor.declaring_type.clone(),
            Expr::NewArray { element_type, .. } => Type::array(element_type.clone()),
            Expr::ListInit { new, .. } | Expr::MemberInit { new, .. } => new.ty(),
            Expr::Block { ty, .. } | Expr::Try { ty, .. } | Expr::Switch { ty, .. } => ty.clone(),
            Expr::TypeIs { .. } => Type::boolean(),
            Expr::Goto { .. } => Type::void(),
            Expr::Label { target, .. } => target.ty().clone(),
            Expr::Loop { break_label, .. } => break_label
                .as_ref()
                .map(|label| label.ty().clone())
                .unwrap_or_else(Type::void),
            Expr::Invoke { target, .. } => target
                .ty()
                .function_signature()
                .map(|(_, result)| result.clone())
                .unwrap_or_else(Type::object),
        }
    }
}

fn binary_type(op: BinaryOperator, left: &Type, right: &Type, converted: Option<Type>) -> Type {
    match op {
        _ if op.is_comparison() => Type::boolean(),
        BinaryOperator::AndAlso | BinaryOperator::OrElse => {
            if matches!(left.kind(), TypeKind::Nullable(_)) {
                left.clone()
            } else {
                Type::boolean()
            }
        }
        BinaryOperator::Coalesce => converted.unwrap_or_else(|| right.clone()),
        BinaryOperator::ArrayIndex => left.element_type().cloned().unwrap_or_else(Type::object),
        BinaryOperator::Assign => left.clone(),
        BinaryOperator::Power => Type::double(),
        BinaryOperator::Add
            if matches!(left.kind(), TypeKind::String) || matches!(right.kind(), TypeKind::String) =>
        {
            Type::string()
        }
        _ => widest(left, right),
    }
}

/// Result type of a numeric operation, following Int32 < Int64 < Double
fn widest(left: &Type, right: &Type) -> Type {
    let rank = |ty: &Type| match ty.kind() {
        TypeKind::Double => 3,
        TypeKind::Int64 => 2,
        TypeKind::Int32 => 1,
        _ => 0,
    };
    if rank(right) > rank(left) {
        right.clone()
    } else {
        left.clone()
    }
}

/// Validates call signatures and operand types across an expression tree
#[derive(Debug, Default)]
pub struct TypeChecker;

impl TypeChecker {
    pub fn new() -> Self {
        Self
    }

    /// Type check an expression and return its output type
    pub fn check(&self, expr: &Expr) -> ExecutionResult<Type> {
        for child in expr.children() {
            self.check(child)?;
        }
        match expr {
            Expr::Call {
                method, arguments, ..
            } => {
                self.check_arguments(expr, method.parameter_types(), arguments)?;
            }

            Expr::New {
                constructor,
                arguments,
                members,
            } => {
                if members.is_none() && !constructor.parameter_types.is_empty() {
                    self.check_arguments(expr, &constructor.parameter_types, arguments)?;
                }
                if let Some(members) = members {
                    if members.len() != arguments.len() {
                        return Err(failure(expr, "member count differs from argument count"));
                    }
                }
            }

            Expr::Conditional { test, if_false, if_true } => {
                self.check_condition(expr, &test.ty())?;
                let (t, f) = (if_true.ty(), if_false.ty());
                if !t.is_void()
                    && !f.is_void()
                    && !t.is_assignable_from(&f)
                    && !f.is_assignable_from(&t)
                {
                    return Err(failure(expr, "branches have unrelated types"));
                }
            }

            Expr::Invoke { target, arguments } => {
                let ty = target.ty();
                match ty.function_signature() {
                    Some((parameters, _)) => {
                        let parameters = parameters.to_vec();
                        self.check_arguments(expr, &parameters, arguments)?;
                    }
                    None if matches!(ty.kind(), TypeKind::Object) => {}
                    None => return Err(failure(expr, &format!("{} is not invocable", ty))),
                }
            }

            Expr::ListInit { initializers, .. } => self.check_initializers(expr, initializers)?,

            Expr::MemberInit { bindings, .. } => self.check_bindings(expr, bindings)?,

            Expr::Binary {
                op: BinaryOperator::AndAlso | BinaryOperator::OrElse,
                left,
                right,
                method: None,
                ..
            } => {
                self.check_condition(expr, &left.ty())?;
                self.check_condition(expr, &right.ty())?;
            }

            _ => {}
        }
        Ok(expr.ty())
    }

    /// Validate without caring about the result type
    pub fn validate(&self, expr: &Expr) -> ExecutionResult<()> {
        self.check(expr).map(|_| ())
    }

    fn check_arguments(&self, expr: &Expr, parameters: &[Type], arguments: &[Expr]) -> ExecutionResult<()> {
        if parameters.len() != arguments.len() {
            return Err(failure(
                expr,
                &format!("expected {} arguments, got {}", parameters.len(), arguments.len()),
            ));
        }
        for (parameter, argument) in parameters.iter().zip(arguments) {
            let actual = argument.ty();
            if !parameter.is_assignable_from(&actual) {
                return Err(failure(
                    expr,
                    &format!("argument {} of type {} is not assignable to {}", argument, actual, parameter),
                ));
            }
        }
        Ok(())
    }

    fn check_initializers(&self, expr: &Expr, initializers: &[ElementInit]) -> ExecutionResult<()> {
        for init in initializers {
            self.check_arguments(expr, init.add_method.parameter_types(), &init.arguments)?;
        }
        Ok(())
    }

    fn check_bindings(&self, expr: &Expr, bindings: &[MemberBinding]) -> ExecutionResult<()> {
        for binding in bindings {
            match binding {
                MemberBinding::Assignment { member, expression } => {
                    if !member.ty.is_assignable_from(&expression.ty()) {
                        return Err(failure(
                            expr,
                            &format!("cannot assign {} to {}", expression.ty(), member.name),
                        ));
                    }
                }
                MemberBinding::Member { bindings, .. } => self.check_bindings(expr, bindings)?,
                MemberBinding::List { initializers, .. } => self.check_initializers(expr, initializers)?,
            }
        }
        Ok(())
    }

    fn check_condition(&self, expr: &Expr, ty: &Type) -> ExecutionResult<()> {
        let boolean = match ty.kind() {
            TypeKind::Boolean | TypeKind::Object => true,
            TypeKind::Nullable(inner) => inner.is_boolean(),
            _ => false,
        };
        if boolean {
            Ok(())
        } else {
            Err(failure(expr, &format!("condition has type {}", ty)))
        }
    }
}

fn failure(expr: &Expr, reason: &str) -> ExecutionError {
    ExecutionError::TypeCheck {
        expression: expr.to_string(),
        reason: reason.to_string(),
    }
}

/// Convenience wrapper around [`TypeChecker::check`]
pub fn type_check_expression(expr: &Expr) -> ExecutionResult<Type> {
    TypeChecker::new().check(expr)
}
