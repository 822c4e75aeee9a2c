//! Structural rewriting of native expression trees.

use crate::expression::expr::{CatchBlock, ElementInit, Expr, LambdaExpr, MemberBinding, SwitchCase};
use std::sync::Arc;

/// Bottom-up rebuilder over [`Expr`].
///
/// Override [`ExprRewriter::rewrite`] to intercept nodes and call
/// [`walk_expr`] to recurse into the ones left alone.
pub trait ExprRewriter {
    type Error;

    fn rewrite(&mut self, expr: &Expr) -> Result<Expr, Self::Error> {
        walk_expr(self, expr)
    }
}

fn rewrite_boxed<R: ExprRewriter + ?Sized>(r: &mut R, expr: &Expr) -> Result<Box<Expr>, R::Error> {
    r.rewrite(expr).map(Box::new)
}

fn rewrite_all<R: ExprRewriter + ?Sized>(r: &mut R, exprs: &[Expr]) -> Result<Vec<Expr>, R::Error> {
    exprs.iter().map(|e| r.rewrite(e)).collect()
}

fn rewrite_optional<R: ExprRewriter + ?Sized>(
    r: &mut R,
    expr: Option<&Expr>,
) -> Result<Option<Box<Expr>>, R::Error> {
    expr.map(|e| rewrite_boxed(r, e)).transpose()
}

fn rewrite_lambda<R: ExprRewriter + ?Sized>(r: &mut R, lambda: &LambdaExpr) -> Result<LambdaExpr, R::Error> {
    Ok(LambdaExpr {
        parameters: lambda.parameters.clone(),
        body: Arc::new(r.rewrite(&lambda.body)?),
    })
}

fn rewrite_initializers<R: ExprRewriter + ?Sized>(
    r: &mut R,
    initializers: &[ElementInit],
) -> Result<Vec<ElementInit>, R::Error> {
    initializers
        .iter()
        .map(|init| {
            Ok(ElementInit {
                add_method: init.add_method.clone(),
                arguments: rewrite_all(r, &init.arguments)?,
            })
        })
        .collect()
}

fn rewrite_bindings<R: ExprRewriter + ?Sized>(
    r: &mut R,
    bindings: &[MemberBinding],
) -> Result<Vec<MemberBinding>, R::Error> {
    bindings
        .iter()
        .map(|binding| {
            Ok(match binding {
                MemberBinding::Assignment { member, expression } => MemberBinding::Assignment {
                    member: member.clone(),
                    expression: r.rewrite(expression)?,
                },
                MemberBinding::Member { member, bindings } => MemberBinding::Member {
                    member: member.clone(),
                    bindings: rewrite_bindings(r, bindings)?,
                },
                MemberBinding::List {
                    member,
                    initializers,
                } => MemberBinding::List {
                    member: member.clone(),
                    initializers: rewrite_initializers(r, initializers)?,
                },
            })
        })
        .collect()
}

/// Rebuilds `expr` with every child passed through `r`
pub fn walk_expr<R: ExprRewriter + ?Sized>(r: &mut R, expr: &Expr) -> Result<Expr, R::Error> {
    Ok(match expr {
        Expr::Constant { .. } | Expr::Parameter(_) => expr.clone(),

        Expr::Member { instance, member } => Expr::Member {
            instance: rewrite_optional(r, instance.as_deref())?,
            member: member.clone(),
        },

        Expr::Call {
            instance,
            method,
            arguments,
        } => Expr::Call {
            instance: rewrite_optional(r, instance.as_deref())?,
            method: method.clone(),
            arguments: rewrite_all(r, arguments)?,
        },

        Expr::Binary {
            op,
            left,
            right,
            method,
            conversion,
        } => Expr::Binary {
            op: *op,
            left: rewrite_boxed(r, left)?,
            right: rewrite_boxed(r, right)?,
            method: method.clone(),
            conversion: conversion.as_ref().map(|c| rewrite_lambda(r, c)).transpose()?,
        },

        Expr::Unary {
            op,
            operand,
            ty,
            method,
        } => Expr::Unary {
            op: *op,
            operand: rewrite_boxed(r, operand)?,
            ty: ty.clone(),
            method: method.clone(),
        },

        Expr::Conditional {
            test,
            if_true,
            if_false,
        } => Expr::Conditional {
            test: rewrite_boxed(r, test)?,
            if_true: rewrite_boxed(r, if_true)?,
            if_false: rewrite_boxed(r, if_false)?,
        },

        Expr::Lambda(lambda) => Expr::Lambda(rewrite_lambda(r, lambda)?),

        Expr::New {
            constructor,
            arguments,
            members,
        } => Expr::New {
            constructor: constructor.clone(),
            arguments: rewrite_all(r, arguments)?,
            members: members.clone(),
        },

        Expr::NewArray {
            element_type,
            items,
        } => Expr::NewArray {
            element_type: element_type.clone(),
            items: rewrite_all(r, items)?,
        },

        Expr::ListInit { new, initializers } => Expr::ListInit {
            new: rewrite_boxed(r, new)?,
            initializers: rewrite_initializers(r, initializers)?,
        },

        Expr::MemberInit { new, bindings } => Expr::MemberInit {
            new: rewrite_boxed(r, new)?,
            bindings: rewrite_bindings(r, bindings)?,
        },

        Expr::Block {
            ty,
            variables,
            expressions,
        } => Expr::Block {
            ty: ty.clone(),
            variables: variables.clone(),
            expressions: rewrite_all(r, expressions)?,
        },

        Expr::TypeIs { operand, ty } => Expr::TypeIs {
            operand: rewrite_boxed(r, operand)?,
            ty: ty.clone(),
        },

        Expr::Try {
            ty,
            body,
            handlers,
            finally,
            fault,
        } => Expr::Try {
            ty: ty.clone(),
            body: rewrite_boxed(r, body)?,
            handlers: handlers
                .iter()
                .map(|handler| {
                    Ok(CatchBlock {
                        test: handler.test.clone(),
                        variable: handler.variable.clone(),
                        filter: handler.filter.as_ref().map(|f| r.rewrite(f)).transpose()?,
                        body: r.rewrite(&handler.body)?,
                    })
                })
                .collect::<Result<_, R::Error>>()?,
            finally: rewrite_optional(r, finally.as_deref())?,
            fault: rewrite_optional(r, fault.as_deref())?,
        },

        Expr::Switch {
            ty,
            value,
            comparison,
            cases,
            default,
        } => Expr::Switch {
            ty: ty.clone(),
            value: rewrite_boxed(r, value)?,
            comparison: comparison.clone(),
            cases: cases
                .iter()
                .map(|case| {
                    Ok(SwitchCase {
                        test_values: rewrite_all(r, &case.test_values)?,
                        body: r.rewrite(&case.body)?,
                    })
                })
                .collect::<Result<_, R::Error>>()?,
            default: rewrite_optional(r, default.as_deref())?,
        },

        Expr::Goto {
            kind,
            target,
            value,
        } => Expr::Goto {
            kind: *kind,
            target: target.clone(),
            value: rewrite_optional(r, value.as_deref())?,
        },

        Expr::Label { target, default } => Expr::Label {
            target: target.clone(),
            default: rewrite_optional(r, default.as_deref())?,
        },

        Expr::Loop {
            body,
            break_label,
            continue_label,
        } => Expr::Loop {
            body: rewrite_boxed(r, body)?,
            break_label: break_label.clone(),
            continue_label: continue_label.clone(),
        },

        Expr::Invoke { target, arguments } => Expr::Invoke {
            target: rewrite_boxed(r, target)?,
            arguments: rewrite_all(r, arguments)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::eval::evaluate;
    use crate::expression::expr::Parameter;
    use crate::expression::operator::BinaryOperator;
    use crate::types::Type;
    use crate::value::Value;
    use std::convert::Infallible;

    /// Replaces every Int32 constant by its negation
    struct Negate;

    impl ExprRewriter for Negate {
        type Error = Infallible;

        fn rewrite(&mut self, expr: &Expr) -> Result<Expr, Infallible> {
            match expr {
                Expr::Constant {
                    value: Value::Int(i),
                    ..
                } => Ok(Expr::int(-i)),
                other => walk_expr(self, other),
            }
        }
    }

    #[test]
    fn test_rewrite_reaches_lambda_bodies() {
        let x = Parameter::new("x", Type::int32());
        let expr = Expr::invoke(
            Expr::lambda(
                vec![x.clone()],
                Expr::binary(BinaryOperator::Add, Expr::parameter(&x), Expr::int(10)),
            ),
            vec![Expr::int(1)],
        );
        let rewritten = Negate.rewrite(&expr).unwrap_or_else(|never| match never {});
        assert_eq!(evaluate(&rewritten).unwrap(), Value::Int(-11));
        // the original is untouched
        assert_eq!(evaluate(&expr).unwrap(), Value::Int(11));
    }
}
