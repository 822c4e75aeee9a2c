//! Functional rewriting of query ASTs.
//!
//! A [`Rewriter`] consumes a tree and produces a new one. The default methods
//! rebuild every node unchanged, so an implementation overrides only the
//! node kinds it cares about.

use crate::ast::node::{
    CatchBlock, ConstantExpression, ElementInit, Expression, LambdaExpression, MemberBinding,
    SwitchCase,
};
use crate::types::MemberInfo;

pub trait Rewriter {
    type Error;

    fn rewrite(&mut self, expr: Expression) -> Result<Expression, Self::Error> {
        walk(self, expr)
    }

    /// Called for `Constant` nodes and for the items of `Collection` nodes
    fn rewrite_constant(
        &mut self,
        constant: ConstantExpression,
    ) -> Result<ConstantExpression, Self::Error> {
        Ok(constant)
    }

    /// Called for the member of a `MemberAccess` after its instance was rewritten
    fn rewrite_member(
        &mut self,
        _instance: Option<&Expression>,
        member: MemberInfo,
    ) -> Result<MemberInfo, Self::Error> {
        Ok(member)
    }
}

fn boxed<R: Rewriter + ?Sized>(r: &mut R, expr: Box<Expression>) -> Result<Box<Expression>, R::Error> {
    Ok(Box::new(r.rewrite(*expr)?))
}

fn optional<R: Rewriter + ?Sized>(
    r: &mut R,
    expr: Option<Box<Expression>>,
) -> Result<Option<Box<Expression>>, R::Error> {
    expr.map(|e| boxed(r, e)).transpose()
}

fn all<R: Rewriter + ?Sized>(r: &mut R, exprs: Vec<Expression>) -> Result<Vec<Expression>, R::Error> {
    exprs.into_iter().map(|e| r.rewrite(e)).collect()
}

fn lambda<R: Rewriter + ?Sized>(
    r: &mut R,
    lambda: LambdaExpression,
) -> Result<LambdaExpression, R::Error> {
    Ok(LambdaExpression {
        parameters: lambda.parameters,
        body: boxed(r, lambda.body)?,
    })
}

fn inits<R: Rewriter + ?Sized>(
    r: &mut R,
    initializers: Vec<ElementInit>,
) -> Result<Vec<ElementInit>, R::Error> {
    initializers
        .into_iter()
        .map(|init| {
            Ok(ElementInit {
                add_method: init.add_method,
                arguments: all(r, init.arguments)?,
            })
        })
        .collect()
}

fn bindings<R: Rewriter + ?Sized>(
    r: &mut R,
    list: Vec<MemberBinding>,
) -> Result<Vec<MemberBinding>, R::Error> {
    list.into_iter()
        .map(|binding| {
            Ok(match binding {
                MemberBinding::Assignment { member, expression } => MemberBinding::Assignment {
                    member,
                    expression: r.rewrite(expression)?,
                },
                MemberBinding::Member { member, bindings: nested } => MemberBinding::Member {
                    member,
                    bindings: bindings(r, nested)?,
                },
                MemberBinding::List {
                    member,
                    initializers,
                } => MemberBinding::List {
                    member,
                    initializers: inits(r, initializers)?,
                },
            })
        })
        .collect()
}

/// Rebuilds `expr`, sending every child through `r`
pub fn walk<R: Rewriter + ?Sized>(r: &mut R, expr: Expression) -> Result<Expression, R::Error> {
    Ok(match expr {
        Expression::Constant(constant) => Expression::Constant(r.rewrite_constant(constant)?),
        Expression::Parameter(parameter) => Expression::Parameter(parameter),
        Expression::MemberAccess { instance, member } => {
            let instance = optional(r, instance)?;
            let member = r.rewrite_member(instance.as_deref(), member)?;
            Expression::MemberAccess { instance, member }
        }
        Expression::MethodCall {
            instance,
            method,
            arguments,
        } => Expression::MethodCall {
            instance: optional(r, instance)?,
            method,
            arguments: all(r, arguments)?,
        },
        Expression::Binary {
            op,
            left,
            right,
            method,
            conversion,
        } => Expression::Binary {
            op,
            left: boxed(r, left)?,
            right: boxed(r, right)?,
            method,
            conversion: match conversion {
                Some(c) => Some(Box::new(lambda(r, *c)?)),
                None => None,
            },
        },
        Expression::Unary {
            op,
            operand,
            ty,
            method,
        } => Expression::Unary {
            op,
            operand: boxed(r, operand)?,
            ty,
            method,
        },
        Expression::Conditional {
            test,
            if_true,
            if_false,
        } => Expression::Conditional {
            test: boxed(r, test)?,
            if_true: boxed(r, if_true)?,
            if_false: boxed(r, if_false)?,
        },
        Expression::Lambda(l) => Expression::Lambda(lambda(r, l)?),
        Expression::New {
            constructor,
            arguments,
            members,
        } => Expression::New {
            constructor,
            arguments: all(r, arguments)?,
            members,
        },
        Expression::NewArray {
            element_type,
            items,
        } => Expression::NewArray {
            element_type,
            items: all(r, items)?,
        },
        Expression::ListInit { new, initializers } => Expression::ListInit {
            new: boxed(r, new)?,
            initializers: inits(r, initializers)?,
        },
        Expression::MemberInit { new, bindings: b } => Expression::MemberInit {
            new: boxed(r, new)?,
            bindings: bindings(r, b)?,
        },
        Expression::Collection {
            element_type,
            items,
        } => Expression::Collection {
            element_type,
            items: items
                .into_iter()
                .map(|item| r.rewrite_constant(item))
                .collect::<Result<_, _>>()?,
        },
        Expression::Block {
            ty,
            variables,
            expressions,
        } => Expression::Block {
            ty,
            variables,
            expressions: all(r, expressions)?,
        },
        Expression::TypeTest { operand, ty } => Expression::TypeTest {
            operand: boxed(r, operand)?,
            ty,
        },
        Expression::Try {
            ty,
            body,
            handlers,
            finally,
            fault,
        } => Expression::Try {
            ty,
            body: boxed(r, body)?,
            handlers: handlers
                .into_iter()
                .map(|handler| {
                    Ok(CatchBlock {
                        test: handler.test,
                        variable: handler.variable,
                        filter: handler.filter.map(|f| r.rewrite(f)).transpose()?,
                        body: r.rewrite(handler.body)?,
                    })
                })
                .collect::<Result<_, R::Error>>()?,
            finally: optional(r, finally)?,
            fault: optional(r, fault)?,
        },
        Expression::Switch {
            ty,
            value,
            comparison,
            cases,
            default,
        } => Expression::Switch {
            ty,
            value: boxed(r, value)?,
            comparison,
            cases: cases
                .into_iter()
                .map(|case| {
                    Ok(SwitchCase {
                        test_values: all(r, case.test_values)?,
                        body: r.rewrite(case.body)?,
                    })
                })
                .collect::<Result<_, R::Error>>()?,
            default: optional(r, default)?,
        },
        Expression::Goto {
            kind,
            target,
            value,
        } => Expression::Goto {
            kind,
            target,
            value: optional(r, value)?,
        },
        Expression::Label { target, default } => Expression::Label {
            target,
            default: optional(r, default)?,
        },
        Expression::Loop {
            body,
            break_label,
            continue_label,
        } => Expression::Loop {
            body: boxed(r, body)?,
            break_label,
            continue_label,
        },
        Expression::Invoke { target, arguments } => Expression::Invoke {
            target: boxed(r, target)?,
            arguments: all(r, arguments)?,
        },
    })
}
