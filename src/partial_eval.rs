//! Partial evaluation of native expressions.
//!
//! Subtrees that depend on nothing but caller-local state are evaluated
//! before a query leaves the process and replaced with constants. The pass
//! runs in two phases: a bottom-up nomination of maximal closed subtrees,
//! then a top-down rewrite that evaluates each nominated root once and stops
//! descending there.

use crate::error::{Error, Result};
use crate::expression::{evaluate, walk_expr, Expr, ExprRewriter, UnaryOperator};
use crate::types::{Member, Type, TypeKind};
use crate::value::Value;
use std::collections::HashSet;

/// Default locality rule.
///
/// Rejects anything bound to a remote data source, values that are already
/// variable arguments, control flow that only makes sense inside its
/// enclosing tree, throws, and quotes.
pub fn can_evaluate_locally(expr: &Expr) -> bool {
    match expr {
        Expr::Constant { value, ty } => {
            !(ty.is_variable_argument()
                || ty.is_queryable()
                || matches!(
                    value,
                    Value::Queryable(_)
                        | Value::Resource(_)
                        | Value::Argument(_)
                        | Value::ArgumentList(_)
                ))
        }
        Expr::Call {
            instance,
            arguments,
            ..
        } => {
            let receiver = instance.as_deref().or_else(|| arguments.first());
            !receiver.is_some_and(|receiver| receiver.ty().is_queryable())
        }
        Expr::Unary {
            op: UnaryOperator::Quote | UnaryOperator::Throw,
            ..
        } => false,
        Expr::Goto { .. } | Expr::Label { .. } | Expr::Loop { .. } => false,
        _ => true,
    }
}

pub struct PartialEvaluator<'a> {
    can_evaluate: Box<dyn Fn(&Expr) -> bool + 'a>,
    wrap_captured_variables: bool,
}

impl<'a> PartialEvaluator<'a> {
    pub fn new() -> Self {
        Self {
            can_evaluate: Box::new(can_evaluate_locally),
            wrap_captured_variables: false,
        }
    }

    /// Narrows the default locality rule with an extra predicate
    pub fn with_predicate(predicate: impl Fn(&Expr) -> bool + 'a) -> Self {
        Self {
            can_evaluate: Box::new(move |expr| can_evaluate_locally(expr) && predicate(expr)),
            wrap_captured_variables: false,
        }
    }

    /// Emit captured variables as `VariableQueryArgument` reads instead of
    /// plain constants
    pub fn wrap_captured_variables(mut self, wrap: bool) -> Self {
        self.wrap_captured_variables = wrap;
        self
    }

    pub fn evaluate(&self, expr: &Expr) -> Result<Expr> {
        let mut nominated = HashSet::new();
        self.nominate(expr, &mut nominated);
        if nominated.is_empty() {
            return Ok(expr.clone());
        }
        log::trace!("nominated {} subtree(s) for local evaluation", nominated.len());
        Replacer {
            nominated: &nominated,
            wrap: self.wrap_captured_variables,
        }
        .rewrite(expr)
    }

    /// Returns whether `expr` is a candidate. Candidates whose parent is also
    /// a candidate are dropped from the set, leaving only maximal roots.
    fn nominate(&self, expr: &Expr, nominated: &mut HashSet<usize>) -> bool {
        let children = expr.children();
        let mut closed = true;
        let mut candidates = Vec::with_capacity(children.len());
        for child in &children {
            if self.nominate(child, nominated) {
                candidates.push(address(child));
            } else {
                closed = false;
            }
        }
        let candidate = closed && defines_nothing(expr) && (self.can_evaluate)(expr);
        if candidate {
            for child in candidates {
                nominated.remove(&child);
            }
            nominated.insert(address(expr));
        }
        candidate
    }
}

impl Default for PartialEvaluator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters and lambdas bind state rather than consume it
fn defines_nothing(expr: &Expr) -> bool {
    !matches!(
        expr,
        Expr::Parameter(_)
            | Expr::Lambda(_)
            | Expr::Binary {
                conversion: Some(_),
                ..
            }
    )
}

fn address(expr: &Expr) -> usize {
    expr as *const Expr as usize
}

struct Replacer<'n> {
    nominated: &'n HashSet<usize>,
    wrap: bool,
}

impl Replacer<'_> {
    fn replace(&self, expr: &Expr) -> Result<Expr> {
        let value = evaluate(expr).map_err(|source| Error::EvaluationFault {
            expression: expr.to_string(),
            source,
        })?;
        let value = match value {
            Value::Sequence(sequence) => {
                Value::Array(sequence.force().map_err(|source| Error::EvaluationFault {
                    expression: expr.to_string(),
                    source,
                })?)
            }
            value => value,
        };
        let ty = expr.ty();
        log::trace!("evaluated {} locally", expr);

        if self.wrap && is_captured_variable(expr) && !value.is_live() {
            return Ok(wrap_argument(value, ty));
        }
        Ok(Expr::Constant { value, ty })
    }
}

impl ExprRewriter for Replacer<'_> {
    type Error = Error;

    fn rewrite(&mut self, expr: &Expr) -> Result<Expr> {
        if !self.nominated.contains(&address(expr)) || expr.is_constant() {
            return walk_expr(self, expr);
        }
        self.replace(expr)
    }
}

/// A static field, or a field read off a constant closure record
fn is_captured_variable(expr: &Expr) -> bool {
    match expr {
        Expr::Member { instance: None, .. } => true,
        Expr::Member {
            instance: Some(instance),
            ..
        } => instance.is_constant(),
        _ => false,
    }
}

fn wrap_argument(value: Value, ty: Type) -> Expr {
    match (value, ty.kind()) {
        (Value::Array(items), TypeKind::Array(element)) => {
            let element = element.clone();
            Expr::member(
                Some(Expr::constant(
                    Value::ArgumentList(items),
                    Type::variable_argument_list(element.clone()),
                )),
                Member::argument_values(&element),
            )
        }
        (value, _) => Expr::member(
            Some(Expr::constant(
                Value::Argument(Box::new(value)),
                Type::variable_argument(ty.clone()),
            )),
            Member::argument_value(&ty),
        ),
    }
}
