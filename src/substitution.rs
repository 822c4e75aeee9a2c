//! Substitution passes that make a query transportable and bind it again.
//!
//! This module provides:
//! - resource substitution over native expressions: live data sources become
//!   `ResourceDescriptor`s before translation and are bound to real sources
//!   on the receiving side
//! - variable argument substitution over the AST: `VariableQueryArgument<T>`
//!   descriptors lose their generic argument for transport and regain it
//!   before AST->native translation
//!
//! Every pass is idempotent and reaches nested lambdas, member-init
//! bindings, collection items and tree-valued constants.

mod argument;
mod resource;

pub use argument::{erase_argument_types, restore_argument_types};
pub use resource::{replace_resources, resolve_resources};

use crate::expression::{walk_expr, Expr, ExprRewriter};
use crate::value::{QuotedExpr, Record, Value};
use std::marker::PhantomData;
use std::sync::Arc;

/// Rewrites every constant value of a native tree through `substitute`.
///
/// `substitute` returns `Some` to replace a value outright; otherwise
/// containers are searched for nested occurrences. Records are rebuilt only
/// when a field actually changed, so shared instances stay shared.
struct ValueSubstitution<F, E> {
    substitute: F,
    _error: PhantomData<fn() -> E>,
}

impl<F, E> ValueSubstitution<F, E>
where
    F: FnMut(&Value) -> Result<Option<Value>, E>,
{
    fn new(substitute: F) -> Self {
        Self {
            substitute,
            _error: PhantomData,
        }
    }

    fn value(&mut self, value: &Value) -> Result<Value, E> {
        if let Some(replacement) = (self.substitute)(value)? {
            return Ok(replacement);
        }
        Ok(match value {
            Value::Array(items) => Value::Array(self.values(items)?),
            Value::ArgumentList(items) => Value::ArgumentList(self.values(items)?),
            Value::Argument(inner) => Value::Argument(Box::new(self.value(inner)?)),
            Value::Dynamic(properties) => Value::Dynamic(
                properties
                    .iter()
                    .map(|(name, property)| Ok((name.clone(), self.value(property)?)))
                    .collect::<Result<_, E>>()?,
            ),
            Value::Record(record) => {
                let fields = self.values(record.fields())?;
                if fields.as_slice() != record.fields() {
                    Value::Record(Arc::new(Record::new(record.ty().clone(), fields)))
                } else {
                    value.clone()
                }
            }
            Value::Expression(quoted) => Value::Expression(QuotedExpr {
                expr: Arc::new(self.rewrite(&quoted.expr)?),
                scope: quoted.scope.clone(),
            }),
            other => other.clone(),
        })
    }

    fn values(&mut self, items: &[Value]) -> Result<Vec<Value>, E> {
        items.iter().map(|item| self.value(item)).collect()
    }
}

impl<F, E> ExprRewriter for ValueSubstitution<F, E>
where
    F: FnMut(&Value) -> Result<Option<Value>, E>,
{
    type Error = E;

    fn rewrite(&mut self, expr: &Expr) -> Result<Expr, E> {
        match expr {
            Expr::Constant { value, ty } => Ok(Expr::Constant {
                value: self.value(value)?,
                ty: ty.clone(),
            }),
            _ => walk_expr(self, expr),
        }
    }
}
