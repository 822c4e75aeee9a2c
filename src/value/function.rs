//! Compiled closures, quoted expressions and deferred sequences.

use crate::expression::{ExecutionError, Expr, Scope};
use crate::value::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type Body = Arc<dyn Fn(&[Value]) -> Result<Value, ExecutionError> + Send + Sync>;

/// Invocable closure produced by compiling a lambda
#[derive(Clone)]
pub struct Function {
    arity: usize,
    body: Body,
}

impl Function {
    pub fn new(
        arity: usize,
        body: impl Fn(&[Value]) -> Result<Value, ExecutionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            arity,
            body: Arc::new(body),
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn call(&self, arguments: &[Value]) -> Result<Value, ExecutionError> {
        if arguments.len() != self.arity {
            return Err(ExecutionError::ArgumentCount {
                callee: "lambda".to_string(),
                expected: self.arity,
                actual: arguments.len(),
            });
        }
        (self.body)(arguments)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function/{}", self.arity)
    }
}

/// An expression captured as data together with the scope it was quoted in
#[derive(Clone)]
pub struct QuotedExpr {
    pub expr: Arc<Expr>,
    pub scope: Scope,
}

impl QuotedExpr {
    /// Quote of a closed expression
    pub fn closed(expr: Expr) -> Self {
        Self {
            expr: Arc::new(expr),
            scope: Scope::default(),
        }
    }
}

impl fmt::Debug for QuotedExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quoted({})", self.expr)
    }
}

type Producer = Arc<dyn Fn() -> Result<Vec<Value>, ExecutionError> + Send + Sync>;

/// One key of a (possibly refined) ordering
#[derive(Debug, Clone)]
pub struct SortKey {
    pub selector: Function,
    pub descending: bool,
}

/// Unsorted source plus the keys it is ordered by
#[derive(Debug, Clone)]
pub struct SortSpec {
    pub source: LazySequence,
    pub keys: Vec<SortKey>,
}

/// Deferred sequence. Nothing runs until [`LazySequence::force`].
#[derive(Clone)]
pub struct LazySequence {
    producer: Producer,
    ordering: Option<Arc<SortSpec>>,
}

impl LazySequence {
    pub fn new(
        producer: impl Fn() -> Result<Vec<Value>, ExecutionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            producer: Arc::new(producer),
            ordering: None,
        }
    }

    /// Stable sort of `source` by `keys`, compared left to right
    pub fn ordered(source: LazySequence, keys: Vec<SortKey>) -> Self {
        let spec = Arc::new(SortSpec { source, keys });
        let captured = spec.clone();
        Self {
            producer: Arc::new(move || sort(&captured)),
            ordering: Some(spec),
        }
    }

    /// The ordering this sequence was produced by, if any
    pub fn ordering(&self) -> Option<&SortSpec> {
        self.ordering.as_deref()
    }

    pub fn force(&self) -> Result<Vec<Value>, ExecutionError> {
        (self.producer)()
    }

    pub fn ptr_eq(&self, other: &LazySequence) -> bool {
        Arc::ptr_eq(&self.producer, &other.producer)
    }
}

impl fmt::Debug for LazySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ordering {
            Some(spec) => write!(f, "LazySequence(ordered by {} keys)", spec.keys.len()),
            None => write!(f, "LazySequence"),
        }
    }
}

fn sort(spec: &SortSpec) -> Result<Vec<Value>, ExecutionError> {
    let items = spec.source.force()?;
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let keys = spec
            .keys
            .iter()
            .map(|key| key.selector.call(std::slice::from_ref(&item)))
            .collect::<Result<Vec<_>, _>>()?;
        keyed.push((keys, item));
    }
    keyed.sort_by(|(a, _), (b, _)| {
        for ((left, right), key) in a.iter().zip(b.iter()).zip(&spec.keys) {
            let ordering = left.sort_cmp(right);
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}
