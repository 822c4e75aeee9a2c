//! Execution pipeline for received query ASTs.
//!
//! Execution runs seven stages in a fixed order, stopping at the first
//! error:
//!
//! ```text
//! prepare_ast -> transform -> prepare_native -> execute_native
//!     -> process_result -> convert_result -> process_graph
//! ```
//!
//! [`DefaultExecutor`] implements every stage. Individual stages are
//! replaced by wrapping an executor in an [`ExecutorDecorator`], which
//! delegates everything it does not override to its parent.

mod decorator;

pub use decorator::ExecutorDecorator;

use crate::ast::Expression;
use crate::config::ExecutorConfig;
use crate::error::Result;
use crate::expression::{evaluate, ExecutionError, Expr, TerminalOutcome, TypeChecker};
use crate::graph::{DynamicObjectMapper, GraphValue, ValueMapper};
use crate::partial_eval::PartialEvaluator;
use crate::substitution::{resolve_resources, restore_argument_types};
use crate::translation::to_native;
use crate::types::TypeResolver;
use crate::value::{SourceProvider, Value};
use std::sync::Arc;

/// Stages of query execution
pub trait QueryExecutor: Send + Sync {
    fn prepare_ast(&self, expr: Expression) -> Result<Expression>;

    fn transform(&self, expr: Expression) -> Result<Expr>;

    fn prepare_native(&self, expr: Expr) -> Result<Expr>;

    fn execute_native(&self, expr: Expr) -> Result<Value>;

    fn process_result(&self, value: Value) -> Result<Value>;

    fn convert_result(&self, value: Value) -> Result<GraphValue>;

    fn process_graph(&self, graph: GraphValue) -> Result<GraphValue>;

    fn execute(&self, expr: Expression) -> Result<GraphValue> {
        let expr = self.prepare_ast(expr)?;
        let native = self.transform(expr)?;
        let native = self.prepare_native(native)?;
        let raw = self.execute_native(native)?;
        let raw = self.process_result(raw)?;
        let graph = self.convert_result(raw)?;
        self.process_graph(graph)
    }
}

pub struct DefaultExecutor {
    resolver: Arc<dyn TypeResolver>,
    provider: Arc<dyn SourceProvider>,
    mapper: Arc<dyn ValueMapper>,
    config: ExecutorConfig,
}

impl DefaultExecutor {
    pub fn new(resolver: Arc<dyn TypeResolver>, provider: Arc<dyn SourceProvider>) -> Self {
        Self {
            resolver,
            provider,
            mapper: Arc::new(DynamicObjectMapper::new()),
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_mapper(mut self, mapper: Arc<dyn ValueMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn run(&self, expr: &Expr) -> std::result::Result<Value, ExecutionError> {
        let value = evaluate(expr)?;
        if self.config.materialize_sequences {
            value.materialize()
        } else {
            Ok(value)
        }
    }
}

impl QueryExecutor for DefaultExecutor {
    fn prepare_ast(&self, expr: Expression) -> Result<Expression> {
        log::debug!("prepare ast: {}", expr);
        Ok(restore_argument_types(expr))
    }

    fn transform(&self, expr: Expression) -> Result<Expr> {
        let native = to_native(&expr, self.resolver.as_ref())?;
        TypeChecker::new().validate(&native)?;
        log::debug!("transformed: {}", native);
        Ok(native)
    }

    fn prepare_native(&self, expr: Expr) -> Result<Expr> {
        let bound = resolve_resources(&expr, self.provider.as_ref())?;
        if !self.config.evaluate_locally {
            return Ok(bound);
        }
        let prepared = PartialEvaluator::new().evaluate(&bound)?;
        log::debug!("prepared native: {}", prepared);
        Ok(prepared)
    }

    fn execute_native(&self, expr: Expr) -> Result<Value> {
        match self.run(&expr) {
            Err(ExecutionError::Terminal(outcome)) if self.config.terminal_sentinels => {
                log::debug!("terminal outcome {:?} becomes a sentinel result", outcome);
                Ok(sentinel(outcome))
            }
            result => Ok(result?),
        }
    }

    fn process_result(&self, value: Value) -> Result<Value> {
        Ok(value)
    }

    fn convert_result(&self, value: Value) -> Result<GraphValue> {
        let graph = self.mapper.map_to_graph(&value)?;
        log::debug!("result: {}", graph);
        Ok(graph)
    }

    fn process_graph(&self, graph: GraphValue) -> Result<GraphValue> {
        Ok(graph)
    }
}

/// Empty result for no element, the first two elements for more than one
fn sentinel(outcome: TerminalOutcome) -> Value {
    match outcome {
        TerminalOutcome::NoElements => Value::Array(Vec::new()),
        TerminalOutcome::MoreThanOneElement(first, second) => Value::Array(vec![*first, *second]),
    }
}
