use crate::ast::Expression;
use crate::error::Result;
use crate::expression::Expr;
use crate::graph::GraphValue;
use crate::pipeline::QueryExecutor;
use crate::value::Value;
use std::sync::Arc;

/// Stage override. Receives the parent executor so it can delegate.
type Stage<I, O> = Box<dyn Fn(&dyn QueryExecutor, I) -> Result<O> + Send + Sync>;

/// Wraps an executor and overrides some of its stages.
///
/// Stages without an override go straight to the parent, so decorators
/// stack: each layer sees the one below it as its parent.
pub struct ExecutorDecorator {
    parent: Arc<dyn QueryExecutor>,
    prepare_ast: Option<Stage<Expression, Expression>>,
    transform: Option<Stage<Expression, Expr>>,
    prepare_native: Option<Stage<Expr, Expr>>,
    execute_native: Option<Stage<Expr, Value>>,
    process_result: Option<Stage<Value, Value>>,
    convert_result: Option<Stage<Value, GraphValue>>,
    process_graph: Option<Stage<GraphValue, GraphValue>>,
}

impl ExecutorDecorator {
    pub fn new(parent: Arc<dyn QueryExecutor>) -> Self {
        Self {
            parent,
            prepare_ast: None,
            transform: None,
            prepare_native: None,
            execute_native: None,
            process_result: None,
            convert_result: None,
            process_graph: None,
        }
    }

    pub fn parent(&self) -> &Arc<dyn QueryExecutor> {
        &self.parent
    }

    pub fn on_prepare_ast(
        mut self,
        stage: impl Fn(&dyn QueryExecutor, Expression) -> Result<Expression> + Send + Sync + 'static,
    ) -> Self {
        self.prepare_ast = Some(Box::new(stage));
        self
    }

    pub fn on_transform(
        mut self,
        stage: impl Fn(&dyn QueryExecutor, Expression) -> Result<Expr> + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Box::new(stage));
        self
    }

    pub fn on_prepare_native(
        mut self,
        stage: impl Fn(&dyn QueryExecutor, Expr) -> Result<Expr> + Send + Sync + 'static,
    ) -> Self {
        self.prepare_native = Some(Box::new(stage));
        self
    }

    pub fn on_execute_native(
        mut self,
        stage: impl Fn(&dyn QueryExecutor, Expr) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.execute_native = Some(Box::new(stage));
        self
    }

    pub fn on_process_result(
        mut self,
        stage: impl Fn(&dyn QueryExecutor, Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.process_result = Some(Box::new(stage));
        self
    }

    pub fn on_convert_result(
        mut self,
        stage: impl Fn(&dyn QueryExecutor, Value) -> Result<GraphValue> + Send + Sync + 'static,
    ) -> Self {
        self.convert_result = Some(Box::new(stage));
        self
    }

    pub fn on_process_graph(
        mut self,
        stage: impl Fn(&dyn QueryExecutor, GraphValue) -> Result<GraphValue> + Send + Sync + 'static,
    ) -> Self {
        self.process_graph = Some(Box::new(stage));
        self
    }
}

impl QueryExecutor for ExecutorDecorator {
    fn prepare_ast(&self, expr: Expression) -> Result<Expression> {
        match &self.prepare_ast {
            Some(stage) => stage(self.parent.as_ref(), expr),
            None => self.parent.prepare_ast(expr),
        }
    }

    fn transform(&self, expr: Expression) -> Result<Expr> {
        match &self.transform {
            Some(stage) => stage(self.parent.as_ref(), expr),
            None => self.parent.transform(expr),
        }
    }

    fn prepare_native(&self, expr: Expr) -> Result<Expr> {
        match &self.prepare_native {
            Some(stage) => stage(self.parent.as_ref(), expr),
            None => self.parent.prepare_native(expr),
        }
    }

    fn execute_native(&self, expr: Expr) -> Result<Value> {
        match &self.execute_native {
            Some(stage) => stage(self.parent.as_ref(), expr),
            None => self.parent.execute_native(expr),
        }
    }

    fn process_result(&self, value: Value) -> Result<Value> {
        match &self.process_result {
            Some(stage) => stage(self.parent.as_ref(), value),
            None => self.parent.process_result(value),
        }
    }

    fn convert_result(&self, value: Value) -> Result<GraphValue> {
        match &self.convert_result {
            Some(stage) => stage(self.parent.as_ref(), value),
            None => self.parent.convert_result(value),
        }
    }

    fn process_graph(&self, graph: GraphValue) -> Result<GraphValue> {
        match &self.process_graph {
            Some(stage) => stage(self.parent.as_ref(), graph),
            None => self.parent.process_graph(graph),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOperator;
    use crate::pipeline::DefaultExecutor;
    use crate::types::{TypeInfo, TypeRegistry};
    use crate::value::SourceRegistry;
    use parking_lot::Mutex;

    fn base() -> Arc<dyn QueryExecutor> {
        Arc::new(DefaultExecutor::new(
            Arc::new(TypeRegistry::with_builtins()),
            Arc::new(SourceRegistry::new()),
        ))
    }

    fn sum(a: i32, b: i32) -> Expression {
        let int = TypeInfo::new("Int32");
        Expression::Binary {
            op: BinaryOperator::Add,
            left: Box::new(Expression::constant(GraphValue::Int(a), int.clone())),
            right: Box::new(Expression::constant(GraphValue::Int(b), int)),
            method: None,
            conversion: None,
        }
    }

    #[test]
    fn test_undecorated_stages_delegate() {
        let decorated = ExecutorDecorator::new(base());
        assert_eq!(decorated.execute(sum(2, 3)).unwrap(), GraphValue::Int(5));
    }

    #[test]
    fn test_override_single_stage() {
        let decorated = ExecutorDecorator::new(base()).on_process_result(|parent, value| {
            let value = parent.process_result(value)?;
            Ok(match value {
                Value::Int(i) => Value::Int(i * 10),
                other => other,
            })
        });
        assert_eq!(decorated.execute(sum(2, 3)).unwrap(), GraphValue::Int(50));
    }

    #[test]
    fn test_stacked_decorators_run_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let inner_seen = seen.clone();
        let inner = ExecutorDecorator::new(base()).on_process_graph(move |parent, graph| {
            inner_seen.lock().push("inner");
            parent.process_graph(graph)
        });
        let outer_seen = seen.clone();
        let outer = ExecutorDecorator::new(Arc::new(inner)).on_process_graph(move |parent, graph| {
            outer_seen.lock().push("outer");
            parent.process_graph(graph)
        });
        outer.execute(sum(1, 1)).unwrap();
        outer.execute(sum(1, 1)).unwrap();
        assert_eq!(*seen.lock(), vec!["outer", "inner", "outer", "inner"]);
    }

    #[test]
    fn test_prepare_ast_rewrites_query() {
        let decorated = ExecutorDecorator::new(base()).on_prepare_ast(|parent, _| {
            parent.prepare_ast(sum(40, 2))
        });
        assert_eq!(decorated.execute(sum(0, 0)).unwrap(), GraphValue::Int(42));
    }
}
