use remote_query::config::ExecutorConfig;
use remote_query::expression::{BinaryOperator, ExecutionError, Expr, QueryBuilder, TerminalOutcome};
use remote_query::graph::GraphValue;
use remote_query::pipeline::{DefaultExecutor, ExecutorDecorator, QueryExecutor};
use remote_query::remote::{QueryServer, RemoteQueryProvider};
use remote_query::types::{Type, TypeRegistry};
use remote_query::value::{InMemorySource, QuerySource, Record, SourceRegistry, Value};
use remote_query::wire::Codec;
use remote_query::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn product_type() -> Type {
    Type::record("Product", vec![("Name", Type::string()), ("Price", Type::int32())])
}

fn executor(config: ExecutorConfig) -> Arc<dyn QueryExecutor> {
    let registry = TypeRegistry::with_builtins();
    registry.register_type(product_type());
    let sources = SourceRegistry::new();
    let rows = [("A", 1), ("B", 2), ("C", 3), ("D", 33999), ("E", 150)]
        .into_iter()
        .map(|(name, price)| {
            Value::Record(Arc::new(Record::new(
                product_type(),
                vec![Value::from(name), Value::Int(price)],
            )))
        })
        .collect();
    sources.register(InMemorySource::shared(product_type(), rows));
    Arc::new(DefaultExecutor::new(Arc::new(registry), Arc::new(sources)).with_config(config))
}

fn provider(executor: Arc<dyn QueryExecutor>) -> RemoteQueryProvider {
    let server = QueryServer::new(executor, Codec::Json);
    RemoteQueryProvider::new(move |request| server.handle(request)).with_codec(Codec::Json)
}

fn source() -> Arc<dyn QuerySource> {
    InMemorySource::shared(product_type(), Vec::new())
}

fn priced_above(registry: &TypeRegistry, min: i32) -> Expr {
    QueryBuilder::from_source(registry, source())
        .filter(|p| {
            Ok(Expr::binary(
                BinaryOperator::GreaterThan,
                Expr::property(p, "Price")?,
                Expr::captured("min", min, Type::int32()),
            ))
        })
        .and_then(|q| q.select(|p| Expr::property(p, "Name")))
        .unwrap()
        .build()
}

#[test]
fn test_audit_decorator_counts_executions() {
    let executed = Arc::new(AtomicUsize::new(0));
    let counter = executed.clone();
    let audited = ExecutorDecorator::new(executor(ExecutorConfig::default())).on_execute_native(
        move |parent, expr| {
            counter.fetch_add(1, Ordering::SeqCst);
            parent.execute_native(expr)
        },
    );
    let provider = provider(Arc::new(audited));
    let registry = TypeRegistry::with_builtins();

    provider.execute(&priced_above(&registry, 10)).unwrap();
    provider.execute(&priced_above(&registry, 1000)).unwrap();
    assert_eq!(executed.load(Ordering::SeqCst), 2);
}

#[test]
fn test_result_cap_decorator() {
    let capped = ExecutorDecorator::new(executor(ExecutorConfig::default())).on_process_result(
        |parent, value| match parent.process_result(value)? {
            Value::Array(mut rows) => {
                rows.truncate(1);
                Ok(Value::Array(rows))
            }
            other => Ok(other),
        },
    );
    let registry = TypeRegistry::with_builtins();
    let result = provider(Arc::new(capped))
        .execute(&priced_above(&registry, 0))
        .unwrap();
    assert_eq!(result, GraphValue::List(vec![GraphValue::String("A".to_string())]));
}

#[test]
fn test_rejecting_decorator_reports_remotely() {
    let guarded = ExecutorDecorator::new(executor(ExecutorConfig::default())).on_prepare_ast(
        |parent, expr| {
            if expr.node_count() > 5 {
                return Err(Error::Remote("query too large".to_string()));
            }
            parent.prepare_ast(expr)
        },
    );
    let registry = TypeRegistry::with_builtins();
    match provider(Arc::new(guarded)).execute(&priced_above(&registry, 0)) {
        Err(Error::Remote(message)) => assert!(message.contains("too large")),
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[test]
fn test_strict_config_surfaces_ambiguity() {
    let registry = TypeRegistry::with_builtins();
    let query = QueryBuilder::from_source(&registry, source())
        .single_where(|p| {
            Ok(Expr::binary(
                BinaryOperator::GreaterThan,
                Expr::property(p, "Price")?,
                Expr::int(100),
            ))
        })
        .unwrap();
    let ast = remote_query::remote::prepare_query(&query, &Default::default()).unwrap();

    match executor(ExecutorConfig::strict()).execute(ast.clone()) {
        Err(Error::Execution(ExecutionError::Terminal(TerminalOutcome::MoreThanOneElement(..)))) => {}
        other => panic!("expected ambiguity, got {:?}", other),
    }
    let GraphValue::List(items) = executor(ExecutorConfig::default()).execute(ast).unwrap() else {
        panic!("expected sentinel list");
    };
    assert_eq!(items.len(), 2);
}

#[test]
fn test_local_evaluation_fault_stops_the_client() {
    let registry = TypeRegistry::with_builtins();
    let query = QueryBuilder::from_source(&registry, source())
        .filter(|p| {
            Ok(Expr::binary(
                BinaryOperator::GreaterThan,
                Expr::property(p, "Price")?,
                Expr::binary(
                    BinaryOperator::Divide,
                    Expr::int(10),
                    Expr::captured("zero", 0, Type::int32()),
                ),
            ))
        })
        .unwrap()
        .build();
    let executed = Arc::new(AtomicUsize::new(0));
    let counter = executed.clone();
    let server = ExecutorDecorator::new(executor(ExecutorConfig::default())).on_prepare_ast(
        move |parent, expr| {
            counter.fetch_add(1, Ordering::SeqCst);
            parent.prepare_ast(expr)
        },
    );
    match provider(Arc::new(server)).execute(&query) {
        Err(Error::EvaluationFault { source, .. }) => {
            assert!(matches!(source, ExecutionError::DivisionByZero))
        }
        other => panic!("expected evaluation fault, got {:?}", other),
    }
    assert_eq!(executed.load(Ordering::SeqCst), 0);
}
