//! Client and server ends of a remote query.
//!
//! The client prepares a native query for transport, encodes the AST and
//! hands the bytes to a transport closure. The server decodes the AST, runs
//! it through a [`QueryExecutor`] and answers with a [`QueryResponse`].

use crate::ast::Expression;
use crate::config::TranslationOptions;
use crate::error::{Error, Result};
use crate::expression::Expr;
use crate::graph::{DynamicObjectMapper, GraphValue, ValueMapper};
use crate::partial_eval::PartialEvaluator;
use crate::pipeline::QueryExecutor;
use crate::substitution::{erase_argument_types, replace_resources};
use crate::translation::to_ast;
use crate::types::Type;
use crate::value::Value;
use crate::wire::{Codec, WireError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Answer of a [`QueryServer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryResponse {
    Result(GraphValue),
    Error(String),
}

/// Turns a native query into a transportable AST: local evaluation, then
/// resource descriptors, then translation, then erased argument types
pub fn prepare_query(expr: &Expr, options: &TranslationOptions) -> Result<Expression> {
    let evaluated = if options.evaluate_locally {
        PartialEvaluator::new()
            .wrap_captured_variables(options.wrap_captured_variables)
            .evaluate(expr)?
    } else {
        expr.clone()
    };
    let outbound = replace_resources(&evaluated);
    let ast = to_ast(
        &outbound,
        &TranslationOptions {
            evaluate_locally: false,
            ..options.clone()
        },
    )?;
    log::debug!("prepared query: {}", ast);
    Ok(erase_argument_types(ast))
}

type Transport = Box<dyn Fn(&[u8]) -> std::result::Result<Vec<u8>, WireError> + Send + Sync>;

/// Sends queries through a caller-supplied transport
pub struct RemoteQueryProvider {
    transport: Transport,
    codec: Codec,
    options: TranslationOptions,
    mapper: Arc<dyn ValueMapper>,
}

impl RemoteQueryProvider {
    pub fn new(
        transport: impl Fn(&[u8]) -> std::result::Result<Vec<u8>, WireError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            transport: Box::new(transport),
            codec: Codec::default(),
            options: TranslationOptions::default(),
            mapper: Arc::new(DynamicObjectMapper::new()),
        }
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_options(mut self, options: TranslationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_mapper(mut self, mapper: Arc<dyn ValueMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Executes `expr` remotely and returns the raw value graph
    pub fn execute(&self, expr: &Expr) -> Result<GraphValue> {
        let ast = prepare_query(expr, &self.options)?;
        let request = self.codec.encode(&ast)?;
        log::debug!("sending {} byte request ({})", request.len(), self.codec);
        let response = (self.transport)(&request)?;
        match self.codec.decode::<QueryResponse>(&response)? {
            QueryResponse::Result(graph) => Ok(graph),
            QueryResponse::Error(message) => Err(Error::Remote(message)),
        }
    }

    /// Executes `expr` remotely and maps the result to `target`
    pub fn execute_as(&self, expr: &Expr, target: &Type) -> Result<Value> {
        let graph = self.execute(expr)?;
        Ok(self.mapper.map_from_graph(&graph, target)?)
    }
}

/// Executing end: decodes requests and encodes responses
pub struct QueryServer {
    executor: Arc<dyn QueryExecutor>,
    codec: Codec,
}

impl QueryServer {
    pub fn new(executor: Arc<dyn QueryExecutor>, codec: Codec) -> Self {
        Self { executor, codec }
    }

    /// Handles one encoded request. Execution failures travel back as
    /// [`QueryResponse::Error`]; only codec failures are returned here.
    pub fn handle(&self, request: &[u8]) -> std::result::Result<Vec<u8>, WireError> {
        let expr: Expression = self.codec.decode(request)?;
        let response = match self.executor.execute(expr) {
            Ok(graph) => QueryResponse::Result(graph),
            Err(e) => {
                log::warn!("query failed: {}", e);
                QueryResponse::Error(e.to_string())
            }
        };
        self.codec.encode(&response)
    }
}
