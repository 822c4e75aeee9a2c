//! Remote query demo - ships a product query across an in-process wire

use anyhow::{anyhow, Context, Result};
use bytes::BytesMut;
use clap::{Parser as ClapParser, ValueEnum};
use remote_query::config::TranslationOptions;
use remote_query::expression::{BinaryOperator, Expr, QueryBuilder};
use remote_query::graph::GraphValue;
use remote_query::pipeline::DefaultExecutor;
use remote_query::remote::{prepare_query, QueryServer, RemoteQueryProvider};
use remote_query::types::{Type, TypeRegistry};
use remote_query::value::{InMemorySource, Record, SourceRegistry, Value};
use remote_query::wire::{decode_frame, encode_frame, Codec, WireError};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrderKey {
    Name,
    Price,
}

/// Remote query demo - filters, orders and projects products on a "server"
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Wire codec (binary or json)
    #[arg(short, long, default_value = "binary")]
    codec: Codec,

    /// Only products priced above this value
    #[arg(short, long, default_value = "10")]
    min_price: i32,

    /// Sort key applied before projecting names
    #[arg(short, long, value_enum, default_value = "price")]
    order_by: OrderKey,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn product_type() -> Type {
    Type::record("Product", vec![("Name", Type::string()), ("Price", Type::int32())])
}

fn products() -> Vec<Value> {
    [("A", 1), ("B", 2), ("C", 3), ("D", 33999), ("E", 150)]
        .into_iter()
        .map(|(name, price)| {
            Value::Record(Arc::new(Record::new(
                product_type(),
                vec![Value::from(name), Value::Int(price)],
            )))
        })
        .collect()
}

/// Server side: a registry that knows `Product` and a source serving it
fn start_server(codec: Codec) -> QueryServer {
    let registry = TypeRegistry::with_builtins();
    registry.register_type(product_type());
    let sources = SourceRegistry::new();
    sources.register(InMemorySource::shared(product_type(), products()));
    let executor = DefaultExecutor::new(Arc::new(registry), Arc::new(sources));
    QueryServer::new(Arc::new(executor), codec)
}

/// Length-prefixed round trip through the server
fn round_trip(server: &QueryServer, request: &[u8]) -> Result<Vec<u8>, WireError> {
    let mut inbound = BytesMut::from(&encode_frame(request)?[..]);
    let request = decode_frame(&mut inbound)?
        .ok_or_else(|| WireError::Frame("incomplete request".to_string()))?;
    let response = server.handle(&request)?;

    let mut outbound = BytesMut::from(&encode_frame(&response)?[..]);
    let response = decode_frame(&mut outbound)?
        .ok_or_else(|| WireError::Frame("incomplete response".to_string()))?;
    Ok(response.to_vec())
}

fn build_query(registry: &TypeRegistry, min_price: i32, order_by: OrderKey) -> Result<Expr> {
    // the client only holds an empty stand-in for the remote table
    let local = InMemorySource::shared(product_type(), Vec::new());
    let query = QueryBuilder::from_source(registry, local)
        .filter(|p| {
            Ok(Expr::binary(
                BinaryOperator::GreaterThan,
                Expr::property(p, "Price")?,
                Expr::captured("minPrice", min_price, Type::int32()),
            ))
        })
        .and_then(|q| match order_by {
            OrderKey::Name => q.order_by(|p| Expr::property(p, "Name")),
            OrderKey::Price => q.order_by(|p| Expr::property(p, "Price")),
        })
        .and_then(|q| q.select(|p| Expr::property(p, "Name")))
        .context("Failed to build query")?;
    Ok(query.build())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let registry = TypeRegistry::with_builtins();
    let query = build_query(&registry, args.min_price, args.order_by)?;
    println!("Query:    {}", query);

    let ast = prepare_query(&query, &TranslationOptions::default())
        .context("Failed to prepare query")?;
    println!("Wire AST: {}", ast);

    let server = Arc::new(start_server(args.codec));
    let provider = RemoteQueryProvider::new(move |request| round_trip(&server, request))
        .with_codec(args.codec);

    log::info!("executing over the {} codec", args.codec);
    let result = provider
        .execute(&query)
        .context("Remote execution failed")?;

    let names = match &result {
        GraphValue::List(items) => items
            .iter()
            .map(|item| match item {
                GraphValue::String(name) => Ok(name.clone()),
                other => Err(anyhow!("unexpected result item {}", other)),
            })
            .collect::<Result<Vec<_>>>()?,
        other => return Err(anyhow!("unexpected result {}", other)),
    };
    println!("Result:   {:?}", names);

    Ok(())
}
