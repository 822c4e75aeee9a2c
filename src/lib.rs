//! Remote query expressions.
//!
//! A query built against a local, strongly typed data source is captured as
//! a native expression tree, partially evaluated, translated into a closed
//! serializable AST, shipped across a process boundary and executed against
//! a server-side source. Results come back as a schema-neutral value graph.

pub mod ast;
pub mod config;
pub mod error;
pub mod expression;
pub mod graph;
pub mod operators;
pub mod partial_eval;
pub mod pipeline;
pub mod remote;
pub mod substitution;
pub mod translation;
pub mod types;
pub mod value;
pub mod wire;

pub use error::{Error, Result};
