//! The closed, serializable query AST.
//!
//! This module provides:
//! - `Expression`, one variant per supported node kind
//! - operators, including the string and membership predicates that exist
//!   only on the wire
//! - resource descriptors and variable query arguments
//! - the `Rewriter` used by every AST pass

mod display;
pub mod argument;
pub mod node;
pub mod operator;
pub mod resource;
pub mod visitor;

pub use argument::{VariableQueryArgument, VariableQueryArgumentList};
pub use node::{
    CatchBlock, ConstantExpression, ElementInit, Expression, GotoKind, LabelTarget,
    LambdaExpression, MemberBinding, ParameterExpression, SwitchCase,
};
pub use operator::{BinaryOperator, UnaryOperator};
pub use resource::ResourceDescriptor;
pub use visitor::Rewriter;
