//! Native expression trees and their evaluation.
//!
//! This module provides:
//! - The native expression representation with identity-bound parameters
//! - Static typing and signature validation
//! - A tree-walking evaluator with closures, quoting and structured jumps
//! - A structural rewriter and a fluent query builder

pub mod builder;
pub mod error;
pub mod eval;
pub mod expr;
pub mod operator;
pub mod rewrite;
pub mod type_checker;

pub use builder::QueryBuilder;
pub use error::{ExecutionError, ExecutionResult, TerminalOutcome};
pub use eval::{
    apply_binary, as_function, compile_lambda, compile_quoted, evaluate, evaluate_in, Scope,
};
pub use expr::{
    CatchBlock, ElementInit, Expr, LabelTarget, LambdaExpr, MemberBinding, Parameter, SwitchCase,
};
pub use operator::{BinaryOperator, UnaryOperator};
pub use rewrite::{walk_expr, ExprRewriter};
pub use type_checker::{type_check_expression, TypeChecker};
