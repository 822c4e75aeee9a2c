//! Translation between native expressions and the query AST.
//!
//! This module provides:
//! - `to_ast`, which optionally partially evaluates a native tree and maps it
//!   onto the closed AST, lowering native-only shapes to wire shapes
//! - `to_native`, which resolves every descriptor and rebuilds an evaluable
//!   native tree, unifying parameters by `(type, name)`
//! - parameter caches shared across translations

mod error;
mod parameter_cache;
mod to_ast;
mod to_native;

pub use error::UnsupportedExpression;
pub use parameter_cache::{ParameterCache, ParameterStore, SharedParameterCache};
pub use to_ast::{to_ast, AstTranslator};
pub use to_native::{to_native, to_native_with, NativeTranslator};
