//! Descriptor resolution seam.

use crate::types::descriptor::{ConstructorInfo, MemberInfo, MethodInfo, TypeInfo};
use crate::types::member::{Constructor, Member, Method};
use crate::types::ty::Type;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Unknown member: {0}")]
    UnknownMember(String),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Unknown constructor: {0}")]
    UnknownConstructor(String),

    #[error("Type {name} expects {expected} generic arguments, got {actual}")]
    GenericArity {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Argument of type {actual} does not fit parameter {expected} of {callee}")]
    SignatureMismatch {
        callee: String,
        expected: String,
        actual: String,
    },
}

/// Turns descriptors back into runtime handles.
///
/// Implementations own whatever lookup caches they need; nothing here is
/// process-global.
pub trait TypeResolver: Send + Sync {
    fn resolve_type(&self, info: &TypeInfo) -> Result<Type, ResolutionError>;

    fn resolve_member(&self, info: &MemberInfo) -> Result<Member, ResolutionError>;

    fn resolve_method(&self, info: &MethodInfo) -> Result<Method, ResolutionError>;

    fn resolve_constructor(&self, info: &ConstructorInfo) -> Result<Constructor, ResolutionError>;
}
