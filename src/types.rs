//! Runtime type handles and their serializable descriptors.
//!
//! This module provides:
//! - `Type`, the cheap-clone runtime type handle used by native expressions
//! - `Member`, `Method` and `Constructor` handles that carry executable behaviour
//! - `TypeInfo`, `MemberInfo`, `MethodInfo` and `ConstructorInfo`, the
//!   name/signature based stand-ins that travel inside a query AST
//! - the `TypeResolver` seam that turns descriptors back into handles
//! - `TypeRegistry`, the default resolver

pub mod descriptor;
pub mod member;
pub mod registry;
pub mod resolver;
pub mod ty;

pub use descriptor::{ConstructorInfo, MemberInfo, MethodInfo, TypeInfo};
pub use member::{
    method_impl, Constructor, Member, Method, MethodImpl, MethodTemplate, StaticGetter,
};
pub use registry::TypeRegistry;
pub use resolver::{ResolutionError, TypeResolver};
pub use ty::{RecordShape, Type, TypeKind};
