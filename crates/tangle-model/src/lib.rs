// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Runtime type model for tangle object graphs.
//!
//! `tangle-model` describes the values a graph may contain: a
//! [`TypeRegistry`] of [`TypeInfo`] descriptors keyed by stable
//! [`TypeName`]s, and a [`Value`] model whose objects ([`ObjRef`]) carry
//! reference identity so graphs can share nodes and form cycles.
//!
//! Descriptors stand in for runtime reflection: they list a type's fields,
//! its place in the subtype lattice, and a member table of closures
//! (properties, methods, constructors, enumeration) that structural codecs
//! look up by name.
//!
//! # Threading
//!
//! The registry is `Send + Sync` and is read without locks. Values are
//! single-threaded (`Rc`); each thread builds and consumes its own graphs.
#![forbid(unsafe_code)]

mod builder;
mod builtins;
mod cons;
mod equality;
mod error;
mod family;
mod members;
mod name;
mod registry;
mod snapshot;
mod types;
mod value;

pub use builder::TypeBuilder;
pub use cons::ConsList;
pub use equality::deep_eq;
pub use error::ModelError;
pub use family::{ImmutableFamily, PersistentFamily};
pub use members::{
    ConstructorBody, ConstructorInfo, EnumerateFn, FieldInfo, Getter, MethodBody, MethodInfo,
    Members, PropertyInfo,
};
pub use name::{TypeExpr, TypeName};
pub use registry::{ResolvedMember, TypeRegistry};
pub use snapshot::{Publish, SnapshotMap};
pub use types::{MemberKind, Primitive, TypeInfo, TypeKind, TypeRef};
pub use value::{DelegateData, ExceptionData, MemberRef, ObjRef, ObjectData, Value};
