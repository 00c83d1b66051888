// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Errors raised by the type model and by member invocation.

use thiserror::Error;

use crate::name::TypeName;

/// Errors produced by the type registry, type-name parsing, and member calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A type name could not be parsed.
    #[error("invalid type name: {0:?}")]
    InvalidTypeName(String),
    /// No type is registered (or constructible) under this name.
    #[error("unknown type: {0}")]
    UnknownType(TypeName),
    /// A type with this name is already registered.
    #[error("duplicate type registration: {0}")]
    DuplicateType(TypeName),
    /// A type tried to derive from a sealed base.
    #[error("type {ty} cannot derive from sealed type {base}")]
    SealedBase {
        /// Type being registered.
        ty: TypeName,
        /// Sealed base type.
        base: TypeName,
    },
    /// A base type has a different kind than the derived type.
    #[error("type {ty} cannot derive from {base}: incompatible kinds")]
    IncompatibleBase {
        /// Type being registered.
        ty: TypeName,
        /// Offending base type.
        base: TypeName,
    },
    /// A type listed something that is not an interface in its interface list.
    #[error("{0} is not an interface")]
    NotAnInterface(TypeName),
    /// Two fields with the same name in one flattened record.
    #[error("type {ty} declares field {field} more than once")]
    DuplicateField {
        /// Type being registered.
        ty: TypeName,
        /// Repeated field name.
        field: String,
    },
    /// Field lookup failed.
    #[error("type {ty} has no field {field}")]
    UnknownField {
        /// Type that was searched.
        ty: TypeName,
        /// Missing field name.
        field: String,
    },
    /// A generic family was given the wrong number of type arguments.
    #[error("generic type {base} expects {expected} type argument(s), found {found}")]
    GenericArity {
        /// Generic family name.
        base: String,
        /// Declared arity.
        expected: usize,
        /// Supplied arity.
        found: usize,
    },
    /// A symbolic member descriptor did not resolve against its owner type.
    #[error("member not found: {0}")]
    MemberNotFound(String),
    /// A member was invoked with the wrong number of arguments.
    #[error("{member} expects {expected} argument(s), found {found}")]
    Arity {
        /// Member name.
        member: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        found: usize,
    },
    /// An instance member was invoked without a receiver object.
    #[error("{0} requires a receiver object")]
    NullReceiver(String),
    /// Object data did not have the layout its type requires.
    #[error("object of type {ty} does not hold {expected} data")]
    ShapeMismatch {
        /// Object type.
        ty: TypeName,
        /// Expected data layout.
        expected: &'static str,
    },
    /// A keyed collection was built from entries with a repeated key.
    #[error("duplicate key in keyed collection")]
    DuplicateKey,
    /// A value could not be converted to the requested primitive.
    #[error("expected {expected}, found {found}")]
    ValueMismatch {
        /// Requested primitive.
        expected: &'static str,
        /// Description of the supplied value.
        found: String,
    },
    /// A user-supplied member body failed.
    #[error("invocation failed: {0}")]
    Invoke(String),
}
