// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Errors raised by encode and decode.
//!
//! Every error aborts the whole call; nothing is retried and no partial graph
//! is returned.

use tangle_model::{ModelError, TypeName};
use thiserror::Error;

use crate::codec::CodecError;

/// Broad failure classes, for callers that only need to know what went wrong
/// in kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// No resolver or surrogate can handle a type.
    UnsupportedShape,
    /// The input is truncated, corrupt, or exceeds a configured limit.
    MalformedStream,
    /// Reader and writer traversal order diverged.
    SessionOrdering,
    /// A surrogate conversion failed or produced an incompatible value.
    SurrogateRoundTrip,
    /// The graph itself cannot be encoded as given.
    InvalidGraph,
}

/// Error returned by [`Engine::encode`](crate::Engine::encode) and
/// [`Engine::decode`](crate::Engine::decode).
#[derive(Debug, Error)]
pub enum WireError {
    /// No resolver claims the type, or the claiming resolver cannot build a
    /// codec for it.
    #[error("unsupported shape {ty}: {reason}")]
    UnsupportedShape {
        /// Offending type.
        ty: TypeName,
        /// What is missing.
        reason: String,
    },
    /// A type name does not resolve in the registry.
    #[error("unknown type: {0}")]
    UnknownType(String),
    /// Byte-level read or write failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// A framing token byte is not part of the token table.
    #[error("invalid framing token {0:#04x}")]
    InvalidToken(u8),
    /// A back-reference names an index that was never defined.
    #[error("back-reference to undefined object #{0}")]
    DanglingReference(u32),
    /// A cached manifest index was never defined.
    #[error("unknown cached type index #{0}")]
    UnknownTypeIndex(u32),
    /// A reflection descriptor does not resolve against its owner type.
    #[error("unresolved member {0}")]
    UnresolvedMember(String),
    /// Input continues after the root value.
    #[error("{0} trailing byte(s) after root value")]
    TrailingBytes(usize),
    /// A decoded keyed collection repeats a key.
    #[error("duplicate key in decoded collection")]
    DuplicateKey,
    /// Nesting exceeded the configured depth.
    #[error("nesting depth limit {0} exceeded")]
    DepthLimit(usize),
    /// A stream declared more type names than the configured limit.
    #[error("more than {0} type manifests in one stream")]
    ManifestLimit(usize),
    /// A definition token does not carry the next object index.
    #[error("object definition #{found} out of order, expected #{expected}")]
    SessionOrder {
        /// Index the reader expected next.
        expected: u32,
        /// Index the stream carried.
        found: u32,
    },
    /// A back-reference names an object that has not been allocated yet.
    #[error("back-reference to object #{0} before it was allocated")]
    PendingReference(u32),
    /// A surrogate conversion failed.
    #[error("surrogate for {ty} failed: {reason}")]
    Surrogate {
        /// Surrogated type.
        ty: TypeName,
        /// Failure description.
        reason: String,
    },
    /// A value does not fit the slot it occupies.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Declared type of the slot.
        expected: TypeName,
        /// Runtime type of the value.
        found: TypeName,
    },
    /// Null in a slot of a value type.
    #[error("null is not allowed for {0}")]
    NullNotAllowed(TypeName),
    /// An object reaches itself while reference preservation is off.
    #[error("cycle through {0} requires reference preservation")]
    CycleDetected(TypeName),
    /// A collection's count accessor disagrees with its enumeration.
    #[error("{ty} reports {reported} item(s) but enumerates {enumerated}")]
    CollectionCount {
        /// Collection type.
        ty: TypeName,
        /// Value of the count accessor.
        reported: usize,
        /// Number of enumerated items.
        enumerated: usize,
    },
    /// A member body or constructor failed.
    #[error("invocation failed: {0}")]
    Invoke(String),
}

impl WireError {
    /// Failure class of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedShape { .. } | Self::UnknownType(_) => ErrorCategory::UnsupportedShape,
            Self::Codec(_)
            | Self::InvalidToken(_)
            | Self::DanglingReference(_)
            | Self::UnknownTypeIndex(_)
            | Self::UnresolvedMember(_)
            | Self::TrailingBytes(_)
            | Self::DuplicateKey
            | Self::DepthLimit(_)
            | Self::ManifestLimit(_) => ErrorCategory::MalformedStream,
            Self::SessionOrder { .. } | Self::PendingReference(_) => ErrorCategory::SessionOrdering,
            Self::Surrogate { .. } => ErrorCategory::SurrogateRoundTrip,
            Self::TypeMismatch { .. }
            | Self::NullNotAllowed(_)
            | Self::CycleDetected(_)
            | Self::CollectionCount { .. }
            | Self::Invoke(_) => ErrorCategory::InvalidGraph,
        }
    }

    pub(crate) fn unsupported(ty: &TypeName, reason: impl Into<String>) -> Self {
        Self::UnsupportedShape {
            ty: ty.clone(),
            reason: reason.into(),
        }
    }
}

impl From<ModelError> for WireError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::UnknownType(name) => Self::UnknownType(name.to_string()),
            ModelError::InvalidTypeName(name) => Self::UnknownType(name),
            ModelError::GenericArity { .. } => Self::UnknownType(err.to_string()),
            ModelError::MemberNotFound(member) => Self::UnresolvedMember(member),
            ModelError::DuplicateKey => Self::DuplicateKey,
            other => Self::Invoke(other.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn model_errors_map_onto_wire_categories() {
        let cases = [
            (ModelError::UnknownType(TypeName::from("Ghost")), ErrorCategory::UnsupportedShape),
            (ModelError::MemberNotFound("A::b".into()), ErrorCategory::MalformedStream),
            (ModelError::DuplicateKey, ErrorCategory::MalformedStream),
            (ModelError::Invoke("boom".into()), ErrorCategory::InvalidGraph),
        ];
        for (model, category) in cases {
            assert_eq!(WireError::from(model).category(), category);
        }
        assert_eq!(
            WireError::from(CodecError::OutOfBounds).category(),
            ErrorCategory::MalformedStream
        );
        assert_eq!(
            WireError::PendingReference(3).category(),
            ErrorCategory::SessionOrdering
        );
    }
}
