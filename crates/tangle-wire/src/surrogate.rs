// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Surrogate declarations.
//!
//! A surrogate stands a serializable carrier in for a type the structural
//! resolvers cannot handle (or should not). `to` converts a value into its
//! carrier before writing; `from` converts the decoded carrier back.
//! `from(to(v))` must reconstruct a value equivalent to `v`; reference
//! identity is not required.

use std::fmt;
use std::sync::Arc;

use tangle_model::{ModelError, TypeInfo, TypeName, TypeRegistry, Value};
use thiserror::Error;

/// Failure reported by a surrogate conversion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SurrogateError(pub String);

impl SurrogateError {
    /// Error with the given description.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl From<ModelError> for SurrogateError {
    fn from(err: ModelError) -> Self {
        Self(err.to_string())
    }
}

/// Conversion between a value and its carrier, in either direction.
pub type Conversion =
    Arc<dyn Fn(&Value, &TypeRegistry) -> Result<Value, SurrogateError> + Send + Sync>;

/// Decides whether a surrogate applies to a type.
pub type TypePredicate = Arc<dyn Fn(&TypeInfo) -> bool + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Matcher {
    Exact(TypeName),
    Predicate(TypePredicate),
}

/// A declared substitute for one type or a family of types.
#[derive(Clone)]
pub struct Surrogate {
    matcher: Matcher,
    carrier: TypeName,
    to: Conversion,
    from: Conversion,
}

impl Surrogate {
    /// Surrogate for exactly the named type. Exact surrogates are consulted
    /// before any structural resolver.
    pub fn for_type<T, F>(ty: impl Into<TypeName>, carrier: impl Into<TypeName>, to: T, from: F) -> Self
    where
        T: Fn(&Value, &TypeRegistry) -> Result<Value, SurrogateError> + Send + Sync + 'static,
        F: Fn(&Value, &TypeRegistry) -> Result<Value, SurrogateError> + Send + Sync + 'static,
    {
        Self {
            matcher: Matcher::Exact(ty.into()),
            carrier: carrier.into(),
            to: Arc::new(to),
            from: Arc::new(from),
        }
    }

    /// Surrogate for every type satisfying `predicate`. Predicate surrogates
    /// are consulted only after every structural resolver declined.
    pub fn matching<P, T, F>(predicate: P, carrier: impl Into<TypeName>, to: T, from: F) -> Self
    where
        P: Fn(&TypeInfo) -> bool + Send + Sync + 'static,
        T: Fn(&Value, &TypeRegistry) -> Result<Value, SurrogateError> + Send + Sync + 'static,
        F: Fn(&Value, &TypeRegistry) -> Result<Value, SurrogateError> + Send + Sync + 'static,
    {
        Self {
            matcher: Matcher::Predicate(Arc::new(predicate)),
            carrier: carrier.into(),
            to: Arc::new(to),
            from: Arc::new(from),
        }
    }

    /// Whether this surrogate names its type exactly.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        matches!(self.matcher, Matcher::Exact(_))
    }

    /// Carrier type name.
    #[must_use]
    pub fn carrier(&self) -> &TypeName {
        &self.carrier
    }

    /// Whether this surrogate applies to `ty`.
    #[must_use]
    pub fn applies_to(&self, ty: &TypeInfo) -> bool {
        match &self.matcher {
            Matcher::Exact(name) => name == ty.name(),
            Matcher::Predicate(predicate) => predicate(ty),
        }
    }

    pub(crate) fn to_carrier(
        &self,
        value: &Value,
        types: &TypeRegistry,
    ) -> Result<Value, SurrogateError> {
        (self.to)(value, types)
    }

    pub(crate) fn from_carrier(
        &self,
        carrier: &Value,
        types: &TypeRegistry,
    ) -> Result<Value, SurrogateError> {
        (self.from)(carrier, types)
    }
}

impl fmt::Debug for Surrogate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match &self.matcher {
            Matcher::Exact(name) => name.as_str(),
            Matcher::Predicate(_) => "<predicate>",
        };
        f.debug_struct("Surrogate")
            .field("target", &target)
            .field("carrier", &self.carrier)
            .finish_non_exhaustive()
    }
}
