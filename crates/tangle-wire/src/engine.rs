// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine: resolver chain, shared codec registry, and the encode/decode
//! entry points.

use std::fmt;
use std::sync::Arc;

use tangle_model::{Publish, SnapshotMap, TypeInfo, TypeName, TypeRef, TypeRegistry, Value};
use tracing::{debug, trace, warn};

use crate::config::WireConfig;
use crate::error::WireError;
use crate::framing::{Decoder, Encoder};
use crate::resolver::{
    ArrayResolver, DelegateResolver, DictionaryResolver, EnumerableResolver, ExceptionResolver,
    ImmutableResolver, LinkedListResolver, MemberResolver, PersistentResolver, PrimitiveResolver,
    RecordResolver, SetResolver, ShapeResolver, SurrogateResolver, ValueCodec,
};
use crate::session::Slot;
use crate::surrogate::{Surrogate, SurrogateError};

/// A built codec, bound to exactly one runtime type. Immutable once
/// published; every caller of [`Engine::codec_for`] for that type receives
/// the same unit.
pub struct CodecUnit {
    ty: TypeRef,
    resolver: &'static str,
    codec: Box<dyn ValueCodec>,
}

impl CodecUnit {
    /// Type the codec is bound to.
    #[must_use]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Name of the resolver that built it.
    #[must_use]
    pub fn resolver(&self) -> &'static str {
        self.resolver
    }

    pub(crate) fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        self.codec.write(enc, value)
    }

    pub(crate) fn read(&self, dec: &mut Decoder<'_>, slot: Slot) -> Result<Value, WireError> {
        self.codec.read(dec, slot)
    }
}

impl fmt::Debug for CodecUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecUnit")
            .field("ty", self.ty.name())
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

/// Encodes and decodes object graphs over one type registry.
///
/// An engine is shared freely across threads. Each call runs on the
/// caller's thread with its own session; only the codec registry is shared,
/// and reads of it never block.
pub struct Engine {
    types: Arc<TypeRegistry>,
    config: WireConfig,
    resolvers: Vec<Box<dyn ShapeResolver>>,
    codecs: SnapshotMap<TypeName, Arc<CodecUnit>>,
}

impl Engine {
    /// Starts configuring an engine over `types`.
    #[must_use]
    pub fn builder(types: Arc<TypeRegistry>) -> EngineBuilder {
        EngineBuilder::new(types)
    }

    /// Engine with the given reference mode and surrogates, defaults
    /// otherwise.
    pub fn configure(
        types: Arc<TypeRegistry>,
        preserve_references: bool,
        surrogates: impl IntoIterator<Item = Surrogate>,
    ) -> Self {
        surrogates
            .into_iter()
            .fold(
                Self::builder(types).preserve_references(preserve_references),
                EngineBuilder::surrogate,
            )
            .build()
    }

    /// Type registry the engine encodes against.
    #[must_use]
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Configuration in force.
    #[must_use]
    pub fn config(&self) -> &WireConfig {
        &self.config
    }

    /// Number of codec units built so far.
    #[must_use]
    pub fn cached_codecs(&self) -> usize {
        self.codecs.len()
    }

    /// Encodes a graph. The root is framed against `object`, so it always
    /// carries a manifest.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, WireError> {
        let mut enc = Encoder::new(self);
        enc.write_value(value, self.types.object())?;
        let bytes = enc.finish();
        debug!(bytes = bytes.len(), "encoded graph");
        Ok(bytes)
    }

    /// Decodes a graph whose root must be an instance of `expected`.
    pub fn decode(&self, bytes: &[u8], expected: &str) -> Result<Value, WireError> {
        let expected = self.types.resolve(expected)?;
        self.decode_as(bytes, &expected)
    }

    /// [`decode`](Self::decode) with an already resolved type.
    pub fn decode_as(&self, bytes: &[u8], expected: &TypeInfo) -> Result<Value, WireError> {
        let mut dec = Decoder::new(self, bytes);
        let value = dec.read_value(self.types.object())?;
        let trailing = dec.remaining();
        if trailing > 0 {
            return Err(WireError::TrailingBytes(trailing));
        }
        match self.types.runtime_type(&value) {
            None if expected.is_value_type() => {
                return Err(WireError::NullNotAllowed(expected.name().clone()));
            }
            Some(runtime) if !self.types.is_assignable(&runtime, expected) => {
                return Err(WireError::TypeMismatch {
                    expected: expected.name().clone(),
                    found: runtime.name().clone(),
                });
            }
            _ => {}
        }
        debug!(bytes = bytes.len(), expected = %expected.name(), "decoded graph");
        Ok(value)
    }

    /// Codec unit for a concrete type, built on first use.
    ///
    /// The first resolver claiming the type builds it. If that resolver
    /// cannot construct the type on read the whole resolution fails; later
    /// resolvers are not tried. Racing first uses may each build a
    /// candidate, but only the first published one is retained and returned
    /// to everyone.
    pub fn codec_for(&self, ty: &TypeRef) -> Result<Arc<CodecUnit>, WireError> {
        if let Some(unit) = self.codecs.get(ty.name()) {
            return Ok(unit);
        }
        if ty.is_abstract() {
            return Err(WireError::unsupported(ty.name(), "abstract types have no instances"));
        }
        let resolver = self
            .resolvers
            .iter()
            .find(|r| r.can_write(ty, &self.types))
            .ok_or_else(|| WireError::unsupported(ty.name(), "no resolver claims this type"))?;
        if !resolver.can_read(ty, &self.types) {
            let err = WireError::unsupported(
                ty.name(),
                format!("claimed by {} but cannot be constructed on read", resolver.name()),
            );
            warn!(ty = %ty.name(), resolver = resolver.name(), error = %err, "codec build failed");
            return Err(err);
        }
        let codec = resolver.build(ty, &self.types).inspect_err(|err| {
            warn!(ty = %ty.name(), resolver = resolver.name(), error = %err, "codec build failed");
        })?;
        let unit = Arc::new(CodecUnit {
            ty: Arc::clone(ty),
            resolver: resolver.name(),
            codec,
        });
        match self.codecs.publish(ty.name().clone(), unit) {
            Publish::Inserted(unit) => {
                debug!(ty = %ty.name(), resolver = unit.resolver(), "built codec");
                Ok(unit)
            }
            Publish::Existing(unit) => {
                trace!(ty = %ty.name(), "codec already published, discarding candidate");
                Ok(unit)
            }
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field(
                "resolvers",
                &self.resolvers.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field("cached_codecs", &self.codecs.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    types: Arc<TypeRegistry>,
    config: WireConfig,
    exact: Vec<Surrogate>,
    predicates: Vec<Surrogate>,
    resolvers: Vec<Box<dyn ShapeResolver>>,
}

impl EngineBuilder {
    fn new(types: Arc<TypeRegistry>) -> Self {
        Self {
            types,
            config: WireConfig::default(),
            exact: Vec::new(),
            predicates: Vec::new(),
            resolvers: Vec::new(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: WireConfig) -> Self {
        self.config = config;
        self
    }

    /// Tracks object identity so shared and cyclic references round-trip.
    pub fn preserve_references(mut self, on: bool) -> Self {
        self.config.preserve_references = on;
        self
    }

    /// Adds a surrogate. Within each class (exact, predicate) the first one
    /// added wins.
    pub fn surrogate(mut self, surrogate: Surrogate) -> Self {
        if surrogate.is_exact() {
            self.exact.push(surrogate);
        } else {
            self.predicates.push(surrogate);
        }
        self
    }

    /// Adds a predicate surrogate.
    pub fn register_surrogate<P, T, F>(
        self,
        predicate: P,
        carrier: impl Into<TypeName>,
        to: T,
        from: F,
    ) -> Self
    where
        P: Fn(&TypeInfo) -> bool + Send + Sync + 'static,
        T: Fn(&Value, &TypeRegistry) -> Result<Value, SurrogateError> + Send + Sync + 'static,
        F: Fn(&Value, &TypeRegistry) -> Result<Value, SurrogateError> + Send + Sync + 'static,
    {
        self.surrogate(Surrogate::matching(predicate, carrier, to, from))
    }

    /// Adds a custom resolver, consulted after the built-in structural
    /// resolvers and before the generic fallbacks (duck-typed collections,
    /// records).
    pub fn resolver(mut self, resolver: impl ShapeResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Finishes the engine.
    #[must_use]
    pub fn build(self) -> Engine {
        let mut resolvers: Vec<Box<dyn ShapeResolver>> = Vec::new();
        if !self.exact.is_empty() {
            resolvers.push(Box::new(SurrogateResolver::exact(self.exact)));
        }
        resolvers.push(Box::new(PrimitiveResolver));
        resolvers.push(Box::new(ArrayResolver));
        resolvers.push(Box::new(DictionaryResolver));
        resolvers.push(Box::new(SetResolver));
        resolvers.push(Box::new(LinkedListResolver));
        resolvers.push(Box::new(ImmutableResolver));
        resolvers.push(Box::new(PersistentResolver));
        resolvers.push(Box::new(ExceptionResolver));
        resolvers.push(Box::new(MemberResolver));
        resolvers.push(Box::new(DelegateResolver));
        resolvers.extend(self.resolvers);
        resolvers.push(Box::new(EnumerableResolver));
        resolvers.push(Box::new(RecordResolver));
        if !self.predicates.is_empty() {
            resolvers.push(Box::new(SurrogateResolver::predicate(self.predicates)));
        }
        debug!(
            resolvers = resolvers.len(),
            preserve_references = self.config.preserve_references,
            "engine built"
        );
        Engine {
            types: self.types,
            config: self.config,
            resolvers,
            codecs: SnapshotMap::new(),
        }
    }
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("config", &self.config)
            .field("exact", &self.exact)
            .field("predicates", &self.predicates)
            .finish_non_exhaustive()
    }
}
