// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Framing of embedded values: tokens, manifests and identity.
//!
//! Every value whose declared type is not a value-type primitive starts with
//! a one-byte token:
//!
//! | Byte   | Meaning                      | Followed by                        |
//! |--------|------------------------------|------------------------------------|
//! | `0x00` | null                         |                                    |
//! | `0x01` | inline, declared type        | payload                            |
//! | `0x02` | inline, named manifest       | `[name]` payload                   |
//! | `0x03` | inline, cached manifest      | `[type index]` payload             |
//! | `0x05` | definition, declared type    | `[object index]` payload           |
//! | `0x06` | definition, named manifest   | `[object index][name]` payload     |
//! | `0x07` | definition, cached manifest  | `[object index][type index]` payload |
//! | `0x08` | back-reference               | `[object index]`                   |
//!
//! A manifest is written unless the declared type is sealed and equal to the
//! runtime type. Indices are `u32` LE, names are length-prefixed UTF-8.

use std::sync::{Arc, OnceLock, Weak};

use tangle_model::{ObjRef, TypeInfo, TypeRef, TypeRegistry, Value};

use crate::codec::{Reader, Writer};
use crate::config::WireConfig;
use crate::engine::{CodecUnit, Engine};
use crate::error::WireError;
use crate::session::{Identity, ReadSession, Slot, TypeSlot, WriteSession};

const NULL: u8 = 0x00;
const DECLARED: u8 = 0x01;
const NAMED: u8 = 0x02;
const CACHED: u8 = 0x03;
const DEFINE: u8 = 0x04;
const BACK_REF: u8 = 0x08;

#[derive(Debug, Clone, Copy)]
enum Manifest {
    Declared,
    Named,
    Cached(u32),
}

impl Manifest {
    const fn mode(self) -> u8 {
        match self {
            Self::Declared => DECLARED,
            Self::Named => NAMED,
            Self::Cached(_) => CACHED,
        }
    }
}

fn mismatch(declared: &TypeInfo, runtime: &TypeInfo) -> WireError {
    WireError::TypeMismatch {
        expected: declared.name().clone(),
        found: runtime.name().clone(),
    }
}

/// Declared element type of a collection or field, with its inline codec
/// memoized on first use.
///
/// The codec is only consulted when the runtime type equals the declared
/// type; polymorphic values go through the engine. Resolution is lazy so a
/// type may contain elements of itself.
#[derive(Debug)]
pub struct Element {
    ty: TypeRef,
    unit: OnceLock<Weak<CodecUnit>>,
}

impl Element {
    /// Element slot of the given declared type.
    #[must_use]
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            unit: OnceLock::new(),
        }
    }

    /// Declared type of the slot.
    #[must_use]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Writes one value into this slot.
    pub fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        enc.write_framed(value, &self.ty, Some(self))
    }

    /// Reads one value from this slot.
    pub fn read(&self, dec: &mut Decoder<'_>) -> Result<Value, WireError> {
        dec.read_framed(&self.ty, Some(self))
    }

    fn unit(&self, engine: &Engine) -> Result<Arc<CodecUnit>, WireError> {
        // Weak: the engine's registry owns the unit, and a recursive type's
        // codec would otherwise keep itself alive.
        if let Some(unit) = self.unit.get().and_then(Weak::upgrade) {
            return Ok(unit);
        }
        let unit = engine.codec_for(&self.ty)?;
        // A racing thread may have set it first; both hold the same unit.
        let _ = self.unit.set(Arc::downgrade(&unit));
        Ok(unit)
    }
}

/// Write side of one `encode` call.
#[derive(Debug)]
pub struct Encoder<'e> {
    engine: &'e Engine,
    out: Writer,
    session: WriteSession,
    depth: usize,
}

impl<'e> Encoder<'e> {
    pub(crate) fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            out: Writer::with_capacity(256),
            session: WriteSession::default(),
            depth: 0,
        }
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.out.into_vec()
    }

    /// Engine driving this call.
    #[must_use]
    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    /// Type registry of the engine.
    #[must_use]
    pub fn types(&self) -> &'e TypeRegistry {
        self.engine.types()
    }

    /// Limits in force.
    #[must_use]
    pub fn config(&self) -> &'e WireConfig {
        self.engine.config()
    }

    /// Raw byte sink, for codecs writing fixed-width payloads.
    pub fn writer(&mut self) -> &mut Writer {
        &mut self.out
    }

    /// Writes a length-prefixed string payload (no token).
    pub fn write_str(&mut self, value: &str) -> Result<(), WireError> {
        let max = self.config().max_string_len;
        Ok(self.out.write_string(value, max)?)
    }

    /// Writes a collection count.
    pub fn write_count(&mut self, count: usize) -> Result<(), WireError> {
        Ok(self.out.write_len(count)?)
    }

    /// Writes `value` into a slot declared as `declared`: token, identity,
    /// manifest, then payload.
    pub fn write_value(&mut self, value: &Value, declared: &TypeRef) -> Result<(), WireError> {
        self.write_framed(value, declared, None)
    }

    fn write_framed(
        &mut self,
        value: &Value,
        declared: &TypeRef,
        element: Option<&Element>,
    ) -> Result<(), WireError> {
        let max = self.config().max_depth;
        if self.depth >= max {
            return Err(WireError::DepthLimit(max));
        }
        self.depth += 1;
        let result = self.write_nested(value, declared, element);
        self.depth -= 1;
        result
    }

    fn write_nested(
        &mut self,
        value: &Value,
        declared: &TypeRef,
        element: Option<&Element>,
    ) -> Result<(), WireError> {
        let engine = self.engine;
        let types = engine.types();

        if declared.is_value_type() {
            let Some(runtime) = types.runtime_type(value) else {
                return Err(WireError::NullNotAllowed(declared.name().clone()));
            };
            if runtime.name() != declared.name() {
                return Err(mismatch(declared, &runtime));
            }
            let unit = match element {
                Some(element) => element.unit(engine)?,
                None => engine.codec_for(declared)?,
            };
            return unit.write(self, value);
        }

        let Some(runtime) = types.runtime_type(value) else {
            self.out.write_u8(NULL);
            return Ok(());
        };
        if !types.is_assignable(&runtime, declared) {
            return Err(mismatch(declared, &runtime));
        }

        let object = value.as_object();
        let mut definition = None;
        if let Some(obj) = object {
            if self.config().preserve_references {
                match self.session.identify(obj)? {
                    Identity::Seen(index) => {
                        self.out.write_u8(BACK_REF);
                        self.out.write_u32_le(index);
                        return Ok(());
                    }
                    Identity::New(index) => definition = Some(index),
                }
            }
        }

        let manifest = if declared.is_sealed() && runtime.name() == declared.name() {
            Manifest::Declared
        } else {
            match self.session.manifest(runtime.name())? {
                TypeSlot::Fresh => Manifest::Named,
                TypeSlot::Cached(index) => Manifest::Cached(index),
            }
        };
        let unit = match (manifest, element) {
            (Manifest::Declared, Some(element)) => element.unit(engine)?,
            _ => engine.codec_for(&runtime)?,
        };

        match definition {
            Some(index) => {
                self.out.write_u8(DEFINE | manifest.mode());
                self.out.write_u32_le(index);
            }
            None => self.out.write_u8(manifest.mode()),
        }
        match manifest {
            Manifest::Declared => {}
            Manifest::Named => self.write_str(runtime.name().as_str())?,
            Manifest::Cached(index) => self.out.write_u32_le(index),
        }

        match object {
            Some(obj) if definition.is_none() => self.write_untracked(obj, &unit, value),
            _ => unit.write(self, value),
        }
    }

    fn write_untracked(
        &mut self,
        obj: &ObjRef,
        unit: &CodecUnit,
        value: &Value,
    ) -> Result<(), WireError> {
        self.session.enter(obj)?;
        let result = unit.write(self, value);
        self.session.leave(obj);
        result
    }
}

/// Read side of one `decode` call.
#[derive(Debug)]
pub struct Decoder<'a> {
    engine: &'a Engine,
    input: Reader<'a>,
    session: ReadSession,
    depth: usize,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(engine: &'a Engine, bytes: &'a [u8]) -> Self {
        Self {
            engine,
            input: Reader::new(bytes),
            session: ReadSession::default(),
            depth: 0,
        }
    }

    /// Engine driving this call.
    #[must_use]
    pub fn engine(&self) -> &'a Engine {
        self.engine
    }

    /// Type registry of the engine.
    #[must_use]
    pub fn types(&self) -> &'a TypeRegistry {
        self.engine.types()
    }

    /// Limits in force.
    #[must_use]
    pub fn config(&self) -> &'a WireConfig {
        self.engine.config()
    }

    /// Raw byte source, for codecs reading fixed-width payloads.
    pub fn reader(&mut self) -> &mut Reader<'a> {
        &mut self.input
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.input.remaining()
    }

    /// Reads a length-prefixed string payload (no token).
    pub fn read_str(&mut self) -> Result<&'a str, WireError> {
        let max = self.config().max_string_len;
        Ok(self.input.read_str(max)?)
    }

    /// Reads a collection count, bounded by the configured maximum.
    pub fn read_count(&mut self) -> Result<usize, WireError> {
        let max = self.config().max_collection_len;
        Ok(self.input.read_count(max)?)
    }

    /// Capacity to pre-size a collection of `count` items with. Every item
    /// takes at least one byte, so a forged count cannot outgrow the input.
    #[must_use]
    pub fn capacity(&self, count: usize) -> usize {
        count.min(self.input.remaining())
    }

    /// Publishes a freshly allocated object under its reserved index so that
    /// nested back-references to it resolve.
    pub fn bind(&mut self, slot: Slot, obj: &ObjRef) {
        self.session.bind(slot, Value::Object(obj.clone()));
    }

    /// Reads a value from a slot declared as `declared`.
    pub fn read_value(&mut self, declared: &TypeRef) -> Result<Value, WireError> {
        self.read_framed(declared, None)
    }

    fn read_framed(
        &mut self,
        declared: &TypeRef,
        element: Option<&Element>,
    ) -> Result<Value, WireError> {
        let max = self.config().max_depth;
        if self.depth >= max {
            return Err(WireError::DepthLimit(max));
        }
        self.depth += 1;
        let result = self.read_nested(declared, element);
        self.depth -= 1;
        result
    }

    fn read_nested(
        &mut self,
        declared: &TypeRef,
        element: Option<&Element>,
    ) -> Result<Value, WireError> {
        let engine = self.engine;
        let types = engine.types();

        if declared.is_value_type() {
            let unit = match element {
                Some(element) => element.unit(engine)?,
                None => engine.codec_for(declared)?,
            };
            return unit.read(self, Slot::NONE);
        }

        let token = self.input.read_u8()?;
        let define = match token {
            NULL => return Ok(Value::Null),
            BACK_REF => {
                let index = self.input.read_u32_le()?;
                let value = self.session.resolve(index)?;
                if let Some(runtime) = types.runtime_type(&value) {
                    if !types.is_assignable(&runtime, declared) {
                        return Err(mismatch(declared, &runtime));
                    }
                }
                return Ok(value);
            }
            DECLARED..=CACHED => false,
            0x05..=0x07 => true,
            other => return Err(WireError::InvalidToken(other)),
        };

        let slot = if define {
            let index = self.input.read_u32_le()?;
            self.session.reserve(index)?
        } else {
            Slot::NONE
        };

        let runtime = match token & !DEFINE {
            DECLARED if declared.is_abstract() => return Err(WireError::InvalidToken(token)),
            DECLARED => Arc::clone(declared),
            NAMED => {
                // Resolving a name may publish a new generic instantiation
                // into the shared registry, so the count is capped per stream.
                let max = self.config().max_manifests;
                if self.session.type_count() >= max {
                    return Err(WireError::ManifestLimit(max));
                }
                let name = self.read_str()?;
                let ty = types.resolve(name)?;
                self.session.push_type(Arc::clone(&ty));
                ty
            }
            _ => {
                let index = self.input.read_u32_le()?;
                self.session.cached_type(index)?
            }
        };
        if !types.is_assignable(&runtime, declared) {
            return Err(mismatch(declared, &runtime));
        }
        // Only objects carry identity; strings and boxed scalars never do.
        if define && runtime.primitive().is_some() {
            return Err(WireError::InvalidToken(token));
        }

        let unit = match element {
            Some(element) if runtime.name() == element.ty().name() => element.unit(engine)?,
            _ => engine.codec_for(&runtime)?,
        };
        let value = unit.read(self, slot)?;
        if define {
            self.session.bind(slot, value.clone());
        }
        Ok(value)
    }
}
