// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shape resolvers: structural matchers that build a codec for a type.
//!
//! The engine asks each resolver in priority order whether it claims a
//! type. The first claim wins; if that resolver cannot also construct the
//! type on read, resolution fails instead of trying the next one.

mod array;
mod delegate;
mod dictionary;
mod enumerable;
mod exception;
mod immutable;
mod linked_list;
mod member;
mod persistent;
mod primitive;
mod record;
mod set;
mod surrogate;

use tangle_model::{ModelError, ObjRef, TypeName, TypeRef, TypeRegistry, Value};

pub(crate) use array::ArrayResolver;
pub(crate) use delegate::DelegateResolver;
pub(crate) use dictionary::DictionaryResolver;
pub(crate) use enumerable::EnumerableResolver;
pub(crate) use exception::ExceptionResolver;
pub(crate) use immutable::ImmutableResolver;
pub(crate) use linked_list::LinkedListResolver;
pub(crate) use member::MemberResolver;
pub(crate) use persistent::PersistentResolver;
pub(crate) use primitive::PrimitiveResolver;
pub(crate) use record::RecordResolver;
pub(crate) use set::SetResolver;
pub(crate) use surrogate::SurrogateResolver;

use crate::error::WireError;
use crate::framing::{Decoder, Element, Encoder};
use crate::session::Slot;

/// Writes and reads the payload of one type. Framing (token, identity,
/// manifest) is already handled when these run.
pub trait ValueCodec: Send + Sync {
    /// Writes the payload of `value`, whose runtime type is the codec's type.
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError>;

    /// Reads a payload. Codecs that allocate an object must
    /// [`bind`](Decoder::bind) it to `slot` before reading nested values.
    fn read(&self, dec: &mut Decoder<'_>, slot: Slot) -> Result<Value, WireError>;
}

/// Structural matcher producing [`ValueCodec`]s.
pub trait ShapeResolver: Send + Sync {
    /// Short name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Whether values of `ty` can be written by this resolver.
    fn can_write(&self, ty: &TypeRef, types: &TypeRegistry) -> bool;

    /// Whether values of `ty` can be constructed on read. Defaults to
    /// [`can_write`](Self::can_write).
    fn can_read(&self, ty: &TypeRef, types: &TypeRegistry) -> bool {
        self.can_write(ty, types)
    }

    /// Builds the codec. Only called for types this resolver claims.
    fn build(&self, ty: &TypeRef, types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError>;
}

pub(crate) fn element(types: &TypeRegistry, name: &TypeName) -> Result<Element, WireError> {
    Ok(Element::new(types.resolve(name.as_str())?))
}

pub(crate) fn receiver<'v>(value: &'v Value, ty: &TypeRef) -> Result<&'v ObjRef, WireError> {
    value.as_object().ok_or_else(|| {
        WireError::from(ModelError::NullReceiver(ty.name().to_string()))
    })
}

pub(crate) fn shape_error(obj: &ObjRef, expected: &'static str) -> WireError {
    WireError::from(ModelError::ShapeMismatch {
        ty: obj.ty().name().clone(),
        expected,
    })
}

pub(crate) fn write_items(
    enc: &mut Encoder<'_>,
    elem: &Element,
    items: &[Value],
) -> Result<(), WireError> {
    enc.write_count(items.len())?;
    items.iter().try_for_each(|item| elem.write(enc, item))
}

pub(crate) fn read_items(dec: &mut Decoder<'_>, elem: &Element) -> Result<Vec<Value>, WireError> {
    let count = dec.read_count()?;
    let mut items = Vec::with_capacity(dec.capacity(count));
    for _ in 0..count {
        items.push(elem.read(dec)?);
    }
    Ok(items)
}

pub(crate) fn write_entries(
    enc: &mut Encoder<'_>,
    key: &Element,
    value: &Element,
    entries: &[(Value, Value)],
) -> Result<(), WireError> {
    enc.write_count(entries.len())?;
    for (k, v) in entries {
        key.write(enc, k)?;
        value.write(enc, v)?;
    }
    Ok(())
}

pub(crate) fn read_entries(
    dec: &mut Decoder<'_>,
    key: &Element,
    value: &Element,
) -> Result<Vec<(Value, Value)>, WireError> {
    let count = dec.read_count()?;
    let mut entries = Vec::with_capacity(dec.capacity(count));
    for _ in 0..count {
        let k = key.read(dec)?;
        let v = value.read(dec)?;
        entries.push((k, v));
    }
    Ok(entries)
}

/// Fails when a collection's `count` accessor disagrees with what it
/// enumerated.
pub(crate) fn check_count(
    ty: &TypeRef,
    reported: &Value,
    enumerated: usize,
) -> Result<(), WireError> {
    let reported = reported.as_count()?;
    if reported == enumerated {
        Ok(())
    } else {
        Err(WireError::CollectionCount {
            ty: ty.name().clone(),
            reported,
            enumerated,
        })
    }
}
