// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persistent (cons list, sorted set, sorted map) families, rebuilt through
//! their `ofSeq` entry points.

use tangle_model::{ObjRef, PersistentFamily, TypeKind, TypeRef, TypeRegistry, Value};

use super::{
    element, read_entries, read_items, receiver, write_entries, write_items, ShapeResolver,
    ValueCodec,
};
use crate::error::WireError;
use crate::framing::{Decoder, Element, Encoder};
use crate::session::Slot;

pub(crate) struct PersistentResolver;

impl ShapeResolver for PersistentResolver {
    fn name(&self) -> &'static str {
        "persistent"
    }

    fn can_write(&self, ty: &TypeRef, _types: &TypeRegistry) -> bool {
        matches!(ty.kind(), TypeKind::Persistent(..))
    }

    fn build(&self, ty: &TypeRef, types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError> {
        let TypeKind::Persistent(family, args) = ty.kind() else {
            return Err(WireError::unsupported(ty.name(), "not a persistent collection"));
        };
        let codec = match (family, args.as_slice()) {
            (PersistentFamily::Map, [key, value]) => PersistentCodec::Map {
                ty: ty.clone(),
                key: element(types, key)?,
                value: element(types, value)?,
            },
            (PersistentFamily::List | PersistentFamily::Set, [elem]) => PersistentCodec::Seq {
                ty: ty.clone(),
                family: *family,
                elem: element(types, elem)?,
            },
            _ => return Err(WireError::unsupported(ty.name(), "wrong number of type arguments")),
        };
        Ok(Box::new(codec))
    }
}

enum PersistentCodec {
    Seq {
        ty: TypeRef,
        family: PersistentFamily,
        elem: Element,
    },
    Map {
        ty: TypeRef,
        key: Element,
        value: Element,
    },
}

impl ValueCodec for PersistentCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        match self {
            Self::Seq { ty, elem, .. } => write_items(enc, elem, &receiver(value, ty)?.elements()),
            Self::Map { ty, key, value: val } => {
                write_entries(enc, key, val, &receiver(value, ty)?.entries())
            }
        }
    }

    fn read(&self, dec: &mut Decoder<'_>, _slot: Slot) -> Result<Value, WireError> {
        let (ty, data) = match self {
            Self::Seq { ty, family, elem } => (ty, family.of_seq(read_items(dec, elem)?)?),
            Self::Map { ty, key, value } => {
                (ty, PersistentFamily::Map.of_map(read_entries(dec, key, value)?)?)
            }
        };
        Ok(Value::Object(ObjRef::new(ty.clone(), data)))
    }
}
