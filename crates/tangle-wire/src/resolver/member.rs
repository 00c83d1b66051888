// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reflection values as symbolic descriptors.
//!
//! Member handles are `[owner][name][param count][param]*`, the member kind
//! being implied by the runtime type. `Type` handles are `[name]`. Both are
//! resolved against the registry on read.

use tangle_model::{
    MemberKind, MemberRef, ObjRef, ObjectData, TypeKind, TypeName, TypeRef, TypeRegistry, Value,
};

use super::{receiver, shape_error, ShapeResolver, ValueCodec};
use crate::error::WireError;
use crate::framing::{Decoder, Encoder};
use crate::session::Slot;

pub(crate) struct MemberResolver;

impl ShapeResolver for MemberResolver {
    fn name(&self) -> &'static str {
        "member"
    }

    fn can_write(&self, ty: &TypeRef, _types: &TypeRegistry) -> bool {
        matches!(ty.kind(), TypeKind::Member(_) | TypeKind::TypeHandle)
    }

    fn build(&self, ty: &TypeRef, _types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError> {
        match ty.kind() {
            TypeKind::Member(kind) => Ok(Box::new(MemberCodec {
                ty: ty.clone(),
                kind: *kind,
            })),
            TypeKind::TypeHandle => Ok(Box::new(TypeHandleCodec { ty: ty.clone() })),
            _ => Err(WireError::unsupported(ty.name(), "not a reflection value")),
        }
    }
}

pub(crate) fn write_descriptor(enc: &mut Encoder<'_>, member: &MemberRef) -> Result<(), WireError> {
    enc.write_str(member.owner().as_str())?;
    enc.write_str(member.name())?;
    enc.write_count(member.params().len())?;
    member
        .params()
        .iter()
        .try_for_each(|param| enc.write_str(param.as_str()))
}

pub(crate) fn read_descriptor(
    dec: &mut Decoder<'_>,
    kind: MemberKind,
) -> Result<MemberRef, WireError> {
    let owner = TypeName::from(dec.read_str()?);
    let name = dec.read_str()?;
    let count = dec.read_count()?;
    let mut params = Vec::with_capacity(dec.capacity(count));
    for _ in 0..count {
        params.push(TypeName::from(dec.read_str()?));
    }
    Ok(MemberRef::new(owner, kind, name, params))
}

struct MemberCodec {
    ty: TypeRef,
    kind: MemberKind,
}

impl ValueCodec for MemberCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let obj = receiver(value, &self.ty)?;
        let member = match &*obj.data() {
            ObjectData::Member(member) => member.clone(),
            _ => return Err(shape_error(obj, "member")),
        };
        write_descriptor(enc, &member)
    }

    fn read(&self, dec: &mut Decoder<'_>, _slot: Slot) -> Result<Value, WireError> {
        let member = read_descriptor(dec, self.kind)?;
        dec.types().find_member(&member)?;
        Ok(Value::Object(ObjRef::new(
            self.ty.clone(),
            ObjectData::Member(member),
        )))
    }
}

struct TypeHandleCodec {
    ty: TypeRef,
}

impl ValueCodec for TypeHandleCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let obj = receiver(value, &self.ty)?;
        let name = match &*obj.data() {
            ObjectData::TypeHandle(name) => name.clone(),
            _ => return Err(shape_error(obj, "type handle")),
        };
        enc.write_str(name.as_str())
    }

    fn read(&self, dec: &mut Decoder<'_>, _slot: Slot) -> Result<Value, WireError> {
        let name = dec.types().resolve(dec.read_str()?)?.name().clone();
        Ok(Value::Object(ObjRef::new(
            self.ty.clone(),
            ObjectData::TypeHandle(name),
        )))
    }
}
