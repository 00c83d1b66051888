// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `Set<T>`: array framing, rebuilt by adding each element.

use rustc_hash::FxHashSet;
use tangle_model::{ObjRef, ObjectData, TypeKind, TypeRef, TypeRegistry, Value};

use super::{element, receiver, shape_error, write_items, ShapeResolver, ValueCodec};
use crate::error::WireError;
use crate::framing::{Decoder, Element, Encoder};
use crate::session::Slot;

pub(crate) struct SetResolver;

impl ShapeResolver for SetResolver {
    fn name(&self) -> &'static str {
        "set"
    }

    fn can_write(&self, ty: &TypeRef, _types: &TypeRegistry) -> bool {
        matches!(ty.kind(), TypeKind::Set(_))
    }

    fn build(&self, ty: &TypeRef, types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError> {
        let TypeKind::Set(elem) = ty.kind() else {
            return Err(WireError::unsupported(ty.name(), "not a set"));
        };
        Ok(Box::new(SetCodec {
            ty: ty.clone(),
            elem: element(types, elem)?,
        }))
    }
}

struct SetCodec {
    ty: TypeRef,
    elem: Element,
}

impl ValueCodec for SetCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let obj = receiver(value, &self.ty)?;
        let items: Vec<Value> = match &*obj.data() {
            ObjectData::Set(items) => items.iter().cloned().collect(),
            _ => return Err(shape_error(obj, "set")),
        };
        write_items(enc, &self.elem, &items)
    }

    fn read(&self, dec: &mut Decoder<'_>, slot: Slot) -> Result<Value, WireError> {
        let count = dec.read_count()?;
        let mut set = FxHashSet::default();
        set.reserve(dec.capacity(count));
        let obj = ObjRef::new(self.ty.clone(), ObjectData::Set(set));
        dec.bind(slot, &obj);
        for _ in 0..count {
            let item = self.elem.read(dec)?;
            let mut data = obj.data_mut();
            let ObjectData::Set(set) = &mut *data else {
                return Err(shape_error(&obj, "set"));
            };
            set.insert(item);
        }
        Ok(Value::Object(obj))
    }
}
