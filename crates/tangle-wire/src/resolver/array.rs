// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `Array<T>`: `[count][element]*`, one element codec for every item.

use tangle_model::{ObjRef, ObjectData, TypeKind, TypeRef, TypeRegistry, Value};

use super::{element, receiver, shape_error, write_items, ShapeResolver, ValueCodec};
use crate::error::WireError;
use crate::framing::{Decoder, Element, Encoder};
use crate::session::Slot;

pub(crate) struct ArrayResolver;

impl ShapeResolver for ArrayResolver {
    fn name(&self) -> &'static str {
        "array"
    }

    fn can_write(&self, ty: &TypeRef, _types: &TypeRegistry) -> bool {
        matches!(ty.kind(), TypeKind::Array(_))
    }

    fn build(&self, ty: &TypeRef, types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError> {
        let TypeKind::Array(elem) = ty.kind() else {
            return Err(WireError::unsupported(ty.name(), "not an array"));
        };
        Ok(Box::new(ArrayCodec {
            ty: ty.clone(),
            elem: element(types, elem)?,
        }))
    }
}

struct ArrayCodec {
    ty: TypeRef,
    elem: Element,
}

impl ValueCodec for ArrayCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let obj = receiver(value, &self.ty)?;
        let items = match &*obj.data() {
            ObjectData::Items(items) => items.clone(),
            _ => return Err(shape_error(obj, "items")),
        };
        write_items(enc, &self.elem, &items)
    }

    fn read(&self, dec: &mut Decoder<'_>, slot: Slot) -> Result<Value, WireError> {
        let count = dec.read_count()?;
        let obj = ObjRef::new(
            self.ty.clone(),
            ObjectData::Items(Vec::with_capacity(dec.capacity(count))),
        );
        dec.bind(slot, &obj);
        for _ in 0..count {
            let item = self.elem.read(dec)?;
            obj.with_items(|items| items.push(item))?;
        }
        Ok(Value::Object(obj))
    }
}
