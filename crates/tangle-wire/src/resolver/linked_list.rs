// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `LinkedList<T>`: array framing, appended in order on read.

use std::collections::LinkedList;

use tangle_model::{ObjRef, ObjectData, TypeKind, TypeRef, TypeRegistry, Value};

use super::{element, receiver, shape_error, write_items, ShapeResolver, ValueCodec};
use crate::error::WireError;
use crate::framing::{Decoder, Element, Encoder};
use crate::session::Slot;

pub(crate) struct LinkedListResolver;

impl ShapeResolver for LinkedListResolver {
    fn name(&self) -> &'static str {
        "linked-list"
    }

    fn can_write(&self, ty: &TypeRef, _types: &TypeRegistry) -> bool {
        matches!(ty.kind(), TypeKind::LinkedList(_))
    }

    fn build(&self, ty: &TypeRef, types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError> {
        let TypeKind::LinkedList(elem) = ty.kind() else {
            return Err(WireError::unsupported(ty.name(), "not a linked list"));
        };
        Ok(Box::new(LinkedListCodec {
            ty: ty.clone(),
            elem: element(types, elem)?,
        }))
    }
}

struct LinkedListCodec {
    ty: TypeRef,
    elem: Element,
}

impl ValueCodec for LinkedListCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let obj = receiver(value, &self.ty)?;
        let items: Vec<Value> = match &*obj.data() {
            ObjectData::Linked(items) => items.iter().cloned().collect(),
            _ => return Err(shape_error(obj, "linked list")),
        };
        write_items(enc, &self.elem, &items)
    }

    fn read(&self, dec: &mut Decoder<'_>, slot: Slot) -> Result<Value, WireError> {
        let count = dec.read_count()?;
        let obj = ObjRef::new(self.ty.clone(), ObjectData::Linked(LinkedList::new()));
        dec.bind(slot, &obj);
        for _ in 0..count {
            let item = self.elem.read(dec)?;
            let mut data = obj.data_mut();
            let ObjectData::Linked(items) = &mut *data else {
                return Err(shape_error(&obj, "linked list"));
            };
            items.push_back(item);
        }
        Ok(Value::Object(obj))
    }
}
