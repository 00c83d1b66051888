// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Immutable collection families.
//!
//! Written in enumeration order. On read the items are decoded into a
//! temporary buffer and handed to the family's bulk constructor; nothing is
//! mutated in place, so such a collection cannot contain itself.

use tangle_model::{ImmutableFamily, ObjRef, TypeKind, TypeRef, TypeRegistry, Value};

use super::{
    element, read_entries, read_items, receiver, write_entries, write_items, ShapeResolver,
    ValueCodec,
};
use crate::error::WireError;
use crate::framing::{Decoder, Element, Encoder};
use crate::session::Slot;

pub(crate) struct ImmutableResolver;

impl ShapeResolver for ImmutableResolver {
    fn name(&self) -> &'static str {
        "immutable"
    }

    fn can_write(&self, ty: &TypeRef, _types: &TypeRegistry) -> bool {
        matches!(ty.kind(), TypeKind::Immutable(..))
    }

    fn build(&self, ty: &TypeRef, types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError> {
        let TypeKind::Immutable(family, args) = ty.kind() else {
            return Err(WireError::unsupported(ty.name(), "not an immutable collection"));
        };
        let shape = match (family.is_keyed(), args.as_slice()) {
            (false, [elem]) => Shape::Seq(element(types, elem)?),
            (true, [key, value]) => Shape::Keyed(element(types, key)?, element(types, value)?),
            _ => return Err(WireError::unsupported(ty.name(), "wrong number of type arguments")),
        };
        Ok(Box::new(ImmutableCodec {
            ty: ty.clone(),
            family: *family,
            shape,
        }))
    }
}

enum Shape {
    Seq(Element),
    Keyed(Element, Element),
}

struct ImmutableCodec {
    ty: TypeRef,
    family: ImmutableFamily,
    shape: Shape,
}

impl ValueCodec for ImmutableCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let obj = receiver(value, &self.ty)?;
        match &self.shape {
            Shape::Seq(elem) => write_items(enc, elem, &obj.elements()),
            Shape::Keyed(key, value) => write_entries(enc, key, value, &obj.entries()),
        }
    }

    fn read(&self, dec: &mut Decoder<'_>, _slot: Slot) -> Result<Value, WireError> {
        let data = match &self.shape {
            Shape::Seq(elem) => {
                let mut items = read_items(dec, elem)?;
                // Stacks enumerate top first; rebuild from the bottom.
                if self.family.reverses_on_build() {
                    items.reverse();
                }
                self.family.create_range(items)?
            }
            Shape::Keyed(key, value) => self.family.create_map(read_entries(dec, key, value)?)?,
        };
        Ok(Value::Object(ObjRef::new(self.ty.clone(), data)))
    }
}
