// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Plain records: every field in flattened declaration order, no count.
//!
//! The record is allocated with default field values and bound before its
//! fields are read, so a field may refer back to the record itself.

use tangle_model::{ObjRef, ObjectData, Primitive, TypeKind, TypeRef, TypeRegistry, Value};

use super::{element, receiver, shape_error, ShapeResolver, ValueCodec};
use crate::error::WireError;
use crate::framing::{Decoder, Element, Encoder};
use crate::session::Slot;

pub(crate) struct RecordResolver;

impl ShapeResolver for RecordResolver {
    fn name(&self) -> &'static str {
        "record"
    }

    fn can_write(&self, ty: &TypeRef, _types: &TypeRegistry) -> bool {
        ty.kind() == &TypeKind::Record && ty.is_constructible()
    }

    fn build(&self, ty: &TypeRef, types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError> {
        let fields = ty
            .fields()
            .iter()
            .map(|field| element(types, field.ty()))
            .collect::<Result<Vec<_>, _>>()?;
        let defaults = ty
            .fields()
            .iter()
            .map(|field| Primitive::from_name(field.ty().as_str()))
            .collect();
        Ok(Box::new(RecordCodec {
            ty: ty.clone(),
            fields,
            defaults,
        }))
    }
}

struct RecordCodec {
    ty: TypeRef,
    fields: Vec<Element>,
    // `Value` is not `Sync`, so defaults are kept as their primitive kinds.
    defaults: Vec<Option<Primitive>>,
}

impl RecordCodec {
    fn blank(&self) -> Vec<Value> {
        self.defaults
            .iter()
            .map(|p| p.map_or(Value::Null, Primitive::default_value))
            .collect()
    }
}

impl ValueCodec for RecordCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let obj = receiver(value, &self.ty)?;
        let values = match &*obj.data() {
            ObjectData::Fields(values) if values.len() == self.fields.len() => values.clone(),
            _ => return Err(shape_error(obj, "record fields")),
        };
        self.fields
            .iter()
            .zip(&values)
            .try_for_each(|(field, value)| field.write(enc, value))
    }

    fn read(&self, dec: &mut Decoder<'_>, slot: Slot) -> Result<Value, WireError> {
        let obj = ObjRef::new(self.ty.clone(), ObjectData::Fields(self.blank()));
        dec.bind(slot, &obj);
        for (index, field) in self.fields.iter().enumerate() {
            let value = field.read(dec)?;
            let mut data = obj.data_mut();
            let ObjectData::Fields(values) = &mut *data else {
                return Err(shape_error(&obj, "record fields"));
            };
            values[index] = value;
        }
        Ok(Value::Object(obj))
    }
}
