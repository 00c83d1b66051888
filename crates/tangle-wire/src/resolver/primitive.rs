// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scalars and strings: fixed-width LE payloads, strings length-prefixed.

use std::rc::Rc;

use tangle_model::{Primitive, TypeRef, TypeRegistry, Value};

use super::{ShapeResolver, ValueCodec};
use crate::error::WireError;
use crate::framing::{Decoder, Encoder};
use crate::session::Slot;

pub(crate) struct PrimitiveResolver;

impl ShapeResolver for PrimitiveResolver {
    fn name(&self) -> &'static str {
        "primitive"
    }

    fn can_write(&self, ty: &TypeRef, _types: &TypeRegistry) -> bool {
        ty.primitive().is_some()
    }

    fn build(&self, ty: &TypeRef, _types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError> {
        let primitive = ty
            .primitive()
            .ok_or_else(|| WireError::unsupported(ty.name(), "not a primitive"))?;
        Ok(Box::new(PrimitiveCodec(primitive)))
    }
}

struct PrimitiveCodec(Primitive);

impl ValueCodec for PrimitiveCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let w = enc.writer();
        match (self.0, value) {
            (Primitive::Bool, Value::Bool(v)) => w.write_bool(*v),
            (Primitive::I8, Value::I8(v)) => w.write_i8(*v),
            (Primitive::I16, Value::I16(v)) => w.write_i16_le(*v),
            (Primitive::I32, Value::I32(v)) => w.write_i32_le(*v),
            (Primitive::I64, Value::I64(v)) => w.write_i64_le(*v),
            (Primitive::U8, Value::U8(v)) => w.write_u8(*v),
            (Primitive::U16, Value::U16(v)) => w.write_u16_le(*v),
            (Primitive::U32, Value::U32(v)) => w.write_u32_le(*v),
            (Primitive::U64, Value::U64(v)) => w.write_u64_le(*v),
            (Primitive::F32, Value::F32(v)) => w.write_f32_le(*v),
            (Primitive::F64, Value::F64(v)) => w.write_f64_le(*v),
            (Primitive::Char, Value::Char(v)) => w.write_char(*v),
            (Primitive::String, Value::Str(v)) => return enc.write_str(v),
            (expected, other) => {
                return Err(WireError::TypeMismatch {
                    expected: expected.name().into(),
                    found: other.primitive().map_or("object", Primitive::name).into(),
                })
            }
        }
        Ok(())
    }

    fn read(&self, dec: &mut Decoder<'_>, _slot: Slot) -> Result<Value, WireError> {
        Ok(match self.0 {
            Primitive::Bool => Value::Bool(dec.reader().read_bool()?),
            Primitive::I8 => Value::I8(dec.reader().read_i8()?),
            Primitive::I16 => Value::I16(dec.reader().read_i16_le()?),
            Primitive::I32 => Value::I32(dec.reader().read_i32_le()?),
            Primitive::I64 => Value::I64(dec.reader().read_i64_le()?),
            Primitive::U8 => Value::U8(dec.reader().read_u8()?),
            Primitive::U16 => Value::U16(dec.reader().read_u16_le()?),
            Primitive::U32 => Value::U32(dec.reader().read_u32_le()?),
            Primitive::U64 => Value::U64(dec.reader().read_u64_le()?),
            Primitive::F32 => Value::F32(dec.reader().read_f32_le()?),
            Primitive::F64 => Value::F64(dec.reader().read_f64_le()?),
            Primitive::Char => Value::Char(dec.reader().read_char()?),
            Primitive::String => Value::Str(Rc::from(dec.read_str()?)),
        })
    }
}
