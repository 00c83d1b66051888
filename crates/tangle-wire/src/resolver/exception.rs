// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Exceptions: `[message][stack trace][inner]`, rebuilt from those three
//! parts only. Strings are nullable; the inner exception is framed against
//! the `Exception` root so any subtype (or the exception itself) may appear.

use std::rc::Rc;
use std::sync::Arc;

use tangle_model::{
    ExceptionData, ObjRef, ObjectData, Primitive, TypeKind, TypeRef, TypeRegistry, Value,
};

use super::{receiver, shape_error, ShapeResolver, ValueCodec};
use crate::error::WireError;
use crate::framing::{Decoder, Encoder};
use crate::session::Slot;

pub(crate) struct ExceptionResolver;

impl ShapeResolver for ExceptionResolver {
    fn name(&self) -> &'static str {
        "exception"
    }

    fn can_write(&self, ty: &TypeRef, _types: &TypeRegistry) -> bool {
        ty.kind() == &TypeKind::Exception && ty.is_constructible()
    }

    fn build(&self, ty: &TypeRef, types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError> {
        Ok(Box::new(ExceptionCodec {
            ty: ty.clone(),
            string: Arc::clone(types.primitive(Primitive::String)),
            root: Arc::clone(types.exception_root()),
        }))
    }
}

struct ExceptionCodec {
    ty: TypeRef,
    string: TypeRef,
    root: TypeRef,
}

impl ExceptionCodec {
    fn text(value: Option<&str>) -> Value {
        value.map_or(Value::Null, Value::str)
    }

    fn read_text(&self, dec: &mut Decoder<'_>) -> Result<Option<Rc<str>>, WireError> {
        match dec.read_value(&self.string)? {
            Value::Str(text) => Ok(Some(text)),
            _ => Ok(None),
        }
    }
}

impl ValueCodec for ExceptionCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let obj = receiver(value, &self.ty)?;
        let data = match &*obj.data() {
            ObjectData::Exception(data) => data.clone(),
            _ => return Err(shape_error(obj, "exception")),
        };
        enc.write_value(&Self::text(data.message()), &self.string)?;
        enc.write_value(&Self::text(data.stack_trace()), &self.string)?;
        enc.write_value(data.inner(), &self.root)
    }

    fn read(&self, dec: &mut Decoder<'_>, slot: Slot) -> Result<Value, WireError> {
        let obj = ObjRef::new(self.ty.clone(), ObjectData::Pending);
        dec.bind(slot, &obj);
        let message = self.read_text(dec)?;
        let stack_trace = self.read_text(dec)?;
        let inner = dec.read_value(&self.root)?;
        obj.replace(ObjectData::Exception(ExceptionData::from_parts(
            message,
            stack_trace,
            inner,
        )));
        Ok(Value::Object(obj))
    }
}
