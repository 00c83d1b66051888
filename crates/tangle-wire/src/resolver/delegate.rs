// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Delegates: the bound method as a descriptor, then the target through the
//! ordinary object pipeline (so a delegate may target an object that holds
//! the delegate).

use std::sync::Arc;

use tangle_model::{
    DelegateData, MemberKind, ObjRef, ObjectData, TypeKind, TypeRef, TypeRegistry, Value,
};

use super::member::{read_descriptor, write_descriptor};
use super::{receiver, shape_error, ShapeResolver, ValueCodec};
use crate::error::WireError;
use crate::framing::{Decoder, Encoder};
use crate::session::Slot;

pub(crate) struct DelegateResolver;

impl ShapeResolver for DelegateResolver {
    fn name(&self) -> &'static str {
        "delegate"
    }

    fn can_write(&self, ty: &TypeRef, _types: &TypeRegistry) -> bool {
        ty.kind() == &TypeKind::Delegate
    }

    fn build(&self, ty: &TypeRef, types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError> {
        Ok(Box::new(DelegateCodec {
            ty: ty.clone(),
            object: Arc::clone(types.object()),
        }))
    }
}

struct DelegateCodec {
    ty: TypeRef,
    object: TypeRef,
}

impl ValueCodec for DelegateCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let obj = receiver(value, &self.ty)?;
        let data = match &*obj.data() {
            ObjectData::Delegate(data) => data.clone(),
            _ => return Err(shape_error(obj, "delegate")),
        };
        write_descriptor(enc, data.method())?;
        enc.write_value(data.target(), &self.object)
    }

    fn read(&self, dec: &mut Decoder<'_>, slot: Slot) -> Result<Value, WireError> {
        let obj = ObjRef::new(self.ty.clone(), ObjectData::Pending);
        dec.bind(slot, &obj);
        let method = read_descriptor(dec, MemberKind::Method)?;
        let info = dec.types().find_method(&method)?;
        let target = dec.read_value(&self.object)?;
        if !info.is_static() && target.is_null() {
            return Err(WireError::Invoke(format!("instance method {method} bound to null")));
        }
        obj.replace(ObjectData::Delegate(DelegateData::new(method, target)));
        Ok(Value::Object(obj))
    }
}
