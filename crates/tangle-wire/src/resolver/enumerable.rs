// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Duck-typed collections.
//!
//! Any concrete type exposing a `count` property, an enumerator, and either
//! `add_range(Array<T>)` or `add(T)` is written as `[count][element]*`. It is
//! rebuilt through its parameterless constructor; the element type comes
//! from the append method's signature (or the `List<T>` kind).

use std::sync::Arc;

use tangle_model::{
    ConstructorInfo, EnumerateFn, MethodInfo, ObjRef, ObjectData, PropertyInfo, TypeExpr,
    TypeKind, TypeName, TypeRef, TypeRegistry, Value,
};

use super::{check_count, element, read_items, receiver, write_items, ShapeResolver, ValueCodec};
use crate::error::WireError;
use crate::framing::{Decoder, Element, Encoder};
use crate::session::Slot;

pub(crate) struct EnumerableResolver;

enum Append {
    Range(MethodInfo, TypeName),
    One(MethodInfo),
}

struct Shape {
    count: PropertyInfo,
    enumerate: EnumerateFn,
    append: Append,
    elem: TypeName,
}

fn array_element(param: &TypeName) -> Option<TypeName> {
    match param.parse() {
        Ok(TypeExpr { base, args }) if base == "Array" && args.len() == 1 => Some(args[0].name()),
        _ => None,
    }
}

impl Shape {
    fn inspect(ty: &TypeRef, types: &TypeRegistry) -> Option<Self> {
        if ty.is_abstract() || ty.primitive().is_some() {
            return None;
        }
        let count = types.find_property(ty, "count")?;
        let enumerate = types
            .base_chain(ty)
            .find_map(|t| t.members().enumerator().cloned())?;
        let instance = |name: &str| {
            types
                .find_methods(ty, name)
                .into_iter()
                .filter(|m| !m.is_static() && m.params().len() == 1)
                .collect::<Vec<_>>()
        };
        let range = instance("add_range").into_iter().find_map(|m| {
            let array = m.params()[0].clone();
            let elem = array_element(&array)?;
            Some((Append::Range(m, array), elem))
        });
        let (append, elem) = range.or_else(|| {
            instance("add").into_iter().next().map(|m| {
                let elem = m.params()[0].clone();
                (Append::One(m), elem)
            })
        })?;
        let elem = match ty.kind() {
            TypeKind::List(declared) => declared.clone(),
            _ => elem,
        };
        Some(Self {
            count,
            enumerate,
            append,
            elem,
        })
    }
}

impl ShapeResolver for EnumerableResolver {
    fn name(&self) -> &'static str {
        "enumerable"
    }

    fn can_write(&self, ty: &TypeRef, types: &TypeRegistry) -> bool {
        Shape::inspect(ty, types).is_some()
    }

    fn can_read(&self, ty: &TypeRef, _types: &TypeRegistry) -> bool {
        ty.members().default_constructor().is_some()
    }

    fn build(&self, ty: &TypeRef, types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError> {
        let shape = Shape::inspect(ty, types)
            .ok_or_else(|| WireError::unsupported(ty.name(), "not an enumerable collection"))?;
        let ctor = ty.members().default_constructor().cloned().ok_or_else(|| {
            WireError::unsupported(ty.name(), "no public parameterless constructor")
        })?;
        let append = match shape.append {
            Append::Range(method, array) => Appender::Range(method, types.resolve(array.as_str())?),
            Append::One(method) => Appender::One(method),
        };
        Ok(Box::new(EnumerableCodec {
            ty: ty.clone(),
            elem: element(types, &shape.elem)?,
            ctor,
            count: shape.count,
            enumerate: shape.enumerate,
            append,
        }))
    }
}

enum Appender {
    Range(MethodInfo, TypeRef),
    One(MethodInfo),
}

struct EnumerableCodec {
    ty: TypeRef,
    elem: Element,
    ctor: ConstructorInfo,
    count: PropertyInfo,
    enumerate: EnumerateFn,
    append: Appender,
}

impl ValueCodec for EnumerableCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let items = (self.enumerate)(value)?;
        check_count(&self.ty, &self.count.get(value)?, items.len())?;
        write_items(enc, &self.elem, &items)
    }

    fn read(&self, dec: &mut Decoder<'_>, slot: Slot) -> Result<Value, WireError> {
        let target = self.ctor.invoke(&self.ty, &[])?;
        dec.bind(slot, receiver(&target, &self.ty)?);
        let items = read_items(dec, &self.elem)?;
        match &self.append {
            Appender::Range(method, array) => {
                let batch = ObjRef::new(Arc::clone(array), ObjectData::Items(items));
                method.invoke(&target, &[Value::Object(batch)])?;
            }
            Appender::One(method) => {
                for item in items {
                    method.invoke(&target, &[item])?;
                }
            }
        }
        Ok(target)
    }
}
