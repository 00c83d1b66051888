// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dictionaries: the built-in `Map<K, V>` and any user type implementing
//! `IDictionary<K, V>`. Payload is `[count]([key][value])*`.

use rustc_hash::{FxHashMap, FxHashSet};
use tangle_model::{
    ConstructorInfo, EnumerateFn, MethodInfo, ObjRef, ObjectData, PropertyInfo, TypeExpr,
    TypeKind, TypeName, TypeRef, TypeRegistry, Value,
};

use super::{check_count, element, receiver, shape_error, ShapeResolver, ValueCodec};
use crate::error::WireError;
use crate::framing::{Decoder, Element, Encoder};
use crate::session::Slot;

const INTERFACE: &str = "IDictionary";

pub(crate) struct DictionaryResolver;

/// Key and value types of the first `IDictionary<K, V>` reachable from `ty`
/// through its bases and interfaces.
fn dictionary_args(ty: &TypeRef, types: &TypeRegistry) -> Option<(TypeName, TypeName)> {
    let mut seen = FxHashSet::default();
    let mut pending: Vec<TypeName> = Vec::new();
    pending.extend(ty.interfaces().iter().cloned());
    pending.extend(ty.base().cloned());
    while let Some(name) = pending.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        if let Ok(TypeExpr { base, args }) = name.parse() {
            if base == INTERFACE && args.len() == 2 {
                return Some((args[0].name(), args[1].name()));
            }
        }
        if let Some(next) = types.get(name.as_str()) {
            pending.extend(next.interfaces().iter().cloned());
            pending.extend(next.base().cloned());
        }
    }
    None
}

struct UserDictionary {
    key: TypeName,
    value: TypeName,
    ctor: Option<ConstructorInfo>,
    add: Option<MethodInfo>,
    enumerate: Option<EnumerateFn>,
}

impl UserDictionary {
    fn inspect(ty: &TypeRef, types: &TypeRegistry) -> Option<Self> {
        if ty.kind() != &TypeKind::Record {
            return None;
        }
        let (key, value) = dictionary_args(ty, types)?;
        let params = [key.clone(), value.clone()];
        let add = types
            .find_methods(ty, "add")
            .into_iter()
            .find(|m| !m.is_static() && m.params() == &params[..]);
        let enumerate = types
            .base_chain(ty)
            .find_map(|t| t.members().enumerator().cloned());
        Some(Self {
            key,
            value,
            ctor: ty.members().default_constructor().cloned(),
            add,
            enumerate,
        })
    }
}

impl ShapeResolver for DictionaryResolver {
    fn name(&self) -> &'static str {
        "dictionary"
    }

    fn can_write(&self, ty: &TypeRef, types: &TypeRegistry) -> bool {
        match ty.kind() {
            TypeKind::Map(..) => true,
            // Every implementor is claimed; one missing a capability fails in
            // `build` rather than falling through to the record resolver.
            _ => UserDictionary::inspect(ty, types).is_some(),
        }
    }

    fn can_read(&self, ty: &TypeRef, types: &TypeRegistry) -> bool {
        match ty.kind() {
            TypeKind::Map(..) => true,
            _ => UserDictionary::inspect(ty, types)
                .is_some_and(|d| d.ctor.is_some() && d.add.is_some()),
        }
    }

    fn build(&self, ty: &TypeRef, types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError> {
        if let TypeKind::Map(key, value) = ty.kind() {
            return Ok(Box::new(MapCodec {
                ty: ty.clone(),
                key: element(types, key)?,
                value: element(types, value)?,
            }));
        }
        let UserDictionary {
            key,
            value,
            ctor: Some(ctor),
            add: Some(add),
            enumerate: Some(enumerate),
        } = UserDictionary::inspect(ty, types)
            .ok_or_else(|| WireError::unsupported(ty.name(), "not a dictionary"))?
        else {
            return Err(WireError::unsupported(
                ty.name(),
                "dictionary needs a public parameterless constructor, add(K, V) and an enumerator",
            ));
        };
        Ok(Box::new(UserDictionaryCodec {
            ty: ty.clone(),
            key: element(types, &key)?,
            value: element(types, &value)?,
            ctor,
            add,
            enumerate,
            count: types.find_property(ty, "count"),
        }))
    }
}

struct MapCodec {
    ty: TypeRef,
    key: Element,
    value: Element,
}

impl ValueCodec for MapCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let obj = receiver(value, &self.ty)?;
        let entries = match &*obj.data() {
            ObjectData::Map(map) => map
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Vec<_>>(),
            _ => return Err(shape_error(obj, "map")),
        };
        super::write_entries(enc, &self.key, &self.value, &entries)
    }

    fn read(&self, dec: &mut Decoder<'_>, slot: Slot) -> Result<Value, WireError> {
        let count = dec.read_count()?;
        let mut map = FxHashMap::default();
        map.reserve(dec.capacity(count));
        let obj = ObjRef::new(self.ty.clone(), ObjectData::Map(map));
        dec.bind(slot, &obj);
        for _ in 0..count {
            let key = self.key.read(dec)?;
            let value = self.value.read(dec)?;
            let mut data = obj.data_mut();
            let ObjectData::Map(map) = &mut *data else {
                return Err(shape_error(&obj, "map"));
            };
            if map.insert(key, value).is_some() {
                return Err(WireError::DuplicateKey);
            }
        }
        Ok(Value::Object(obj))
    }
}

struct UserDictionaryCodec {
    ty: TypeRef,
    key: Element,
    value: Element,
    ctor: ConstructorInfo,
    add: MethodInfo,
    enumerate: EnumerateFn,
    count: Option<PropertyInfo>,
}

impl UserDictionaryCodec {
    fn entry(&self, pair: &Value) -> Result<(Value, Value), WireError> {
        let pair = receiver(pair, &self.ty)?;
        match (pair.field("key"), pair.field("value")) {
            (Some(k), Some(v)) => Ok((k, v)),
            _ => Err(shape_error(pair, "KeyValuePair")),
        }
    }
}

impl ValueCodec for UserDictionaryCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let pairs = (self.enumerate)(value)?;
        if let Some(count) = &self.count {
            check_count(&self.ty, &count.get(value)?, pairs.len())?;
        }
        let entries = pairs
            .iter()
            .map(|pair| self.entry(pair))
            .collect::<Result<Vec<_>, _>>()?;
        super::write_entries(enc, &self.key, &self.value, &entries)
    }

    fn read(&self, dec: &mut Decoder<'_>, slot: Slot) -> Result<Value, WireError> {
        let count = dec.read_count()?;
        let target = self.ctor.invoke(&self.ty, &[])?;
        let obj = receiver(&target, &self.ty)?;
        dec.bind(slot, obj);
        for _ in 0..count {
            let key = self.key.read(dec)?;
            let value = self.value.read(dec)?;
            self.add.invoke(&target, &[key, value])?;
        }
        Ok(target)
    }
}
