// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tangle_model::{
    ExceptionData, ModelError, ObjRef, ObjectData, TypeBuilder, TypeName, TypeRegistry, Value,
};
use tangle_wire::{Engine, Surrogate, SurrogateError};

/// Registry with every fixture type used by the wire tests.
pub fn fixtures() -> Arc<TypeRegistry> {
    let types = TypeRegistry::new();
    let kvp = types
        .key_value_pair_of(&TypeName::from("string"), &TypeName::from("i32"))
        .unwrap();

    let defs = [
        TypeBuilder::record("Node")
            .field("value", "i32")
            .field("next", "Node")
            .build(),
        TypeBuilder::record("Pair")
            .field("a", "object")
            .field("b", "object")
            .build(),
        TypeBuilder::interface("Shape").build(),
        TypeBuilder::record("Circle")
            .implements("Shape")
            .field("radius", "f64")
            .build(),
        TypeBuilder::record("Square")
            .implements("Shape")
            .field("side", "f64")
            .build(),
        TypeBuilder::record("Drawing")
            .field("title", "string")
            .field("shapes", "List<Shape>")
            .field("focus", "Shape")
            .build(),
        TypeBuilder::record("Animal").open().field("name", "string").build(),
        TypeBuilder::record("Dog")
            .extends("Animal")
            .field("good", "bool")
            .build(),
        TypeBuilder::record("Kennel")
            .field("resident", "Animal")
            .field("tags", "Set<string>")
            .build(),
        TypeBuilder::record("Bag")
            .constructor(std::iter::empty::<&str>(), |ty, _| {
                Ok(Value::Object(ObjRef::new(ty.clone(), ObjectData::Items(Vec::new()))))
            })
            .property("count", "i32", |this| {
                let len = items_of(this)?.len();
                Ok(Value::I32(i32::try_from(len).unwrap_or(i32::MAX)))
            })
            .method("add", ["i32"], |this, args| {
                let obj = this.as_object().ok_or_else(|| ModelError::NullReceiver("Bag".into()))?;
                obj.with_items(|items| items.push(args[0].clone()))?;
                Ok(Value::Null)
            })
            .enumerate(items_of)
            .build(),
        TypeBuilder::record("SealedBag")
            .property("count", "i32", |_| Ok(Value::I32(0)))
            .method("add", ["i32"], |_, _| Ok(Value::Null))
            .enumerate(|_| Ok(Vec::new()))
            .build(),
        TypeBuilder::record("LyingBag")
            .constructor(std::iter::empty::<&str>(), |ty, _| {
                Ok(Value::Object(ObjRef::new(ty.clone(), ObjectData::Items(Vec::new()))))
            })
            .property("count", "i32", |_| Ok(Value::I32(7)))
            .method("add", ["i32"], |_, _| Ok(Value::Null))
            .enumerate(items_of)
            .build(),
        TypeBuilder::record("Phonebook")
            .implements("IDictionary<string,i32>")
            .constructor(std::iter::empty::<&str>(), |ty, _| {
                Ok(Value::Object(ObjRef::new(
                    ty.clone(),
                    ObjectData::Map(FxHashMap::default()),
                )))
            })
            .method("add", ["string", "i32"], |this, args| {
                let obj = this
                    .as_object()
                    .ok_or_else(|| ModelError::NullReceiver("Phonebook".into()))?;
                let mut data = obj.data_mut();
                let ObjectData::Map(map) = &mut *data else {
                    return Err(ModelError::Invoke("phonebook storage".into()));
                };
                if map.insert(args[0].clone(), args[1].clone()).is_some() {
                    return Err(ModelError::DuplicateKey);
                }
                Ok(Value::Null)
            })
            .property("count", "i32", |this| {
                let len = this.as_object().map_or(0, |o| o.entries().len());
                Ok(Value::I32(i32::try_from(len).unwrap_or(i32::MAX)))
            })
            .enumerate(move |this| {
                let obj = this
                    .as_object()
                    .ok_or_else(|| ModelError::NullReceiver("Phonebook".into()))?;
                let mut entries = obj.entries();
                entries.sort_by(|a, b| a.0.total_cmp(&b.0));
                Ok(entries
                    .into_iter()
                    .map(|(k, v)| {
                        Value::Object(ObjRef::new(kvp.clone(), ObjectData::Fields(vec![k, v])))
                    })
                    .collect())
            })
            .build(),
        TypeBuilder::record("LockedBook")
            .implements("IDictionary<string,i32>")
            .method("add", ["string", "i32"], |_, _| Ok(Value::Null))
            .enumerate(|_| Ok(Vec::new()))
            .build(),
        TypeBuilder::record("BlindBook")
            .implements("IDictionary<string,i32>")
            .constructor(std::iter::empty::<&str>(), |ty, _| {
                Ok(Value::Object(ObjRef::new(
                    ty.clone(),
                    ObjectData::Map(FxHashMap::default()),
                )))
            })
            .method("add", ["string", "i32"], |_, _| Ok(Value::Null))
            .build(),
        TypeBuilder::exception("Fault").non_constructible().build(),
        TypeBuilder::record("FaultDto")
            .field("message", "string")
            .field("inner", "Exception")
            .build(),
        TypeBuilder::record("Secret")
            .non_constructible()
            .field("text", "string")
            .build(),
        TypeBuilder::record("Celsius").field("degrees", "f64").build(),
        TypeBuilder::record("Counter")
            .field("step", "i32")
            .field("on_tick", "Delegate")
            .method("next", ["i32"], |this, args| {
                let step = this
                    .as_object()
                    .and_then(|o| o.field("step"))
                    .and_then(|v| v.as_i32())
                    .unwrap_or(0);
                Ok(Value::I32(args[0].as_i32().unwrap_or(0) + step))
            })
            .static_method("zero", std::iter::empty::<&str>(), |_| Ok(Value::I32(0)))
            .build(),
    ];
    for def in defs {
        types.register(def).unwrap();
    }
    Arc::new(types)
}

fn items_of(this: &Value) -> Result<Vec<Value>, ModelError> {
    Ok(this
        .as_object()
        .ok_or_else(|| ModelError::NullReceiver("Bag".into()))?
        .elements())
}

/// Engine over [`fixtures`].
pub fn engine(preserve_references: bool) -> Engine {
    Engine::configure(fixtures(), preserve_references, [fault_surrogate()])
}

/// Carries the non-constructible `Fault` exception as a `FaultDto` record.
pub fn fault_surrogate() -> Surrogate {
    Surrogate::for_type(
        "Fault",
        "FaultDto",
        |value, types| {
            let obj = value.as_object().ok_or_else(|| SurrogateError::new("null fault"))?;
            let body = obj.data();
            let ObjectData::Exception(data) = &*body else {
                return Err(SurrogateError::new("not an exception"));
            };
            let dto = types.new_record(
                "FaultDto",
                [
                    ("message", data.message().map_or(Value::Null, Value::str)),
                    ("inner", data.inner().clone()),
                ],
            )?;
            Ok(Value::Object(dto))
        },
        |carrier, types| {
            let dto = carrier.as_object().ok_or_else(|| SurrogateError::new("null dto"))?;
            let message = dto.field("message").unwrap_or_default();
            let inner = dto.field("inner").unwrap_or_default();
            let data = ExceptionData::new(message.as_str().unwrap_or_default()).with_inner(inner);
            Ok(Value::Object(types.new_exception("Fault", data)?))
        },
    )
}

pub fn node(types: &TypeRegistry, value: i32) -> ObjRef {
    types.new_record("Node", [("value", Value::I32(value))]).unwrap()
}

pub fn items(types: &TypeRegistry, ty: &str, values: impl IntoIterator<Item = Value>) -> Value {
    Value::Object(
        types
            .new_object(ty, ObjectData::Items(values.into_iter().collect()))
            .unwrap(),
    )
}

pub fn ints(values: impl IntoIterator<Item = i32>) -> Vec<Value> {
    values.into_iter().map(Value::I32).collect()
}

pub fn round_trip(engine: &Engine, value: &Value, expected: &str) -> Value {
    let bytes = engine.encode(value).unwrap();
    engine.decode(&bytes, expected).unwrap()
}
