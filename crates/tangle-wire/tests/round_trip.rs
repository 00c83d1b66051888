// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end round trips through `Engine::encode` / `Engine::decode`.
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tangle_model::{
    deep_eq, ExceptionData, ImmutableFamily, MemberRef, ObjRef, ObjectData, PersistentFamily,
    TypeName, TypeRef, TypeRegistry, Value,
};
use tangle_wire::{
    Decoder, Encoder, Engine, ErrorCategory, ShapeResolver, Slot, ValueCodec, WireConfig,
    WireError,
};

use common::{engine, fixtures, ints, items, node, round_trip};

fn field(value: &Value, name: &str) -> Value {
    value.as_object().unwrap().field(name).unwrap()
}

fn count(bytes: &[u8], needle: &str) -> usize {
    bytes
        .windows(needle.len())
        .filter(|w| *w == needle.as_bytes())
        .count()
}

#[test]
fn primitives_and_strings_round_trip_at_the_root() {
    let engine = engine(false);
    let cases = [
        (Value::Bool(true), "bool"),
        (Value::I8(-3), "i8"),
        (Value::U16(65_000), "u16"),
        (Value::I32(-42), "i32"),
        (Value::I64(i64::MIN), "i64"),
        (Value::U64(u64::MAX), "u64"),
        (Value::F32(1.5), "f32"),
        (Value::F64(-0.25), "f64"),
        (Value::Char('λ'), "char"),
        (Value::str("héllo"), "string"),
        (Value::str(""), "string"),
    ];
    for (value, ty) in cases {
        let back = round_trip(&engine, &value, ty);
        assert_eq!(back, value, "{ty}");
    }
}

#[test]
fn null_root_round_trips_for_reference_types_only() {
    let engine = engine(true);
    let bytes = engine.encode(&Value::Null).unwrap();
    assert_eq!(bytes, vec![0x00]);
    assert!(engine.decode(&bytes, "Node").unwrap().is_null());
    assert!(engine.decode(&bytes, "string").unwrap().is_null());

    let err = engine.decode(&bytes, "i32").unwrap_err();
    assert!(matches!(err, WireError::NullNotAllowed(_)));
}

#[test]
fn empty_collection_frame_is_token_manifest_and_zero_count() {
    let engine = engine(false);
    let types = engine.types();
    let list = items(types, "List<i32>", Vec::<Value>::new());
    let bytes = engine.encode(&list).unwrap();

    let mut expected = vec![0x02];
    expected.extend_from_slice(&9u32.to_le_bytes());
    expected.extend_from_slice(b"List<i32>");
    expected.extend_from_slice(&0u32.to_le_bytes());
    assert_eq!(bytes, expected);

    let back = engine.decode(&bytes, "List<i32>").unwrap();
    assert!(back.as_object().unwrap().elements().is_empty());
}

#[test]
fn preserved_root_carries_a_definition_index() {
    let engine = engine(true);
    let list = items(engine.types(), "List<i32>", []);
    let bytes = engine.encode(&list).unwrap();
    assert_eq!(bytes[0], 0x06);
    assert_eq!(&bytes[1..5], &0u32.to_le_bytes());
}

#[test]
fn lists_arrays_and_linked_lists_keep_order() {
    let engine = engine(false);
    let types = engine.types();

    let list = items(types, "List<i32>", ints([3, 1, 2]));
    let back = round_trip(&engine, &list, "List<i32>");
    assert_eq!(back.as_object().unwrap().elements(), ints([3, 1, 2]));

    let array = items(types, "Array<string>", [Value::str("a"), Value::Null, Value::str("c")]);
    let back = round_trip(&engine, &array, "Array<string>");
    assert!(deep_eq(&array, &back));

    let chain = [Value::I64(7), Value::I64(8)].into_iter().collect();
    let linked = Value::Object(
        types
            .new_object("LinkedList<i64>", ObjectData::Linked(chain))
            .unwrap(),
    );
    let back = round_trip(&engine, &linked, "LinkedList<i64>");
    assert_eq!(
        back.as_object().unwrap().elements(),
        vec![Value::I64(7), Value::I64(8)]
    );
}

#[test]
fn maps_and_sets_round_trip_structurally() {
    let engine = engine(false);
    let types = engine.types();

    let mut map = FxHashMap::default();
    map.insert(Value::str("one"), Value::Object(node(types, 1)));
    map.insert(Value::str("two"), Value::Null);
    let map = Value::Object(types.new_object("Map<string,Node>", ObjectData::Map(map)).unwrap());
    let back = round_trip(&engine, &map, "Map<string,Node>");
    assert!(deep_eq(&map, &back));

    let set: FxHashSet<Value> = ints([5, 9, 11]).into_iter().collect();
    let set = Value::Object(types.new_object("Set<i32>", ObjectData::Set(set)).unwrap());
    let back = round_trip(&engine, &set, "Set<i32>");
    assert!(deep_eq(&set, &back));
}

#[test]
fn maps_decode_through_their_dictionary_interface() {
    let engine = engine(false);
    let types = engine.types();
    let mut map = FxHashMap::default();
    map.insert(Value::I32(1), Value::str("x"));
    let map = Value::Object(types.new_object("Map<i32,string>", ObjectData::Map(map)).unwrap());
    let back = round_trip(&engine, &map, "IDictionary<i32,string>");
    assert!(deep_eq(&map, &back));
}

#[test]
fn shared_node_decodes_as_one_object_when_preserving() {
    let engine = engine(true);
    let types = engine.types();
    let shared = Value::Object(node(types, 9));
    let pair = types
        .new_record("Pair", [("a", shared.clone()), ("b", shared)])
        .unwrap();

    let back = round_trip(&engine, &Value::Object(pair), "Pair");
    let (a, b) = (field(&back, "a"), field(&back, "b"));
    assert!(a.ptr_eq(&b));
    assert_eq!(field(&a, "value"), Value::I32(9));
}

#[test]
fn shared_node_is_duplicated_without_preservation() {
    let engine = engine(false);
    let types = engine.types();
    let shared = Value::Object(node(types, 9));
    let pair = Value::Object(
        types
            .new_record("Pair", [("a", shared.clone()), ("b", shared)])
            .unwrap(),
    );

    let back = round_trip(&engine, &pair, "Pair");
    let (a, b) = (field(&back, "a"), field(&back, "b"));
    assert!(!a.ptr_eq(&b));
    assert!(deep_eq(&pair, &back));
}

#[test]
fn two_node_cycle_round_trips_with_identity() {
    let engine = engine(true);
    let types = engine.types();
    let a = node(types, 1);
    let b = node(types, 2);
    a.set_field("next", Value::Object(b.clone())).unwrap();
    b.set_field("next", Value::Object(a.clone())).unwrap();

    let back = round_trip(&engine, &Value::Object(a), "Node");
    let next = field(&back, "next");
    assert_eq!(field(&next, "value"), Value::I32(2));
    assert!(field(&next, "next").ptr_eq(&back));
}

#[test]
fn self_cycle_through_a_list_round_trips() {
    let engine = engine(true);
    let types = engine.types();
    let list = items(types, "List<object>", Vec::<Value>::new());
    list.as_object()
        .unwrap()
        .with_items(|v| v.extend([list.clone(), Value::I32(4), Value::str("s")]))
        .unwrap();

    let back = round_trip(&engine, &list, "List<object>");
    let elements = back.as_object().unwrap().elements();
    assert!(elements[0].ptr_eq(&back));
    assert_eq!(elements[1], Value::I32(4));
    assert_eq!(elements[2], Value::str("s"));
}

#[test]
fn cycle_without_preservation_is_rejected() {
    let engine = engine(false);
    let types = engine.types();
    let a = node(types, 1);
    a.set_field("next", Value::Object(a.clone())).unwrap();

    let err = engine.encode(&Value::Object(a)).unwrap_err();
    assert!(matches!(err, WireError::CycleDetected(_)));
    assert_eq!(err.category(), ErrorCategory::InvalidGraph);
}

#[test]
fn sealed_fields_carry_no_manifest() {
    let engine = engine(false);
    let types = engine.types();
    let head = node(types, 1);
    let mid = node(types, 2);
    mid.set_field("next", Value::Object(node(types, 3))).unwrap();
    head.set_field("next", Value::Object(mid)).unwrap();

    let bytes = engine.encode(&Value::Object(head.clone())).unwrap();
    assert_eq!(count(&bytes, "Node"), 1);
    let back = engine.decode(&bytes, "Node").unwrap();
    assert!(deep_eq(&Value::Object(head), &back));
}

#[test]
fn polymorphic_slots_name_each_runtime_type_once() {
    let engine = engine(true);
    let types = engine.types();
    let circles: Vec<Value> = (1..=3)
        .map(|r| {
            Value::Object(
                types
                    .new_record("Circle", [("radius", Value::F64(f64::from(r)))])
                    .unwrap(),
            )
        })
        .collect();
    let square = Value::Object(
        types
            .new_record("Square", [("side", Value::F64(2.0))])
            .unwrap(),
    );
    let mut shapes = circles.clone();
    shapes.push(square);
    let drawing = Value::Object(
        types
            .new_record(
                "Drawing",
                [
                    ("title", Value::str("plan")),
                    ("shapes", items(types, "List<Shape>", shapes)),
                    ("focus", circles[1].clone()),
                ],
            )
            .unwrap(),
    );

    let bytes = engine.encode(&drawing).unwrap();
    assert_eq!(count(&bytes, "Circle"), 1);
    assert_eq!(count(&bytes, "Square"), 1);

    let back = engine.decode(&bytes, "Drawing").unwrap();
    assert!(deep_eq(&drawing, &back));
    let decoded = field(&back, "shapes").as_object().unwrap().elements();
    assert_eq!(decoded[3].as_object().unwrap().ty().name().as_str(), "Square");
    assert!(field(&back, "focus").ptr_eq(&decoded[1]));
}

#[test]
fn subtype_in_open_base_slot_keeps_its_runtime_type() {
    let engine = engine(false);
    let types = engine.types();
    let dog = types
        .new_record("Dog", [("name", Value::str("rex")), ("good", Value::Bool(true))])
        .unwrap();
    let mut tags = FxHashSet::default();
    tags.insert(Value::str("loud"));
    let tags = Value::Object(types.new_object("Set<string>", ObjectData::Set(tags)).unwrap());
    let kennel = Value::Object(
        types
            .new_record("Kennel", [("resident", Value::Object(dog)), ("tags", tags)])
            .unwrap(),
    );

    let back = round_trip(&engine, &kennel, "Kennel");
    let resident = field(&back, "resident");
    assert_eq!(resident.as_object().unwrap().ty().name().as_str(), "Dog");
    assert_eq!(field(&resident, "good"), Value::Bool(true));
    assert!(deep_eq(&kennel, &back));
}

#[test]
fn decode_rejects_a_root_of_the_wrong_type() {
    let engine = engine(false);
    let bytes = engine.encode(&Value::Object(node(engine.types(), 1))).unwrap();
    let err = engine.decode(&bytes, "Pair").unwrap_err();
    assert!(matches!(err, WireError::TypeMismatch { .. }));
}

#[test]
fn immutable_stack_keeps_top_first_order() {
    let engine = engine(false);
    let types = engine.types();
    let data = ImmutableFamily::Stack.create_range(ints([1, 2, 3])).unwrap();
    let stack = Value::Object(types.new_object("ImmutableStack<i32>", data).unwrap());
    let before = stack.as_object().unwrap().elements();

    let back = round_trip(&engine, &stack, "ImmutableStack<i32>");
    assert_eq!(back.as_object().unwrap().elements(), before);
}

#[test]
fn immutable_collections_round_trip() {
    let engine = engine(false);
    let types = engine.types();
    for family in [
        ImmutableFamily::List,
        ImmutableFamily::Array,
        ImmutableFamily::Queue,
        ImmutableFamily::SortedSet,
    ] {
        let name = TypeName::generic(family.generic_name(), &[TypeName::from("i32")]);
        let data = family.create_range(ints([4, 2, 8])).unwrap();
        let value = Value::Object(types.new_object(name.as_str(), data).unwrap());
        let back = round_trip(&engine, &value, name.as_str());
        assert!(deep_eq(&value, &back), "{name}");
    }

    let data = ImmutableFamily::SortedDictionary
        .create_map(vec![(Value::str("b"), Value::I32(2)), (Value::str("a"), Value::I32(1))])
        .unwrap();
    let dict = Value::Object(
        types
            .new_object("ImmutableSortedDictionary<string,i32>", data)
            .unwrap(),
    );
    let back = round_trip(&engine, &dict, "ImmutableSortedDictionary<string,i32>");
    assert_eq!(
        back.as_object().unwrap().entries(),
        dict.as_object().unwrap().entries()
    );
}

#[test]
fn persistent_collections_round_trip() {
    let engine = engine(true);
    let types = engine.types();

    let list = PersistentFamily::List.of_seq(ints([1, 2, 3])).unwrap();
    let list = Value::Object(types.new_object("PersistentList<i32>", list).unwrap());
    let back = round_trip(&engine, &list, "PersistentList<i32>");
    assert_eq!(back.as_object().unwrap().elements(), ints([1, 2, 3]));

    let map = PersistentFamily::Map
        .of_map(vec![
            (Value::I32(2), Value::Object(node(types, 20))),
            (Value::I32(1), Value::Null),
        ])
        .unwrap();
    let map = Value::Object(types.new_object("PersistentMap<i32,Node>", map).unwrap());
    let back = round_trip(&engine, &map, "PersistentMap<i32,Node>");
    assert!(deep_eq(&map, &back));
}

#[test]
fn sorted_collections_of_objects_keep_their_order() {
    for preserve in [false, true] {
        let engine = engine(preserve);
        let types = engine.types();
        // Interleave allocations so address order differs from supplied order.
        let mut nodes = Vec::new();
        let mut scratch = Vec::new();
        for value in 0..40 {
            scratch.push(node(types, -value));
            nodes.push(Value::Object(node(types, value)));
        }
        drop(scratch);
        nodes.reverse();

        let set = PersistentFamily::Set.of_seq(nodes.clone()).unwrap();
        let set = Value::Object(types.new_object("PersistentSet<Node>", set).unwrap());
        let back = round_trip(&engine, &set, "PersistentSet<Node>");
        assert!(deep_eq(&set, &back));
        assert_eq!(field(&back.as_object().unwrap().elements()[0], "value"), Value::I32(39));

        let sorted = ImmutableFamily::SortedSet.create_range(nodes).unwrap();
        let sorted = Value::Object(types.new_object("ImmutableSortedSet<Node>", sorted).unwrap());
        let back = round_trip(&engine, &sorted, "ImmutableSortedSet<Node>");
        assert!(deep_eq(&sorted, &back));
    }
}

#[test]
fn nested_collections_round_trip() {
    let engine = engine(true);
    let types = engine.types();

    let mut map = FxHashMap::default();
    map.insert(Value::str("odd"), items(types, "List<i32>", ints([1, 3])));
    map.insert(Value::str("none"), items(types, "List<i32>", Vec::<Value>::new()));
    let map = Value::Object(
        types
            .new_object("Map<string,List<i32>>", ObjectData::Map(map))
            .unwrap(),
    );
    let back = round_trip(&engine, &map, "Map<string,List<i32>>");
    assert!(deep_eq(&map, &back));

    let inner = items(types, "Array<i32>", ints([9, 9]));
    let outer = items(types, "List<Array<i32>>", [inner.clone(), inner]);
    let back = round_trip(&engine, &outer, "List<Array<i32>>");
    assert!(deep_eq(&outer, &back));
    let elements = back.as_object().unwrap().elements();
    assert!(elements[0].ptr_eq(&elements[1]));

    let rows = ImmutableFamily::List
        .create_range(vec![
            items(types, "List<i32>", ints([1])),
            items(types, "List<i32>", ints([2, 3])),
        ])
        .unwrap();
    let rows = Value::Object(types.new_object("ImmutableList<List<i32>>", rows).unwrap());
    let back = round_trip(&engine, &rows, "ImmutableList<List<i32>>");
    assert!(deep_eq(&rows, &back));
}

#[test]
fn exception_keeps_message_trace_and_inner() {
    let engine = engine(true);
    let types = engine.types();
    let inner = types
        .new_exception("Exception", ExceptionData::new("disk full"))
        .unwrap();
    let outer = types
        .new_exception(
            "Exception",
            ExceptionData::new("save failed")
                .with_stack_trace("at save()")
                .with_inner(Value::Object(inner)),
        )
        .unwrap();
    let outer = Value::Object(outer);

    let back = round_trip(&engine, &outer, "Exception");
    assert!(deep_eq(&outer, &back));
    let body = back.as_object().unwrap().data();
    let ObjectData::Exception(data) = &*body else {
        panic!("not an exception");
    };
    assert_eq!(data.message(), Some("save failed"));
    assert_eq!(data.stack_trace(), Some("at save()"));
    assert!(data.inner().as_object().is_some());
}

#[test]
fn member_and_type_handles_resolve_after_decode() {
    let engine = engine(false);
    let types = engine.types();

    let member = types
        .member_value(MemberRef::method("Counter", "next", ["i32"]))
        .unwrap();
    let back = round_trip(&engine, &member, "MemberInfo");
    assert!(deep_eq(&member, &back));

    let property = types.member_value(MemberRef::property("Bag", "count")).unwrap();
    let back = round_trip(&engine, &property, "PropertyInfo");
    assert!(deep_eq(&property, &back));

    let handle = types.type_value(&TypeName::from("Map<string,Node>")).unwrap();
    let back = round_trip(&engine, &handle, "Type");
    assert!(deep_eq(&handle, &back));
}

#[test]
fn delegates_invoke_against_the_decoded_target() {
    let engine = engine(true);
    let types = engine.types();
    let counter = types.new_record("Counter", [("step", Value::I32(10))]).unwrap();
    let tick = types
        .delegate(
            MemberRef::method("Counter", "next", ["i32"]),
            Value::Object(counter.clone()),
        )
        .unwrap();
    counter.set_field("on_tick", tick).unwrap();

    let back = round_trip(&engine, &Value::Object(counter), "Counter");
    let tick = field(&back, "on_tick");
    let body = tick.as_object().unwrap().data();
    let ObjectData::Delegate(data) = &*body else {
        panic!("not a delegate");
    };
    assert!(data.target().ptr_eq(&back));
    drop(body);
    assert_eq!(
        types.invoke_delegate(&tick, &[Value::I32(5)]).unwrap(),
        Value::I32(15)
    );
}

#[test]
fn static_delegate_round_trips_without_target() {
    let engine = engine(false);
    let types = engine.types();
    let zero = types
        .delegate(
            MemberRef::method("Counter", "zero", std::iter::empty::<&str>()),
            Value::Null,
        )
        .unwrap();
    let back = round_trip(&engine, &zero, "Delegate");
    assert_eq!(types.invoke_delegate(&back, &[]).unwrap(), Value::I32(0));
}

#[test]
fn duck_typed_collection_is_rebuilt_through_its_members() {
    let engine = engine(false);
    let types = engine.types();
    let bag = items(types, "Bag", ints([4, 4, 1]));

    let back = round_trip(&engine, &bag, "Bag");
    assert_eq!(back.as_object().unwrap().elements(), ints([4, 4, 1]));
    let ty = types.resolve("Bag").unwrap();
    assert_eq!(engine.codec_for(&ty).unwrap().resolver(), "enumerable");
}

#[test]
fn collection_with_inconsistent_count_is_rejected() {
    let engine = engine(false);
    let liar = items(engine.types(), "LyingBag", ints([1]));
    let err = engine.encode(&liar).unwrap_err();
    assert!(matches!(
        err,
        WireError::CollectionCount {
            reported: 7,
            enumerated: 1,
            ..
        }
    ));
}

#[test]
fn claimed_type_without_constructor_fails_without_fallback() {
    let engine = engine(false);
    let types = engine.types();
    for name in ["SealedBag", "LockedBook"] {
        let ty = types.resolve(name).unwrap();
        let err = engine.codec_for(&ty).unwrap_err();
        assert!(matches!(err, WireError::UnsupportedShape { .. }), "{name}");
        assert_eq!(err.category(), ErrorCategory::UnsupportedShape);
    }
    assert_eq!(engine.cached_codecs(), 0);
}

#[test]
fn dictionary_without_enumerator_is_not_taken_for_a_record() {
    let engine = engine(false);
    let types = engine.types();
    let ty = types.resolve("BlindBook").unwrap();
    let err = engine.codec_for(&ty).unwrap_err();
    assert!(
        matches!(&err, WireError::UnsupportedShape { reason, .. } if reason.contains("enumerator")),
        "{err}"
    );

    let book = ty.members().default_constructor().unwrap().invoke(&ty, &[]).unwrap();
    let err = engine.encode(&book).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnsupportedShape);
    assert_eq!(engine.cached_codecs(), 0);
}

#[test]
fn user_dictionary_round_trips_through_add() {
    let engine = engine(false);
    let types = engine.types();
    let ty = types.resolve("Phonebook").unwrap();
    let book = ty.members().default_constructor().unwrap().invoke(&ty, &[]).unwrap();
    let add = types.find_methods(&ty, "add").remove(0);
    add.invoke(&book, &[Value::str("ann"), Value::I32(101)]).unwrap();
    add.invoke(&book, &[Value::str("bob"), Value::I32(202)]).unwrap();

    let back = round_trip(&engine, &book, "Phonebook");
    assert!(deep_eq(&book, &back));
    assert_eq!(engine.codec_for(&ty).unwrap().resolver(), "dictionary");
}

#[test]
fn abstract_types_have_no_codec() {
    let engine = engine(false);
    let shape = engine.types().resolve("Shape").unwrap();
    let err = engine.codec_for(&shape).unwrap_err();
    assert!(matches!(err, WireError::UnsupportedShape { .. }));
}

#[test]
fn codec_units_are_cached_per_type() {
    let engine = engine(false);
    let ty = engine.types().resolve("Node").unwrap();
    let first = engine.codec_for(&ty).unwrap();
    let second = engine.codec_for(&ty).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.resolver(), "record");
    assert_eq!(first.ty().name().as_str(), "Node");
}

struct CelsiusResolver;

struct CelsiusCodec {
    ty: TypeRef,
}

impl ShapeResolver for CelsiusResolver {
    fn name(&self) -> &'static str {
        "celsius"
    }

    fn can_write(&self, ty: &TypeRef, _types: &TypeRegistry) -> bool {
        ty.name().as_str() == "Celsius"
    }

    fn build(&self, ty: &TypeRef, _types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError> {
        Ok(Box::new(CelsiusCodec { ty: ty.clone() }))
    }
}

impl ValueCodec for CelsiusCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let Some(Value::F64(degrees)) = value.as_object().and_then(|o| o.field("degrees")) else {
            return Err(WireError::Invoke("celsius without degrees".into()));
        };
        enc.writer().write_f64_le(degrees);
        Ok(())
    }

    fn read(&self, dec: &mut Decoder<'_>, slot: Slot) -> Result<Value, WireError> {
        let degrees = dec.reader().read_f64_le()?;
        let obj = ObjRef::new(self.ty.clone(), ObjectData::Fields(vec![Value::F64(degrees)]));
        dec.bind(slot, &obj);
        Ok(Value::Object(obj))
    }
}

#[test]
fn custom_resolver_runs_before_the_record_fallback() {
    let engine = Engine::builder(fixtures()).resolver(CelsiusResolver).build();
    let types = engine.types();
    let reading = Value::Object(
        types
            .new_record("Celsius", [("degrees", Value::F64(21.5))])
            .unwrap(),
    );

    let bytes = engine.encode(&reading).unwrap();
    // token, manifest, eight payload bytes
    assert_eq!(bytes.len(), 1 + 4 + "Celsius".len() + 8);
    let back = engine.decode(&bytes, "Celsius").unwrap();
    assert_eq!(field(&back, "degrees"), Value::F64(21.5));
    let ty = types.resolve("Celsius").unwrap();
    assert_eq!(engine.codec_for(&ty).unwrap().resolver(), "celsius");
}

#[test]
fn depth_limit_applies_to_encode_and_decode() {
    let deep = engine(false);
    let types = deep.types();
    let head = node(types, 0);
    let mut tail = head.clone();
    for value in 1..10 {
        let next = node(types, value);
        tail.set_field("next", Value::Object(next.clone())).unwrap();
        tail = next;
    }
    let head = Value::Object(head);

    let shallow = Engine::builder(fixtures())
        .config(WireConfig {
            max_depth: 4,
            ..WireConfig::default()
        })
        .build();
    let err = shallow.encode(&head).unwrap_err();
    assert!(matches!(err, WireError::DepthLimit(4)));

    let bytes = deep.encode(&head).unwrap();
    let err = shallow.decode(&bytes, "Node").unwrap_err();
    assert!(matches!(err, WireError::DepthLimit(4)));
    assert!(deep_eq(&head, &deep.decode(&bytes, "Node").unwrap()));
}

#[test]
fn default_depth_limit_fits_the_test_thread_stack() {
    let max = WireConfig::default().max_depth;
    for preserve in [false, true] {
        let engine = engine(preserve);
        let types = engine.types();

        // The null ending a chain of n nodes sits at depth n + 1.
        let head = node(types, 0);
        let mut tail = head.clone();
        for value in 1..i32::try_from(max - 1).unwrap() {
            let next = node(types, value);
            tail.set_field("next", Value::Object(next.clone())).unwrap();
            tail = next;
        }
        let head = Value::Object(head);
        let back = round_trip(&engine, &head, "Node");
        assert!(deep_eq(&head, &back));

        tail.set_field("next", Value::Object(node(types, -1))).unwrap();
        assert!(matches!(engine.encode(&head), Err(WireError::DepthLimit(m)) if m == max));

        let mut nested = items(types, "List<object>", Vec::<Value>::new());
        for _ in 1..max {
            nested = items(types, "List<object>", [nested]);
        }
        let back = round_trip(&engine, &nested, "List<object>");
        assert!(deep_eq(&nested, &back));
    }
}

/// Collection tree generated by the round-trip law below.
#[derive(Debug, Clone)]
enum Tree {
    Int(i32),
    Text(String),
    Null,
    List(Vec<Tree>),
    Array(Vec<Tree>),
    Map(BTreeMap<String, Tree>),
    Set(Vec<i64>),
    Immutable(Vec<Tree>),
    Sorted(Vec<Tree>),
}

fn tree() -> impl Strategy<Value = Tree> {
    let leaf = prop_oneof![
        any::<i32>().prop_map(Tree::Int),
        "[a-z]{0,6}".prop_map(Tree::Text),
        Just(Tree::Null),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Tree::List),
            prop::collection::vec(inner.clone(), 0..6).prop_map(Tree::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner.clone(), 0..6).prop_map(Tree::Map),
            prop::collection::vec(any::<i64>(), 0..6).prop_map(Tree::Set),
            prop::collection::vec(inner.clone(), 0..6).prop_map(Tree::Immutable),
            prop::collection::vec(inner, 0..6).prop_map(Tree::Sorted),
        ]
    })
}

fn build(types: &TypeRegistry, tree: &Tree) -> Value {
    let all = |children: &[Tree]| children.iter().map(|t| build(types, t)).collect::<Vec<_>>();
    let object = |name: &str, data: ObjectData| Value::Object(types.new_object(name, data).unwrap());
    match tree {
        Tree::Int(v) => Value::I32(*v),
        Tree::Text(v) => Value::str(v),
        Tree::Null => Value::Null,
        Tree::List(children) => items(types, "List<object>", all(children)),
        Tree::Array(children) => items(types, "Array<object>", all(children)),
        Tree::Map(entries) => object(
            "Map<string,object>",
            ObjectData::Map(
                entries
                    .iter()
                    .map(|(k, t)| (Value::str(k), build(types, t)))
                    .collect(),
            ),
        ),
        Tree::Set(values) => object(
            "Set<i64>",
            ObjectData::Set(values.iter().copied().map(Value::I64).collect()),
        ),
        Tree::Immutable(children) => object(
            "ImmutableList<object>",
            ImmutableFamily::List.create_range(all(children)).unwrap(),
        ),
        Tree::Sorted(children) => object(
            "ImmutableSortedSet<object>",
            ImmutableFamily::SortedSet.create_range(all(children)).unwrap(),
        ),
    }
}

proptest! {
    #[test]
    fn nested_collections_survive_the_round_trip(shape in tree(), preserve in any::<bool>()) {
        let engine = engine(preserve);
        let value = build(engine.types(), &shape);
        let bytes = engine.encode(&value).unwrap();
        let back = engine.decode(&bytes, "object").unwrap();
        prop_assert!(deep_eq(&value, &back));
    }
}
