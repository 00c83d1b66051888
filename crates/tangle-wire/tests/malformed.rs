// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Decoding hostile or damaged input fails cleanly.
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use proptest::prelude::*;
use tangle_model::{ObjectData, TypeRegistry, Value};
use tangle_wire::{CodecError, Engine, ErrorCategory, WireConfig, WireError, Writer};

use common::{engine, fixtures, ints, items, node};

const MAX: usize = 1 << 20;

fn named(name: &str) -> Writer {
    let mut w = Writer::default();
    w.write_u8(0x02);
    w.write_string(name, MAX).unwrap();
    w
}

fn sample_graph(types: &TypeRegistry) -> Value {
    let head = node(types, 1);
    head.set_field("next", Value::Object(node(types, 2))).unwrap();
    let list = items(types, "List<object>", ints([7, 8]));
    list.as_object()
        .unwrap()
        .with_items(|v| {
            v.push(Value::Object(head.clone()));
            v.push(Value::Object(head));
            v.push(Value::str("tail"));
        })
        .unwrap();
    list
}

#[test]
fn unknown_token_is_rejected() {
    let engine = engine(true);
    for token in [0x04, 0x09, 0x7f, 0xff] {
        let err = engine.decode(&[token], "Node").unwrap_err();
        assert!(matches!(err, WireError::InvalidToken(t) if t == token), "{token:#x}");
        assert_eq!(err.category(), ErrorCategory::MalformedStream);
    }
}

#[test]
fn declared_token_for_an_abstract_slot_is_rejected() {
    let err = engine(false).decode(&[0x01], "Node").unwrap_err();
    assert!(matches!(err, WireError::InvalidToken(0x01)));
}

#[test]
fn strings_never_carry_a_definition() {
    let mut w = Writer::default();
    w.write_u8(0x06);
    w.write_u32_le(0);
    w.write_string("string", MAX).unwrap();
    w.write_string("boxed", MAX).unwrap();
    let err = engine(true).decode(&w.into_vec(), "string").unwrap_err();
    assert!(matches!(err, WireError::InvalidToken(0x06)));
}

#[test]
fn back_reference_to_an_undefined_object_is_rejected() {
    let mut w = Writer::default();
    w.write_u8(0x08);
    w.write_u32_le(5);
    let err = engine(true).decode(&w.into_vec(), "Node").unwrap_err();
    assert!(matches!(err, WireError::DanglingReference(5)));
}

#[test]
fn definition_out_of_order_is_rejected() {
    let engine = engine(true);
    let mut bytes = engine.encode(&Value::Object(node(engine.types(), 1))).unwrap();
    assert_eq!(bytes[0], 0x06);
    bytes[1..5].copy_from_slice(&3u32.to_le_bytes());

    let err = engine.decode(&bytes, "Node").unwrap_err();
    assert!(matches!(err, WireError::SessionOrder { expected: 0, found: 3 }));
    assert_eq!(err.category(), ErrorCategory::SessionOrdering);
}

#[test]
fn reference_to_an_object_under_construction_is_rejected() {
    // An immutable list can only be allocated once its items are read, so
    // an item pointing back at it has nothing to resolve to.
    let mut w = Writer::default();
    w.write_u8(0x06);
    w.write_u32_le(0);
    w.write_string("ImmutableList<object>", MAX).unwrap();
    w.write_len(1).unwrap();
    w.write_u8(0x08);
    w.write_u32_le(0);

    let err = engine(true).decode(&w.into_vec(), "object").unwrap_err();
    assert!(matches!(err, WireError::PendingReference(0)));
    assert_eq!(err.category(), ErrorCategory::SessionOrdering);
}

#[test]
fn cached_manifest_index_must_exist() {
    let mut w = Writer::default();
    w.write_u8(0x03);
    w.write_u32_le(7);
    let err = engine(false).decode(&w.into_vec(), "Node").unwrap_err();
    assert!(matches!(err, WireError::UnknownTypeIndex(7)));
}

#[test]
fn unknown_manifest_name_is_rejected() {
    let err = engine(false)
        .decode(&named("Ghost").into_vec(), "object")
        .unwrap_err();
    assert!(matches!(err, WireError::UnknownType(_)));
    assert_eq!(err.category(), ErrorCategory::UnsupportedShape);
}

#[test]
fn every_truncation_of_a_valid_stream_fails() {
    let engine = engine(true);
    let bytes = engine.encode(&sample_graph(engine.types())).unwrap();
    assert!(engine.decode(&bytes, "List<object>").is_ok());
    for len in 0..bytes.len() {
        assert!(
            engine.decode(&bytes[..len], "List<object>").is_err(),
            "prefix of {len} bytes decoded"
        );
    }
}

#[test]
fn trailing_bytes_are_rejected() {
    let engine = engine(false);
    let mut bytes = engine.encode(&Value::I32(3)).unwrap();
    bytes.extend_from_slice(&[0xAA, 0xBB]);
    let err = engine.decode(&bytes, "i32").unwrap_err();
    assert!(matches!(err, WireError::TrailingBytes(2)));
}

#[test]
fn repeated_map_key_is_rejected() {
    let mut w = named("Map<string,i32>");
    w.write_len(2).unwrap();
    for value in [1, 2] {
        w.write_u8(0x01);
        w.write_string("dup", MAX).unwrap();
        w.write_i32_le(value);
    }
    let err = engine(false).decode(&w.into_vec(), "object").unwrap_err();
    assert!(matches!(err, WireError::DuplicateKey));
}

#[test]
fn repeated_set_element_collapses() {
    let mut w = named("Set<i32>");
    w.write_len(3).unwrap();
    for value in [4, 4, 5] {
        w.write_i32_le(value);
    }
    let back = engine(false).decode(&w.into_vec(), "Set<i32>").unwrap();
    let body = back.as_object().unwrap().data();
    let ObjectData::Set(set) = &*body else {
        panic!("not a set");
    };
    assert_eq!(set.len(), 2);
}

#[test]
fn bool_payload_must_be_zero_or_one() {
    let mut w = named("bool");
    w.write_u8(7);
    let err = engine(false).decode(&w.into_vec(), "bool").unwrap_err();
    assert!(matches!(err, WireError::Codec(CodecError::InvalidBool(7))));
}

#[test]
fn forged_counts_fail_without_allocating() {
    let engine = engine(false);

    let mut w = named("List<i32>");
    w.write_u32_le(u32::MAX);
    let err = engine.decode(&w.into_vec(), "object").unwrap_err();
    assert!(matches!(err, WireError::Codec(CodecError::LengthTooLarge)));

    let mut w = named("Array<i64>");
    w.write_u32_le(1_000_000);
    let err = engine.decode(&w.into_vec(), "object").unwrap_err();
    assert!(matches!(err, WireError::Codec(CodecError::OutOfBounds)));
}

#[test]
fn back_reference_of_the_wrong_type_is_rejected() {
    // A node whose `next` points back at itself is fine; one pointing at the
    // enclosing pair is not.
    let mut w = Writer::default();
    w.write_u8(0x06);
    w.write_u32_le(0);
    w.write_string("Node", MAX).unwrap();
    w.write_i32_le(1);
    w.write_u8(0x08);
    w.write_u32_le(0);
    assert!(engine(true).decode(&w.into_vec(), "Node").is_ok());

    let mut w = Writer::default();
    w.write_u8(0x06);
    w.write_u32_le(0);
    w.write_string("Pair", MAX).unwrap();
    w.write_u8(0x06);
    w.write_u32_le(1);
    w.write_string("Node", MAX).unwrap();
    w.write_i32_le(1);
    w.write_u8(0x08);
    w.write_u32_le(0);
    w.write_u8(0x00);
    let err = engine(true).decode(&w.into_vec(), "Pair").unwrap_err();
    assert!(matches!(err, WireError::TypeMismatch { .. }));
}

#[test]
fn forged_deep_nesting_stops_at_the_depth_limit() {
    let max = WireConfig::default().max_depth;
    let mut w = Writer::default();
    for _ in 0..20 * max {
        w.write_u8(0x02);
        w.write_string("List<object>", MAX).unwrap();
        w.write_len(1).unwrap();
    }
    w.write_u8(0x00);
    let err = engine(false).decode(&w.into_vec(), "object").unwrap_err();
    assert!(matches!(err, WireError::DepthLimit(m) if m == max));
    assert_eq!(err.category(), ErrorCategory::MalformedStream);
}

#[test]
fn manifests_per_stream_are_capped() {
    let permissive = engine(false);
    let types = permissive.types();
    let mixed = items(
        types,
        "List<object>",
        [Value::I32(1), Value::str("two"), Value::I64(3), Value::I32(4)],
    );
    // List<object>, i32, string, i64; the second i32 reuses its cached index.
    let bytes = permissive.encode(&mixed).unwrap();
    assert!(permissive.decode(&bytes, "object").is_ok());

    let strict = Engine::builder(fixtures())
        .config(WireConfig {
            max_manifests: 3,
            ..WireConfig::default()
        })
        .build();
    let err = strict.decode(&bytes, "object").unwrap_err();
    assert!(matches!(err, WireError::ManifestLimit(3)));
    assert_eq!(err.category(), ErrorCategory::MalformedStream);

    let exact = Engine::builder(fixtures())
        .config(WireConfig {
            max_manifests: 4,
            ..WireConfig::default()
        })
        .build();
    assert!(exact.decode(&bytes, "object").is_ok());
}

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let engine = engine(true);
        let _ = engine.decode(&bytes, "object");
        let _ = engine.decode(&bytes, "Node");
    }

    #[test]
    fn corrupted_valid_streams_never_panic(
        flips in prop::collection::vec((any::<prop::sample::Index>(), any::<u8>()), 1..8)
    ) {
        let engine = engine(true);
        let mut bytes = engine.encode(&sample_graph(engine.types())).unwrap();
        for (at, byte) in flips {
            let i = at.index(bytes.len());
            bytes[i] = byte;
        }
        let _ = engine.decode(&bytes, "List<object>");
    }
}
