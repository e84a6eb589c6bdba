//! Tests for the fields module

use std::sync::Arc;

use super::*;
use crate::column::{ClusterSize, ColumnType};
use crate::storage::MemoryPageStorage;
use crate::types::{RVec, RecordType, TypeRegistry, Variant2};

#[derive(Debug, Default, Clone, PartialEq)]
struct Hit {
    energy: f64,
    layer: u8,
    label: String,
}
crate::record_type!(Hit { energy: f64, layer: u8, label: String });

fn connected(mut field: Field) -> (Field, Arc<MemoryPageStorage>) {
    let storage = Arc::new(MemoryPageStorage::new());
    field.connect(storage.clone()).unwrap();
    (field, storage)
}

fn u32s(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

// ============================================================================
// Scalars and strings
// ============================================================================

#[test]
fn scalar_field_round_trips_values() {
    let (mut field, _) = connected(Field::scalar("x", ScalarType::F64));
    for mut v in [1.5f64, -2.0, 1e300] {
        field.append(&field.capture(&mut v).unwrap()).unwrap();
    }

    let mut out = field.generate_value();
    field.read(2, &mut out.as_field_value()).unwrap();
    assert_eq!(*out.get::<f64>().unwrap(), 1e300);
    field.read(0, &mut out.as_field_value()).unwrap();
    assert_eq!(*out.get::<f64>().unwrap(), 1.5);
}

#[test]
fn cluster_size_field_accepts_values_in_any_order() {
    let (mut field, storage) = connected(Field::scalar("n", ScalarType::ClusterSize));
    assert_eq!(field.columns()[0].column_type(), ColumnType::Index);
    assert!(!field.columns()[0].model().is_sorted());

    let values = [ClusterSize(5), ClusterSize(3), ClusterSize(0), ClusterSize(u32::MAX)];
    for mut v in values {
        field.append(&field.capture(&mut v).unwrap()).unwrap();
    }
    field.flush().unwrap();
    assert_eq!(
        u32s(&storage.column_bytes(ColumnId::new(0, 0)).unwrap()),
        vec![5, 3, 0, u32::MAX]
    );

    let mut out = ClusterSize(0);
    for (i, expected) in values.iter().enumerate().rev() {
        field.read(i as u64, &mut field.capture(&mut out).unwrap()).unwrap();
        assert_eq!(out, *expected);
    }
}

#[test]
fn bool_field_is_simple_and_reads_back() {
    let (mut field, storage) = connected(Field::scalar("flag", ScalarType::Bool));
    assert!(field.is_simple());
    for mut v in [true, false, true] {
        field.append(&field.capture(&mut v).unwrap()).unwrap();
    }
    field.flush().unwrap();
    assert_eq!(storage.column_bytes(ColumnId::new(0, 0)).unwrap(), vec![1, 0, 1]);

    let mut out = false;
    field.read(2, &mut field.capture(&mut out).unwrap()).unwrap();
    assert!(out);
}

#[test]
fn string_field_writes_bytes_and_cumulative_index() {
    let (mut field, storage) = connected(Field::string("s"));
    for s in ["abc", "", "de"] {
        let mut v = s.to_string();
        field.append(&field.capture(&mut v).unwrap()).unwrap();
    }
    field.flush().unwrap();

    assert_eq!(storage.column_bytes(ColumnId::new(0, 1)).unwrap(), b"abcde");
    assert_eq!(u32s(&storage.column_bytes(ColumnId::new(0, 0)).unwrap()), vec![3, 3, 5]);

    let mut out = String::from("stale contents");
    field.read(1, &mut field.capture(&mut out).unwrap()).unwrap();
    assert_eq!(out, "");
    field.read(2, &mut field.capture(&mut out).unwrap()).unwrap();
    assert_eq!(out, "de");
}

#[test]
fn string_with_embedded_nul_round_trips() {
    let (mut field, _) = connected(Field::string("s"));
    let mut v = String::from("a\0b\0");
    field.append(&field.capture(&mut v).unwrap()).unwrap();

    let mut out = String::new();
    field.read(0, &mut field.capture(&mut out).unwrap()).unwrap();
    assert_eq!(out, "a\0b\0");
}

#[test]
fn string_index_restarts_after_cluster_commit() {
    let (mut field, storage) = connected(Field::string("s"));
    let mut v = "xy".to_string();
    field.append(&field.capture(&mut v).unwrap()).unwrap();
    field.commit_cluster().unwrap();
    field.append(&field.capture(&mut v).unwrap()).unwrap();
    field.flush().unwrap();

    assert_eq!(u32s(&storage.column_bytes(ColumnId::new(0, 0)).unwrap()), vec![2, 2]);
    let mut out = String::new();
    field.read(1, &mut field.capture(&mut out).unwrap()).unwrap();
    assert_eq!(out, "xy");
}

// ============================================================================
// Collections
// ============================================================================

#[test]
fn vector_item_is_attached_as_first_sub_field() {
    let field = Field::vector("v", Field::scalar("_0", ScalarType::U8));
    assert_eq!(field.sub_fields().len(), 1);
    let item = &field.sub_fields()[0];
    assert_eq!((item.name(), item.order()), ("_0", 1));
    assert_eq!(field.order(), 0);
}

#[test]
fn vector_field_writes_cumulative_counts() {
    let (mut field, storage) = connected(Field::vector("v", Field::scalar("_0", ScalarType::I32)));
    let mut a: RVec<i32> = vec![1, 2, 3].into();
    let mut b: RVec<i32> = vec![4, 5].into();
    field.append(&field.capture(&mut a).unwrap()).unwrap();
    field.append(&field.capture(&mut b).unwrap()).unwrap();
    field.flush().unwrap();

    assert_eq!(u32s(&storage.column_bytes(ColumnId::new(0, 0)).unwrap()), vec![3, 5]);
    let index = field.principal_column().unwrap();
    assert_eq!(
        index.collection_info(0).unwrap(),
        (ClusterIndex::new(0, 0), ClusterSize(3))
    );
    assert_eq!(
        index.collection_info(1).unwrap(),
        (ClusterIndex::new(0, 3), ClusterSize(2))
    );

    let mut out: RVec<i32> = vec![9; 7].into();
    field.read(1, &mut field.capture(&mut out).unwrap()).unwrap();
    assert_eq!(out, [4, 5]);
}

#[test]
fn vector_of_strings_reads_items_in_cluster() {
    let (mut field, _) = connected(Field::vector("v", Field::string("_0")));
    let mut first: RVec<String> = vec!["a".to_string()].into();
    let mut second: RVec<String> = vec!["bb".to_string(), "".to_string(), "ccc".to_string()].into();
    field.append(&field.capture(&mut first).unwrap()).unwrap();
    field.commit_cluster().unwrap();
    field.append(&field.capture(&mut second).unwrap()).unwrap();

    let mut out = field.generate_value();
    field.read(1, &mut out.as_field_value()).unwrap();
    assert_eq!(out.get::<RVec<String>>().unwrap(), &second);
    field.read(0, &mut out.as_field_value()).unwrap();
    assert_eq!(out.get::<RVec<String>>().unwrap(), &first);
}

#[test]
fn nested_vectors_round_trip() {
    let factory = FieldFactory::builtin();
    let (mut field, _) = connected(factory.create("vv", "vector<vector<u8>>").unwrap());
    let mut value: RVec<RVec<u8>> =
        RVec::from(vec![RVec::from(vec![1u8]), RVec::new(), RVec::from(vec![2u8, 3])]);
    field.append(&field.capture(&mut value).unwrap()).unwrap();

    let mut out = field.generate_value();
    field.read(0, &mut out.as_field_value()).unwrap();
    assert_eq!(out.get::<RVec<RVec<u8>>>().unwrap(), &value);
}

#[test]
fn array_field_maps_items_to_repeated_entries() {
    let item = Field::scalar("_0", ScalarType::I64);
    let (mut field, storage) = connected(Field::array("a", item, 3).unwrap());
    assert_eq!(field.repetitions(), 3);
    assert_eq!(field.value_size(), 3 * 8);
    assert!(field.columns().is_empty());

    let mut rows = [[1i64, 2, 3], [4, 5, 6]];
    for row in &mut rows {
        field.append(&field.capture(row).unwrap()).unwrap();
    }
    field.flush().unwrap();
    assert_eq!(storage.column_bytes(ColumnId::new(1, 0)).unwrap().len(), 6 * 8);

    let mut out = [0i64; 3];
    field.read(1, &mut field.capture(&mut out).unwrap()).unwrap();
    assert_eq!(out, [4, 5, 6]);
    field
        .read_in_cluster(ClusterIndex::new(0, 0), &mut field.capture(&mut out).unwrap())
        .unwrap();
    assert_eq!(out, [1, 2, 3]);
}

#[test]
fn array_rejects_zero_length() {
    let err = Field::array("a", Field::scalar("_0", ScalarType::U8), 0).unwrap_err();
    assert!(err.to_string().contains("at least one item"));
}

// ============================================================================
// Records
// ============================================================================

fn hit_field(registry: &mut TypeRegistry) -> Field {
    registry.register::<Hit>().unwrap();
    FieldFactory::new(registry).create("hit", "Hit").unwrap()
}

#[test]
fn record_field_uses_member_offsets() {
    let mut registry = TypeRegistry::new();
    let field = hit_field(&mut registry);
    let Field::Record(record) = &field else {
        panic!("expected a record field");
    };

    let offsets: Vec<(String, usize)> = record
        .members()
        .map(|(f, offset)| (f.name().to_string(), offset))
        .collect();
    assert_eq!(
        offsets,
        vec![
            ("energy".to_string(), std::mem::offset_of!(Hit, energy)),
            ("layer".to_string(), std::mem::offset_of!(Hit, layer)),
            ("label".to_string(), std::mem::offset_of!(Hit, label)),
        ]
    );
    assert_eq!(field.value_size(), size_of::<Hit>());
}

#[test]
fn record_field_round_trips() {
    let mut registry = TypeRegistry::new();
    let (mut field, _) = connected(hit_field(&mut registry));
    let mut hits = [
        Hit { energy: 1.25, layer: 3, label: "inner".into() },
        Hit { energy: -7.0, layer: 9, label: String::new() },
    ];
    for hit in &mut hits {
        field.append(&field.capture(hit).unwrap()).unwrap();
    }

    let mut out = Hit::default();
    field.read(1, &mut field.capture(&mut out).unwrap()).unwrap();
    assert_eq!(out, hits[1]);
    field
        .read_in_cluster(ClusterIndex::new(0, 0), &mut field.capture(&mut out).unwrap())
        .unwrap();
    assert_eq!(out, hits[0]);
}

#[test]
fn record_rejects_mismatched_members() {
    let descriptor = Arc::new(Hit::descriptor());
    let members = vec![
        Field::scalar("energy", ScalarType::F32),
        Field::scalar("layer", ScalarType::U8),
        Field::string("label"),
    ];
    let err = Field::record("hit", descriptor.clone(), members).unwrap_err();
    assert!(err.to_string().contains("declared as 'f64'"));

    let err = Field::record("hit", descriptor, vec![Field::string("label")]).unwrap_err();
    assert!(err.to_string().contains("member fields"));
}

// ============================================================================
// Variants
// ============================================================================

#[test]
fn variant_field_writes_switch_elements() {
    let factory = FieldFactory::builtin();
    let (mut field, storage) = connected(factory.create("v", "variant<i32,f64>").unwrap());

    let mut a: Variant2<i32, f64> = Variant2::with_0(7);
    let mut b: Variant2<i32, f64> = Variant2::with_1(2.5);
    field.append(&field.capture(&mut a).unwrap()).unwrap();
    field.append(&field.capture(&mut b).unwrap()).unwrap();
    field.flush().unwrap();

    assert_eq!(u32s(&storage.column_bytes(ColumnId::new(0, 0)).unwrap()), vec![0, 1, 0, 2]);

    let mut out: Variant2<i32, f64> = Variant2::default();
    field.read(1, &mut field.capture(&mut out).unwrap()).unwrap();
    assert_eq!(out.tag(), 2);
    assert_eq!(out.get_1(), Some(&2.5));
    field.read(0, &mut field.capture(&mut out).unwrap()).unwrap();
    assert_eq!(out.tag(), 1);
    assert_eq!(out.get_0(), Some(&7));
}

#[test]
fn variant_switches_alternative_with_owned_members() {
    let factory = FieldFactory::builtin();
    let (mut field, _) = connected(factory.create("v", "variant<string,vector<i32>>").unwrap());

    let mut s: Variant2<String, RVec<i32>> = Variant2::with_0("text".into());
    let mut v: Variant2<String, RVec<i32>> = Variant2::with_1(vec![1, 2].into());
    field.append(&field.capture(&mut s).unwrap()).unwrap();
    field.append(&field.capture(&mut v).unwrap()).unwrap();
    field.append(&field.capture(&mut s).unwrap()).unwrap();

    let mut out = field.generate_value();
    for (entry, expected) in [(0, &s), (1, &v), (2, &s), (1, &v)] {
        field.read(entry, &mut out.as_field_value()).unwrap();
        assert_eq!(out.get::<Variant2<String, RVec<i32>>>().unwrap(), expected);
    }
    let Field::Variant(variant) = &field else {
        panic!("expected a variant field");
    };
    assert_eq!(variant.running_count(0), Some(2));
    assert_eq!(variant.running_count(1), Some(1));
}

#[test]
fn variant_read_fails_on_tag_zero() {
    let (mut field, _) = connected(
        Field::variant("v", vec![Field::scalar("_0", ScalarType::I32)]).unwrap(),
    );
    let mut value = field.generate_value();
    // SAFETY: destroying a variant value leaves it valueless (tag 0), which
    // is still a valid state to append and to drop.
    unsafe { field.value_type().destroy(value.as_ptr()) };
    field.append(&value.as_field_value()).unwrap();

    let mut out = field.generate_value();
    let err = field.read(0, &mut out.as_field_value()).unwrap_err();
    assert!(err.to_string().contains("switch tag 0"));
}

#[test]
fn variant_counters_reset_per_cluster() {
    let factory = FieldFactory::builtin();
    let (mut field, storage) = connected(factory.create("v", "variant<u8,u32>").unwrap());
    let mut x: Variant2<u8, u32> = Variant2::with_0(1);
    field.append(&field.capture(&mut x).unwrap()).unwrap();
    field.append(&field.capture(&mut x).unwrap()).unwrap();
    field.commit_cluster().unwrap();
    field.append(&field.capture(&mut x).unwrap()).unwrap();
    field.flush().unwrap();

    let switch = u32s(&storage.column_bytes(ColumnId::new(0, 0)).unwrap());
    assert_eq!(switch, vec![0, 1, 1, 1, 0, 1]);

    let mut out: Variant2<u8, u32> = Variant2::with_1(5);
    field.read(2, &mut field.capture(&mut out).unwrap()).unwrap();
    assert_eq!(out.get_0(), Some(&1));
}

// ============================================================================
// Tree operations
// ============================================================================

fn sample_schema(registry: &mut TypeRegistry) -> Field {
    registry.register::<Hit>().unwrap();
    let factory = FieldFactory::new(registry);
    let mut root = Field::root();
    root.attach(factory.create("px", "double").unwrap()).unwrap();
    root.attach(factory.create("hits", "std::vector<Hit>").unwrap()).unwrap();
    root.attach(factory.create("pair", "std::variant<int, std::string>").unwrap())
        .unwrap();
    root
}

#[test]
fn root_rejects_duplicate_names_and_late_attach() {
    let mut root = Field::root();
    root.attach(Field::scalar("x", ScalarType::I32)).unwrap();
    let err = root.attach(Field::string("x")).unwrap_err();
    assert!(err.to_string().contains("already has a sub-field named 'x'"));

    root.connect(Arc::new(MemoryPageStorage::new())).unwrap();
    assert!(root.attach(Field::string("y")).is_err());
    assert!(Field::string("s").attach(Field::string("t")).is_err());
}

#[test]
fn root_field_has_no_values() {
    let mut root = Field::root();
    assert_eq!(root.value_size(), 0);
    assert_eq!(root.name(), "");
    assert_eq!(root.structure(), Structure::Record);

    let mut value = root.generate_value();
    assert!(root.append(&value.as_field_value()).is_err());
    assert!(root.read(0, &mut value.as_field_value()).is_err());
}

#[test]
fn connect_assigns_depth_first_ids() {
    let mut registry = TypeRegistry::new();
    let mut root = sample_schema(&mut registry);
    let next = root.connect(Arc::new(MemoryPageStorage::new())).unwrap();

    let ids: Vec<(String, u64)> = root
        .iter()
        .map(|e| (e.field.name().to_string(), e.field.on_disk_id().unwrap()))
        .collect();
    let names: Vec<&str> = ids.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        ["px", "hits", "_0", "energy", "layer", "label", "pair", "_0", "_1"]
    );
    let numbers: Vec<u64> = ids.iter().map(|(_, id)| *id).collect();
    assert_eq!(numbers, (1..=9).collect::<Vec<_>>());
    assert_eq!(root.on_disk_id(), Some(0));
    assert_eq!(next, 10);

    assert!(root.connect(Arc::new(MemoryPageStorage::new())).is_err());
}

#[test]
fn iterator_reports_level_order_and_siblings() {
    let mut registry = TypeRegistry::new();
    let root = sample_schema(&mut registry);
    let entries: Vec<(&str, usize, usize, usize)> = root
        .iter()
        .map(|e| (e.field.name(), e.level, e.order, e.siblings))
        .collect();
    assert_eq!(entries[0], ("px", 1, 1, 3));
    assert_eq!(entries[2], ("_0", 2, 1, 1));
    assert_eq!(entries[5], ("label", 3, 3, 3));
    assert_eq!(entries[6], ("pair", 1, 3, 3));
    assert_eq!(entries[8], ("_1", 2, 2, 2));
    assert_eq!(root.iter().count(), 9);
}

#[test]
fn schema_printer_renders_tree() {
    let mut registry = TypeRegistry::new();
    let root = sample_schema(&mut registry);
    let text = SchemaPrinter::render(&root);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "<root>");
    assert_eq!(lines[1], "  px: f64");
    assert_eq!(lines[2], "  hits: vector<Hit> [collection]");
    assert_eq!(lines[3], "    _0: Hit [record]");
    assert_eq!(lines[4], "      energy: f64");
    assert_eq!(lines[7], "  pair: variant<i32,string> [variant of 2]");
}

#[test]
fn clone_as_copies_structure_without_connection() {
    let mut registry = TypeRegistry::new();
    let mut root = sample_schema(&mut registry);
    root.connect(Arc::new(MemoryPageStorage::new())).unwrap();

    let Field::Root(inner) = &root else { unreachable!() };
    let hits = inner.get("hits").unwrap();
    let copy = hits.clone_as("more_hits");
    assert_eq!(copy.name(), "more_hits");
    assert_eq!(copy.type_name(), "vector<Hit>");
    assert_eq!(copy.order(), 0);
    assert!(!copy.is_connected());
    assert!(copy.columns().is_empty());

    let orig: Vec<(&str, usize)> = hits.iter().map(|e| (e.field.name(), e.order)).collect();
    let cloned: Vec<(&str, usize)> = copy.iter().map(|e| (e.field.name(), e.order)).collect();
    assert_eq!(orig, cloned);
    assert!(copy.iter().all(|e| !e.field.is_connected()));
}

#[test]
fn generate_columns_is_idempotent() {
    let mut field = Field::string("s");
    field.generate_columns();
    field.generate_columns();
    let types: Vec<ColumnType> = field.columns().iter().map(|c| c.column_type()).collect();
    assert_eq!(types, [ColumnType::Index, ColumnType::Byte]);
}

#[test]
fn split_value_addresses_sub_values() {
    let mut registry = TypeRegistry::new();
    let field = hit_field(&mut registry);
    let mut hit = Hit { energy: 2.0, layer: 4, label: "x".into() };
    let mut value = field.capture(&mut hit).unwrap();
    let mut parts = field.split_value(&mut value).unwrap();

    assert_eq!(parts.len(), 3);
    assert_eq!(*parts[0].get::<f64>().unwrap(), 2.0);
    *parts[1].get_mut::<u8>().unwrap() = 5;
    assert_eq!(parts[2].get::<String>().unwrap(), "x");
    drop(parts);
    assert_eq!(hit.layer, 5);
}

#[test]
fn split_vector_value_yields_items() {
    let field = Field::vector("v", Field::string("_0"));
    let mut v: RVec<String> = vec!["a".to_string(), "b".to_string()].into();
    let mut value = field.capture(&mut v).unwrap();
    let parts = field.split_value(&mut value).unwrap();
    let items: Vec<&String> = parts.iter().map(|p| p.get::<String>().unwrap()).collect();
    assert_eq!(items, ["a", "b"]);
}

#[test]
fn capture_rejects_wrong_type() {
    let field = Field::scalar("x", ScalarType::I32);
    let mut wrong = 1.0f32;
    let err = field.capture(&mut wrong).unwrap_err();
    assert!(err.to_string().contains("cannot be accessed as 'f32'"));
}

#[test]
fn append_rejects_value_of_other_field() {
    let (mut a, _) = connected(Field::scalar("a", ScalarType::I32));
    let b = Field::scalar("b", ScalarType::I64);
    let mut value = b.generate_value();
    let err = a.append(&value.as_field_value()).unwrap_err();
    assert!(err.to_string().contains("cannot use a value of type 'i64'"));
}

#[test]
fn unconnected_field_reports_missing_columns() {
    let mut field = Field::scalar("x", ScalarType::U64);
    let mut v = 3u64;
    let err = field.append(&field.capture(&mut v).unwrap()).unwrap_err();
    assert!(err.to_string().contains("connect the field before use"));
}

#[test]
fn generate_value_at_and_destroy_value_at_run_in_place() {
    let field = Field::vector("v", Field::string("_0"));
    let mut slot = std::mem::MaybeUninit::<RVec<String>>::uninit();
    let ptr = std::ptr::NonNull::new(slot.as_mut_ptr().cast::<u8>()).unwrap();
    // SAFETY: slot is sized and aligned for the field's value type.
    unsafe {
        let mut value = field.generate_value_at(ptr);
        value.get_mut::<RVec<String>>().unwrap().push("owned".into());
        field.destroy_value_at(value).unwrap();
    }
    let owned = field.generate_value();
    field.destroy_value(owned).unwrap();
}
