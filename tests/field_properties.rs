//! # Field Property Tests
//!
//! Randomized checks of the laws every field kind must satisfy:
//!
//! - Round trip: reading entry `i` yields the value appended as entry `i`,
//!   regardless of cluster boundaries and page size
//! - Size law: `n` items of a vector or array occupy exactly `n` item entries
//! - Variant tag law: alternative `k` is written and read back with tag `k+1`
//! - Record offset law: members never alias

use std::sync::Arc;

use proptest::prelude::*;
use turfield::{
    record_type, ColumnId, Field, FieldFactory, MemoryPageStorage, RVec, RecordType, TypeRegistry,
    Variant3,
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Sample {
    flag: bool,
    small: u8,
    label: String,
    wide: i64,
    ratio: f32,
}
record_type!(Sample {
    flag: bool,
    small: u8,
    label: String,
    wide: i64,
    ratio: f32,
});

fn storage(page_size: usize) -> Arc<MemoryPageStorage> {
    Arc::new(MemoryPageStorage::builder().page_size(page_size).build().unwrap())
}

fn index_values(storage: &MemoryPageStorage, id: ColumnId) -> Vec<u32> {
    storage
        .column_bytes(id)
        .unwrap()
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn sample() -> impl Strategy<Value = Sample> {
    (any::<bool>(), any::<u8>(), ".{0,12}", any::<i64>(), -1e6f32..1e6).prop_map(
        |(flag, small, label, wide, ratio)| Sample {
            flag,
            small,
            label,
            wide,
            ratio,
        },
    )
}

fn variant() -> impl Strategy<Value = Variant3<i32, String, RVec<u32>>> {
    prop_oneof![
        any::<i32>().prop_map(Variant3::with_0),
        "[a-z\\x00]{0,8}".prop_map(Variant3::with_1),
        prop::collection::vec(any::<u32>(), 0..6).prop_map(|v| Variant3::with_2(v.into())),
    ]
}

proptest! {
    #[test]
    fn strings_round_trip_across_clusters(
        values in prop::collection::vec(".{0,40}", 1..60),
        cluster_len in 1usize..10,
        page_size in prop::sample::select(vec![64usize, 100, 4096]),
    ) {
        let mut field = Field::string("s");
        field.connect(storage(page_size)).unwrap();
        let mut values = values;
        for (i, value) in values.iter_mut().enumerate() {
            field.append(&field.capture(value).unwrap()).unwrap();
            if i % cluster_len == cluster_len - 1 {
                field.commit_cluster().unwrap();
            }
        }

        let mut out = String::new();
        for (i, expected) in values.iter().enumerate() {
            field.read(i as u64, &mut field.capture(&mut out).unwrap()).unwrap();
            prop_assert_eq!(&out, expected);
        }
    }

    #[test]
    fn vector_index_counts_items(lens in prop::collection::vec(0usize..20, 1..30)) {
        let store = storage(128);
        let mut field = FieldFactory::builtin().create("v", "vector<f64>").unwrap();
        field.connect(store.clone()).unwrap();

        let mut total = 0u32;
        let mut expected_index = Vec::new();
        for (i, len) in lens.iter().enumerate() {
            let mut v: RVec<f64> = (0..*len).map(|k| (i * 100 + k) as f64).collect();
            field.append(&field.capture(&mut v).unwrap()).unwrap();
            total += *len as u32;
            expected_index.push(total);
        }
        field.flush().unwrap();

        prop_assert_eq!(index_values(&store, ColumnId::new(0, 0)), expected_index);
        let item_bytes = store.column_bytes(ColumnId::new(1, 0)).unwrap();
        prop_assert_eq!(item_bytes.len(), total as usize * 8);

        let mut out = field.generate_value();
        for (i, len) in lens.iter().enumerate() {
            field.read(i as u64, &mut out.as_field_value()).unwrap();
            let items = out.get::<RVec<f64>>().unwrap();
            prop_assert_eq!(items.len(), *len);
            prop_assert!(items.iter().enumerate().all(|(k, x)| *x == (i * 100 + k) as f64));
        }
    }

    #[test]
    fn array_size_law(len in 1usize..9, entries in 1usize..20) {
        let store = storage(64);
        let type_name = format!("std::array<bool,{len}>");
        let mut field = FieldFactory::builtin().create("a", &type_name).unwrap();
        prop_assert_eq!(field.value_size(), len);
        prop_assert_eq!(field.repetitions(), len);
        field.connect(store.clone()).unwrap();

        let mut value = field.generate_value();
        for _ in 0..entries {
            field.append(&value.as_field_value()).unwrap();
        }
        field.flush().unwrap();
        prop_assert_eq!(store.column_bytes(ColumnId::new(1, 0)).unwrap().len(), len * entries);
    }

    #[test]
    fn variant_tag_law(values in prop::collection::vec(variant(), 1..40)) {
        let store = storage(256);
        let mut field = FieldFactory::builtin()
            .create("v", "variant<i32,string,vector<u32>>")
            .unwrap();
        field.connect(store.clone()).unwrap();

        let mut values = values;
        for value in values.iter_mut() {
            field.append(&field.capture(value).unwrap()).unwrap();
        }
        field.flush().unwrap();

        let switch = index_values(&store, ColumnId::new(0, 0));
        let mut seen = [0u32; 3];
        for (value, element) in values.iter().zip(switch.chunks_exact(2)) {
            let k = value.tag() as usize - 1;
            prop_assert_eq!(element, &[seen[k], value.tag()][..]);
            seen[k] += 1;
        }

        let mut out = field.generate_value();
        for (i, expected) in values.iter().enumerate() {
            field.read(i as u64, &mut out.as_field_value()).unwrap();
            let got = out.get::<Variant3<i32, String, RVec<u32>>>().unwrap();
            prop_assert_eq!(got.tag(), expected.tag());
            prop_assert_eq!(got, expected);
        }
    }

    #[test]
    fn record_members_do_not_alias(samples in prop::collection::vec(sample(), 1..30)) {
        let mut registry = TypeRegistry::new();
        registry.register::<Sample>().unwrap();
        let mut field = FieldFactory::new(&registry).create_for::<Sample>("s").unwrap();
        field.connect(storage(64)).unwrap();

        let mut samples = samples;
        for sample in samples.iter_mut() {
            field.append(&field.capture(sample).unwrap()).unwrap();
        }
        let mut out = Sample::default();
        for (i, expected) in samples.iter().enumerate() {
            field.read(i as u64, &mut field.capture(&mut out).unwrap()).unwrap();
            prop_assert_eq!(&out, expected);
        }
    }
}

#[test]
fn record_descriptor_offsets_cover_disjoint_ranges() {
    let descriptor = Sample::descriptor();
    let factory = FieldFactory::builtin();
    let mut spans: Vec<(usize, usize)> = descriptor
        .members()
        .iter()
        .map(|m| {
            let size = factory.create(m.name(), m.type_name()).unwrap().value_size();
            (m.offset(), m.offset() + size)
        })
        .collect();
    spans.sort_unstable();
    assert!(spans.windows(2).all(|w| w[0].1 <= w[1].0));
    assert!(spans.iter().all(|&(_, end)| end <= descriptor.size()));
    assert_eq!(descriptor.size(), size_of::<Sample>());
}
