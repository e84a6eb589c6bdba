//! # turfield - Typed Field-to-Column Mapping
//!
//! turfield decomposes typed in-memory values into flat, append-only
//! columns and reassembles them on read. A schema is a tree of fields that
//! mirrors the value type; each field owns the columns for its part of the
//! value:
//!
//! - **Scalars** map to one value column
//! - **Strings and vectors** map to an index column of cumulative counts plus
//!   their payload
//! - **Records** spread over their members, **arrays** over repeated items
//! - **Variants** map to a switch column of `(index, tag)` pairs plus one
//!   sub-field per alternative
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use turfield::{Field, FieldFactory, MemoryPageStorage, RVec};
//!
//! let storage = Arc::new(MemoryPageStorage::new());
//! let mut field = FieldFactory::builtin().create("jets", "std::vector<float>")?;
//! field.connect(storage.clone())?;
//!
//! let mut jets: RVec<f32> = vec![41.5, 17.0].into();
//! field.append(&field.capture(&mut jets)?)?;
//! field.commit_cluster()?;
//!
//! let mut out = field.generate_value();
//! field.read(0, &mut out.as_field_value())?;
//! assert_eq!(out.get::<RVec<f32>>()?, &[41.5, 17.0]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Field factory (type name → tree)  │
//! ├─────────────────────────────────────┤
//! │  Field tree (append / read / split) │
//! ├──────────────────┬──────────────────┤
//! │   Value types    │     Columns      │
//! │ (layout, ctor,   │ (write page,     │
//! │  dtor)           │  cluster index)  │
//! ├──────────────────┴──────────────────┤
//! │       PageStorage (in memory)       │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`]: Page sizes, nesting and alternative limits
//! - [`column`]: Column types, element encodings, cluster addressing
//! - [`storage`]: The `PageStorage` backend trait and its in-memory backend
//! - [`types`]: Scalar types, type names, `RVec`, variants, record descriptors
//! - [`fields`]: The field tree, the factory, iteration and visitors

#[macro_use]
mod macros;

pub mod column;
pub mod config;
pub mod fields;
pub mod storage;
pub mod types;

pub use column::{ClusterIndex, ClusterSize, Column, ColumnId, ColumnModel, ColumnType, FieldId};
pub use fields::{
    Field, FieldEntry, FieldFactory, FieldValue, FieldVisitor, OwnedValue, SchemaPrinter,
    Structure,
};
pub use storage::{MemoryPageStorage, PageStorage};
pub use types::{
    FieldType, RVec, RecordDescriptor, RecordType, ScalarType, TypeRegistry, Variant2, Variant3,
    Variant4,
};
