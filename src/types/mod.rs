//! # Type System
//!
//! Everything the field engine needs to know about in-memory values, kept
//! apart from the field tree that maps them onto columns.
//!
//! ## Module Structure
//!
//! - `scalar`: `ScalarType`, the primitive value types and their column encoding
//! - `type_name`: canonical type names, aliases and template argument parsing
//! - `field_type`: `FieldType`, the link between Rust types and type names
//! - `rvec`: `RVec<T>` / `RawVec`, the vector layout shared with the engine
//! - `variant`: `VariantLayout` and the `Variant2`..`Variant4` wrappers
//! - `descriptor`: `RecordDescriptor`, `RecordType` and `TypeRegistry`
//! - `value_type`: `ValueType`, the construct/destroy tree behind owned values
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | `ScalarType` | bool, integers, floats, cluster sizes |
//! | `FieldType` | Rust type ↔ field type name, checked on capture |
//! | `RVec<T>` | vector values |
//! | `Variant2<A, B>` | variant values |
//! | `RecordDescriptor` | member table of a record type |
//! | `ValueType` | size, alignment, construction and destruction of values |
//!
//! ## Usage
//!
//! ```ignore
//! use turfield::types::{FieldType, RVec, Variant2};
//!
//! assert_eq!(<RVec<Variant2<i32, f64>>>::type_name(), "vector<variant<i32,f64>>");
//! ```

mod descriptor;
mod field_type;
mod rvec;
mod scalar;
pub mod type_name;
mod value_type;
mod variant;

pub use descriptor::{MemberDescriptor, RecordDescriptor, RecordDescriptorBuilder, RecordType, TypeRegistry};
pub use field_type::FieldType;
pub use rvec::{RVec, RawVec};
pub use scalar::ScalarType;
pub use value_type::{ValueKind, ValueType};
pub use variant::{Variant2, Variant3, Variant4, VariantLayout};
