//! Rust types that can be captured as field values.
//!
//! `FieldType` ties a Rust type to the canonical type name of the field that
//! reads and writes it. Capturing a `&mut T` as a field value checks the name
//! and the size and alignment against the field, so a value can never be
//! reinterpreted as another type.
//!
//! | Rust type | Type name |
//! |-----------|-----------|
//! | `bool`, `u8`, `i32`, `u32`, `i64`, `u64`, `f32`, `f64` | same |
//! | `ClusterSize` | `cluster_size` |
//! | `String` | `string` |
//! | `RVec<T>` | `vector<T>` |
//! | `[T; N]` | `array<T,N>` |
//! | `Variant2<A, B>` .. `Variant4` | `variant<A,B>` |
//! | records declared with `record_type!` | the record name |

use super::RVec;
use crate::column::ClusterSize;

/// Rust type with the in-memory layout its field type name describes.
///
/// # Safety
///
/// The field built from `type_name()` constructs, destroys, reads and writes
/// values of this type through raw pointers. Implementors must have exactly
/// the layout that field assumes.
pub unsafe trait FieldType: 'static {
    fn type_name() -> String;
}

macro_rules! scalar_field_type {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            // SAFETY: scalar fields read and write the type's native layout.
            unsafe impl FieldType for $ty {
                fn type_name() -> String {
                    $name.to_string()
                }
            }
        )*
    };
}

scalar_field_type! {
    bool => "bool",
    u8 => "u8",
    i32 => "i32",
    u32 => "u32",
    i64 => "i64",
    u64 => "u64",
    f32 => "f32",
    f64 => "f64",
    ClusterSize => "cluster_size",
}

// SAFETY: string fields construct, drop and assign values as `String`.
unsafe impl FieldType for String {
    fn type_name() -> String {
        "string".to_string()
    }
}

// SAFETY: vector fields treat values as `RawVec`, which `RVec<T>` wraps
// transparently, and allocate items with T's size and alignment.
unsafe impl<T: FieldType> FieldType for RVec<T> {
    fn type_name() -> String {
        format!("vector<{}>", T::type_name())
    }
}

// SAFETY: array fields address N items at a stride of size_of::<T>().
unsafe impl<T: FieldType, const N: usize> FieldType for [T; N] {
    fn type_name() -> String {
        format!("array<{},{}>", T::type_name(), N)
    }
}
