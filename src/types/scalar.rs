//! Scalar value types and their little-endian column encoding.
//!
//! | Scalar | In memory | Column | Notes |
//! |--------|-----------|--------|-------|
//! | bool | 1 byte | Bit | decodes any non-zero byte as `true` |
//! | u8 | 1 byte | Byte | |
//! | i32, u32 | 4 bytes | Int32 | |
//! | i64, u64 | 8 bytes | Int64 | |
//! | f32 | 4 bytes | Real32 | bit pattern preserved |
//! | f64 | 8 bytes | Real64 | bit pattern preserved |
//! | cluster_size | 4 bytes | Index (unsorted) | `ClusterSize` newtype, any order |

use std::fmt;
use std::ptr;

use crate::column::{ClusterSize, ColumnModel, ColumnType};
use crate::config::MAX_ELEMENT_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    U8,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    ClusterSize,
}

impl ScalarType {
    pub const ALL: [ScalarType; 9] = [
        ScalarType::Bool,
        ScalarType::U8,
        ScalarType::I32,
        ScalarType::U32,
        ScalarType::I64,
        ScalarType::U64,
        ScalarType::F32,
        ScalarType::F64,
        ScalarType::ClusterSize,
    ];

    /// Canonical type name.
    pub fn type_name(self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::U8 => "u8",
            ScalarType::I32 => "i32",
            ScalarType::U32 => "u32",
            ScalarType::I64 => "i64",
            ScalarType::U64 => "u64",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
            ScalarType::ClusterSize => "cluster_size",
        }
    }

    /// Looks up a canonical (already normalized) type name.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.type_name() == name)
    }

    pub fn size(self) -> usize {
        match self {
            ScalarType::Bool | ScalarType::U8 => 1,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 | ScalarType::ClusterSize => 4,
            ScalarType::I64 | ScalarType::U64 | ScalarType::F64 => 8,
        }
    }

    pub fn align(self) -> usize {
        match self {
            ScalarType::Bool | ScalarType::U8 => align_of::<u8>(),
            ScalarType::I32 | ScalarType::U32 => align_of::<u32>(),
            ScalarType::F32 => align_of::<f32>(),
            ScalarType::ClusterSize => align_of::<ClusterSize>(),
            ScalarType::I64 | ScalarType::U64 => align_of::<u64>(),
            ScalarType::F64 => align_of::<f64>(),
        }
    }

    pub fn column_model(self) -> ColumnModel {
        match self {
            ScalarType::Bool => ColumnModel::new(ColumnType::Bit, false),
            ScalarType::U8 => ColumnModel::new(ColumnType::Byte, false),
            ScalarType::I32 | ScalarType::U32 => ColumnModel::new(ColumnType::Int32, false),
            ScalarType::I64 | ScalarType::U64 => ColumnModel::new(ColumnType::Int64, false),
            ScalarType::F32 => ColumnModel::new(ColumnType::Real32, false),
            ScalarType::F64 => ColumnModel::new(ColumnType::Real64, false),
            ScalarType::ClusterSize => ColumnModel::new(ColumnType::Index, false),
        }
    }

    /// Encodes the value at `src` into `out` and returns the element width.
    ///
    /// # Safety
    ///
    /// `src` must point to an initialized, aligned value of this scalar type.
    pub unsafe fn encode(self, src: *const u8, out: &mut [u8; MAX_ELEMENT_SIZE]) -> usize {
        fn put<const N: usize>(out: &mut [u8; MAX_ELEMENT_SIZE], bytes: [u8; N]) -> usize {
            out[..N].copy_from_slice(&bytes);
            N
        }

        // SAFETY: the caller guarantees `src` holds a valid value of the type
        // selected by `self`.
        unsafe {
            match self {
                ScalarType::Bool => put(out, [*src.cast::<bool>() as u8]),
                ScalarType::U8 => put(out, [*src]),
                ScalarType::I32 => put(out, src.cast::<i32>().read().to_le_bytes()),
                ScalarType::U32 => put(out, src.cast::<u32>().read().to_le_bytes()),
                ScalarType::I64 => put(out, src.cast::<i64>().read().to_le_bytes()),
                ScalarType::U64 => put(out, src.cast::<u64>().read().to_le_bytes()),
                ScalarType::F32 => put(out, src.cast::<f32>().read().to_le_bytes()),
                ScalarType::F64 => put(out, src.cast::<f64>().read().to_le_bytes()),
                ScalarType::ClusterSize => put(out, src.cast::<ClusterSize>().read().0.to_le_bytes()),
            }
        }
    }

    /// Decodes one column element into the value at `dst`.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of this scalar type and aligned for it.
    /// `bytes` must hold at least `self.size()` bytes.
    pub unsafe fn decode(self, bytes: &[u8], dst: *mut u8) {
        fn le<const N: usize>(bytes: &[u8]) -> [u8; N] {
            let mut buf = [0u8; N];
            buf.copy_from_slice(&bytes[..N]);
            buf
        }

        // SAFETY: the caller guarantees `dst` is writable and aligned for the
        // type selected by `self`; scalars have no drop glue.
        unsafe {
            match self {
                ScalarType::Bool => ptr::write(dst.cast::<bool>(), bytes[0] != 0),
                ScalarType::U8 => ptr::write(dst, bytes[0]),
                ScalarType::I32 => ptr::write(dst.cast::<i32>(), i32::from_le_bytes(le(bytes))),
                ScalarType::U32 => ptr::write(dst.cast::<u32>(), u32::from_le_bytes(le(bytes))),
                ScalarType::I64 => ptr::write(dst.cast::<i64>(), i64::from_le_bytes(le(bytes))),
                ScalarType::U64 => ptr::write(dst.cast::<u64>(), u64::from_le_bytes(le(bytes))),
                ScalarType::F32 => ptr::write(dst.cast::<f32>(), f32::from_le_bytes(le(bytes))),
                ScalarType::F64 => ptr::write(dst.cast::<f64>(), f64::from_le_bytes(le(bytes))),
                ScalarType::ClusterSize => {
                    ptr::write(dst.cast::<ClusterSize>(), ClusterSize(u32::from_le_bytes(le(bytes))))
                }
            }
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_width_matches_column_type() {
        for scalar in ScalarType::ALL {
            assert_eq!(
                scalar.size(),
                scalar.column_model().column_type().element_size(),
                "{}",
                scalar
            );
            assert_eq!(ScalarType::from_type_name(scalar.type_name()), Some(scalar));
        }
    }

    #[test]
    fn bool_decodes_any_nonzero_byte_as_true() {
        let mut value = false;
        unsafe { ScalarType::Bool.decode(&[0x7f], (&mut value as *mut bool).cast()) };
        assert!(value);

        let mut out = [0u8; MAX_ELEMENT_SIZE];
        let n = unsafe { ScalarType::Bool.encode((&value as *const bool).cast(), &mut out) };
        assert_eq!(&out[..n], &[1]);
    }

    #[test]
    fn floats_keep_their_bit_pattern() {
        let value = f64::from_bits(0x7ff8_0000_0000_0001);
        let mut out = [0u8; MAX_ELEMENT_SIZE];
        let n = unsafe { ScalarType::F64.encode((&value as *const f64).cast(), &mut out) };
        assert_eq!(n, 8);

        let mut back = 0.0f64;
        unsafe { ScalarType::F64.decode(&out[..n], (&mut back as *mut f64).cast()) };
        assert_eq!(back.to_bits(), value.to_bits());
    }

    #[test]
    fn integers_encode_little_endian() {
        let value = -2i32;
        let mut out = [0u8; MAX_ELEMENT_SIZE];
        let n = unsafe { ScalarType::I32.encode((&value as *const i32).cast(), &mut out) };
        assert_eq!(&out[..n], &[0xfe, 0xff, 0xff, 0xff]);
    }
}
