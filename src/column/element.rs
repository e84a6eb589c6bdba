//! # Index and Switch Element Layouts
//!
//! On-disk layouts for the two structural column types. Both are plain
//! little-endian structs with no padding so they can be copied straight into
//! and out of column pages.
//!
//! ```text
//! IndexElement  (4 bytes): | count: u32 LE |
//! SwitchElement (8 bytes): | index: u32 LE | tag: u32 LE |
//! ```
//!
//! A switch tag of 0 means "no active alternative" and is never produced for a
//! constructed variant value.

use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{INDEX_ELEMENT_SIZE, SWITCH_ELEMENT_SIZE};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct IndexElement {
    count: U32<LittleEndian>,
}

impl IndexElement {
    pub fn new(count: u32) -> Self {
        Self {
            count: U32::new(count),
        }
    }

    zerocopy_accessors! {
        count: u32,
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        Self::read_from_bytes(bytes.get(..INDEX_ELEMENT_SIZE)?).ok()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct SwitchElement {
    index: U32<LittleEndian>,
    tag: U32<LittleEndian>,
}

impl SwitchElement {
    pub fn new(index: u32, tag: u32) -> Self {
        Self {
            index: U32::new(index),
            tag: U32::new(tag),
        }
    }

    zerocopy_accessors! {
        index: u32,
        tag: u32,
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        Self::read_from_bytes(bytes.get(..SWITCH_ELEMENT_SIZE)?).ok()
    }
}

const _: () = assert!(size_of::<IndexElement>() == INDEX_ELEMENT_SIZE);
const _: () = assert!(size_of::<SwitchElement>() == SWITCH_ELEMENT_SIZE);
