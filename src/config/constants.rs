//! # turfield Configuration Constants
//!
//! This module centralizes all configuration constants, grouping interdependent
//! values together and documenting their relationships. Constants that depend
//! on each other are co-located to prevent mismatch bugs.
//!
//! ## Dependency Graph
//!
//! ```text
//! INDEX_ELEMENT_SIZE (4 bytes, u32 cumulative offset)
//!       │
//!       └─> SWITCH_ELEMENT_SIZE (8 bytes = index + u32 tag)
//!             The switch element embeds an index element as its low half.
//!
//! DEFAULT_PAGE_SIZE (64 KiB)
//!       │
//!       ├─> MIN_PAGE_SIZE (must be <=)
//!       │     A page must hold at least one element of the widest column
//!       │     type, otherwise every append would commit a partial element.
//!       │
//!       └─> MAX_ELEMENT_SIZE (must be <= MIN_PAGE_SIZE)
//!
//! MAX_VARIANT_ALTERNATIVES (127)
//!       │
//!       └─> The in-memory tag byte is an i8 storing tag - 1, with -1 as the
//!           "no alternative" sentinel. Tags therefore range over 1..=127.
//!
//! MAX_TYPE_NESTING_DEPTH (16)
//!       │
//!       └─> Bounds factory recursion for nested vector/array/variant/record
//!           type names.
//! ```
//!
//! ## Critical Invariants
//!
//! These invariants are enforced by compile-time assertions:
//!
//! 1. `MIN_PAGE_SIZE <= DEFAULT_PAGE_SIZE`
//! 2. `MAX_ELEMENT_SIZE <= MIN_PAGE_SIZE`
//! 3. `SWITCH_ELEMENT_SIZE == 2 * INDEX_ELEMENT_SIZE`
//! 4. `MAX_VARIANT_ALTERNATIVES <= i8::MAX`
//!
//! ## Usage
//!
//! ```ignore
//! use crate::config::{DEFAULT_PAGE_SIZE, MAX_TYPE_NESTING_DEPTH};
//! ```

// ============================================================================
// COLUMN ELEMENT LAYOUT
// On-disk element widths shared by the column and field layers
// ============================================================================

/// Size of one index column element: a little-endian u32 holding the
/// cluster-relative cumulative item count.
pub const INDEX_ELEMENT_SIZE: usize = 4;

/// Size of one switch column element: little-endian u32 local index followed
/// by little-endian u32 tag.
pub const SWITCH_ELEMENT_SIZE: usize = 8;

/// Widest element any column type stores.
pub const MAX_ELEMENT_SIZE: usize = 8;

const _: () = assert!(
    SWITCH_ELEMENT_SIZE == 2 * INDEX_ELEMENT_SIZE,
    "switch elements must be an index element plus a u32 tag"
);

// ============================================================================
// PAGE CONFIGURATION
// Write pages buffer appended elements before they are committed to storage
// ============================================================================

/// Default number of bytes a column buffers before committing a page.
pub const DEFAULT_PAGE_SIZE: usize = 64 * 1024;

/// Smallest page size accepted by the storage builder.
pub const MIN_PAGE_SIZE: usize = 64;

const _: () = assert!(
    MIN_PAGE_SIZE <= DEFAULT_PAGE_SIZE,
    "MIN_PAGE_SIZE must not exceed DEFAULT_PAGE_SIZE"
);

const _: () = assert!(
    MAX_ELEMENT_SIZE <= MIN_PAGE_SIZE,
    "a page must be able to hold at least one element of every column type"
);

// ============================================================================
// TYPE SYSTEM LIMITS
// Checked when a field tree is built from a type name
// ============================================================================

/// Maximum depth of nested type names accepted by the field factory.
pub const MAX_TYPE_NESTING_DEPTH: usize = 16;

/// Maximum number of alternatives in a variant type.
pub const MAX_VARIANT_ALTERNATIVES: usize = 127;

const _: () = assert!(
    MAX_VARIANT_ALTERNATIVES <= i8::MAX as usize,
    "variant tags are stored as tag - 1 in a signed byte"
);
