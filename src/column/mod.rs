//! # Columns
//!
//! A column is an append-only, randomly readable sequence of fixed-size
//! elements of one primitive on-disk type. Fields translate typed values into
//! one or more columns; the column layer knows nothing about the values it
//! stores beyond their element width.
//!
//! ## Column Types
//!
//! | Type | Element | Bits on disk | Used by |
//! |------|---------|--------------|---------|
//! | **Index** | u32 LE, cluster-relative cumulative count | 32 | string, vector, cluster_size |
//! | **Switch** | u32 LE local index + u32 LE tag | 64 | variant |
//! | **Byte** | u8 | 8 | u8, string characters |
//! | **Bit** | u8 (0 or 1) | 8 | bool |
//! | **Real64** | f64 LE | 64 | f64 |
//! | **Real32** | f32 LE | 32 | f32 |
//! | **Int64** | i64/u64 LE | 64 | i64, u64 |
//! | **Int32** | i32/u32 LE | 32 | i32, u32 |
//!
//! ## Index Encoding
//!
//! Index columns store, per logical entry, the running total of items written
//! in the current cluster. The entry `i` of a cluster spans
//! `[value[i - 1], value[i])` of the content column, with `value[-1] = 0`:
//!
//! ```text
//! entries:        [1,2,3]  [4,5]  []   [6]
//! index column:      3       5     5    6
//! content column: 1 2 3 4 5 6
//! ```
//!
//! ## Cluster Addressing
//!
//! Every column records where each cluster starts. A `ClusterIndex` names an
//! element by (cluster id, index within the cluster). Cluster ids are shared
//! by all columns of a field tree because every column marks a boundary when
//! the tree commits a cluster, so a cluster-relative offset read from an index
//! column can be resolved against the content column of the same cluster.
//!
//! ## Module Structure
//!
//! - `element`: zerocopy layouts of index and switch elements
//! - `column`: the `Column` itself (write page, reads, cluster translation)

mod column;
mod element;

pub use column::Column;
pub use element::{IndexElement, SwitchElement};

use std::fmt;
use std::ops::Add;

/// Identifier of a field within a connected field tree.
pub type FieldId = u64;

/// Canonical on-disk element type of a column.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Index = 1,
    Switch = 2,
    Byte = 3,
    Bit = 4,
    Real64 = 5,
    Real32 = 6,
    Int64 = 7,
    Int32 = 8,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Index => "Index",
            ColumnType::Switch => "Switch",
            ColumnType::Byte => "Byte",
            ColumnType::Bit => "Bit",
            ColumnType::Real64 => "Real64",
            ColumnType::Real32 => "Real32",
            ColumnType::Int64 => "Int64",
            ColumnType::Int32 => "Int32",
        }
    }

    pub fn bits_on_disk(self) -> u32 {
        self.element_size() as u32 * 8
    }

    /// Width of one element in bytes.
    pub fn element_size(self) -> usize {
        match self {
            ColumnType::Index => crate::config::INDEX_ELEMENT_SIZE,
            ColumnType::Switch => crate::config::SWITCH_ELEMENT_SIZE,
            ColumnType::Byte | ColumnType::Bit => 1,
            ColumnType::Real64 | ColumnType::Int64 => 8,
            ColumnType::Real32 | ColumnType::Int32 => 4,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static metadata of a column: element type and whether element values
/// must be non-decreasing within a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnModel {
    column_type: ColumnType,
    is_sorted: bool,
}

impl ColumnModel {
    pub fn new(column_type: ColumnType, is_sorted: bool) -> Self {
        Self {
            column_type,
            is_sorted,
        }
    }

    pub fn index() -> Self {
        Self::new(ColumnType::Index, true)
    }

    pub fn switch() -> Self {
        Self::new(ColumnType::Switch, false)
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_sorted(&self) -> bool {
        self.is_sorted
    }
}

/// Storage address of a column: owning field id plus position among that
/// field's columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId {
    pub field_id: FieldId,
    pub column_index: u32,
}

impl ColumnId {
    pub fn new(field_id: FieldId, column_index: u32) -> Self {
        Self {
            field_id,
            column_index,
        }
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field_id, self.column_index)
    }
}

/// Element address relative to the start of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ClusterIndex {
    cluster_id: u64,
    index: u64,
}

impl ClusterIndex {
    pub fn new(cluster_id: u64, index: u64) -> Self {
        Self { cluster_id, index }
    }

    pub fn cluster_id(&self) -> u64 {
        self.cluster_id
    }

    pub fn index(&self) -> u64 {
        self.index
    }
}

impl Add<u64> for ClusterIndex {
    type Output = ClusterIndex;

    fn add(self, rhs: u64) -> ClusterIndex {
        ClusterIndex::new(self.cluster_id, self.index + rhs)
    }
}

impl fmt::Display for ClusterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cluster_id, self.index)
    }
}

/// Item count stored in an index column.
///
/// Exposed as a scalar field type so an index column can be written directly,
/// e.g. when a collection's items are appended by a separate field tree.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClusterSize(pub u32);

impl ClusterSize {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ClusterSize {
    fn from(value: u32) -> Self {
        ClusterSize(value)
    }
}
