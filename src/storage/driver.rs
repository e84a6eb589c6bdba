//! # Page Storage Abstraction
//!
//! `PageStorage` is the seam between columns and whatever physically keeps
//! their elements. Columns buffer appended elements in a write page and hand
//! complete pages to the backend; reads of committed elements are copied back
//! out of the backend.
//!
//! ## Copy-Based Interface
//!
//! ```text
//! fn commit_page(&self, id: ColumnId, data: &[u8]) -> Result<()>;
//! fn read_elements(&self, id: ColumnId, first: u64, out: &mut [u8]) -> Result<()>;
//! ```
//!
//! Both sides exchange whole elements. A backend learns the element width of
//! each column when the column connects, and rejects pages that are not a
//! whole number of elements.
//!
//! ## Cluster Boundaries
//!
//! The backend owns the cluster table of every column. Each column starts
//! with one open cluster at element 0; `commit_cluster` closes the open
//! cluster and opens the next one at the current element count:
//!
//! ```text
//! elements:       0 1 2 | 3 4 | 5 6 7 8
//! cluster_starts: [0,     3,    5]
//! locate(4) = cluster 1, index 1
//! ```
//!
//! Columns always flush their write page before committing a cluster, so the
//! boundary lands on the committed element count.
//!
//! ## Thread Safety
//!
//! `PageStorage` requires `Send + Sync`. A single field tree is single
//! threaded, but independent trees may share one backend as long as they
//! were connected with disjoint field id ranges.

use eyre::Result;

use crate::column::{ClusterIndex, ColumnId, ColumnModel};

/// Backend that keeps the committed pages of every connected column.
pub trait PageStorage: Send + Sync {
    /// Number of bytes a column buffers before committing a page.
    fn page_size(&self) -> usize;

    /// Registers a column and returns the number of elements it already
    /// holds. Reconnecting an existing column with the same model is allowed
    /// so a second field tree can read what a first one wrote.
    fn connect_column(&self, id: ColumnId, model: ColumnModel) -> Result<u64>;

    /// Appends a page of whole elements to the column.
    fn commit_page(&self, id: ColumnId, data: &[u8]) -> Result<()>;

    /// Closes the open cluster of the column at its current element count.
    fn commit_cluster(&self, id: ColumnId) -> Result<()>;

    /// Copies `out.len()` bytes worth of elements starting at `first`.
    fn read_elements(&self, id: ColumnId, first: u64, out: &mut [u8]) -> Result<()>;

    fn element_count(&self, id: ColumnId) -> Result<u64>;

    /// Global index of the first element of `cluster_id`.
    fn cluster_start(&self, id: ColumnId, cluster_id: u64) -> Result<u64>;

    /// Translates a global element index into a cluster-relative one.
    ///
    /// Indexes at or past the committed element count resolve into the open
    /// cluster, which lets a column address elements still in its write page.
    fn locate(&self, id: ColumnId, global: u64) -> Result<ClusterIndex>;
}
