//! # In-Memory Page Storage
//!
//! `MemoryPageStorage` keeps every column as a growable byte buffer plus its
//! cluster table. It is the backend used by tests, benchmarks and any caller
//! that only needs round trips within one process.
//!
//! ## Layout
//!
//! ```text
//! MemoryPageStorage
//! ├── page_size
//! ├── RwLock<HashMap<ColumnId, ColumnPages>>
//! │     ColumnPages { model, bytes, n_elements, cluster_starts, n_pages }
//! └── RwLock<StorageStats>
//! ```
//!
//! Reads take the shared lock, page and cluster commits take the exclusive
//! one. Nothing here blocks on I/O.

use eyre::{bail, ensure, eyre, Result};
use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::PageStorage;
use crate::column::{ClusterIndex, ColumnId, ColumnModel};
use crate::config::{DEFAULT_PAGE_SIZE, MIN_PAGE_SIZE};

/// Counters of committed work, mainly for tests and benchmarks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub columns: u64,
    pub pages_committed: u64,
    pub bytes_committed: u64,
    pub clusters_committed: u64,
}

#[derive(Debug)]
struct ColumnPages {
    model: ColumnModel,
    element_size: usize,
    bytes: Vec<u8>,
    n_elements: u64,
    cluster_starts: Vec<u64>,
    n_pages: u64,
}

impl ColumnPages {
    fn new(model: ColumnModel) -> Self {
        Self {
            model,
            element_size: model.column_type().element_size(),
            bytes: Vec::new(),
            n_elements: 0,
            cluster_starts: vec![0],
            n_pages: 0,
        }
    }

    fn locate(&self, global: u64) -> ClusterIndex {
        // cluster_starts is sorted and starts with 0, so the partition point
        // is at least 1.
        let cluster = self.cluster_starts.partition_point(|&start| start <= global) - 1;
        let start = self.cluster_starts[cluster];
        ClusterIndex::new(cluster as u64, global - start)
    }
}

#[derive(Debug)]
pub struct MemoryPageStorage {
    page_size: usize,
    columns: RwLock<HashMap<ColumnId, ColumnPages>>,
    stats: RwLock<StorageStats>,
}

impl Default for MemoryPageStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPageStorage {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            columns: RwLock::new(HashMap::new()),
            stats: RwLock::new(StorageStats::default()),
        }
    }

    pub fn builder() -> MemoryPageStorageBuilder {
        MemoryPageStorageBuilder::new()
    }

    pub fn stats(&self) -> StorageStats {
        *self.stats.read()
    }

    /// Connected column ids in ascending order.
    pub fn column_ids(&self) -> Vec<ColumnId> {
        let mut ids: Vec<ColumnId> = self.columns.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn column_model(&self, id: ColumnId) -> Option<ColumnModel> {
        self.columns.read().get(&id).map(|c| c.model)
    }

    /// Copy of every committed byte of a column.
    pub fn column_bytes(&self, id: ColumnId) -> Option<Vec<u8>> {
        self.columns.read().get(&id).map(|c| c.bytes.clone())
    }

    pub fn cluster_starts(&self, id: ColumnId) -> Option<Vec<u64>> {
        self.columns.read().get(&id).map(|c| c.cluster_starts.clone())
    }

    pub fn page_count(&self, id: ColumnId) -> Option<u64> {
        self.columns.read().get(&id).map(|c| c.n_pages)
    }
}

impl PageStorage for MemoryPageStorage {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn connect_column(&self, id: ColumnId, model: ColumnModel) -> Result<u64> {
        let mut columns = self.columns.write();
        if let Some(existing) = columns.get(&id) {
            ensure!(
                existing.model == model,
                "column {} already connected as {:?}, cannot reconnect as {:?}",
                id,
                existing.model,
                model
            );
            debug!(column = %id, elements = existing.n_elements, "reconnected column");
            return Ok(existing.n_elements);
        }

        columns.insert(id, ColumnPages::new(model));
        self.stats.write().columns += 1;
        debug!(column = %id, column_type = %model.column_type(), "connected column");
        Ok(0)
    }

    fn commit_page(&self, id: ColumnId, data: &[u8]) -> Result<()> {
        let mut columns = self.columns.write();
        let column = columns
            .get_mut(&id)
            .ok_or_else(|| eyre!("column {} is not connected", id))?;

        ensure!(
            data.len() % column.element_size == 0,
            "page of {} bytes is not a whole number of {}-byte elements for column {}",
            data.len(),
            column.element_size,
            id
        );

        let n_new = (data.len() / column.element_size) as u64;
        column.bytes.extend_from_slice(data);
        column.n_elements += n_new;
        column.n_pages += 1;

        let mut stats = self.stats.write();
        stats.pages_committed += 1;
        stats.bytes_committed += data.len() as u64;

        trace!(column = %id, elements = n_new, total = column.n_elements, "committed page");
        Ok(())
    }

    fn commit_cluster(&self, id: ColumnId) -> Result<()> {
        let mut columns = self.columns.write();
        let column = columns
            .get_mut(&id)
            .ok_or_else(|| eyre!("column {} is not connected", id))?;

        column.cluster_starts.push(column.n_elements);
        self.stats.write().clusters_committed += 1;
        Ok(())
    }

    fn read_elements(&self, id: ColumnId, first: u64, out: &mut [u8]) -> Result<()> {
        let columns = self.columns.read();
        let column = columns
            .get(&id)
            .ok_or_else(|| eyre!("column {} is not connected", id))?;

        ensure!(
            out.len() % column.element_size == 0,
            "read buffer of {} bytes is not a whole number of elements for column {}",
            out.len(),
            id
        );

        let count = (out.len() / column.element_size) as u64;
        if first + count > column.n_elements {
            bail!(
                "read of elements {}..{} past end of column {} ({} elements)",
                first,
                first + count,
                id,
                column.n_elements
            );
        }

        let offset = first as usize * column.element_size;
        out.copy_from_slice(&column.bytes[offset..offset + out.len()]);
        Ok(())
    }

    fn element_count(&self, id: ColumnId) -> Result<u64> {
        self.columns
            .read()
            .get(&id)
            .map(|c| c.n_elements)
            .ok_or_else(|| eyre!("column {} is not connected", id))
    }

    fn cluster_start(&self, id: ColumnId, cluster_id: u64) -> Result<u64> {
        let columns = self.columns.read();
        let column = columns
            .get(&id)
            .ok_or_else(|| eyre!("column {} is not connected", id))?;

        column
            .cluster_starts
            .get(cluster_id as usize)
            .copied()
            .ok_or_else(|| {
                eyre!(
                    "cluster {} does not exist in column {} ({} clusters)",
                    cluster_id,
                    id,
                    column.cluster_starts.len()
                )
            })
    }

    fn locate(&self, id: ColumnId, global: u64) -> Result<ClusterIndex> {
        self.columns
            .read()
            .get(&id)
            .map(|c| c.locate(global))
            .ok_or_else(|| eyre!("column {} is not connected", id))
    }
}

/// Builder for [`MemoryPageStorage`].
pub struct MemoryPageStorageBuilder {
    page_size: Option<usize>,
}

impl Default for MemoryPageStorageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPageStorageBuilder {
    pub fn new() -> Self {
        Self { page_size: None }
    }

    /// Sets the write page size in bytes. Defaults to `DEFAULT_PAGE_SIZE`.
    ///
    /// Small pages are useful in tests to force reads that span committed
    /// pages and the unflushed write page.
    pub fn page_size(mut self, bytes: usize) -> Self {
        self.page_size = Some(bytes);
        self
    }

    pub fn build(self) -> Result<MemoryPageStorage> {
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        ensure!(
            page_size >= MIN_PAGE_SIZE,
            "page size {} is below the minimum of {} bytes",
            page_size,
            MIN_PAGE_SIZE
        );
        Ok(MemoryPageStorage::with_page_size(page_size))
    }
}
