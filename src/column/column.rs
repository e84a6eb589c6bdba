//! # Column
//!
//! A `Column` buffers appended elements in a write page and commits the page
//! to its `PageStorage` once it reaches the backend's page size, on `flush`,
//! and before every cluster boundary.
//!
//! ```text
//!            committed (in storage)          write page
//! global:  0 1 2 ... n_committed-1 | n_committed ... n_elements-1
//! ```
//!
//! Reads below `n_committed` are served by the backend, the rest from the
//! write page, so values can be read back before they are flushed.
//!
//! ## Sorted Columns
//!
//! Index columns are sorted within a cluster: each appended element must be
//! at least the previous one. The check resets at every cluster boundary
//! because index values restart from zero.

use std::fmt;
use std::sync::Arc;

use eyre::{bail, ensure, eyre, Result, WrapErr};
use tracing::{trace, warn};
use zerocopy::IntoBytes;

use super::{ClusterIndex, ClusterSize, ColumnId, ColumnModel, ColumnType, IndexElement, SwitchElement};
use crate::config::{INDEX_ELEMENT_SIZE, SWITCH_ELEMENT_SIZE};
use crate::storage::PageStorage;

struct ColumnHandle {
    id: ColumnId,
    storage: Arc<dyn PageStorage>,
    page_size: usize,
}

pub struct Column {
    model: ColumnModel,
    element_size: usize,
    page: Vec<u8>,
    n_elements: u64,
    n_committed: u64,
    last_sorted: Option<u32>,
    handle: Option<ColumnHandle>,
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("model", &self.model)
            .field("id", &self.handle.as_ref().map(|h| h.id))
            .field("n_elements", &self.n_elements)
            .field("n_committed", &self.n_committed)
            .finish()
    }
}

impl Column {
    pub fn new(model: ColumnModel) -> Self {
        Self {
            model,
            element_size: model.column_type().element_size(),
            page: Vec::new(),
            n_elements: 0,
            n_committed: 0,
            last_sorted: None,
            handle: None,
        }
    }

    pub fn model(&self) -> ColumnModel {
        self.model
    }

    pub fn column_type(&self) -> ColumnType {
        self.model.column_type()
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    pub fn n_elements(&self) -> u64 {
        self.n_elements
    }

    pub fn id(&self) -> Option<ColumnId> {
        self.handle.as_ref().map(|h| h.id)
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Attaches the column to a backend. Elements the backend already holds
    /// for `id` become readable through this column.
    pub fn connect(&mut self, id: ColumnId, storage: Arc<dyn PageStorage>) -> Result<()> {
        if let Some(handle) = &self.handle {
            bail!("column {} is already connected, cannot connect as {}", handle.id, id);
        }

        let existing = storage.connect_column(id, self.model)?;
        let page_size = storage.page_size().max(self.element_size);
        self.page.reserve(page_size);
        self.n_elements = existing;
        self.n_committed = existing;
        self.handle = Some(ColumnHandle {
            id,
            storage,
            page_size,
        });
        Ok(())
    }

    fn handle(&self) -> Result<&ColumnHandle> {
        self.handle
            .as_ref()
            .ok_or_else(|| eyre!("{} column is not connected to storage", self.column_type()))
    }

    pub fn append(&mut self, element: &[u8]) -> Result<()> {
        ensure!(
            element.len() == self.element_size,
            "{} column expects {}-byte elements, got {} bytes",
            self.column_type(),
            self.element_size,
            element.len()
        );
        self.append_bulk(element)
    }

    /// Appends a run of elements packed back to back.
    pub fn append_bulk(&mut self, elements: &[u8]) -> Result<()> {
        let page_size = self.handle()?.page_size;
        ensure!(
            elements.len() % self.element_size == 0,
            "{} bytes is not a whole number of {}-byte {} elements",
            elements.len(),
            self.element_size,
            self.column_type()
        );

        if self.model.is_sorted() {
            self.check_sorted(elements)?;
        }

        let mut rest = elements;
        while !rest.is_empty() {
            let room = page_size - page_size % self.element_size - self.page.len();
            let take = room.min(rest.len());
            self.page.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.page.len() + self.element_size > page_size {
                self.commit_page()?;
            }
        }

        self.n_elements += (elements.len() / self.element_size) as u64;
        Ok(())
    }

    fn check_sorted(&mut self, elements: &[u8]) -> Result<()> {
        for chunk in elements.chunks_exact(self.element_size) {
            let value = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            if let Some(last) = self.last_sorted {
                ensure!(
                    value >= last,
                    "index column {} would decrease from {} to {} within a cluster",
                    self.id().map_or_else(|| "?".to_string(), |id| id.to_string()),
                    last,
                    value
                );
            }
            self.last_sorted = Some(value);
        }
        Ok(())
    }

    /// Appends a cumulative item count to an index column.
    pub fn append_index(&mut self, count: u64) -> Result<()> {
        ensure!(
            self.column_type() == ColumnType::Index,
            "cannot append an index element to a {} column",
            self.column_type()
        );
        let count = u32::try_from(count)
            .map_err(|_| eyre!("cluster item count {} exceeds the u32 index range", count))?;
        self.append(IndexElement::new(count).as_bytes())
    }

    /// Appends a (local index, tag) pair to a switch column.
    pub fn append_switch(&mut self, index: u64, tag: u32) -> Result<()> {
        ensure!(
            self.column_type() == ColumnType::Switch,
            "cannot append a switch element to a {} column",
            self.column_type()
        );
        let index = u32::try_from(index)
            .map_err(|_| eyre!("alternative index {} exceeds the u32 switch range", index))?;
        self.append(SwitchElement::new(index, tag).as_bytes())
    }

    pub fn read(&self, global: u64, out: &mut [u8]) -> Result<()> {
        ensure!(
            out.len() == self.element_size,
            "{} column reads {}-byte elements, buffer has {} bytes",
            self.column_type(),
            self.element_size,
            out.len()
        );
        self.read_bulk(global, out)
    }

    /// Reads `out.len() / element_size` consecutive elements starting at
    /// `first`. The run may span committed pages and the write page.
    pub fn read_bulk(&self, first: u64, out: &mut [u8]) -> Result<()> {
        let handle = self.handle()?;
        ensure!(
            out.len() % self.element_size == 0,
            "read buffer of {} bytes is not a whole number of {} elements",
            out.len(),
            self.column_type()
        );

        let count = (out.len() / self.element_size) as u64;
        ensure!(
            first + count <= self.n_elements,
            "read of elements {}..{} past end of {} column ({} elements)",
            first,
            first + count,
            self.column_type(),
            self.n_elements
        );

        let n_stored = self.n_committed.saturating_sub(first).min(count);
        let split = n_stored as usize * self.element_size;
        let (stored, buffered) = out.split_at_mut(split);
        if !stored.is_empty() {
            handle.storage.read_elements(handle.id, first, stored)?;
        }
        if !buffered.is_empty() {
            let page_first = (first + n_stored - self.n_committed) as usize * self.element_size;
            buffered.copy_from_slice(&self.page[page_first..page_first + buffered.len()]);
        }
        Ok(())
    }

    pub fn read_in_cluster(&self, index: ClusterIndex, out: &mut [u8]) -> Result<()> {
        let global = self.global_index(index)?;
        self.read(global, out)
    }

    pub fn global_index(&self, index: ClusterIndex) -> Result<u64> {
        let handle = self.handle()?;
        let start = handle.storage.cluster_start(handle.id, index.cluster_id())?;
        Ok(start + index.index())
    }

    pub fn cluster_index(&self, global: u64) -> Result<ClusterIndex> {
        let handle = self.handle()?;
        handle.storage.locate(handle.id, global)
    }

    fn read_index_value(&self, global: u64) -> Result<u32> {
        let mut buf = [0u8; INDEX_ELEMENT_SIZE];
        self.read(global, &mut buf)?;
        IndexElement::decode(&buf)
            .map(|e| e.count())
            .ok_or_else(|| eyre!("truncated index element at {}", global))
    }

    /// Start (cluster relative) and length of entry `global` of an index
    /// column.
    pub fn collection_info(&self, global: u64) -> Result<(ClusterIndex, ClusterSize)> {
        ensure!(
            self.column_type() == ColumnType::Index,
            "collection info requested from a {} column",
            self.column_type()
        );

        let position = self.cluster_index(global)?;
        let end = self
            .read_index_value(global)
            .wrap_err_with(|| format!("failed to read index entry {}", global))?;
        let start = if position.index() == 0 {
            0
        } else {
            self.read_index_value(global - 1)?
        };

        ensure!(
            start <= end,
            "index entry {} ends at {} before its start {}",
            global,
            end,
            start
        );

        Ok((
            ClusterIndex::new(position.cluster_id(), start as u64),
            ClusterSize(end - start),
        ))
    }

    /// Cluster-relative alternative index and tag of entry `global` of a
    /// switch column.
    pub fn switch_info(&self, global: u64) -> Result<(ClusterIndex, u32)> {
        ensure!(
            self.column_type() == ColumnType::Switch,
            "switch info requested from a {} column",
            self.column_type()
        );

        let position = self.cluster_index(global)?;
        let mut buf = [0u8; SWITCH_ELEMENT_SIZE];
        self.read(global, &mut buf)?;
        let Some(elem) = SwitchElement::decode(&buf) else {
            bail!("truncated switch element at {}", global);
        };
        Ok((
            ClusterIndex::new(position.cluster_id(), elem.index() as u64),
            elem.tag(),
        ))
    }

    fn commit_page(&mut self) -> Result<()> {
        if self.page.is_empty() {
            return Ok(());
        }
        let handle = self.handle()?;
        handle.storage.commit_page(handle.id, &self.page)?;
        trace!(column = %handle.id, bytes = self.page.len(), "flushed write page");
        self.n_committed += (self.page.len() / self.element_size) as u64;
        self.page.clear();
        Ok(())
    }

    /// Commits the write page to storage.
    pub fn flush(&mut self) -> Result<()> {
        if self.handle.is_none() && self.page.is_empty() {
            return Ok(());
        }
        self.commit_page()
    }

    /// Flushes and marks a cluster boundary at the current element count.
    pub fn commit_cluster(&mut self) -> Result<()> {
        self.commit_page()?;
        let handle = self.handle()?;
        handle.storage.commit_cluster(handle.id)?;
        self.last_sorted = None;
        Ok(())
    }
}

impl Drop for Column {
    fn drop(&mut self) {
        if !self.page.is_empty() {
            warn!(
                column = ?self.id(),
                bytes = self.page.len(),
                "dropping column with unflushed elements"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryPageStorage;

    fn connected(model: ColumnModel, page_size: usize) -> (Column, Arc<MemoryPageStorage>) {
        let storage = Arc::new(MemoryPageStorage::builder().page_size(page_size).build().unwrap());
        let mut column = Column::new(model);
        column.connect(ColumnId::new(1, 0), storage.clone()).unwrap();
        (column, storage)
    }

    #[test]
    fn append_without_storage_fails() {
        let mut column = Column::new(ColumnModel::new(ColumnType::Int32, false));
        assert!(column.append(&5i32.to_le_bytes()).is_err());
    }

    #[test]
    fn reads_span_committed_pages_and_write_page() {
        let (mut column, storage) = connected(ColumnModel::new(ColumnType::Int32, false), 64);
        for v in 0..40i32 {
            column.append(&v.to_le_bytes()).unwrap();
        }
        assert!(storage.stats().pages_committed >= 2);

        let mut out = vec![0u8; 40 * 4];
        column.read_bulk(0, &mut out).unwrap();
        let values: Vec<i32> = out
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(values, (0..40).collect::<Vec<_>>());

        column.flush().unwrap();
        let mut one = [0u8; 4];
        column.read(39, &mut one).unwrap();
        assert_eq!(i32::from_le_bytes(one), 39);
    }

    #[test]
    fn collection_info_uses_cumulative_counts() {
        let (mut column, _storage) = connected(ColumnModel::index(), 1024);
        column.append_index(3).unwrap();
        column.append_index(5).unwrap();
        column.append_index(5).unwrap();

        assert_eq!(
            column.collection_info(0).unwrap(),
            (ClusterIndex::new(0, 0), ClusterSize(3))
        );
        assert_eq!(
            column.collection_info(1).unwrap(),
            (ClusterIndex::new(0, 3), ClusterSize(2))
        );
        assert_eq!(column.collection_info(2).unwrap().1, ClusterSize(0));
    }

    #[test]
    fn index_column_rejects_decrease_within_cluster_only() {
        let (mut column, _storage) = connected(ColumnModel::index(), 1024);
        column.append_index(4).unwrap();
        assert!(column.append_index(2).is_err());

        column.commit_cluster().unwrap();
        column.append_index(2).unwrap();
        assert_eq!(
            column.collection_info(1).unwrap(),
            (ClusterIndex::new(1, 0), ClusterSize(2))
        );
    }

    #[test]
    fn switch_info_decodes_index_and_tag() {
        let (mut column, _storage) = connected(ColumnModel::switch(), 1024);
        column.append_switch(0, 1).unwrap();
        column.append_switch(4, 2).unwrap();
        assert_eq!(column.switch_info(1).unwrap(), (ClusterIndex::new(0, 4), 2));
        assert!(column.collection_info(0).is_err());
    }

    #[test]
    fn cluster_local_reads_translate_through_storage() {
        let (mut column, _storage) = connected(ColumnModel::new(ColumnType::Byte, false), 64);
        column.append_bulk(b"abc").unwrap();
        column.commit_cluster().unwrap();
        column.append_bulk(b"de").unwrap();

        let mut out = [0u8; 1];
        column.read_in_cluster(ClusterIndex::new(1, 1), &mut out).unwrap();
        assert_eq!(&out, b"e");
        assert_eq!(column.cluster_index(4).unwrap(), ClusterIndex::new(1, 1));
    }

    #[test]
    fn wrong_element_width_is_rejected() {
        let (mut column, _storage) = connected(ColumnModel::new(ColumnType::Real64, false), 1024);
        assert!(column.append(&[0u8; 4]).is_err());
        assert!(column.append_index(1).is_err());
    }

    #[test]
    fn second_column_sees_flushed_elements() {
        let (mut writer, storage) = connected(ColumnModel::new(ColumnType::Int64, false), 1024);
        writer.append(&42i64.to_le_bytes()).unwrap();
        writer.flush().unwrap();

        let mut reader = Column::new(ColumnModel::new(ColumnType::Int64, false));
        reader.connect(ColumnId::new(1, 0), storage).unwrap();
        assert_eq!(reader.n_elements(), 1);
        let mut out = [0u8; 8];
        reader.read(0, &mut out).unwrap();
        assert_eq!(i64::from_le_bytes(out), 42);
    }
}
