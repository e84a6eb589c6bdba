//! # Vector Fields
//!
//! A vector field owns an index column and one item sub-field (`_0`). Each
//! entry appends its items to the sub-field, then the cumulative item count
//! of the cluster to the index column:
//!
//! ```text
//! append [1,2,3], [4,5]
//! index (col 0):   3 5
//! item _0 (col 0): 1 2 3 4 5
//!
//! collection_info(0) = (0, 3)
//! collection_info(1) = (3, 2)
//! ```
//!
//! Items of plain numeric types are copied between `RVec` memory and the
//! item column as one block instead of item by item.

use std::slice;

use eyre::{Result, WrapErr};

use super::{Field, FieldBase, Structure};
use crate::column::{ClusterIndex, ColumnModel};
use crate::types::{RawVec, ValueType};

#[derive(Debug)]
pub struct VectorField {
    pub(super) base: FieldBase,
    running_items: u64,
}

impl VectorField {
    pub fn new(name: impl Into<String>, item: Field) -> Self {
        let type_name = format!("vector<{}>", item.type_name());
        let value_type = ValueType::vector(type_name.clone(), item.value_type().clone());
        let mut base = FieldBase::new(name.into(), type_name, Structure::Collection, false, value_type);
        base.push_sub_field(item);
        Self::with_base(base)
    }

    pub(super) fn with_base(base: FieldBase) -> Self {
        Self {
            base,
            running_items: 0,
        }
    }

    pub fn item(&self) -> &Field {
        &self.base.sub_fields[0]
    }

    /// Items written in the current cluster.
    pub fn running_items(&self) -> u64 {
        self.running_items
    }

    pub(super) fn column_models(&self) -> Vec<ColumnModel> {
        vec![ColumnModel::index()]
    }

    /// # Safety
    ///
    /// `ptr` must point to an `RVec` of the item type.
    pub(super) unsafe fn append_raw(&mut self, ptr: *const u8) -> Result<()> {
        // SAFETY: forwarded caller contract.
        let raw = unsafe { &*ptr.cast::<RawVec>() };
        let count = raw.len();
        let item = self.base.sub_field_mut(0)?;
        let item_size = item.value_size();

        if let Some(width) = item.bulk_width().filter(|_| count > 0) {
            // SAFETY: the buffer holds `count` initialized items whose
            // in-memory bytes equal their column encoding.
            let bytes = unsafe { slice::from_raw_parts(raw.as_ptr(), count * width) };
            item.base_mut().column_mut(0)?.append_bulk(bytes)?;
        } else {
            for i in 0..count {
                // SAFETY: item i is initialized and of the item type.
                unsafe { item.append_raw(raw.item_ptr(i, item_size))? };
            }
        }

        self.running_items += count as u64;
        self.base.column_mut(0)?.append_index(self.running_items)
    }

    /// # Safety
    ///
    /// `ptr` must point to a constructed `RVec` of the item type.
    pub(super) unsafe fn read_raw(&self, global: u64, ptr: *mut u8) -> Result<()> {
        // SAFETY: forwarded caller contract.
        let raw = unsafe { &mut *ptr.cast::<RawVec>() };
        let (start, size) = self
            .base
            .column(0)?
            .collection_info(global)
            .wrap_err_with(|| format!("failed to read field '{}' entry {}", self.base.name, global))?;
        let count = size.get() as usize;

        let item = self.item();
        let item_type = item.value_type();
        // SAFETY: the vector holds items of item_type, allocated with its
        // size and alignment.
        unsafe {
            item_type.destroy_items(raw, 0);
            raw.reserve_exact(count, item_type.size(), item_type.align());
        }
        if count == 0 {
            return Ok(());
        }

        if let Some(width) = item.bulk_width() {
            let column = item.principal_column()?;
            let first = column.global_index(start)?;
            // SAFETY: capacity >= count; any bit pattern is a valid value of
            // a bulk-copyable scalar.
            unsafe {
                let bytes = slice::from_raw_parts_mut(raw.as_mut_ptr(), count * width);
                column.read_bulk(first, bytes)?;
                raw.set_len(count);
            }
            return Ok(());
        }

        for i in 0..count {
            let item_ptr = raw.item_ptr(i, item_type.size());
            let position = ClusterIndex::new(start.cluster_id(), start.index() + i as u64);
            // SAFETY: slot i is within capacity. It is constructed before the
            // length covers it, so a failed read leaves a droppable vector.
            unsafe {
                item_type.construct(item_ptr);
                raw.set_len(i + 1);
                item.read_in_cluster_raw(position, item_ptr)?;
            }
        }
        Ok(())
    }

    pub(super) fn commit_cluster(&mut self) {
        self.running_items = 0;
    }
}
