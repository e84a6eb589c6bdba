//! Fixed-size array fields. An `array<T,N>` has no column of its own; entry
//! `e` occupies items `e*N .. e*N+N` of its item sub-field, globally and
//! within a cluster.

use std::slice;

use eyre::{ensure, Result};

use super::{Field, FieldBase, Structure};
use crate::column::ClusterIndex;
use crate::types::ValueType;

#[derive(Debug)]
pub struct ArrayField {
    pub(super) base: FieldBase,
    len: usize,
}

impl ArrayField {
    pub fn new(name: impl Into<String>, item: Field, len: usize) -> Result<Self> {
        let name = name.into();
        ensure!(len > 0, "array field '{}' must have at least one item", name);

        let type_name = format!("array<{},{}>", item.type_name(), len);
        let value_type = ValueType::array(type_name.clone(), item.value_type().clone(), len)?;
        let mut base = FieldBase::new(name, type_name, Structure::Leaf, false, value_type);
        base.repetitions = len;
        base.attach(item)?;
        Ok(Self { base, len })
    }

    pub(super) fn clone_with(&self, base: FieldBase) -> Self {
        Self { base, len: self.len }
    }

    pub fn item(&self) -> &Field {
        &self.base.sub_fields[0]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    ///
    /// `ptr` must point to `len` constructed items.
    pub(super) unsafe fn append_raw(&mut self, ptr: *const u8) -> Result<()> {
        let len = self.len;
        let item = self.base.sub_field_mut(0)?;
        let item_size = item.value_size();

        if let Some(width) = item.bulk_width() {
            // SAFETY: the array is contiguous and its bytes equal the column
            // encoding of its items.
            let bytes = unsafe { slice::from_raw_parts(ptr, len * width) };
            return item.base_mut().column_mut(0)?.append_bulk(bytes);
        }
        for i in 0..len {
            // SAFETY: item i lies inside the array.
            unsafe { item.append_raw(ptr.add(i * item_size))? };
        }
        Ok(())
    }

    /// # Safety
    ///
    /// `ptr` must point to `len` constructed items.
    pub(super) unsafe fn read_raw(&self, global: u64, ptr: *mut u8) -> Result<()> {
        let item = self.item();
        let first = global * self.len as u64;

        if item.bulk_width().is_some() {
            // SAFETY: forwarded caller contract.
            return unsafe { self.read_raw_items(first, ptr) };
        }
        for i in 0..self.len {
            // SAFETY: item i lies inside the array.
            unsafe { item.read_raw(first + i as u64, ptr.add(i * item.value_size()))? };
        }
        Ok(())
    }

    /// # Safety
    ///
    /// `ptr` must point to `len` constructed items.
    pub(super) unsafe fn read_in_cluster_raw(&self, index: ClusterIndex, ptr: *mut u8) -> Result<()> {
        let item = self.item();
        let first = index.index() * self.len as u64;

        if item.bulk_width().is_some() {
            let global = item
                .principal_column()?
                .global_index(ClusterIndex::new(index.cluster_id(), first))?;
            // SAFETY: forwarded caller contract.
            return unsafe { self.read_raw_items(global, ptr) };
        }
        for i in 0..self.len {
            let position = ClusterIndex::new(index.cluster_id(), first + i as u64);
            // SAFETY: item i lies inside the array.
            unsafe { item.read_in_cluster_raw(position, ptr.add(i * item.value_size()))? };
        }
        Ok(())
    }

    /// Reads `len` bulk-copyable items starting at item `first`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writes of the whole array.
    unsafe fn read_raw_items(&self, first: u64, ptr: *mut u8) -> Result<()> {
        let item = self.item();
        let width = item.value_size();
        // SAFETY: forwarded caller contract; any bit pattern is a valid
        // value of a bulk-copyable scalar.
        let bytes = unsafe { slice::from_raw_parts_mut(ptr, self.len * width) };
        item.principal_column()?.read_bulk(first, bytes)
    }
}
