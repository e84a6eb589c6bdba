//! # Variant Fields
//!
//! A variant field owns one switch column and one sub-field per alternative
//! (`_0`, `_1`, ...). Alternative `k` has tag `k + 1`; tag 0 means the value
//! holds no alternative.
//!
//! Each entry appends the active alternative to its sub-field and then a
//! switch element pointing at it:
//!
//! ```text
//! variant<i32,f64>: append 7 (tag 1), 2.5 (tag 2), 8 (tag 1)
//! switch (col 0): (0,1) (0,2) (1,1)
//! _0 (i32):       7 8
//! _1 (f64):       2.5
//! ```
//!
//! The in-memory value follows [`VariantLayout`]: payload at offset 0 and
//! the tag byte at `tag_offset`.

use eyre::{bail, ensure, Result, WrapErr};
use smallvec::{smallvec, SmallVec};

use super::{Field, FieldBase, Structure};
use crate::column::ColumnModel;
use crate::config::MAX_VARIANT_ALTERNATIVES;
use crate::types::{ValueType, VariantLayout};

#[derive(Debug)]
pub struct VariantField {
    pub(super) base: FieldBase,
    layout: VariantLayout,
    running: SmallVec<[u64; 4]>,
}

impl VariantField {
    pub fn new(name: impl Into<String>, alternatives: Vec<Field>) -> Result<Self> {
        let name = name.into();
        ensure!(
            !alternatives.is_empty(),
            "variant field '{}' needs at least one alternative",
            name
        );
        ensure!(
            alternatives.len() <= MAX_VARIANT_ALTERNATIVES,
            "variant field '{}' has {} alternatives, at most {} are supported",
            name,
            alternatives.len(),
            MAX_VARIANT_ALTERNATIVES
        );

        let type_names: Vec<&str> = alternatives.iter().map(Field::type_name).collect();
        let type_name = format!("variant<{}>", type_names.join(","));
        let value_type = ValueType::variant(
            type_name.clone(),
            alternatives.iter().map(|a| a.value_type().clone()).collect(),
        )?;
        let layout = VariantLayout::new(alternatives.iter().map(|a| (a.value_size(), a.alignment())));

        let mut base = FieldBase::new(name, type_name, Structure::Variant, false, value_type);
        for alternative in alternatives {
            base.attach(alternative)
                .wrap_err_with(|| format!("invalid alternatives for variant field '{}'", base.name))?;
        }
        Ok(Self::with_parts(base, layout))
    }

    fn with_parts(base: FieldBase, layout: VariantLayout) -> Self {
        let running = smallvec![0; base.sub_fields.len()];
        Self {
            base,
            layout,
            running,
        }
    }

    pub(super) fn clone_with(&self, base: FieldBase) -> Self {
        Self::with_parts(base, self.layout)
    }

    pub fn layout(&self) -> &VariantLayout {
        &self.layout
    }

    pub fn alternatives(&self) -> &[Field] {
        &self.base.sub_fields
    }

    /// Entries of alternative `k` written in the current cluster.
    pub fn running_count(&self, k: usize) -> Option<u64> {
        self.running.get(k).copied()
    }

    pub(super) fn column_models(&self) -> Vec<ColumnModel> {
        vec![ColumnModel::switch()]
    }

    /// # Safety
    ///
    /// `ptr` must point to a constructed variant value of this type.
    pub(super) unsafe fn append_raw(&mut self, ptr: *const u8) -> Result<()> {
        // SAFETY: forwarded caller contract.
        let tag = unsafe { self.layout.tag(ptr) };
        ensure!(
            tag as usize <= self.running.len(),
            "variant field '{}' holds tag {} but has {} alternatives",
            self.base.name,
            tag,
            self.running.len()
        );

        let mut index = 0;
        if tag > 0 {
            let k = tag as usize - 1;
            // SAFETY: the active alternative lives at offset 0.
            unsafe { self.base.sub_field_mut(k)?.append_raw(ptr)? };
            index = self.running[k];
            self.running[k] += 1;
        }
        self.base.column_mut(0)?.append_switch(index, tag)
    }

    /// # Safety
    ///
    /// `ptr` must point to a constructed variant value of this type.
    pub(super) unsafe fn read_raw(&self, global: u64, ptr: *mut u8) -> Result<()> {
        let (position, tag) = self
            .base
            .column(0)?
            .switch_info(global)
            .wrap_err_with(|| format!("failed to read field '{}' entry {}", self.base.name, global))?;
        if tag == 0 {
            bail!(
                "variant field '{}' entry {} has switch tag 0",
                self.base.name,
                global
            );
        }
        let alternative = self.base.sub_field(tag as usize - 1)?;

        // SAFETY: forwarded caller contract. The old alternative is detached
        // (tag 0) before it is destroyed, and the new one is constructed
        // before its tag is set.
        unsafe {
            let current = self.layout.tag(ptr);
            if current != tag {
                if current > 0 {
                    self.layout.set_tag(ptr, 0);
                    self.base.sub_field(current as usize - 1)?.value_type().destroy(ptr);
                }
                alternative.value_type().construct(ptr);
                self.layout.set_tag(ptr, tag);
            }
            alternative.read_in_cluster_raw(position, ptr)
        }
    }

    pub(super) fn commit_cluster(&mut self) {
        self.running.iter_mut().for_each(|n| *n = 0);
    }
}
