//! # String Fields
//!
//! A string is stored as its UTF-8 bytes in a byte column, delimited by an
//! index column holding the cumulative byte count within the cluster:
//!
//! ```text
//! append "abc", "", "de"
//! index (col 0): 3 3 5
//! bytes (col 1): a b c d e
//! ```
//!
//! Strings are length delimited, so embedded NUL bytes round trip.

use eyre::{eyre, Result, WrapErr};

use super::{FieldBase, Structure};
use crate::column::{ColumnModel, ColumnType};
use crate::types::ValueType;

#[derive(Debug)]
pub struct StringField {
    pub(super) base: FieldBase,
    running_bytes: u64,
}

impl StringField {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_base(FieldBase::new(
            name.into(),
            "string".to_string(),
            Structure::Leaf,
            false,
            ValueType::string(),
        ))
    }

    pub(super) fn with_base(base: FieldBase) -> Self {
        Self {
            base,
            running_bytes: 0,
        }
    }

    /// Bytes written in the current cluster.
    pub fn running_bytes(&self) -> u64 {
        self.running_bytes
    }

    pub(super) fn column_models(&self) -> Vec<ColumnModel> {
        vec![
            ColumnModel::index(),
            ColumnModel::new(ColumnType::Byte, false),
        ]
    }

    /// # Safety
    ///
    /// `ptr` must point to a `String`.
    pub(super) unsafe fn append_raw(&mut self, ptr: *const u8) -> Result<()> {
        // SAFETY: forwarded caller contract.
        let value = unsafe { &*ptr.cast::<String>() };
        let bytes = value.as_bytes();
        self.base.column_mut(1)?.append_bulk(bytes)?;
        self.running_bytes += bytes.len() as u64;
        self.base.column_mut(0)?.append_index(self.running_bytes)
    }

    /// # Safety
    ///
    /// `ptr` must point to a constructed `String`.
    pub(super) unsafe fn read_raw(&self, global: u64, ptr: *mut u8) -> Result<()> {
        // SAFETY: forwarded caller contract.
        let value = unsafe { &mut *ptr.cast::<String>() };
        let (start, len) = self
            .base
            .column(0)?
            .collection_info(global)
            .wrap_err_with(|| format!("failed to read field '{}' entry {}", self.base.name, global))?;

        if len.get() == 0 {
            value.clear();
            return Ok(());
        }

        let chars = self.base.column(1)?;
        let mut buf = std::mem::take(value).into_bytes();
        buf.clear();
        buf.resize(len.get() as usize, 0);
        chars.read_bulk(chars.global_index(start)?, &mut buf)?;

        *value = String::from_utf8(buf).map_err(|e| {
            eyre!(
                "field '{}' entry {} is not valid UTF-8: {}",
                self.base.name,
                global,
                e.utf8_error()
            )
        })?;
        Ok(())
    }

    pub(super) fn commit_cluster(&mut self) {
        self.running_bytes = 0;
    }
}
