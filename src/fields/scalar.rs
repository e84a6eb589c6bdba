//! Scalar fields: one value, one column element.

use eyre::{Result, WrapErr};

use super::{FieldBase, Structure};
use crate::column::{Column, ColumnModel};
use crate::config::MAX_ELEMENT_SIZE;
use crate::types::{ScalarType, ValueType};

#[derive(Debug)]
pub struct ScalarField {
    pub(super) base: FieldBase,
    scalar: ScalarType,
}

impl ScalarField {
    pub fn new(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            base: FieldBase::new(
                name.into(),
                scalar.type_name().to_string(),
                Structure::Leaf,
                true,
                ValueType::scalar(scalar),
            ),
            scalar,
        }
    }

    pub(super) fn clone_with(&self, base: FieldBase) -> Self {
        Self {
            base,
            scalar: self.scalar,
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.scalar
    }

    pub(super) fn column_models(&self) -> Vec<ColumnModel> {
        vec![self.scalar.column_model()]
    }

    pub(super) fn principal(&self) -> Result<&Column> {
        self.base.column(0)
    }

    /// # Safety
    ///
    /// `ptr` must point to a value of this scalar type.
    pub(super) unsafe fn append_raw(&mut self, ptr: *const u8) -> Result<()> {
        let mut element = [0u8; MAX_ELEMENT_SIZE];
        // SAFETY: forwarded caller contract.
        let width = unsafe { self.scalar.encode(ptr, &mut element) };
        self.base.column_mut(0)?.append(&element[..width])
    }

    /// # Safety
    ///
    /// `ptr` must be valid for writes of this scalar type.
    pub(super) unsafe fn read_raw(&self, global: u64, ptr: *mut u8) -> Result<()> {
        let mut element = [0u8; MAX_ELEMENT_SIZE];
        let width = self.scalar.size();
        self.principal()?
            .read(global, &mut element[..width])
            .wrap_err_with(|| format!("failed to read field '{}' entry {}", self.base.name, global))?;
        // SAFETY: forwarded caller contract.
        unsafe { self.scalar.decode(&element[..width], ptr) };
        Ok(())
    }
}
