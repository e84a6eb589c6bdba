//! The root field: nameless, zero-sized top of a schema. Holds the top-level
//! fields and nothing else.

use eyre::{ensure, Result};

use super::{Field, FieldBase, Structure};
use crate::types::ValueType;

#[derive(Debug)]
pub struct RootField {
    pub(super) base: FieldBase,
}

impl Default for RootField {
    fn default() -> Self {
        Self::new()
    }
}

impl RootField {
    pub fn new() -> Self {
        Self::with_base(FieldBase::new(
            String::new(),
            String::new(),
            Structure::Record,
            false,
            ValueType::empty(),
        ))
    }

    pub(super) fn with_base(base: FieldBase) -> Self {
        Self { base }
    }

    pub fn attach(&mut self, child: Field) -> Result<()> {
        ensure!(
            self.base.on_disk_id.is_none(),
            "cannot attach '{}' after the schema is connected",
            child.name()
        );
        ensure!(
            !child.is_connected(),
            "field '{}' is already connected to another schema",
            child.name()
        );
        self.base.attach(child)
    }

    /// Finds a top-level field by name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.base.sub_fields.iter().find(|f| f.name() == name)
    }
}
