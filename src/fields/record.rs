//! # Record Fields
//!
//! A record field has no columns of its own. Its sub-fields are the members
//! of a [`RecordDescriptor`], in descriptor order, each reading and writing
//! the value at `record + offset`.
//!
//! Building the field validates the descriptor against the member fields:
//!
//! | Check | Error when |
//! |-------|------------|
//! | count | member fields and descriptor members differ in number |
//! | type | a member field's type name differs from the descriptor's |
//! | fit | `offset + member size` exceeds the record size |
//! | alignment | `offset` is not a multiple of the member alignment |
//! | overlap | two members share bytes |

use std::sync::Arc;

use eyre::{ensure, Result, WrapErr};

use super::{Field, FieldBase, Structure};
use crate::column::ClusterIndex;
use crate::types::{RecordDescriptor, ValueType};

#[derive(Debug)]
pub struct RecordField {
    pub(super) base: FieldBase,
    descriptor: Arc<RecordDescriptor>,
}

impl RecordField {
    /// Builds a record field. Member fields are renamed to the descriptor's
    /// member names.
    pub fn new(
        name: impl Into<String>,
        descriptor: Arc<RecordDescriptor>,
        members: Vec<Field>,
    ) -> Result<Self> {
        let name = name.into();
        ensure!(
            members.len() == descriptor.members().len(),
            "record field '{}' of type '{}' has {} member fields, the type has {} members",
            name,
            descriptor.name(),
            members.len(),
            descriptor.members().len()
        );

        let mut spans = Vec::with_capacity(members.len());
        for (field, member) in members.iter().zip(descriptor.members()) {
            ensure!(
                field.type_name() == member.type_name(),
                "member '{}' of '{}' is declared as '{}' but its field has type '{}'",
                member.name(),
                descriptor.name(),
                member.type_name(),
                field.type_name()
            );
            let end = member.offset() + field.value_size();
            ensure!(
                end <= descriptor.size(),
                "member '{}' of '{}' ends at byte {}, past the record size {}",
                member.name(),
                descriptor.name(),
                end,
                descriptor.size()
            );
            ensure!(
                member.offset() % field.alignment() == 0,
                "member '{}' of '{}' at offset {} is not aligned to {}",
                member.name(),
                descriptor.name(),
                member.offset(),
                field.alignment()
            );
            if field.value_size() > 0 {
                spans.push((member.offset(), end, member.name()));
            }
        }
        spans.sort_unstable();
        for pair in spans.windows(2) {
            let ((_, end, first), (start, _, second)) = (pair[0], pair[1]);
            ensure!(
                start >= end,
                "members '{}' and '{}' of '{}' overlap",
                first,
                second,
                descriptor.name()
            );
        }

        let value_type = ValueType::record(descriptor.clone())?;
        let mut base = FieldBase::new(
            name,
            descriptor.name().to_string(),
            Structure::Record,
            false,
            value_type,
        );
        for (mut field, member) in members.into_iter().zip(descriptor.members()) {
            field.base_mut().name = member.name().to_string();
            base.attach(field)
                .wrap_err_with(|| format!("invalid member list of '{}'", descriptor.name()))?;
        }
        Ok(Self { base, descriptor })
    }

    pub(super) fn clone_with(&self, base: FieldBase) -> Self {
        Self {
            base,
            descriptor: self.descriptor.clone(),
        }
    }

    pub fn descriptor(&self) -> &Arc<RecordDescriptor> {
        &self.descriptor
    }

    /// Member fields with their byte offsets.
    pub fn members(&self) -> impl Iterator<Item = (&Field, usize)> + '_ {
        self.base
            .sub_fields
            .iter()
            .zip(self.descriptor.members())
            .map(|(field, member)| (field, member.offset()))
    }

    /// # Safety
    ///
    /// `ptr` must point to a constructed record of this type.
    pub(super) unsafe fn append_raw(&mut self, ptr: *const u8) -> Result<()> {
        let descriptor = &self.descriptor;
        for (field, member) in self.base.sub_fields.iter_mut().zip(descriptor.members()) {
            // SAFETY: the member lies inside the record at its offset.
            unsafe { field.append_raw(ptr.add(member.offset()))? };
        }
        Ok(())
    }

    /// # Safety
    ///
    /// `ptr` must point to a constructed record of this type.
    pub(super) unsafe fn read_raw(&self, global: u64, ptr: *mut u8) -> Result<()> {
        for (field, offset) in self.members() {
            // SAFETY: as in append_raw().
            unsafe { field.read_raw(global, ptr.add(offset))? };
        }
        Ok(())
    }

    /// # Safety
    ///
    /// `ptr` must point to a constructed record of this type.
    pub(super) unsafe fn read_in_cluster_raw(&self, index: ClusterIndex, ptr: *mut u8) -> Result<()> {
        for (field, offset) in self.members() {
            // SAFETY: as in append_raw().
            unsafe { field.read_in_cluster_raw(index, ptr.add(offset))? };
        }
        Ok(())
    }
}
