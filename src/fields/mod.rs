//! # Field Tree
//!
//! A `Field` maps values of one in-memory type onto one or more columns.
//! Fields form a tree that mirrors the type: a vector field has its item as
//! sub-field, a record field its members, a variant field its alternatives.
//! The top of every schema is a root field with an empty name.
//!
//! ```text
//! <root>                       (record, no columns)
//! ├── px: f64                  col 0: Real64
//! ├── label: string            col 0: Index   col 1: Byte
//! └── hits: vector<Hit>        col 0: Index
//!     └── _0: Hit              (record, no columns)
//!         ├── energy: f64      col 0: Real64
//!         └── layer: u8        col 0: Byte
//! ```
//!
//! ## Field Kinds
//!
//! | Kind | Structure | Own columns | Per-cluster state |
//! |------|-----------|-------------|-------------------|
//! | Scalar | leaf | 1 value column | none |
//! | String | leaf | index + byte | running byte count |
//! | Vector | collection | index | running item count |
//! | Array | leaf (N repetitions) | none | none |
//! | Record | record | none | none |
//! | Variant | variant | switch | running count per alternative |
//! | Root | record | none | none |
//!
//! ## Lifecycle
//!
//! 1. Build the tree with [`FieldFactory`] or the `Field::*` constructors.
//! 2. [`Field::connect`] generates columns and assigns field ids depth first.
//! 3. Append entries with [`Field::append`], call [`Field::commit_cluster`]
//!    between clusters.
//! 4. Read entries back with [`Field::read`] or [`Field::read_in_cluster`].
//!
//! ## Values
//!
//! Appends and reads go through [`FieldValue`] handles. Each handle carries
//! the value type it was created for and is checked against the field, so a
//! field never interprets memory of another type.

mod array;
mod factory;
mod iter;
mod record;
mod root;
mod scalar;
mod string;
mod value;
mod variant;
mod vector;
mod visitor;

#[cfg(test)]
mod tests;

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use eyre::{bail, ensure, eyre, Result, WrapErr};
use tracing::debug;

use crate::column::{ClusterIndex, Column, ColumnId, FieldId};
use crate::storage::PageStorage;
use crate::types::{FieldType, RawVec, RecordDescriptor, ScalarType, ValueType};

pub use array::ArrayField;
pub use factory::FieldFactory;
pub use iter::{FieldEntry, FieldIter};
pub use record::RecordField;
pub use root::RootField;
pub use scalar::ScalarField;
pub use string::StringField;
pub use value::{FieldValue, OwnedValue};
pub use variant::VariantField;
pub use vector::VectorField;
pub use visitor::{FieldVisitor, SchemaPrinter};

/// Structural role of a field in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Structure {
    Leaf,
    Collection,
    Record,
    Variant,
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Structure::Leaf => "leaf",
            Structure::Collection => "collection",
            Structure::Record => "record",
            Structure::Variant => "variant",
        };
        f.write_str(name)
    }
}

/// State shared by every field kind.
#[derive(Debug)]
pub struct FieldBase {
    name: String,
    type_name: String,
    structure: Structure,
    is_simple: bool,
    repetitions: usize,
    order: usize,
    value_type: Arc<ValueType>,
    sub_fields: Vec<Field>,
    columns: Vec<Column>,
    columns_generated: bool,
    on_disk_id: Option<FieldId>,
}

impl FieldBase {
    pub(crate) fn new(
        name: String,
        type_name: String,
        structure: Structure,
        is_simple: bool,
        value_type: Arc<ValueType>,
    ) -> Self {
        Self {
            name,
            type_name,
            structure,
            is_simple,
            repetitions: 0,
            order: 0,
            value_type,
            sub_fields: Vec::new(),
            columns: Vec::new(),
            columns_generated: false,
            on_disk_id: None,
        }
    }

    /// Adds `child` as the last sub-field. Sibling names must be unique.
    pub(crate) fn attach(&mut self, child: Field) -> Result<()> {
        ensure!(
            !self.sub_fields.iter().any(|f| f.name() == child.name()),
            "field '{}' already has a sub-field named '{}'",
            self.name,
            child.name()
        );
        self.push_sub_field(child);
        Ok(())
    }

    /// Appends without the sibling name check; for bases that take a single item.
    pub(crate) fn push_sub_field(&mut self, mut child: Field) {
        child.base_mut().order = self.sub_fields.len() + 1;
        self.sub_fields.push(child);
    }

    pub(crate) fn column(&self, index: usize) -> Result<&Column> {
        self.columns.get(index).ok_or_else(|| {
            eyre!(
                "field '{}' has no column {}; connect the field before use",
                self.name,
                index
            )
        })
    }

    pub(crate) fn column_mut(&mut self, index: usize) -> Result<&mut Column> {
        let name = &self.name;
        self.columns.get_mut(index).ok_or_else(|| {
            eyre!(
                "field '{}' has no column {}; connect the field before use",
                name,
                index
            )
        })
    }

    pub(crate) fn sub_field(&self, index: usize) -> Result<&Field> {
        self.sub_fields
            .get(index)
            .ok_or_else(|| eyre!("field '{}' has no sub-field {}", self.name, index))
    }

    pub(crate) fn sub_field_mut(&mut self, index: usize) -> Result<&mut Field> {
        let name = &self.name;
        self.sub_fields
            .get_mut(index)
            .ok_or_else(|| eyre!("field '{}' has no sub-field {}", name, index))
    }

    fn clone_unconnected(&self, name: String) -> Self {
        let sub_fields = self
            .sub_fields
            .iter()
            .map(|child| {
                let mut copy = child.clone_as(child.name());
                copy.base_mut().order = child.order();
                copy
            })
            .collect();
        Self {
            name,
            type_name: self.type_name.clone(),
            structure: self.structure,
            is_simple: self.is_simple,
            repetitions: self.repetitions,
            order: 0,
            value_type: self.value_type.clone(),
            sub_fields,
            columns: Vec::new(),
            columns_generated: false,
            on_disk_id: None,
        }
    }
}

/// A node of the field tree.
#[derive(Debug)]
pub enum Field {
    Scalar(ScalarField),
    String(StringField),
    Vector(VectorField),
    Array(ArrayField),
    Record(RecordField),
    Variant(VariantField),
    Root(RootField),
}

macro_rules! each_kind {
    ($field:expr, $kind:ident => $body:expr) => {
        match $field {
            Field::Scalar($kind) => $body,
            Field::String($kind) => $body,
            Field::Vector($kind) => $body,
            Field::Array($kind) => $body,
            Field::Record($kind) => $body,
            Field::Variant($kind) => $body,
            Field::Root($kind) => $body,
        }
    };
}

impl Field {
    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Field::Scalar(ScalarField::new(name, scalar))
    }

    pub fn string(name: impl Into<String>) -> Self {
        Field::String(StringField::new(name))
    }

    pub fn vector(name: impl Into<String>, item: Field) -> Self {
        Field::Vector(VectorField::new(name, item))
    }

    pub fn array(name: impl Into<String>, item: Field, len: usize) -> Result<Self> {
        Ok(Field::Array(ArrayField::new(name, item, len)?))
    }

    pub fn record(
        name: impl Into<String>,
        descriptor: Arc<RecordDescriptor>,
        members: Vec<Field>,
    ) -> Result<Self> {
        Ok(Field::Record(RecordField::new(name, descriptor, members)?))
    }

    pub fn variant(name: impl Into<String>, alternatives: Vec<Field>) -> Result<Self> {
        Ok(Field::Variant(VariantField::new(name, alternatives)?))
    }

    pub fn root() -> Self {
        Field::Root(RootField::new())
    }

    pub fn base(&self) -> &FieldBase {
        each_kind!(self, f => &f.base)
    }

    pub(crate) fn base_mut(&mut self) -> &mut FieldBase {
        each_kind!(self, f => &mut f.base)
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn type_name(&self) -> &str {
        &self.base().type_name
    }

    pub fn structure(&self) -> Structure {
        self.base().structure
    }

    pub fn is_simple(&self) -> bool {
        self.base().is_simple
    }

    /// Fixed number of item repetitions; 0 for anything but arrays.
    pub fn repetitions(&self) -> usize {
        self.base().repetitions
    }

    /// 1-based position among siblings, 0 for an unattached field.
    pub fn order(&self) -> usize {
        self.base().order
    }

    pub fn value_type(&self) -> &Arc<ValueType> {
        &self.base().value_type
    }

    pub fn sub_fields(&self) -> &[Field] {
        &self.base().sub_fields
    }

    /// Mutable access to the sub-fields, e.g. to append to the top-level
    /// fields of a root one at a time.
    pub fn sub_fields_mut(&mut self) -> &mut [Field] {
        &mut self.base_mut().sub_fields
    }

    pub fn columns(&self) -> &[Column] {
        &self.base().columns
    }

    pub fn on_disk_id(&self) -> Option<FieldId> {
        self.base().on_disk_id
    }

    pub fn is_connected(&self) -> bool {
        self.base().on_disk_id.is_some()
    }

    pub fn value_size(&self) -> usize {
        self.value_type().size()
    }

    pub fn alignment(&self) -> usize {
        self.value_type().align()
    }

    /// First column of the field; the one that indexes its entries.
    pub fn principal_column(&self) -> Result<&Column> {
        self.base().column(0)
    }

    /// Adds a top-level field. Only the root accepts new sub-fields, and only
    /// before it is connected.
    pub fn attach(&mut self, child: Field) -> Result<()> {
        match self {
            Field::Root(root) => root.attach(child),
            other => bail!(
                "cannot attach '{}' to field '{}': only the root field accepts sub-fields",
                child.name(),
                other.name()
            ),
        }
    }

    /// Creates this field's own columns. Sub-fields generate their own.
    pub fn generate_columns(&mut self) {
        if self.base().columns_generated {
            return;
        }
        let models = match self {
            Field::Scalar(f) => f.column_models(),
            Field::String(f) => f.column_models(),
            Field::Vector(f) => f.column_models(),
            Field::Variant(f) => f.column_models(),
            Field::Array(_) | Field::Record(_) | Field::Root(_) => Vec::new(),
        };
        let base = self.base_mut();
        base.columns = models.into_iter().map(Column::new).collect();
        base.columns_generated = true;
    }

    /// Connects the whole tree, numbering fields from 0. Returns the next
    /// free field id.
    pub fn connect(&mut self, storage: Arc<dyn PageStorage>) -> Result<FieldId> {
        self.connect_from(storage, 0)
    }

    /// Connects the tree, numbering fields depth first from `first_id`.
    /// Trees sharing one storage must use disjoint id ranges.
    pub fn connect_from(&mut self, storage: Arc<dyn PageStorage>, first_id: FieldId) -> Result<FieldId> {
        let next = self.connect_recursive(&storage, first_id)?;
        debug!(
            field = %self.name(),
            first_id,
            fields = next - first_id,
            "connected field tree"
        );
        Ok(next)
    }

    fn connect_recursive(&mut self, storage: &Arc<dyn PageStorage>, id: FieldId) -> Result<FieldId> {
        if let Some(existing) = self.on_disk_id() {
            bail!("field '{}' is already connected as field {}", self.name(), existing);
        }
        self.generate_columns();

        let base = self.base_mut();
        for (index, column) in base.columns.iter_mut().enumerate() {
            column
                .connect(ColumnId::new(id, index as u32), storage.clone())
                .wrap_err_with(|| format!("failed to connect column {} of field '{}'", index, base.name))?;
        }
        base.on_disk_id = Some(id);

        let mut next = id + 1;
        for child in &mut base.sub_fields {
            next = child.connect_recursive(storage, next)?;
        }
        Ok(next)
    }

    fn check_value(&self, value_type: &Arc<ValueType>) -> Result<()> {
        let own = self.value_type();
        if Arc::ptr_eq(own, value_type) {
            return Ok(());
        }
        ensure!(
            own.type_name() == value_type.type_name()
                && own.size() == value_type.size()
                && own.align() == value_type.align(),
            "field '{}' of type '{}' cannot use a value of type '{}'",
            self.name(),
            self.type_name(),
            value_type.type_name()
        );
        Ok(())
    }

    /// Appends one entry.
    pub fn append(&mut self, value: &FieldValue<'_>) -> Result<()> {
        self.check_value(value.value_type())?;
        // SAFETY: the handle points to a constructed value of this field's
        // type, checked above.
        unsafe { self.append_raw(value.as_ptr()) }
    }

    /// Reads entry `global` into a constructed value.
    pub fn read(&self, global: u64, value: &mut FieldValue<'_>) -> Result<()> {
        self.check_value(value.value_type())?;
        // SAFETY: as in append(); &mut excludes other access for the call.
        unsafe { self.read_raw(global, value.as_ptr()) }
    }

    /// Reads the entry at a cluster-relative position into a constructed value.
    pub fn read_in_cluster(&self, index: ClusterIndex, value: &mut FieldValue<'_>) -> Result<()> {
        self.check_value(value.value_type())?;
        // SAFETY: as in read().
        unsafe { self.read_in_cluster_raw(index, value.as_ptr()) }
    }

    /// # Safety
    ///
    /// `ptr` must point to a constructed value of this field's type.
    pub(crate) unsafe fn append_raw(&mut self, ptr: *const u8) -> Result<()> {
        // SAFETY: forwarded caller contract.
        unsafe {
            match self {
                Field::Scalar(f) => f.append_raw(ptr),
                Field::String(f) => f.append_raw(ptr),
                Field::Vector(f) => f.append_raw(ptr),
                Field::Array(f) => f.append_raw(ptr),
                Field::Record(f) => f.append_raw(ptr),
                Field::Variant(f) => f.append_raw(ptr),
                Field::Root(_) => bail!("the root field has no values to append"),
            }
        }
    }

    /// # Safety
    ///
    /// `ptr` must point to a constructed value of this field's type.
    pub(crate) unsafe fn read_raw(&self, global: u64, ptr: *mut u8) -> Result<()> {
        // SAFETY: forwarded caller contract.
        unsafe {
            match self {
                Field::Scalar(f) => f.read_raw(global, ptr),
                Field::String(f) => f.read_raw(global, ptr),
                Field::Vector(f) => f.read_raw(global, ptr),
                Field::Array(f) => f.read_raw(global, ptr),
                Field::Record(f) => f.read_raw(global, ptr),
                Field::Variant(f) => f.read_raw(global, ptr),
                Field::Root(_) => bail!("the root field has no values to read"),
            }
        }
    }

    /// # Safety
    ///
    /// `ptr` must point to a constructed value of this field's type.
    pub(crate) unsafe fn read_in_cluster_raw(&self, index: ClusterIndex, ptr: *mut u8) -> Result<()> {
        // SAFETY: forwarded caller contract.
        unsafe {
            match self {
                Field::Array(f) => f.read_in_cluster_raw(index, ptr),
                Field::Record(f) => f.read_in_cluster_raw(index, ptr),
                Field::Root(_) => bail!("the root field has no values to read"),
                _ => {
                    let global = self.principal_column()?.global_index(index)?;
                    self.read_raw(global, ptr)
                }
            }
        }
    }

    /// Element width when values of this field can be copied to and from
    /// its principal column as raw bytes.
    pub(crate) fn bulk_width(&self) -> Option<usize> {
        match self {
            Field::Scalar(f) if f.scalar_type() != ScalarType::Bool && cfg!(target_endian = "little") => {
                Some(f.scalar_type().size())
            }
            _ => None,
        }
    }

    /// Wraps a typed value after checking its type name and layout against
    /// the field.
    pub fn capture<'a, T: FieldType>(&self, value: &'a mut T) -> Result<FieldValue<'a>> {
        FieldValue::typed(value, self.value_type().clone())
    }

    /// # Safety
    ///
    /// `ptr` must point to a constructed value of this field's type that is
    /// valid, and not otherwise accessed, for `'a`.
    pub unsafe fn capture_value<'a>(&self, ptr: NonNull<u8>) -> FieldValue<'a> {
        // SAFETY: forwarded caller contract.
        unsafe { FieldValue::from_raw(ptr, self.value_type().clone()) }
    }

    /// Allocates and default-constructs a value of this field's type.
    pub fn generate_value(&self) -> OwnedValue {
        OwnedValue::new(self.value_type().clone())
    }

    /// Default-constructs a value at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writes of `value_size()` bytes, aligned to
    /// `alignment()`, and not otherwise accessed for `'a`. Whatever was at
    /// `ptr` is overwritten without being destroyed.
    pub unsafe fn generate_value_at<'a>(&self, ptr: NonNull<u8>) -> FieldValue<'a> {
        // SAFETY: forwarded caller contract.
        unsafe {
            self.value_type().construct(ptr.as_ptr());
            FieldValue::from_raw(ptr, self.value_type().clone())
        }
    }

    /// Destroys and frees an owned value.
    pub fn destroy_value(&self, value: OwnedValue) -> Result<()> {
        self.check_value(value.value_type())?;
        drop(value);
        Ok(())
    }

    /// Runs the destructor of the value in place without releasing its memory.
    ///
    /// # Safety
    ///
    /// The memory behind `value` must not be used again until a value is
    /// constructed in it.
    pub unsafe fn destroy_value_at(&self, value: FieldValue<'_>) -> Result<()> {
        self.check_value(value.value_type())?;
        // SAFETY: forwarded caller contract, type checked above.
        unsafe { self.value_type().destroy(value.as_ptr()) };
        Ok(())
    }

    /// Handles to the direct sub-values of a composite value: vector and
    /// array items, record members, the active variant alternative.
    pub fn split_value<'v>(&self, value: &'v mut FieldValue<'_>) -> Result<Vec<FieldValue<'v>>> {
        self.check_value(value.value_type())?;
        let ptr = value.as_ptr();

        let mut parts = Vec::new();
        // SAFETY: ptr holds a constructed value of this field's type; each
        // handle addresses a distinct sub-value inside it and borrows the
        // parent handle mutably for 'v.
        unsafe {
            match self {
                Field::Vector(f) => {
                    let item = f.item();
                    let raw = &*ptr.cast::<RawVec>();
                    for i in 0..raw.len() {
                        let item_ptr = raw.item_ptr(i, item.value_size());
                        parts.push(item.capture_value(NonNull::new_unchecked(item_ptr)));
                    }
                }
                Field::Array(f) => {
                    let item = f.item();
                    for i in 0..f.len() {
                        let item_ptr = ptr.add(i * item.value_size());
                        parts.push(item.capture_value(NonNull::new_unchecked(item_ptr)));
                    }
                }
                Field::Record(f) => {
                    for (member, offset) in f.members() {
                        parts.push(member.capture_value(NonNull::new_unchecked(ptr.add(offset))));
                    }
                }
                Field::Variant(f) => {
                    let tag = f.layout().tag(ptr);
                    if tag > 0 {
                        let alternative = f.base.sub_field(tag as usize - 1)?;
                        parts.push(alternative.capture_value(NonNull::new_unchecked(ptr)));
                    }
                }
                Field::Scalar(_) | Field::String(_) | Field::Root(_) => {}
            }
        }
        Ok(parts)
    }

    /// Flushes every column of the tree to storage.
    pub fn flush(&mut self) -> Result<()> {
        let base = self.base_mut();
        for column in &mut base.columns {
            column.flush()?;
        }
        for child in &mut base.sub_fields {
            child.flush()?;
        }
        Ok(())
    }

    /// Closes the current cluster: marks the boundary on every column and
    /// resets per-cluster counters, recursively.
    pub fn commit_cluster(&mut self) -> Result<()> {
        match self {
            Field::String(f) => f.commit_cluster(),
            Field::Vector(f) => f.commit_cluster(),
            Field::Variant(f) => f.commit_cluster(),
            _ => {}
        }

        let base = self.base_mut();
        for column in &mut base.columns {
            column
                .commit_cluster()
                .wrap_err_with(|| format!("failed to commit cluster of field '{}'", base.name))?;
        }
        if !base.columns.is_empty() {
            debug!(field = %base.name, id = ?base.on_disk_id, "committed cluster");
        }
        for child in &mut base.sub_fields {
            child.commit_cluster()?;
        }
        Ok(())
    }

    /// Structurally identical copy under a new name. The copy is not
    /// connected and carries no per-cluster state.
    pub fn clone_as(&self, new_name: impl Into<String>) -> Field {
        let base = self.base().clone_unconnected(new_name.into());
        match self {
            Field::Scalar(f) => Field::Scalar(f.clone_with(base)),
            Field::String(_) => Field::String(StringField::with_base(base)),
            Field::Vector(_) => Field::Vector(VectorField::with_base(base)),
            Field::Array(f) => Field::Array(f.clone_with(base)),
            Field::Record(f) => Field::Record(f.clone_with(base)),
            Field::Variant(f) => Field::Variant(f.clone_with(base)),
            Field::Root(_) => Field::Root(RootField::with_base(base)),
        }
    }

    /// Depth-first, pre-order iteration over all descendants.
    pub fn iter(&self) -> FieldIter<'_> {
        FieldIter::new(self)
    }

    /// Calls the visitor callback matching this field's kind.
    pub fn accept(&self, visitor: &mut dyn FieldVisitor, level: usize) {
        match self {
            Field::Scalar(_) => visitor.visit_scalar(self, level),
            Field::String(_) => visitor.visit_string(self, level),
            Field::Vector(_) => visitor.visit_vector(self, level),
            Field::Array(_) => visitor.visit_array(self, level),
            Field::Record(_) => visitor.visit_record(self, level),
            Field::Variant(_) => visitor.visit_variant(self, level),
            Field::Root(_) => visitor.visit_root(self, level),
        }
    }

    /// Visits this field at level 0, then every descendant in iteration order.
    pub fn walk(&self, visitor: &mut dyn FieldVisitor) {
        self.accept(visitor, 0);
        for entry in self.iter() {
            entry.field.accept(visitor, entry.level);
        }
    }
}

impl<'a> IntoIterator for &'a Field {
    type Item = FieldEntry<'a>;
    type IntoIter = FieldIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
