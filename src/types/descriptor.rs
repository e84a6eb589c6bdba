//! # Record Descriptors
//!
//! Record fields need three things about a composite Rust type: its members
//! in declaration order with their type names and byte offsets, its size and
//! alignment, and a way to construct and destroy a whole value in place.
//! `RecordDescriptor` carries all of it. Descriptors are generated at compile
//! time by the [`record_type!`](crate::record_type) macro and registered once
//! in a [`TypeRegistry`], which the field factory consults for any type name
//! that is not a builtin.
//!
//! ```ignore
//! #[derive(Default)]
//! struct Point { x: f32, y: f32 }
//! record_type!(Point { x: f32, y: f32 });
//!
//! let mut registry = TypeRegistry::new();
//! registry.register::<Point>()?;
//! let field = FieldFactory::new(&registry).create("pos", "Point")?;
//! ```
//!
//! ## Descriptor Table
//!
//! ```text
//! Point (size 8, align 4)
//! ├── x: f32 @ 0
//! └── y: f32 @ 4
//! ```

use std::fmt;
use std::ptr;
use std::sync::Arc;

use eyre::{bail, ensure, Result};
use hashbrown::HashMap;
use tracing::debug;

use super::type_name::{normalize, ARRAY_PREFIX, VARIANT_PREFIX, VECTOR_PREFIX};
use super::{FieldType, ScalarType};

/// One member of a record: name, canonical type name and byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    name: String,
    type_name: String,
    offset: usize,
}

impl MemberDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

unsafe fn construct_default<T: Default>(ptr: *mut u8) {
    // SAFETY: callers pass memory that is valid and aligned for T.
    unsafe { ptr.cast::<T>().write(T::default()) };
}

unsafe fn destroy_in_place<T>(ptr: *mut u8) {
    // SAFETY: callers pass a constructed T that is not used afterwards.
    unsafe { ptr::drop_in_place(ptr.cast::<T>()) };
}

pub struct RecordDescriptor {
    name: String,
    size: usize,
    alignment: usize,
    members: Vec<MemberDescriptor>,
    construct: unsafe fn(*mut u8),
    destroy: unsafe fn(*mut u8),
}

impl fmt::Debug for RecordDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordDescriptor")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("alignment", &self.alignment)
            .field("members", &self.members)
            .finish()
    }
}

impl RecordDescriptor {
    /// Starts a descriptor for `T` under `name`. Size, alignment, construction
    /// (`T::default()`) and destruction (`drop_in_place`) come from `T`.
    pub fn builder<T: Default + 'static>(name: impl Into<String>) -> RecordDescriptorBuilder {
        RecordDescriptorBuilder {
            descriptor: RecordDescriptor {
                name: name.into(),
                size: size_of::<T>(),
                alignment: align_of::<T>(),
                members: Vec::new(),
                construct: construct_default::<T>,
                destroy: destroy_in_place::<T>,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    /// Default-constructs a record at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writes of `size()` bytes and aligned to
    /// `alignment()`. Any value already there is overwritten without being
    /// dropped.
    pub unsafe fn construct(&self, ptr: *mut u8) {
        // SAFETY: forwarded caller contract.
        unsafe { (self.construct)(ptr) }
    }

    /// Drops the record at `ptr` in place.
    ///
    /// # Safety
    ///
    /// `ptr` must hold a constructed record of this type, which must not be
    /// used again until it is reconstructed.
    pub unsafe fn destroy(&self, ptr: *mut u8) {
        // SAFETY: forwarded caller contract.
        unsafe { (self.destroy)(ptr) }
    }

    fn same_layout(&self, other: &RecordDescriptor) -> bool {
        self.name == other.name
            && self.size == other.size
            && self.alignment == other.alignment
            && self.members == other.members
    }
}

pub struct RecordDescriptorBuilder {
    descriptor: RecordDescriptor,
}

impl RecordDescriptorBuilder {
    /// Appends a member. Members are kept in call order.
    ///
    /// # Safety
    ///
    /// `offset` must be the byte offset of a member of the record type whose
    /// layout is exactly what the field built from `type_name` expects.
    pub unsafe fn member(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        offset: usize,
    ) -> Self {
        self.descriptor.members.push(MemberDescriptor {
            name: name.into(),
            type_name: type_name.into(),
            offset,
        });
        self
    }

    pub fn build(self) -> RecordDescriptor {
        self.descriptor
    }
}

/// Rust struct with a compile-time generated [`RecordDescriptor`].
///
/// Implemented by [`record_type!`](crate::record_type); implementing it by
/// hand requires the same guarantees as [`RecordDescriptorBuilder::member`].
///
/// # Safety
///
/// `descriptor()` must describe `Self` exactly.
pub unsafe trait RecordType: FieldType + Default {
    fn descriptor() -> RecordDescriptor;
}

fn is_reserved(name: &str) -> bool {
    ScalarType::from_type_name(name).is_some()
        || name == "string"
        || name.starts_with(VECTOR_PREFIX)
        || name.starts_with(ARRAY_PREFIX)
        || name.starts_with(VARIANT_PREFIX)
}

/// Record descriptors by type name.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    records: HashMap<String, Arc<RecordDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the descriptor of `T`. Registering the same type twice is a
    /// no-op.
    pub fn register<T: RecordType>(&mut self) -> Result<Arc<RecordDescriptor>> {
        self.insert(T::descriptor())
    }

    fn insert(&mut self, descriptor: RecordDescriptor) -> Result<Arc<RecordDescriptor>> {
        let name = descriptor.name().to_string();
        ensure!(!name.is_empty(), "record type name must not be empty");
        ensure!(
            normalize(&name) == name && !is_reserved(&name) && !name.contains(['<', '>', ',']),
            "record type name '{}' collides with a builtin type name",
            name
        );

        if let Some(existing) = self.records.get(&name) {
            if existing.same_layout(&descriptor) {
                return Ok(existing.clone());
            }
            bail!("record type '{}' is already registered with a different layout", name);
        }

        debug!(
            record = %name,
            size = descriptor.size(),
            members = descriptor.members().len(),
            "registered record type"
        );
        let descriptor = Arc::new(descriptor);
        self.records.insert(name, descriptor.clone());
        Ok(descriptor)
    }

    pub fn get(&self, name: &str) -> Option<Arc<RecordDescriptor>> {
        self.records.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Registered names in ascending order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.records.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
