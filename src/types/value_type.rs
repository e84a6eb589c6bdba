//! # Value Types
//!
//! `ValueType` is the immutable description of how values of one field type
//! live in memory: size, alignment, and how to construct and destroy them in
//! place. A field tree builds one `ValueType` per field, children first, and
//! shares them through `Arc`:
//!
//! ```text
//! Field vector<Hit>            ValueType vector ──┐
//! └── Field Hit (record)       ValueType Hit  <───┘ (item)
//!     ├── Field energy f64     ValueType f64
//!     └── Field label string   ValueType string
//! ```
//!
//! Owned values keep an `Arc<ValueType>` so they can destroy and free
//! themselves after the field that produced them is gone.
//!
//! ## Construction and Destruction
//!
//! | Kind | construct | destroy |
//! |------|-----------|---------|
//! | Scalar | zero bytes | nothing |
//! | String | `String::new()` | drop the `String` |
//! | Vector | empty `RawVec` | destroy items, release buffer |
//! | Array | construct each item | destroy each item |
//! | Record | descriptor (`Default`) | descriptor (`drop_in_place`) |
//! | Variant | zero bytes, construct alternative 0, tag 1 | destroy active alternative |
//! | Empty | nothing | nothing |

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use eyre::{eyre, Result};

use super::{RawVec, RecordDescriptor, ScalarType, VariantLayout};

pub enum ValueKind {
    /// Root values: zero sized, nothing to construct.
    Empty,
    Scalar(ScalarType),
    String,
    Vector {
        item: Arc<ValueType>,
    },
    Array {
        item: Arc<ValueType>,
        len: usize,
    },
    Record {
        descriptor: Arc<RecordDescriptor>,
    },
    Variant {
        layout: VariantLayout,
        alternatives: Vec<Arc<ValueType>>,
    },
}

pub struct ValueType {
    type_name: String,
    layout: Layout,
    kind: ValueKind,
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueType")
            .field("type_name", &self.type_name)
            .field("size", &self.layout.size())
            .field("align", &self.layout.align())
            .finish()
    }
}

impl ValueType {
    fn new(type_name: String, size: usize, align: usize, kind: ValueKind) -> Result<Arc<Self>> {
        let layout = Layout::from_size_align(size, align)
            .map_err(|_| eyre!("invalid layout for '{}': size {} align {}", type_name, size, align))?
            .pad_to_align();
        Ok(Arc::new(Self {
            type_name,
            layout,
            kind,
        }))
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            type_name: String::new(),
            layout: Layout::new::<()>(),
            kind: ValueKind::Empty,
        })
    }

    pub fn scalar(scalar: ScalarType) -> Arc<Self> {
        Arc::new(Self {
            type_name: scalar.type_name().to_string(),
            layout: Layout::from_size_align(scalar.size(), scalar.align())
                .unwrap_or_else(|_| Layout::new::<u8>()),
            kind: ValueKind::Scalar(scalar),
        })
    }

    pub fn string() -> Arc<Self> {
        Arc::new(Self {
            type_name: "string".to_string(),
            layout: Layout::new::<String>(),
            kind: ValueKind::String,
        })
    }

    pub fn vector(type_name: String, item: Arc<ValueType>) -> Arc<Self> {
        Arc::new(Self {
            type_name,
            layout: Layout::new::<RawVec>(),
            kind: ValueKind::Vector { item },
        })
    }

    pub fn array(type_name: String, item: Arc<ValueType>, len: usize) -> Result<Arc<Self>> {
        let size = item
            .size()
            .checked_mul(len)
            .ok_or_else(|| eyre!("array type '{}' is too large", type_name))?;
        let align = item.align();
        Self::new(type_name, size, align, ValueKind::Array { item, len })
    }

    pub fn record(descriptor: Arc<RecordDescriptor>) -> Result<Arc<Self>> {
        let (size, align) = (descriptor.size(), descriptor.alignment());
        Self::new(
            descriptor.name().to_string(),
            size,
            align,
            ValueKind::Record { descriptor },
        )
    }

    pub fn variant(type_name: String, alternatives: Vec<Arc<ValueType>>) -> Result<Arc<Self>> {
        let layout = VariantLayout::new(alternatives.iter().map(|a| (a.size(), a.align())));
        Self::new(
            type_name,
            layout.size(),
            layout.alignment(),
            ValueKind::Variant {
                layout,
                alternatives,
            },
        )
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn size(&self) -> usize {
        self.layout.size()
    }

    pub fn align(&self) -> usize {
        self.layout.align()
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Constructs a default value at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writes of `size()` bytes and aligned to
    /// `align()`. A value already at `ptr` is overwritten without being
    /// destroyed.
    pub unsafe fn construct(&self, ptr: *mut u8) {
        // SAFETY: forwarded caller contract; each arm writes a valid value of
        // the described type.
        unsafe {
            match &self.kind {
                ValueKind::Empty => {}
                ValueKind::Scalar(_) => ptr::write_bytes(ptr, 0, self.size()),
                ValueKind::String => ptr.cast::<String>().write(String::new()),
                ValueKind::Vector { item } => ptr.cast::<RawVec>().write(RawVec::new(item.align())),
                ValueKind::Array { item, len } => {
                    for i in 0..*len {
                        item.construct(ptr.add(i * item.size()));
                    }
                }
                ValueKind::Record { descriptor } => descriptor.construct(ptr),
                ValueKind::Variant {
                    layout,
                    alternatives,
                } => {
                    ptr::write_bytes(ptr, 0, self.size());
                    alternatives[0].construct(ptr);
                    layout.set_tag(ptr, 1);
                }
            }
        }
    }

    /// Destroys the value at `ptr` in place, children first.
    ///
    /// # Safety
    ///
    /// `ptr` must hold a value constructed for this type. It must not be used
    /// again until it is reconstructed.
    pub unsafe fn destroy(&self, ptr: *mut u8) {
        // SAFETY: forwarded caller contract.
        unsafe {
            match &self.kind {
                ValueKind::Empty | ValueKind::Scalar(_) => {}
                ValueKind::String => ptr::drop_in_place(ptr.cast::<String>()),
                ValueKind::Vector { item } => {
                    let raw = &mut *ptr.cast::<RawVec>();
                    item.destroy_items(raw, 0);
                    raw.release(item.size(), item.align());
                }
                ValueKind::Array { item, len } => {
                    for i in 0..*len {
                        item.destroy(ptr.add(i * item.size()));
                    }
                }
                ValueKind::Record { descriptor } => descriptor.destroy(ptr),
                ValueKind::Variant {
                    layout,
                    alternatives,
                } => {
                    let tag = layout.tag(ptr);
                    if tag > 0 {
                        layout.set_tag(ptr, 0);
                        alternatives[tag as usize - 1].destroy(ptr);
                    }
                }
            }
        }
    }

    /// Destroys the items of `raw` from index `from` on and shrinks its
    /// length to `from`. `self` is the item type.
    ///
    /// # Safety
    ///
    /// `raw` must be a vector whose items are of this type.
    pub unsafe fn destroy_items(&self, raw: &mut RawVec, from: usize) {
        let len = raw.len();
        if from >= len {
            return;
        }
        // SAFETY: items from..len are constructed; len is shortened first so
        // a panicking destructor cannot lead to a double drop.
        unsafe {
            raw.set_len(from);
            for i in from..len {
                self.destroy(raw.item_ptr(i, self.size()));
            }
        }
    }

    /// Allocates uninitialized memory for one value.
    pub fn allocate(&self) -> NonNull<u8> {
        if self.size() == 0 {
            return NonNull::new(ptr::null_mut::<u8>().wrapping_add(self.align()))
                .unwrap_or(NonNull::dangling());
        }
        // SAFETY: the layout has a non-zero size.
        let ptr = unsafe { alloc::alloc(self.layout) };
        match NonNull::new(ptr) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(self.layout),
        }
    }

    /// # Safety
    ///
    /// `ptr` must come from [`ValueType::allocate`] on this value type, and
    /// the value in it must already be destroyed.
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        if self.size() > 0 {
            // SAFETY: allocated with self.layout.
            unsafe { alloc::dealloc(ptr.as_ptr(), self.layout) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RVec, Variant2};

    #[test]
    fn layouts_match_rust_types() {
        let f64_type = ValueType::scalar(ScalarType::F64);
        let string = ValueType::string();
        let vector = ValueType::vector("vector<string>".into(), string.clone());
        assert_eq!(vector.size(), size_of::<RVec<String>>());

        let array = ValueType::array("array<f64,3>".into(), f64_type.clone(), 3).unwrap();
        assert_eq!(array.size(), size_of::<[f64; 3]>());
        assert_eq!(array.align(), align_of::<[f64; 3]>());

        let variant =
            ValueType::variant("variant<string,f64>".into(), vec![string, f64_type]).unwrap();
        assert_eq!(variant.size(), size_of::<Variant2<String, f64>>());
        assert_eq!(variant.align(), align_of::<Variant2<String, f64>>());
    }

    #[test]
    fn vector_of_strings_constructs_and_destroys() {
        let vector = ValueType::vector("vector<string>".into(), ValueType::string());
        let ptr = vector.allocate();
        unsafe {
            vector.construct(ptr.as_ptr());
            let typed = &mut *ptr.as_ptr().cast::<RVec<String>>();
            typed.push("a".to_string());
            typed.push("b".to_string());
            vector.destroy(ptr.as_ptr());
            vector.deallocate(ptr);
        }
    }

    #[test]
    fn variant_constructs_first_alternative() {
        let variant = ValueType::variant(
            "variant<i32,string>".into(),
            vec![ValueType::scalar(ScalarType::I32), ValueType::string()],
        )
        .unwrap();
        let ptr = variant.allocate();
        unsafe {
            variant.construct(ptr.as_ptr());
            let typed = &mut *ptr.as_ptr().cast::<Variant2<i32, String>>();
            assert_eq!(typed.tag(), 1);
            assert_eq!(typed.get_0(), Some(&0));
            typed.set_1("payload".to_string());
            variant.destroy(ptr.as_ptr());
            variant.deallocate(ptr);
        }
    }

    #[test]
    fn empty_type_is_zero_sized() {
        let empty = ValueType::empty();
        assert_eq!(empty.size(), 0);
        let ptr = empty.allocate();
        unsafe {
            empty.construct(ptr.as_ptr());
            empty.destroy(ptr.as_ptr());
            empty.deallocate(ptr);
        }
    }
}
