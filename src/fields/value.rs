//! # Field Values
//!
//! Two handle types address the memory of one value of a field's type:
//!
//! | Handle | Owns memory | Created by | Released by |
//! |--------|-------------|------------|-------------|
//! | `FieldValue<'a>` | no | `Field::capture`, `capture_value`, `generate_value_at`, `split_value` | never (caller's memory) |
//! | `OwnedValue` | yes | `Field::generate_value` | `Drop` (destroy + free) |
//!
//! Both carry the `ValueType` of the field they were made for. Appending or
//! reading through a handle of another type is an error, so a value can only
//! ever be interpreted as the type it was constructed as.
//!
//! ```ignore
//! let mut v: RVec<i32> = vec![1, 2, 3].into();
//! field.append(field.capture(&mut v)?)?;
//!
//! let mut owned = field.generate_value();
//! field.read(0, &mut owned.as_field_value())?;
//! assert_eq!(owned.get::<RVec<i32>>()?, &[1, 2, 3]);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Arc;

use eyre::{ensure, Result};

use crate::types::{FieldType, ValueType};

fn check_type<T: FieldType>(value_type: &ValueType) -> Result<()> {
    let requested = T::type_name();
    ensure!(
        requested == value_type.type_name(),
        "value of type '{}' cannot be accessed as '{}'",
        value_type.type_name(),
        requested
    );
    ensure!(
        size_of::<T>() == value_type.size() && align_of::<T>() == value_type.align(),
        "layout of '{}' ({} bytes, align {}) differs from the field value ({} bytes, align {})",
        requested,
        size_of::<T>(),
        align_of::<T>(),
        value_type.size(),
        value_type.align()
    );
    Ok(())
}

/// Non-owning handle to a constructed value that lives for `'a`.
///
/// The handle is not `Clone`: typed access through `get_mut` relies on it
/// being the only handle to its memory.
pub struct FieldValue<'a> {
    ptr: NonNull<u8>,
    value_type: Arc<ValueType>,
    _marker: PhantomData<&'a mut ()>,
}

impl fmt::Debug for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValue")
            .field("ptr", &self.ptr)
            .field("type_name", &self.value_type.type_name())
            .finish()
    }
}

impl<'a> FieldValue<'a> {
    /// # Safety
    ///
    /// `ptr` must point to a constructed value of `value_type` that stays
    /// valid, and is not accessed through other references, for `'a`.
    pub(crate) unsafe fn from_raw(ptr: NonNull<u8>, value_type: Arc<ValueType>) -> Self {
        Self {
            ptr,
            value_type,
            _marker: PhantomData,
        }
    }

    pub(crate) fn typed<T: FieldType>(value: &'a mut T, value_type: Arc<ValueType>) -> Result<Self> {
        check_type::<T>(&value_type)?;
        Ok(Self {
            ptr: NonNull::from(value).cast(),
            value_type,
            _marker: PhantomData,
        })
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn type_name(&self) -> &str {
        self.value_type.type_name()
    }

    pub fn value_type(&self) -> &Arc<ValueType> {
        &self.value_type
    }

    pub fn get<T: FieldType>(&self) -> Result<&T> {
        check_type::<T>(&self.value_type)?;
        // SAFETY: the type check matched name and layout, and the value is
        // constructed for 'a.
        Ok(unsafe { &*self.ptr.as_ptr().cast::<T>() })
    }

    pub fn get_mut<T: FieldType>(&mut self) -> Result<&mut T> {
        check_type::<T>(&self.value_type)?;
        // SAFETY: as in get(); &mut self prevents a second live reference
        // through this handle.
        Ok(unsafe { &mut *self.ptr.as_ptr().cast::<T>() })
    }
}

/// Heap allocated value owned by the caller. Destroyed and freed on drop.
pub struct OwnedValue {
    ptr: NonNull<u8>,
    value_type: Arc<ValueType>,
}

impl fmt::Debug for OwnedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedValue")
            .field("ptr", &self.ptr)
            .field("type_name", &self.value_type.type_name())
            .finish()
    }
}

impl OwnedValue {
    /// Allocates and default-constructs a value.
    pub(crate) fn new(value_type: Arc<ValueType>) -> Self {
        let ptr = value_type.allocate();
        // SAFETY: freshly allocated with the value type's layout.
        unsafe { value_type.construct(ptr.as_ptr()) };
        Self { ptr, value_type }
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn type_name(&self) -> &str {
        self.value_type.type_name()
    }

    pub fn value_type(&self) -> &Arc<ValueType> {
        &self.value_type
    }

    pub fn size(&self) -> usize {
        self.value_type.size()
    }

    /// Borrows the value as a field value handle.
    pub fn as_field_value(&mut self) -> FieldValue<'_> {
        // SAFETY: the value is constructed and exclusively borrowed for the
        // lifetime of the handle.
        unsafe { FieldValue::from_raw(self.ptr, self.value_type.clone()) }
    }

    pub fn get<T: FieldType>(&self) -> Result<&T> {
        check_type::<T>(&self.value_type)?;
        // SAFETY: type checked; the value is constructed while self lives.
        Ok(unsafe { &*self.ptr.as_ptr().cast::<T>() })
    }

    pub fn get_mut<T: FieldType>(&mut self) -> Result<&mut T> {
        check_type::<T>(&self.value_type)?;
        // SAFETY: as in get(), with exclusive access through &mut self.
        Ok(unsafe { &mut *self.ptr.as_ptr().cast::<T>() })
    }
}

impl Drop for OwnedValue {
    fn drop(&mut self) {
        // SAFETY: the value was constructed in new() and is dropped once.
        unsafe {
            self.value_type.destroy(self.ptr.as_ptr());
            self.value_type.deallocate(self.ptr);
        }
    }
}
