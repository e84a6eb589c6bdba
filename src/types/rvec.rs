//! # Type-Erased Vectors
//!
//! Vector fields read and write collections whose item type is only known at
//! runtime. `Vec<T>` has no stable layout, so vector values use `RVec<T>`, a
//! `#[repr(transparent)]` wrapper around the `#[repr(C)]` `RawVec`:
//!
//! ```text
//! RawVec (repr C)
//! ┌──────────┬──────────┬──────────┐
//! │ ptr      │ len      │ capacity │
//! └──────────┴──────────┴──────────┘
//!      │
//!      └─> capacity * item_size bytes, aligned to item_align
//! ```
//!
//! The engine manipulates `RawVec` with the item size and alignment of the
//! item field, the typed `RVec<T>` with `size_of::<T>()` and `align_of::<T>()`.
//! Both allocate with `Layout::from_size_align(capacity * size, align)`, the
//! layout `Layout::array::<T>(capacity)` produces, so a buffer grown by one
//! side can be released by the other.
//!
//! Zero capacity and zero-sized items never allocate; the buffer pointer is
//! then a dangling, well-aligned address.

use std::alloc::{self, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr;
use std::slice;

/// Type-erased vector header. Items are managed by the owner.
#[repr(C)]
#[derive(Debug)]
pub struct RawVec {
    ptr: *mut u8,
    len: usize,
    capacity: usize,
}

fn dangling(align: usize) -> *mut u8 {
    ptr::null_mut::<u8>().wrapping_add(align)
}

fn buffer_layout(capacity: usize, item_size: usize, item_align: usize) -> Layout {
    let Some(bytes) = capacity.checked_mul(item_size) else {
        panic!("capacity overflow");
    };
    match Layout::from_size_align(bytes, item_align) {
        Ok(layout) => layout,
        Err(_) => panic!("capacity overflow"),
    }
}

impl RawVec {
    /// Empty vector whose buffer pointer is aligned for `item_align`.
    pub fn new(item_align: usize) -> Self {
        Self {
            ptr: dangling(item_align),
            len: 0,
            capacity: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr
    }

    /// Address of item `index`.
    pub fn item_ptr(&self, index: usize, item_size: usize) -> *mut u8 {
        self.ptr.wrapping_add(index * item_size)
    }

    /// # Safety
    ///
    /// Items `0..len` must be initialized and `len <= capacity`.
    pub unsafe fn set_len(&mut self, len: usize) {
        self.len = len;
    }

    /// Grows the buffer to hold at least `capacity` items.
    ///
    /// # Safety
    ///
    /// `item_size` and `item_align` must be the values this vector was
    /// created and previously grown with.
    pub unsafe fn reserve_exact(&mut self, capacity: usize, item_size: usize, item_align: usize) {
        if capacity <= self.capacity {
            return;
        }
        if item_size == 0 {
            self.capacity = usize::MAX;
            return;
        }

        let new_layout = buffer_layout(capacity, item_size, item_align);
        // SAFETY: new_layout has a non-zero size. The old buffer, if any, was
        // allocated with buffer_layout(self.capacity, item_size, item_align).
        let new_ptr = unsafe {
            if self.capacity == 0 {
                alloc::alloc(new_layout)
            } else {
                let old_layout = buffer_layout(self.capacity, item_size, item_align);
                alloc::realloc(self.ptr, old_layout, new_layout.size())
            }
        };
        if new_ptr.is_null() {
            alloc::handle_alloc_error(new_layout);
        }
        self.ptr = new_ptr;
        self.capacity = capacity;
    }

    /// Releases the buffer without touching the items and resets the vector
    /// to empty.
    ///
    /// # Safety
    ///
    /// Same layout requirements as [`RawVec::reserve_exact`]. Items still in
    /// the buffer are leaked, so the caller must have destroyed them.
    pub unsafe fn release(&mut self, item_size: usize, item_align: usize) {
        if self.capacity > 0 && item_size > 0 {
            let layout = buffer_layout(self.capacity, item_size, item_align);
            // SAFETY: the buffer was allocated with exactly this layout.
            unsafe { alloc::dealloc(self.ptr, layout) };
        }
        *self = RawVec::new(item_align);
    }
}

/// Vector with a stable, type-erased layout.
///
/// `RVec<T>` is what vector fields read into and append from. It derefs to
/// `[T]` and offers the handful of `Vec` operations callers need.
#[repr(transparent)]
pub struct RVec<T> {
    raw: RawVec,
    _marker: PhantomData<T>,
}

// SAFETY: RVec<T> owns its items like Vec<T> does.
unsafe impl<T: Send> Send for RVec<T> {}
// SAFETY: shared access only hands out &T.
unsafe impl<T: Sync> Sync for RVec<T> {}

impl<T> RVec<T> {
    pub fn new() -> Self {
        Self {
            raw: RawVec::new(align_of::<T>()),
            _marker: PhantomData,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut vec = Self::new();
        vec.reserve(capacity);
        vec
    }

    pub fn capacity(&self) -> usize {
        self.raw.capacity
    }

    pub fn raw(&self) -> &RawVec {
        &self.raw
    }

    pub fn reserve(&mut self, additional: usize) {
        let Some(needed) = self.raw.len.checked_add(additional) else {
            panic!("capacity overflow");
        };
        if needed <= self.raw.capacity {
            return;
        }
        let target = needed.max(self.raw.capacity.saturating_mul(2)).max(4);
        // SAFETY: the buffer only ever holds T.
        unsafe { self.raw.reserve_exact(target, size_of::<T>(), align_of::<T>()) };
    }

    pub fn push(&mut self, value: T) {
        self.reserve(1);
        // SAFETY: reserve guarantees room for one more item.
        unsafe {
            ptr::write(self.raw.ptr.cast::<T>().add(self.raw.len), value);
        }
        self.raw.len += 1;
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.raw.len == 0 {
            return None;
        }
        self.raw.len -= 1;
        // SAFETY: the item at the old last index is initialized and no longer
        // counted by len.
        Some(unsafe { ptr::read(self.raw.ptr.cast::<T>().add(self.raw.len)) })
    }

    pub fn clear(&mut self) {
        let items: *mut [T] = self.as_mut_slice();
        self.raw.len = 0;
        // SAFETY: the items were initialized and are no longer reachable.
        unsafe { ptr::drop_in_place(items) };
    }

    pub fn as_slice(&self) -> &[T] {
        // SAFETY: ptr is non-null, aligned and items 0..len are initialized.
        unsafe { slice::from_raw_parts(self.raw.ptr.cast::<T>(), self.raw.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as in as_slice, and we hold &mut self.
        unsafe { slice::from_raw_parts_mut(self.raw.ptr.cast::<T>(), self.raw.len) }
    }
}

impl<T> Drop for RVec<T> {
    fn drop(&mut self) {
        self.clear();
        // SAFETY: items are dropped and the buffer holds T.
        unsafe { self.raw.release(size_of::<T>(), align_of::<T>()) };
    }
}

impl<T> Default for RVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for RVec<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for RVec<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Clone> Clone for RVec<T> {
    fn clone(&self) -> Self {
        self.iter().cloned().collect()
    }
}

impl<T: PartialEq> PartialEq for RVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: PartialEq> PartialEq<[T]> for RVec<T> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq, const N: usize> PartialEq<[T; N]> for RVec<T> {
    fn eq(&self, other: &[T; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: fmt::Debug> fmt::Debug for RVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> FromIterator<T> for RVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut vec = RVec::with_capacity(iter.size_hint().0);
        for item in iter {
            vec.push(item);
        }
        vec
    }
}

impl<T> From<Vec<T>> for RVec<T> {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T: Clone> From<&[T]> for RVec<T> {
    fn from(items: &[T]) -> Self {
        items.iter().cloned().collect()
    }
}

impl<'a, T> IntoIterator for &'a RVec<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
