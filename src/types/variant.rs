//! # Variant Values
//!
//! A variant value holds exactly one of several alternatives plus a tag byte
//! naming the active one. The in-memory layout is a fixed contract shared by
//! the variant field and the typed wrappers below:
//!
//! ```text
//! offset 0                     tag_offset            size
//! ┌────────────────────────────┬─────────┬───────────┐
//! │ payload (largest alt.)     │ tag - 1 │ padding   │
//! └────────────────────────────┴─────────┴───────────┘
//! tag_offset = round_up(max_item_size, max_alignment)
//! size       = tag_offset + max_alignment
//! ```
//!
//! The tag byte is a signed byte holding `tag - 1`: alternative `k` (0-based)
//! is stored as `k` and reported as tag `k + 1`; the stored value `-1` is tag
//! 0, "no active alternative". Tag 0 only exists transiently, e.g. while a
//! read replaces one alternative with another.
//!
//! ## Typed Wrappers
//!
//! `Variant2`, `Variant3` and `Variant4` are `#[repr(C)]` structs of a
//! `#[repr(C)]` union and an `i8`, which places the tag at exactly
//! `tag_offset` and gives the whole value exactly `size` bytes:
//!
//! ```ignore
//! let mut v: Variant2<i32, f64> = Variant2::with_0(7);
//! v.set_1(2.5);
//! assert_eq!(v.tag(), 2);
//! assert_eq!(v.get_1(), Some(&2.5));
//! ```

use std::fmt;
use std::mem::{ManuallyDrop, MaybeUninit};
use std::ptr;

use super::FieldType;

/// Size, alignment and tag position of a variant value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantLayout {
    max_item_size: usize,
    max_alignment: usize,
    tag_offset: usize,
    size: usize,
}

impl VariantLayout {
    /// Builds the layout from `(size, alignment)` of each alternative.
    pub fn new(alternatives: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut max_item_size = 0;
        let mut max_alignment = 1;
        for (size, align) in alternatives {
            max_item_size = max_item_size.max(size);
            max_alignment = max_alignment.max(align);
        }
        let tag_offset = max_item_size.next_multiple_of(max_alignment);
        Self {
            max_item_size,
            max_alignment,
            tag_offset,
            size: tag_offset + max_alignment,
        }
    }

    pub fn max_item_size(&self) -> usize {
        self.max_item_size
    }

    pub fn alignment(&self) -> usize {
        self.max_alignment
    }

    pub fn tag_offset(&self) -> usize {
        self.tag_offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Reads the 1-based tag of the value at `ptr`; 0 means no alternative.
    ///
    /// # Safety
    ///
    /// `ptr` must point to at least `self.size()` readable bytes.
    pub unsafe fn tag(&self, ptr: *const u8) -> u32 {
        // SAFETY: tag_offset < size and the caller guarantees size bytes.
        let stored = unsafe { ptr.add(self.tag_offset).cast::<i8>().read() };
        if stored < 0 {
            0
        } else {
            stored as u32 + 1
        }
    }

    /// # Safety
    ///
    /// `ptr` must point to at least `self.size()` writable bytes, and `tag`
    /// must be at most `MAX_VARIANT_ALTERNATIVES`.
    pub unsafe fn set_tag(&self, ptr: *mut u8, tag: u32) {
        let stored = (tag as i32 - 1) as i8;
        // SAFETY: as in tag().
        unsafe { ptr.add(self.tag_offset).cast::<i8>().write(stored) };
    }
}

macro_rules! define_variant {
    ($name:ident, $payload:ident, $first:ident; $($idx:tt : $ty:ident),+) => {
        paste::paste! {
            #[repr(C)]
            #[allow(dead_code)]
            union $payload<$($ty),+> {
                $( [<_ $idx>]: ManuallyDrop<$ty>, )+
            }

            #[doc = "Tagged union of " $name " alternatives with the variant field layout."]
            #[repr(C)]
            pub struct $name<$($ty),+> {
                payload: MaybeUninit<$payload<$($ty),+>>,
                index: i8,
            }

            impl<$($ty),+> $name<$($ty),+> {
                $(
                    pub fn [<with_ $idx>](value: $ty) -> Self {
                        let mut variant = Self {
                            payload: MaybeUninit::uninit(),
                            index: -1,
                        };
                        // SAFETY: every union member starts at offset 0.
                        unsafe { ptr::write(variant.payload.as_mut_ptr().cast::<$ty>(), value) };
                        variant.index = $idx;
                        variant
                    }

                    pub fn [<get_ $idx>](&self) -> Option<&$ty> {
                        if self.index != $idx {
                            return None;
                        }
                        // SAFETY: the alternative is active, hence initialized.
                        Some(unsafe { &*self.payload.as_ptr().cast::<$ty>() })
                    }

                    pub fn [<get_ $idx _mut>](&mut self) -> Option<&mut $ty> {
                        if self.index != $idx {
                            return None;
                        }
                        // SAFETY: as in the shared getter.
                        Some(unsafe { &mut *self.payload.as_mut_ptr().cast::<$ty>() })
                    }

                    pub fn [<set_ $idx>](&mut self, value: $ty) {
                        self.drop_active();
                        // SAFETY: no alternative is active after drop_active.
                        unsafe { ptr::write(self.payload.as_mut_ptr().cast::<$ty>(), value) };
                        self.index = $idx;
                    }
                )+

                /// 1-based tag of the active alternative, 0 if there is none.
                pub fn tag(&self) -> u32 {
                    if self.index < 0 {
                        0
                    } else {
                        self.index as u32 + 1
                    }
                }

                /// 0-based index of the active alternative.
                pub fn index(&self) -> Option<usize> {
                    usize::try_from(self.index).ok()
                }

                pub fn is_valueless(&self) -> bool {
                    self.index < 0
                }

                fn drop_active(&mut self) {
                    let index = std::mem::replace(&mut self.index, -1);
                    match index {
                        $(
                            // SAFETY: the index named this alternative as active.
                            $idx => unsafe {
                                ptr::drop_in_place(self.payload.as_mut_ptr().cast::<$ty>())
                            },
                        )+
                        _ => {}
                    }
                }
            }

            impl<$($ty),+> Drop for $name<$($ty),+> {
                fn drop(&mut self) {
                    self.drop_active();
                }
            }

            impl<$($ty),+> Default for $name<$($ty),+>
            where
                $first: Default,
            {
                fn default() -> Self {
                    Self::with_0($first::default())
                }
            }

            impl<$($ty: Clone),+> Clone for $name<$($ty),+> {
                fn clone(&self) -> Self {
                    $(
                        if let Some(value) = self.[<get_ $idx>]() {
                            return Self::[<with_ $idx>](value.clone());
                        }
                    )+
                    Self {
                        payload: MaybeUninit::uninit(),
                        index: -1,
                    }
                }
            }

            impl<$($ty: PartialEq),+> PartialEq for $name<$($ty),+> {
                fn eq(&self, other: &Self) -> bool {
                    $(
                        if let (Some(a), Some(b)) = (self.[<get_ $idx>](), other.[<get_ $idx>]()) {
                            return a == b;
                        }
                    )+
                    self.index == other.index
                }
            }

            impl<$($ty: fmt::Debug),+> fmt::Debug for $name<$($ty),+> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    $(
                        if let Some(value) = self.[<get_ $idx>]() {
                            return f
                                .debug_struct(stringify!($name))
                                .field("tag", &self.tag())
                                .field("value", value)
                                .finish();
                        }
                    )+
                    f.debug_struct(stringify!($name)).field("tag", &0u32).finish()
                }
            }

            // SAFETY: the wrapper has the variant field layout for these
            // alternatives, and the name lists them in declaration order.
            unsafe impl<$($ty: FieldType),+> FieldType for $name<$($ty),+> {
                fn type_name() -> String {
                    let names: Vec<String> = vec![$($ty::type_name()),+];
                    format!("variant<{}>", names.join(","))
                }
            }
        }
    };
}

define_variant!(Variant2, Variant2Payload, A; 0: A, 1: B);
define_variant!(Variant3, Variant3Payload, A; 0: A, 1: B, 2: C);
define_variant!(Variant4, Variant4Payload, A; 0: A, 1: B, 2: C, 3: D);
