//! # Macros
//!
//! ## record_type!
//!
//! Generates the [`FieldType`](crate::types::FieldType) and
//! [`RecordType`](crate::types::RecordType) impls of a struct so it can be
//! stored by a record field. Members are listed in the order they should be
//! stored; each listed type must be the member's declared type, which the
//! expansion checks at compile time. The struct must implement `Default`.
//!
//! ```ignore
//! #[derive(Default)]
//! struct Track {
//!     pt: f32,
//!     hits: RVec<u32>,
//! }
//!
//! record_type!(Track { pt: f32, hits: RVec<u32> });
//!
//! // Generates:
//! // FieldType::type_name() == "Track"
//! // RecordType::descriptor() with members
//! //   ("pt", "f32", offset_of!(Track, pt)),
//! //   ("hits", "vector<u32>", offset_of!(Track, hits))
//! ```
//!
//! The stored type name defaults to the struct name; `record_type!(Track as
//! "reco::Track" { .. })` overrides it.
//!
//! ## zerocopy_accessors!
//!
//! Generates getter and setter methods for zerocopy struct fields that use
//! little-endian wrapper types.
//!
//! ```ignore
//! #[repr(C)]
//! struct SwitchElement {
//!     index: U32<LittleEndian>,
//!     tag: U32<LittleEndian>,
//! }
//!
//! impl SwitchElement {
//!     zerocopy_accessors! {
//!         index: u32,
//!         tag: u32,
//!     }
//! }
//!
//! // Generates:
//! // pub fn index(&self) -> u32 { self.index.get() }
//! // pub fn set_index(&mut self, val: u32) { self.index = U32::new(val); }
//! // pub fn tag(&self) -> u32 { self.tag.get() }
//! // pub fn set_tag(&mut self, val: u32) { self.tag = U32::new(val); }
//! ```

/// Declares a struct as a record field type.
#[macro_export]
macro_rules! record_type {
    (@name $ty:ident) => {
        ::std::string::String::from(stringify!($ty))
    };
    (@name $ty:ident $name:literal) => {
        ::std::string::String::from($name)
    };
    ($ty:ident $(as $name:literal)? { $($member:ident : $mty:ty),* $(,)? }) => {
        // SAFETY: the descriptor below is derived from the struct itself.
        unsafe impl $crate::types::FieldType for $ty {
            fn type_name() -> ::std::string::String {
                $crate::record_type!(@name $ty $($name)?)
            }
        }

        // SAFETY: offsets come from offset_of! and member types are checked
        // by assert_member_types.
        unsafe impl $crate::types::RecordType for $ty {
            fn descriptor() -> $crate::types::RecordDescriptor {
                #[allow(dead_code)]
                fn assert_member_types(record: &$ty) {
                    $( let _: &$mty = &record.$member; )*
                }

                let builder = $crate::types::RecordDescriptor::builder::<$ty>(
                    <$ty as $crate::types::FieldType>::type_name(),
                );
                $(
                    // SAFETY: see the impl-level comment.
                    let builder = unsafe {
                        builder.member(
                            stringify!($member),
                            <$mty as $crate::types::FieldType>::type_name(),
                            ::core::mem::offset_of!($ty, $member),
                        )
                    };
                )*
                builder.build()
            }
        }
    };
}

/// Generates getter and setter methods for zerocopy little-endian fields.
#[macro_export]
macro_rules! zerocopy_accessors {
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            $crate::zerocopy_accessors!(@impl $field, $ty);
        )*
    };
}
