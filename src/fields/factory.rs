//! # Field Factory
//!
//! Builds a field tree from a type name. Names are normalized first, so
//! `std::vector<Double_t>` and `vector<f64>` produce the same field.
//!
//! ## Resolution Order
//!
//! ```text
//! normalize ─► scalar? ─► string? ─► vector<T>? ─► array<T,N>? ─► variant<..>? ─► registry? ─► error
//! ```
//!
//! Template arguments are created recursively, at most
//! `MAX_TYPE_NESTING_DEPTH` levels deep. Item fields are named `_0`;
//! variant alternatives `_0`, `_1`, and so on.
//!
//! ## Usage
//!
//! ```ignore
//! let mut registry = TypeRegistry::new();
//! registry.register::<Hit>()?;
//!
//! let factory = FieldFactory::new(&registry);
//! let field = factory.create("hits", "std::vector<Hit>")?;
//! assert_eq!(field.type_name(), "vector<Hit>");
//! ```

use eyre::{bail, ensure, eyre, Result, WrapErr};
use tracing::{debug, trace};

use super::Field;
use crate::config::{MAX_TYPE_NESTING_DEPTH, MAX_VARIANT_ALTERNATIVES};
use crate::types::type_name::{self, ARRAY_PREFIX, VARIANT_PREFIX, VECTOR_PREFIX};
use crate::types::{FieldType, ScalarType, TypeRegistry};

/// Creates fields by type name, resolving record names through an optional
/// [`TypeRegistry`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldFactory<'r> {
    registry: Option<&'r TypeRegistry>,
}

impl<'r> FieldFactory<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    /// Factory for builtin types only.
    pub fn builtin() -> Self {
        Self { registry: None }
    }

    pub fn create(&self, field_name: &str, type_name: &str) -> Result<Field> {
        let field = self.create_nested(field_name, type_name, 0)?;
        debug!(
            field = field_name,
            type_name = field.type_name(),
            sub_fields = field.iter().count(),
            "created field"
        );
        Ok(field)
    }

    /// Creates the field for the Rust type `T`.
    pub fn create_for<T: FieldType>(&self, field_name: &str) -> Result<Field> {
        self.create(field_name, &T::type_name())
    }

    fn create_nested(&self, field_name: &str, raw: &str, depth: usize) -> Result<Field> {
        ensure!(
            depth <= MAX_TYPE_NESTING_DEPTH,
            "type of field '{}' is nested more than {} levels deep",
            field_name,
            MAX_TYPE_NESTING_DEPTH
        );

        let canonical = type_name::normalize(raw);
        ensure!(!canonical.is_empty(), "field '{}' has an empty type name", field_name);
        type_name::check_balanced(&canonical)
            .wrap_err_with(|| format!("invalid type for field '{}'", field_name))?;
        trace!(field = field_name, raw, canonical = %canonical, depth, "resolving type");

        if let Some(scalar) = ScalarType::from_type_name(&canonical) {
            return Ok(Field::scalar(field_name, scalar));
        }
        if canonical == "string" {
            return Ok(Field::string(field_name));
        }

        if let Some(args) = type_name::template_args(&canonical, VECTOR_PREFIX)? {
            let item = self.create_nested("_0", args, depth + 1)?;
            return Ok(Field::vector(field_name, item));
        }

        if let Some(args) = type_name::template_args(&canonical, ARRAY_PREFIX)? {
            let parts = type_name::split_type_list(args)?;
            let [item_type, len] = parts.as_slice() else {
                bail!(
                    "array type '{}' of field '{}' needs an item type and a length",
                    canonical,
                    field_name
                );
            };
            let len: usize = len.parse().map_err(|_| {
                eyre!("invalid array length '{}' in type '{}'", len, canonical)
            })?;
            let item = self.create_nested("_0", item_type, depth + 1)?;
            return Field::array(field_name, item, len);
        }

        if let Some(args) = type_name::template_args(&canonical, VARIANT_PREFIX)? {
            let parts = type_name::split_type_list(args)
                .wrap_err_with(|| format!("invalid alternatives in type '{}'", canonical))?;
            ensure!(
                parts.len() <= MAX_VARIANT_ALTERNATIVES,
                "variant type of field '{}' has {} alternatives, at most {} are supported",
                field_name,
                parts.len(),
                MAX_VARIANT_ALTERNATIVES
            );
            let alternatives = parts
                .iter()
                .enumerate()
                .map(|(i, part)| self.create_nested(&format!("_{i}"), part, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            return Field::variant(field_name, alternatives);
        }

        if let Some(descriptor) = self.registry.and_then(|r| r.get(&canonical)) {
            let members = descriptor
                .members()
                .iter()
                .map(|member| {
                    self.create_nested(member.name(), member.type_name(), depth + 1)
                        .wrap_err_with(|| {
                            format!("failed to create member '{}' of '{}'", member.name(), canonical)
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            return Field::record(field_name, descriptor, members);
        }

        bail!("unknown type '{}' for field '{}'", raw.trim(), field_name)
    }
}
