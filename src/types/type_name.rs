//! # Type Name Normalization
//!
//! Field type names are plain strings so they can be stored next to the
//! columns and resolved again when data is read back. Several spellings of
//! the same type are accepted and mapped to one canonical name before the
//! factory dispatches on it.
//!
//! ## Canonical Names
//!
//! ```text
//! bool u8 i32 u32 i64 u64 f32 f64 cluster_size string
//! vector<T>  array<T,N>  variant<A,B,...>  <record name>
//! ```
//!
//! ## Aliases
//!
//! | Canonical | Accepted spellings |
//! |-----------|--------------------|
//! | bool | `Bool_t`, `Bool` |
//! | u8 | `uint8_t`, `std::uint8_t`, `unsigned char`, `UChar_t`, `UInt8` |
//! | i32 | `int`, `Int_t`, `int32_t`, `std::int32_t`, `Int32` |
//! | u32 | `unsigned`, `unsigned int`, `UInt_t`, `uint32_t`, `std::uint32_t`, `UInt32` |
//! | i64 | `long long`, `Long64_t`, `int64_t`, `std::int64_t`, `Int64` |
//! | u64 | `unsigned long long`, `ULong64_t`, `uint64_t`, `std::uint64_t`, `UInt64` |
//! | f32 | `float`, `Float_t`, `Float32` |
//! | f64 | `double`, `Double_t`, `Float64` |
//! | cluster_size | `ClusterSize`, `ClusterSize_t` |
//! | string | `std::string`, `String` |
//! | vector<…> | `std::vector<…>`, `RVec<…>`, `ROOT::VecOps::RVec<…>` |
//! | array<…> | `std::array<…>` |
//! | variant<…> | `std::variant<…>` |
//!
//! Only the outermost name is normalized here. Template arguments are
//! normalized when the factory recurses into them, and container type names
//! are rebuilt from the canonical names of their items.

use eyre::{bail, Result};

pub const VECTOR_PREFIX: &str = "vector<";
pub const ARRAY_PREFIX: &str = "array<";
pub const VARIANT_PREFIX: &str = "variant<";

const PREFIX_ALIASES: &[(&str, &str)] = &[
    ("std::vector<", VECTOR_PREFIX),
    ("ROOT::VecOps::RVec<", VECTOR_PREFIX),
    ("RVec<", VECTOR_PREFIX),
    ("std::array<", ARRAY_PREFIX),
    ("std::variant<", VARIANT_PREFIX),
];

fn scalar_alias(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "Bool_t" | "Bool" => "bool",
        "uint8_t" | "std::uint8_t" | "unsigned char" | "UChar_t" | "UInt8" => "u8",
        "int" | "Int_t" | "int32_t" | "std::int32_t" | "Int32" => "i32",
        "unsigned" | "unsigned int" | "UInt_t" | "uint32_t" | "std::uint32_t" | "UInt32" => "u32",
        "long long" | "Long64_t" | "int64_t" | "std::int64_t" | "Int64" => "i64",
        "unsigned long long" | "ULong64_t" | "uint64_t" | "std::uint64_t" | "UInt64" => "u64",
        "float" | "Float_t" | "Float32" => "f32",
        "double" | "Double_t" | "Float64" => "f64",
        "ClusterSize" | "ClusterSize_t" => "cluster_size",
        "std::string" | "String" => "string",
        _ => return None,
    };
    Some(canonical)
}

/// Maps the outermost spelling of `raw` to its canonical form.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(canonical) = scalar_alias(trimmed) {
        return canonical.to_string();
    }
    for (alias, canonical) in PREFIX_ALIASES {
        if let Some(rest) = trimmed.strip_prefix(alias) {
            return format!("{canonical}{rest}");
        }
    }
    trimmed.to_string()
}

/// Returns the text between `prefix` and the matching closing `>`.
///
/// `None` means `name` does not start with `prefix`. A name that starts with
/// the prefix but does not end with `>` is malformed.
pub fn template_args<'a>(name: &'a str, prefix: &str) -> Result<Option<&'a str>> {
    let Some(rest) = name.strip_prefix(prefix) else {
        return Ok(None);
    };
    check_balanced(name)?;
    match rest.strip_suffix('>') {
        Some(args) => Ok(Some(args)),
        None => bail!("type name '{}' has trailing text after its template arguments", name),
    }
}

/// Fails if the `<`/`>` brackets of `name` are not balanced, or if the
/// outermost bracket pair closes before the end of the name.
pub fn check_balanced(name: &str) -> Result<()> {
    let mut depth = 0usize;
    for (pos, ch) in name.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => {
                if depth == 0 {
                    bail!("unbalanced '>' at byte {} in type name '{}'", pos, name);
                }
                depth -= 1;
                if depth == 0 && pos + 1 != name.len() {
                    bail!("unexpected text after byte {} in type name '{}'", pos, name);
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        bail!("unbalanced '<' in type name '{}'", name);
    }
    Ok(())
}

/// Splits a comma separated template argument list at top-level commas only,
/// so `i32,variant<f64,i32>` yields `["i32", "variant<f64,i32>"]`.
pub fn split_type_list(list: &str) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut begin = 0;
    for (pos, ch) in list.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => {
                if depth == 0 {
                    bail!("unbalanced '>' in type list '{}'", list);
                }
                depth -= 1;
            }
            ',' if depth == 0 => {
                parts.push(list[begin..pos].trim());
                begin = pos + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        bail!("unbalanced '<' in type list '{}'", list);
    }
    parts.push(list[begin..].trim());

    if parts.iter().any(|p| p.is_empty()) {
        bail!("empty type in type list '{}'", list);
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_map_to_canonical_names() {
        assert_eq!(normalize("  int "), "i32");
        assert_eq!(normalize("std::int32_t"), "i32");
        assert_eq!(normalize("Float64"), "f64");
        assert_eq!(normalize("unsigned int"), "u32");
        assert_eq!(normalize("std::string"), "string");
        assert_eq!(normalize("Point"), "Point");
    }

    #[test]
    fn container_prefixes_are_rewritten() {
        assert_eq!(normalize("std::vector<int>"), "vector<int>");
        assert_eq!(normalize("ROOT::VecOps::RVec<float>"), "vector<float>");
        assert_eq!(normalize("std::array<double,3>"), "array<double,3>");
        assert_eq!(normalize("std::variant<int,double>"), "variant<int,double>");
    }

    #[test]
    fn split_respects_nesting() {
        let parts = split_type_list("i32, variant<f64,i32>,vector<array<u8,2>>").unwrap();
        assert_eq!(parts, vec!["i32", "variant<f64,i32>", "vector<array<u8,2>>"]);
    }

    #[test]
    fn split_rejects_empty_and_unbalanced() {
        assert!(split_type_list("i32,").is_err());
        assert!(split_type_list("").is_err());
        assert!(split_type_list("vector<i32").is_err());
        assert!(split_type_list("i32>").is_err());
    }

    #[test]
    fn template_args_strip_prefix_and_suffix() {
        assert_eq!(
            template_args("vector<vector<i32>>", VECTOR_PREFIX).unwrap(),
            Some("vector<i32>")
        );
        assert_eq!(template_args("string", VECTOR_PREFIX).unwrap(), None);
        assert!(template_args("vector<i32", VECTOR_PREFIX).is_err());
        assert!(template_args("vector<i32>x", VECTOR_PREFIX).is_err());
        assert!(template_args("vector<i32>>", VECTOR_PREFIX).is_err());
    }
}
