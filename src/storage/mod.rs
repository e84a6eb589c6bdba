//! # Storage Layer
//!
//! Columns commit their write pages and cluster boundaries to a
//! [`PageStorage`] backend. The field engine never touches physical layout;
//! compression, file formats and eviction belong to the backend.
//!
//! ## Backends
//!
//! | Backend | Durability | Use |
//! |---------|------------|-----|
//! | `MemoryPageStorage` | process lifetime | tests, benchmarks, in-process round trips |
//!
//! ## Connecting
//!
//! ```ignore
//! let storage = Arc::new(MemoryPageStorage::builder().page_size(4096).build()?);
//! field.connect(storage.clone())?;
//! ```
//!
//! ## Module Structure
//!
//! - `driver`: the `PageStorage` trait
//! - `memory`: `MemoryPageStorage` and its builder

mod driver;
mod memory;

pub use driver::PageStorage;
pub use memory::{MemoryPageStorage, MemoryPageStorageBuilder, StorageStats};
