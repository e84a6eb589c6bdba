//! # turfield Configuration Module
//!
//! This module centralizes all configuration constants for turfield. Constants
//! are grouped by their functional area and interdependencies are documented
//! and enforced through compile-time assertions.
//!
//! ## Why Centralization?
//!
//! Element widths are shared between the column layer, the field layer and
//! the storage backend. If the switch element width drifts away from the
//! index element width, switch info decoding silently reads the wrong half of
//! an element. Co-locating these values keeps them in lockstep.
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric configuration values with dependency documentation

pub mod constants;
pub use constants::*;
