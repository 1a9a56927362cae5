//! Unified error types for the POIFS engine.
//!
//! Lower layers (FAT, property table, block stores) never swallow
//! corruption; everything surfaces as a [`PoifsError`] so the façade can
//! decide policy.

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{CorruptLocation, PoifsError, Result};
