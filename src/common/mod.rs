//! Shared plumbing: errors, binary helpers and format sniffing.

// Submodule declarations
pub mod binary;
pub mod detection;
pub mod error;

// Re-exports for convenience
pub use detection::FileMagic;
pub use error::{CorruptLocation, PoifsError, Result};
