//! Configuration for opening and building compound files.
//!
//! Limits that guard against maliciously crafted files are carried here
//! instead of in process-wide state, so two filesystems in one process can
//! use different policies.
//!
//! # Examples
//!
//! ```rust
//! use poifs::poifs::{BigBlockSize, LoadStrategy, PoifsOptions};
//!
//! // Create with defaults
//! let options = PoifsOptions::default();
//!
//! // Or customize
//! let options = PoifsOptions::new()
//!     .with_big_block_size(BigBlockSize::Large)
//!     .with_load_strategy(LoadStrategy::Consuming)
//!     .with_max_stream_size(64 * 1024 * 1024);
//! ```
use super::block_size::BigBlockSize;
use crate::common::error::{PoifsError, Result};
use serde::{Deserialize, Serialize};

/// Default upper bound for a declared stream size.
pub const DEFAULT_MAX_STREAM_SIZE: u64 = 0x7FFF_FFFF;

/// Default upper bound for a single internal buffer.
pub const DEFAULT_MAX_RECORD_LENGTH: u64 = 100_000_000;

/// How block chains are materialized when a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// Follow chains on demand with random access to the byte source
    #[default]
    Lazy,
    /// Claim every block once at open time and reject blocks shared between chains
    Consuming,
}

/// Options controlling limits and layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoifsOptions {
    /// Largest declared stream size accepted when reading or writing a document
    pub max_stream_size: u64,
    /// Largest single buffer allocated while loading internal structures
    pub max_record_length: u64,
    /// Sector size used for newly created filesystems
    pub big_block_size: BigBlockSize,
    /// Chain materialization strategy used when opening
    pub load_strategy: LoadStrategy,
    /// Reject every mutating operation
    pub read_only: bool,
}

impl Default for PoifsOptions {
    fn default() -> Self {
        Self {
            max_stream_size: DEFAULT_MAX_STREAM_SIZE,
            max_record_length: DEFAULT_MAX_RECORD_LENGTH,
            big_block_size: BigBlockSize::Small,
            load_strategy: LoadStrategy::Lazy,
            read_only: false,
        }
    }
}

impl PoifsOptions {
    /// Create a new `PoifsOptions` with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the largest accepted stream size.
    #[inline]
    pub fn with_max_stream_size(mut self, limit: u64) -> Self {
        self.max_stream_size = limit;
        self
    }

    /// Set the largest internal buffer the engine may allocate.
    #[inline]
    pub fn with_max_record_length(mut self, limit: u64) -> Self {
        self.max_record_length = limit;
        self
    }

    /// Set the sector size for newly created filesystems.
    ///
    /// Has no effect when opening an existing file; the header decides.
    #[inline]
    pub fn with_big_block_size(mut self, size: BigBlockSize) -> Self {
        self.big_block_size = size;
        self
    }

    /// Set the chain materialization strategy.
    #[inline]
    pub fn with_load_strategy(mut self, strategy: LoadStrategy) -> Self {
        self.load_strategy = strategy;
        self
    }

    /// Set whether mutations are rejected.
    #[inline]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Check a stream size against `max_stream_size`.
    pub fn check_stream_size(&self, requested: u64) -> Result<()> {
        if requested > self.max_stream_size {
            return Err(PoifsError::SizeLimit {
                requested,
                limit: self.max_stream_size,
            });
        }
        Ok(())
    }

    /// Check an internal buffer length against `max_record_length`.
    pub fn check_record_length(&self, requested: u64) -> Result<()> {
        if requested > self.max_record_length {
            return Err(PoifsError::SizeLimit {
                requested,
                limit: self.max_record_length,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = PoifsOptions::default();
        assert_eq!(options.max_stream_size, 0x7FFF_FFFF);
        assert_eq!(options.max_record_length, 100_000_000);
        assert_eq!(options.big_block_size.bytes(), 512);
        assert_eq!(options.load_strategy, LoadStrategy::Lazy);
        assert!(!options.read_only);
    }

    #[test]
    fn test_limits() {
        let options = PoifsOptions::new()
            .with_max_stream_size(100)
            .with_max_record_length(10);
        assert!(options.check_stream_size(100).is_ok());
        assert!(matches!(
            options.check_stream_size(101),
            Err(PoifsError::SizeLimit { requested: 101, limit: 100 })
        ));
        assert!(options.check_record_length(11).is_err());
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_deserialize_partial_yaml() {
        let yaml = "max_stream_size: 4096\nload_strategy: consuming\nbig_block_size: \"4096\"\n";
        let options: PoifsOptions = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(options.max_stream_size, 4096);
        assert_eq!(options.load_strategy, LoadStrategy::Consuming);
        assert_eq!(options.big_block_size, BigBlockSize::Large);
        assert_eq!(options.max_record_length, DEFAULT_MAX_RECORD_LENGTH);
    }
}
