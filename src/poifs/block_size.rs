//! Big block size variants.
//!
//! A compound file uses either 512-byte sectors (major version 3) or
//! 4096-byte sectors (major version 4). Everything that depends on the
//! sector size hangs off this type so the arithmetic lives in one place.

use super::consts::*;
use crate::common::error::{PoifsError, Result};
use serde::{Deserialize, Serialize};

/// Supported big block sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BigBlockSize {
    /// 512-byte blocks, sector shift 9
    #[default]
    #[serde(rename = "512")]
    Small,
    /// 4096-byte blocks, sector shift 12
    #[serde(rename = "4096")]
    Large,
}

impl BigBlockSize {
    /// Resolve a sector shift read from a header.
    pub fn from_shift(shift: u16) -> Result<Self> {
        match shift {
            SECTOR_SHIFT_V3 => Ok(BigBlockSize::Small),
            SECTOR_SHIFT_V4 => Ok(BigBlockSize::Large),
            other => Err(PoifsError::UnsupportedFormat(format!(
                "Unsupported sector shift {} (block size {}), only 9 and 12 are valid",
                other,
                1u64.checked_shl(other as u32).unwrap_or(0)
            ))),
        }
    }

    /// Resolve a block size in bytes.
    pub fn from_bytes(size: usize) -> Result<Self> {
        match size {
            SECTOR_SIZE_V3 => Ok(BigBlockSize::Small),
            SECTOR_SIZE_V4 => Ok(BigBlockSize::Large),
            other => Err(PoifsError::UnsupportedFormat(format!(
                "Sector size must be 512 or 4096, got {}",
                other
            ))),
        }
    }

    /// Block size in bytes.
    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            BigBlockSize::Small => SECTOR_SIZE_V3,
            BigBlockSize::Large => SECTOR_SIZE_V4,
        }
    }

    /// Sector shift stored in the header.
    #[inline]
    pub fn shift(self) -> u16 {
        match self {
            BigBlockSize::Small => SECTOR_SHIFT_V3,
            BigBlockSize::Large => SECTOR_SHIFT_V4,
        }
    }

    /// Header major version matching this block size.
    #[inline]
    pub fn major_version(self) -> u16 {
        match self {
            BigBlockSize::Small => 3,
            BigBlockSize::Large => 4,
        }
    }

    /// Allocation table entries held by one FAT sector.
    #[inline]
    pub fn bat_entries_per_block(self) -> usize {
        self.bytes() / 4
    }

    /// FAT sector ids held by one DIFAT sector; the last slot chains onward.
    #[inline]
    pub fn xbat_entries_per_block(self) -> usize {
        self.bat_entries_per_block() - 1
    }

    /// Byte offset of the next-DIFAT pointer inside a DIFAT sector.
    #[inline]
    pub fn next_xbat_chain_offset(self) -> usize {
        self.xbat_entries_per_block() * 4
    }

    /// Directory entries held by one sector.
    #[inline]
    pub fn properties_per_block(self) -> usize {
        self.bytes() / DIRENTRY_SIZE
    }

    /// Byte offset of a sector in the file; the header occupies the first block.
    #[inline]
    pub fn offset_of(self, sector: u32) -> u64 {
        (sector as u64 + 1) * self.bytes() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_geometry() {
        let bs = BigBlockSize::Small;
        assert_eq!(bs.bytes(), 512);
        assert_eq!(bs.bat_entries_per_block(), 128);
        assert_eq!(bs.xbat_entries_per_block(), 127);
        assert_eq!(bs.next_xbat_chain_offset(), 508);
        assert_eq!(bs.properties_per_block(), 4);
        assert_eq!(bs.offset_of(0), 512);
    }

    #[test]
    fn test_large_geometry() {
        let bs = BigBlockSize::from_shift(12).unwrap();
        assert_eq!(bs, BigBlockSize::Large);
        assert_eq!(bs.xbat_entries_per_block(), 1023);
        assert_eq!(bs.offset_of(1), 8192);
        assert_eq!(bs.major_version(), 4);
    }

    #[test]
    fn test_rejects_other_sizes() {
        assert!(matches!(
            BigBlockSize::from_shift(10),
            Err(PoifsError::UnsupportedFormat(_))
        ));
        assert!(BigBlockSize::from_bytes(1024).is_err());
    }
}
