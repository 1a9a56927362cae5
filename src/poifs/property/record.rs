//! The 128-byte directory entry record.

use crate::common::binary::{decode_utf16le, encode_utf16le, utf16_len};
use crate::common::error::{PoifsError, Result};
use crate::poifs::block_size::BigBlockSize;
use crate::poifs::consts::*;
use chrono::{DateTime, Utc};
use tracing::debug;
use zerocopy::{FromBytes, IntoBytes, LE, U16, U32, U64};
use zerocopy_derive::{
    FromBytes as DeriveFromBytes, Immutable as DeriveImmutable, IntoBytes as DeriveIntoBytes,
    KnownLayout as DeriveKnownLayout,
};

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01.
const FILETIME_EPOCH_OFFSET: i64 = 11_644_473_600;
/// FILETIME ticks (100 ns) per second.
const FILETIME_TICKS: u64 = 10_000_000;

/// On-disk directory entry (128 bytes).
#[derive(Debug, Clone, DeriveFromBytes, DeriveIntoBytes, DeriveImmutable, DeriveKnownLayout)]
#[repr(C)]
struct RawPropertyRecord {
    /// Name in UTF-16LE, NUL padded
    name: [u8; 64],
    /// Name length in bytes, terminator included
    name_len: U16<LE>,
    entry_type: u8,
    node_color: u8,
    sid_left: U32<LE>,
    sid_right: U32<LE>,
    sid_child: U32<LE>,
    clsid: [u8; 16],
    state_bits: U32<LE>,
    creation_time: U64<LE>,
    modified_time: U64<LE>,
    start_sector: U32<LE>,
    stream_size: U64<LE>,
}

/// Entry type stored in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    /// Storage (directory)
    Storage,
    /// Stream (document)
    Stream,
    /// Root storage
    Root,
}

impl PropertyType {
    /// Decode a type byte. Empty and unsupported types yield `None`.
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            STGTY_STORAGE => Some(PropertyType::Storage),
            STGTY_STREAM => Some(PropertyType::Stream),
            STGTY_ROOT => Some(PropertyType::Root),
            _ => None,
        }
    }

    /// Type byte written to disk.
    pub fn to_byte(self) -> u8 {
        match self {
            PropertyType::Storage => STGTY_STORAGE,
            PropertyType::Stream => STGTY_STREAM,
            PropertyType::Root => STGTY_ROOT,
        }
    }
}

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Entry name
    pub name: String,
    /// Entry type
    pub kind: PropertyType,
    /// Red-black node colour as stored
    pub color: u8,
    /// Left sibling index as stored
    pub left: u32,
    /// Right sibling index as stored
    pub right: u32,
    /// Child index as stored (storages only)
    pub child: u32,
    /// Class id
    pub clsid: [u8; 16],
    /// User state bits
    pub state_bits: u32,
    /// Creation time as FILETIME
    pub created: u64,
    /// Modification time as FILETIME
    pub modified: u64,
    /// First block of the data (mini stream start for the root)
    pub start_block: u32,
    /// Data size in bytes
    pub size: u64,
    /// Index of the record this entry was read from
    pub index: u32,
}

impl Property {
    fn blank(name: String, kind: PropertyType) -> Self {
        Self {
            name,
            kind,
            color: COLOR_BLACK,
            left: NOSTREAM,
            right: NOSTREAM,
            child: NOSTREAM,
            clsid: [0; 16],
            state_bits: 0,
            created: 0,
            modified: 0,
            start_block: ENDOFCHAIN,
            size: 0,
            index: NOSTREAM,
        }
    }

    /// The root entry of an empty filesystem.
    pub fn new_root() -> Self {
        Self::blank(ROOT_ENTRY_NAME.to_string(), PropertyType::Root)
    }

    /// A new storage.
    pub fn new_storage(name: &str) -> Result<Self> {
        validate_name(name)?;
        let mut property = Self::blank(name.to_string(), PropertyType::Storage);
        property.start_block = 0;
        Ok(property)
    }

    /// A new stream of `size` bytes; the start block is set once data is placed.
    pub fn new_stream(name: &str, size: u64) -> Result<Self> {
        validate_name(name)?;
        let mut property = Self::blank(name.to_string(), PropertyType::Stream);
        property.size = size;
        Ok(property)
    }

    /// True for the root and storages.
    #[inline]
    pub fn is_directory(&self) -> bool {
        !matches!(self.kind, PropertyType::Stream)
    }

    /// True for streams.
    #[inline]
    pub fn is_document(&self) -> bool {
        matches!(self.kind, PropertyType::Stream)
    }

    /// Whether a stream of this size lives in the mini stream.
    #[inline]
    pub fn should_use_small_blocks(&self) -> bool {
        uses_small_blocks(self.size)
    }

    /// Creation time, `None` when not recorded.
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        filetime_to_datetime(self.created)
    }

    /// Modification time, `None` when not recorded.
    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        filetime_to_datetime(self.modified)
    }

    /// Decode record `index`. Empty and unsupported records yield `None`.
    pub fn parse(record: &[u8], index: u32, block_size: BigBlockSize) -> Result<Option<Self>> {
        let raw = RawPropertyRecord::read_from_bytes(record).map_err(|_| {
            PoifsError::corrupt_entry(index, format!("record is {} bytes, expected 128", record.len()))
        })?;

        let Some(kind) = PropertyType::from_byte(raw.entry_type) else {
            if raw.entry_type != STGTY_EMPTY {
                debug!(index, entry_type = raw.entry_type, "skipping unsupported entry type");
            }
            return Ok(None);
        };

        let name_len = raw.name_len.get() as usize;
        if name_len % 2 != 0 || name_len > raw.name.len() {
            return Err(PoifsError::corrupt_entry(
                index,
                format!("invalid name length {} (must be even and at most 64)", name_len),
            ));
        }
        let name = decode_utf16le(&raw.name[..name_len.saturating_sub(2)]);

        // 512-byte sector files only define the low 32 bits of the size.
        let size = match block_size {
            BigBlockSize::Small => raw.stream_size.get() & 0xFFFF_FFFF,
            BigBlockSize::Large => raw.stream_size.get(),
        };

        Ok(Some(Self {
            name,
            kind,
            color: raw.node_color,
            left: raw.sid_left.get(),
            right: raw.sid_right.get(),
            child: raw.sid_child.get(),
            clsid: raw.clsid,
            state_bits: raw.state_bits.get(),
            created: raw.creation_time.get(),
            modified: raw.modified_time.get(),
            start_block: raw.start_sector.get(),
            size,
            index,
        }))
    }

    /// Encode as a 128-byte record.
    pub fn to_bytes(&self) -> [u8; DIRENTRY_SIZE] {
        let mut name = [0u8; 64];
        let encoded = encode_utf16le(&self.name);
        let n = encoded.len().min(MAX_NAME_LEN * 2);
        name[..n].copy_from_slice(&encoded[..n]);

        let raw = RawPropertyRecord {
            name,
            name_len: U16::new((n + 2) as u16),
            entry_type: self.kind.to_byte(),
            node_color: self.color,
            sid_left: U32::new(self.left),
            sid_right: U32::new(self.right),
            sid_child: U32::new(self.child),
            clsid: self.clsid,
            state_bits: U32::new(self.state_bits),
            creation_time: U64::new(self.created),
            modified_time: U64::new(self.modified),
            start_sector: U32::new(self.start_block),
            stream_size: U64::new(self.size),
        };

        let mut out = [0u8; DIRENTRY_SIZE];
        out.copy_from_slice(raw.as_bytes());
        out
    }
}

/// An unused record: no name, no type, no links.
pub fn empty_record() -> [u8; DIRENTRY_SIZE] {
    let mut record = [0u8; DIRENTRY_SIZE];
    record[68..80].fill(0xFF);
    record
}

/// Whether a stream of `size` bytes lives in the mini stream.
#[inline]
pub fn uses_small_blocks(size: u64) -> bool {
    size < MINI_STREAM_CUTOFF as u64
}

/// Check an entry name: 1 to 31 UTF-16 code units.
pub fn validate_name(name: &str) -> Result<()> {
    let units = utf16_len(name);
    if units == 0 || units > MAX_NAME_LEN {
        return Err(PoifsError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Convert a FILETIME to UTC. Zero means "not set".
pub fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 {
        return None;
    }
    let secs = (filetime / FILETIME_TICKS) as i64 - FILETIME_EPOCH_OFFSET;
    let nanos = ((filetime % FILETIME_TICKS) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

/// Convert UTC to a FILETIME, clamping times before 1601 to zero.
pub fn datetime_to_filetime(time: DateTime<Utc>) -> u64 {
    let secs = time.timestamp() + FILETIME_EPOCH_OFFSET;
    if secs < 0 {
        return 0;
    }
    (secs as u64)
        .saturating_mul(FILETIME_TICKS)
        .saturating_add(time.timestamp_subsec_nanos() as u64 / 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_layout() {
        let mut property = Property::new_stream("Book", 1234).unwrap();
        property.start_block = 9;
        let bytes = property.to_bytes();
        assert_eq!(&bytes[..8], &[b'B', 0, b'o', 0, b'o', 0, b'k', 0]);
        assert_eq!(u16::from_le_bytes([bytes[64], bytes[65]]), 10);
        assert_eq!(bytes[66], STGTY_STREAM);
        assert_eq!(bytes[67], COLOR_BLACK);
        assert_eq!(&bytes[68..72], &[0xFF; 4]);
        assert_eq!(u32::from_le_bytes([bytes[116], bytes[117], bytes[118], bytes[119]]), 9);
        assert_eq!(u32::from_le_bytes([bytes[120], bytes[121], bytes[122], bytes[123]]), 1234);

        let parsed = Property::parse(&bytes, 3, BigBlockSize::Small).unwrap().unwrap();
        assert_eq!(parsed.name, "Book");
        assert_eq!(parsed.size, 1234);
        assert_eq!(parsed.index, 3);
    }

    #[test]
    fn test_size_high_bits_ignored_for_small_blocks() {
        let mut property = Property::new_stream("Big", 0).unwrap();
        property.size = 0x1_0000_0010;
        let bytes = property.to_bytes();
        let small = Property::parse(&bytes, 1, BigBlockSize::Small).unwrap().unwrap();
        assert_eq!(small.size, 0x10);
        let large = Property::parse(&bytes, 1, BigBlockSize::Large).unwrap().unwrap();
        assert_eq!(large.size, 0x1_0000_0010);
    }

    #[test]
    fn test_empty_and_unknown_records() {
        assert!(Property::parse(&empty_record(), 5, BigBlockSize::Small).unwrap().is_none());
        let mut record = Property::new_root().to_bytes();
        record[66] = 3;
        assert!(Property::parse(&record, 5, BigBlockSize::Small).unwrap().is_none());
    }

    #[test]
    fn test_bad_name_length() {
        let mut record = Property::new_root().to_bytes();
        record[64] = 7;
        assert!(Property::parse(&record, 0, BigBlockSize::Small).is_err());
        record[64] = 66;
        assert!(Property::parse(&record, 0, BigBlockSize::Small).is_err());
    }

    #[test]
    fn test_name_length_boundary() {
        let ok = "a".repeat(31);
        let property = Property::new_stream(&ok, 0).unwrap();
        let bytes = property.to_bytes();
        assert_eq!(u16::from_le_bytes([bytes[64], bytes[65]]), 64);
        let parsed = Property::parse(&bytes, 1, BigBlockSize::Small).unwrap().unwrap();
        assert_eq!(parsed.name, ok);

        let too_long = "a".repeat(32);
        assert!(matches!(
            Property::new_stream(&too_long, 0),
            Err(PoifsError::InvalidName(_))
        ));
        assert!(Property::new_storage("").is_err());
        // Surrogate pairs count as two units.
        assert!(validate_name(&"\u{1F600}".repeat(16)).is_err());
    }

    #[test]
    fn test_filetime_conversion() {
        let time = Utc.with_ymd_and_hms(2020, 2, 29, 12, 30, 0).unwrap();
        let filetime = datetime_to_filetime(time);
        assert_eq!(filetime_to_datetime(filetime), Some(time));
        assert_eq!(filetime_to_datetime(0), None);
        assert_eq!(
            filetime_to_datetime(116_444_736_000_000_000),
            DateTime::from_timestamp(0, 0)
        );
    }
}
