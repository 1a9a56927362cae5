//! The compound file header block.
//!
//! The header is always 512 bytes on disk. For 4096-byte sector files the
//! first big block is still reserved for it, the remaining bytes are zero.
//!
//! Every field is kept, including the reserved and transaction bytes, so
//! that parsing a header and serializing it again yields identical bytes.

use super::block_size::BigBlockSize;
use super::consts::*;
use crate::common::detection::FileMagic;
use crate::common::error::{CorruptLocation, PoifsError, Result};
use tracing::warn;
use zerocopy::{FromBytes, IntoBytes, LE, U16, U32};
use zerocopy_derive::{
    FromBytes as DeriveFromBytes, Immutable as DeriveImmutable, IntoBytes as DeriveIntoBytes,
    KnownLayout as DeriveKnownLayout,
};

/// On-disk header layout (512 bytes).
#[derive(Debug, Clone, DeriveFromBytes, DeriveIntoBytes, DeriveImmutable, DeriveKnownLayout)]
#[repr(C)]
struct RawHeader {
    magic: [u8; 8],
    clsid: [u8; 16],
    minor_version: U16<LE>,
    major_version: U16<LE>,
    byte_order: U16<LE>,
    sector_shift: U16<LE>,
    mini_sector_shift: U16<LE>,
    reserved: [u8; 6],
    num_dir_sectors: U32<LE>,
    num_fat_sectors: U32<LE>,
    first_dir_sector: U32<LE>,
    transaction_signature: U32<LE>,
    mini_stream_cutoff: U32<LE>,
    first_minifat_sector: U32<LE>,
    num_minifat_sectors: U32<LE>,
    first_difat_sector: U32<LE>,
    num_difat_sectors: U32<LE>,
    difat: [U32<LE>; HEADER_DIFAT_ENTRIES],
}

/// Parsed header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBlock {
    /// Class id stored in the header (normally zero)
    pub clsid: [u8; 16],
    /// Minor format version
    pub minor_version: u16,
    /// Major format version, 3 or 4
    pub major_version: u16,
    /// Byte order mark, always 0xFFFE
    pub byte_order: u16,
    /// Big block size
    pub big_block_size: BigBlockSize,
    /// log2 of the mini block size, always 6
    pub mini_sector_shift: u16,
    /// Reserved bytes, kept verbatim
    pub reserved: [u8; 6],
    /// Directory sector count (zero for 512-byte sector files)
    pub num_dir_sectors: u32,
    /// Number of FAT sectors
    pub bat_count: u32,
    /// First sector of the directory stream
    pub property_start: u32,
    /// Transaction signature, kept verbatim
    pub transaction_signature: u32,
    /// Mini stream cutoff stored in the file
    pub mini_stream_cutoff: u32,
    /// First sector of the mini-FAT
    pub sbat_start: u32,
    /// Number of mini-FAT sectors
    pub sbat_count: u32,
    /// First DIFAT sector
    pub xbat_start: u32,
    /// Number of DIFAT sectors
    pub xbat_count: u32,
    /// The 109 FAT sector slots embedded in the header
    pub bat_slots: [u32; HEADER_DIFAT_ENTRIES],
}

impl HeaderBlock {
    /// Build a header for an empty filesystem.
    pub fn new(big_block_size: BigBlockSize) -> Self {
        Self {
            clsid: [0; 16],
            minor_version: MINOR_VERSION,
            major_version: big_block_size.major_version(),
            byte_order: BYTE_ORDER_LE,
            big_block_size,
            mini_sector_shift: MINI_SECTOR_SHIFT,
            reserved: [0; 6],
            num_dir_sectors: 0,
            bat_count: 0,
            property_start: ENDOFCHAIN,
            transaction_signature: 0,
            mini_stream_cutoff: MINI_STREAM_CUTOFF,
            sbat_start: ENDOFCHAIN,
            sbat_count: 0,
            xbat_start: ENDOFCHAIN,
            xbat_count: 0,
            bat_slots: [FREESECT; HEADER_DIFAT_ENTRIES],
        }
    }

    /// Parse the leading bytes of a file.
    ///
    /// Only the first 512 bytes are inspected. Inputs that are not compound
    /// files at all fail with one of the format identity errors, so callers
    /// can redirect them to another parser.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(PoifsError::EmptyFile);
        }

        match FileMagic::detect(data) {
            FileMagic::Ole2 => {},
            FileMagic::Ooxml => return Err(PoifsError::OfficeXmlFile),
            FileMagic::Unknown => {
                let mut signature = [0u8; 8];
                let n = data.len().min(8);
                signature[..n].copy_from_slice(&data[..n]);
                return Err(PoifsError::NotOle2File(format!(
                    "Invalid header signature; read 0x{:016X}, expected 0x{:016X}",
                    u64::from_le_bytes(signature),
                    u64::from_le_bytes(*MAGIC)
                )));
            },
            other => {
                return Err(PoifsError::NotOle2File(format!(
                    "The supplied data appears to be {}",
                    other.describe()
                )));
            },
        }

        if data.len() < HEADER_SIZE {
            return Err(PoifsError::NotOle2File(format!(
                "Unable to read entire header; {} bytes read; expected {} bytes",
                data.len(),
                HEADER_SIZE
            )));
        }

        let raw = RawHeader::read_from_bytes(&data[..HEADER_SIZE])
            .map_err(|_| PoifsError::corrupt(CorruptLocation::Header, "unreadable header"))?;

        let big_block_size = BigBlockSize::from_shift(raw.sector_shift.get())?;

        let byte_order = raw.byte_order.get();
        if byte_order != BYTE_ORDER_LE {
            return Err(PoifsError::UnsupportedFormat(format!(
                "Unsupported byte order 0x{:04X}, expected 0x{:04X}",
                byte_order, BYTE_ORDER_LE
            )));
        }

        let mini_sector_shift = raw.mini_sector_shift.get();
        if mini_sector_shift != MINI_SECTOR_SHIFT {
            return Err(PoifsError::UnsupportedFormat(format!(
                "Unsupported mini sector shift {}, expected {}",
                mini_sector_shift, MINI_SECTOR_SHIFT
            )));
        }

        let major_version = raw.major_version.get();
        if major_version != big_block_size.major_version() {
            warn!(
                major_version,
                block_size = big_block_size.bytes(),
                "header major version does not match the sector size"
            );
        }

        let mini_stream_cutoff = raw.mini_stream_cutoff.get();
        if mini_stream_cutoff != MINI_STREAM_CUTOFF {
            warn!(
                mini_stream_cutoff,
                "non-standard mini stream cutoff, using {}", MINI_STREAM_CUTOFF
            );
        }

        let mut bat_slots = [FREESECT; HEADER_DIFAT_ENTRIES];
        for (slot, value) in bat_slots.iter_mut().zip(raw.difat.iter()) {
            *slot = value.get();
        }

        Ok(Self {
            clsid: raw.clsid,
            minor_version: raw.minor_version.get(),
            major_version,
            byte_order,
            big_block_size,
            mini_sector_shift,
            reserved: raw.reserved,
            num_dir_sectors: raw.num_dir_sectors.get(),
            bat_count: raw.num_fat_sectors.get(),
            property_start: raw.first_dir_sector.get(),
            transaction_signature: raw.transaction_signature.get(),
            mini_stream_cutoff,
            sbat_start: raw.first_minifat_sector.get(),
            sbat_count: raw.num_minifat_sectors.get(),
            xbat_start: raw.first_difat_sector.get(),
            xbat_count: raw.num_difat_sectors.get(),
            bat_slots,
        })
    }

    /// The FAT sector ids held by the header itself.
    pub fn bat_array(&self) -> &[u32] {
        let n = (self.bat_count as usize).min(HEADER_DIFAT_ENTRIES);
        &self.bat_slots[..n]
    }

    /// Store FAT sector ids; only the first 109 fit in the header.
    pub fn set_bat_array(&mut self, sectors: &[u32]) {
        self.bat_slots = [FREESECT; HEADER_DIFAT_ENTRIES];
        for (slot, &sector) in self.bat_slots.iter_mut().zip(sectors) {
            *slot = sector;
        }
    }

    /// Serialize to the fixed 512-byte on-disk form.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut difat = [U32::<LE>::new(FREESECT); HEADER_DIFAT_ENTRIES];
        for (raw, &value) in difat.iter_mut().zip(self.bat_slots.iter()) {
            *raw = U32::new(value);
        }

        let raw = RawHeader {
            magic: *MAGIC,
            clsid: self.clsid,
            minor_version: U16::new(self.minor_version),
            major_version: U16::new(self.major_version),
            byte_order: U16::new(self.byte_order),
            sector_shift: U16::new(self.big_block_size.shift()),
            mini_sector_shift: U16::new(self.mini_sector_shift),
            reserved: self.reserved,
            num_dir_sectors: U32::new(self.num_dir_sectors),
            num_fat_sectors: U32::new(self.bat_count),
            first_dir_sector: U32::new(self.property_start),
            transaction_signature: U32::new(self.transaction_signature),
            mini_stream_cutoff: U32::new(self.mini_stream_cutoff),
            first_minifat_sector: U32::new(self.sbat_start),
            num_minifat_sectors: U32::new(self.sbat_count),
            first_difat_sector: U32::new(self.xbat_start),
            num_difat_sectors: U32::new(self.xbat_count),
            difat,
        };

        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(raw.as_bytes());
        out
    }

    /// Serialize padded to one big block.
    pub fn to_block(&self) -> Vec<u8> {
        let mut block = vec![0u8; self.big_block_size.bytes()];
        block[..HEADER_SIZE].copy_from_slice(&self.to_bytes());
        block
    }
}

/// Check whether data begins with the compound file signature.
///
/// # Examples
///
/// ```
/// use poifs::poifs::has_poifs_header;
///
/// assert!(has_poifs_header(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00]));
/// assert!(!has_poifs_header(b"PK\x03\x04"));
/// ```
pub fn has_poifs_header(data: &[u8]) -> bool {
    crate::common::detection::has_ole2_signature(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(size: BigBlockSize) -> HeaderBlock {
        let mut header = HeaderBlock::new(size);
        header.bat_count = 2;
        header.set_bat_array(&[7, 8]);
        header.property_start = 3;
        header.sbat_start = 5;
        header.sbat_count = 1;
        header.transaction_signature = 0xDEAD_BEEF;
        header.reserved = [1, 2, 3, 4, 5, 6];
        header
    }

    #[test]
    fn test_header_round_trip_shift_9() {
        let header = sample_header(BigBlockSize::Small);
        let first = header.to_bytes();
        let parsed = HeaderBlock::parse(&first).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.to_bytes(), first);
        assert_eq!(parsed.bat_array(), &[7, 8]);
    }

    #[test]
    fn test_header_round_trip_shift_12() {
        let mut header = sample_header(BigBlockSize::Large);
        header.num_dir_sectors = 1;
        let block = header.to_block();
        assert_eq!(block.len(), 4096);
        assert!(block[HEADER_SIZE..].iter().all(|&b| b == 0));

        let parsed = HeaderBlock::parse(&block).unwrap();
        assert_eq!(parsed.big_block_size, BigBlockSize::Large);
        assert_eq!(parsed.major_version, 4);
        assert_eq!(parsed.to_bytes(), header.to_bytes());
    }

    #[test]
    fn test_field_offsets() {
        let bytes = sample_header(BigBlockSize::Small).to_bytes();
        assert_eq!(&bytes[..8], MAGIC);
        assert_eq!(u16::from_le_bytes([bytes[0x1C], bytes[0x1D]]), 0xFFFE);
        assert_eq!(u16::from_le_bytes([bytes[0x1E], bytes[0x1F]]), 9);
        assert_eq!(bytes[0x2C], 2);
        assert_eq!(bytes[0x30], 3);
        assert_eq!(u32::from_le_bytes([bytes[0x38], bytes[0x39], bytes[0x3A], bytes[0x3B]]), 4096);
        assert_eq!(bytes[0x4C], 7);
        assert_eq!(&bytes[0x54..0x58], &[0xFF; 4]);
    }

    #[test]
    fn test_identity_errors() {
        assert!(matches!(HeaderBlock::parse(&[]), Err(PoifsError::EmptyFile)));

        let mut zip = vec![0u8; 600];
        zip[..4].copy_from_slice(b"PK\x03\x04");
        assert!(matches!(HeaderBlock::parse(&zip), Err(PoifsError::OfficeXmlFile)));

        let junk = vec![0x42u8; 600];
        let err = HeaderBlock::parse(&junk).unwrap_err();
        assert!(err.is_format_identity_error());
        assert!(err.to_string().contains("Invalid header signature"));

        let short = MAGIC.to_vec();
        assert!(matches!(HeaderBlock::parse(&short), Err(PoifsError::NotOle2File(_))));
    }

    #[test]
    fn test_rejects_bad_sector_shift() {
        let mut bytes = sample_header(BigBlockSize::Small).to_bytes();
        bytes[0x1E] = 10;
        let err = HeaderBlock::parse(&bytes).unwrap_err();
        assert!(matches!(err, PoifsError::UnsupportedFormat(_)));
        assert!(!err.is_format_identity_error());
    }
}
