//! Constants of the compound file format.

/// Magic bytes that should be at the beginning of every OLE2 file
pub const MAGIC: &[u8; 8] = crate::common::detection::OLE2_SIGNATURE;

/// Size of the on-disk header, regardless of the big block size
pub const HEADER_SIZE: usize = 512;

/// Size of a directory entry (property record) in bytes
pub const DIRENTRY_SIZE: usize = 128;

/// Big block size for major version 3 (512 bytes, sector shift 9)
pub const SECTOR_SIZE_V3: usize = 512;

/// Big block size for major version 4 (4096 bytes, sector shift 12)
pub const SECTOR_SIZE_V4: usize = 4096;

/// Sector shift for 512-byte blocks
pub const SECTOR_SHIFT_V3: u16 = 9;

/// Sector shift for 4096-byte blocks
pub const SECTOR_SHIFT_V4: u16 = 12;

/// Mini blocks are always 64 bytes
pub const MINI_SECTOR_SHIFT: u16 = 6;

/// Size of a mini block in bytes
pub const MINI_SECTOR_SIZE: usize = 1 << MINI_SECTOR_SHIFT;

/// Streams strictly smaller than this live in the mini stream
pub const MINI_STREAM_CUTOFF: u32 = 4096;

/// Number of FAT sector slots embedded in the header
pub const HEADER_DIFAT_ENTRIES: usize = 109;

/// Header minor version written by this engine
pub const MINOR_VERSION: u16 = 0x003E;

/// Little-endian byte order mark stored in the header
pub const BYTE_ORDER_LE: u16 = 0xFFFE;

/// Longest entry name in UTF-16 code units, terminator excluded
pub const MAX_NAME_LEN: usize = 31;

/// Name of the root directory entry
pub const ROOT_ENTRY_NAME: &str = "Root Entry";

// Sector IDs
/// Maximum regular sector ID
pub const MAXREGSECT: u32 = 0xFFFFFFFA; // -6
/// Denotes a DIFAT sector in a FAT
pub const DIFSECT: u32 = 0xFFFFFFFC; // -4
/// Denotes a FAT sector in a FAT
pub const FATSECT: u32 = 0xFFFFFFFD; // -3
/// End of a virtual stream chain
pub const ENDOFCHAIN: u32 = 0xFFFFFFFE; // -2
/// Unallocated sector
pub const FREESECT: u32 = 0xFFFFFFFF; // -1

// Directory Entry IDs
/// Unallocated directory entry
pub const NOSTREAM: u32 = 0xFFFFFFFF; // -1

// Object types in storage
/// Empty directory entry
pub const STGTY_EMPTY: u8 = 0;
/// Element is a storage object
pub const STGTY_STORAGE: u8 = 1;
/// Element is a stream object
pub const STGTY_STREAM: u8 = 2;
/// Element is a root storage
pub const STGTY_ROOT: u8 = 5;

// Node colour of the sibling red-black tree; every written node is black
/// Black node
pub const COLOR_BLACK: u8 = 1;
