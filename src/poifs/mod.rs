//! OLE2 compound document filesystem
//!
//! This module reads, edits and writes compound files: a FAT-style
//! filesystem of sectors stored in a single file, used by legacy
//! Microsoft Office formats (.doc, .xls, .ppt, .msg).
//!
//! # Architecture
//!
//! - [`HeaderBlock`]: the 512-byte header and its 109 inline FAT locations
//! - [`BlockAllocationTable`]: FAT and mini-FAT chains
//! - [`BlockSpace`] with [`BigBlockStore`] and [`MiniBlockStore`]: block
//!   access over a [`DataSource`]
//! - [`PropertyTable`]: the directory, held as an arena indexed by [`EntryId`]
//! - [`PoifsFileSystem`]: the public façade
//!
//! # Example
//!
//! ```rust
//! use poifs::poifs::PoifsFileSystem;
//!
//! # fn main() -> poifs::common::Result<()> {
//! let mut fs = PoifsFileSystem::new();
//! let root = fs.root()?;
//! let dir = fs.create_directory(root, "Objects")?;
//! fs.create_document(dir, "Contents", b"hello")?;
//!
//! let mut image = Vec::new();
//! fs.write_filesystem(&mut image)?;
//!
//! let reopened = PoifsFileSystem::from_bytes(image)?;
//! let doc = reopened.entry("Objects/Contents")?;
//! assert_eq!(reopened.read_document(doc)?, b"hello");
//! # Ok(())
//! # }
//! ```

/// Per-file-type free lists for consistency checks at open time
pub mod block_list;

/// Sector size variants (512 / 4096)
pub mod block_size;

/// Format constants and sentinels
pub mod consts;

/// Extraction of a filesystem to a directory tree
pub mod dump;

/// Public entry handles, kinds and paths
pub mod entry;

/// FAT / mini-FAT tables and sector layout planning
pub mod fat;

/// Filesystem façade
pub mod filesystem;

/// Header block parsing and generation
pub mod header;

/// Open / build options
pub mod options;

/// Directory records and the property tree
pub mod property;

/// Byte sources backing a filesystem
pub mod source;

/// Block stores over big and mini sectors
pub mod store;

/// Chain-backed document streams
pub mod stream;

/// Fresh image layout
mod writer;


// Re-export public types
pub use block_list::{BlockList, RawBlockList, SmallBlockList};
pub use block_size::BigBlockSize;
pub use dump::{default_dump_dir, dump_filesystem, DumpOptions};
pub use entry::{EntryId, EntryInfo, EntryKind, EntryPath};
pub use fat::{BlockAllocationTable, ChainLoopDetector, LayoutPlanner, TableKind};
pub use filesystem::PoifsFileSystem;
pub use header::{has_poifs_header, HeaderBlock};
pub use options::{LoadStrategy, PoifsOptions, DEFAULT_MAX_RECORD_LENGTH, DEFAULT_MAX_STREAM_SIZE};
pub use property::{Property, PropertyTable, PropertyType};
pub use source::{ByteArraySource, DataSource, FileSource};
pub use store::{BigBlockStore, BlockSpace, BlockStore, BlockStoreMut, MiniBlockStore};
pub use stream::PoifsStream;
