//! poifs - OLE2 compound document filesystem
//!
//! This library reads, edits and writes the OLE2 compound file format
//! (Microsoft's "Compound File Binary Format") used by legacy Office
//! documents such as .doc, .xls, .ppt and .msg files.
//!
//! # Features
//!
//! - **Reader**: open files from memory, a path or any `Read`
//! - **Editor**: create, replace, rename and delete storages and streams
//! - **Writer**: produce a fresh, compacted image with 512 or 4096-byte sectors
//! - **Validation**: chain loop detection, bounded allocations and an
//!   optional open-time block ownership check
//! - **Dumping**: extract a file's tree to disk (`poifs-dump` binary)
//!
//! # Example - Listing a file
//!
//! ```no_run
//! use poifs::poifs::{PoifsFileSystem, PoifsOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fs = PoifsFileSystem::open_path("book.xls", PoifsOptions::default())?;
//! for (path, id) in fs.walk()? {
//!     let info = fs.entry_info(id)?;
//!     println!("{} ({} bytes)", path, info.size);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Editing in place
//!
//! ```no_run
//! use poifs::poifs::{PoifsFileSystem, PoifsOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut fs = PoifsFileSystem::open_path_rw("report.doc", PoifsOptions::default())?;
//! let root = fs.root()?;
//! let stream = fs.child(root, "\u{5}SummaryInformation")?;
//! fs.delete(stream)?;
//! fs.save("report-stripped.doc")?;
//! # Ok(())
//! # }
//! ```

/// Shared error types, binary helpers and format detection
pub mod common;

/// Compound document filesystem
pub mod poifs;

pub use common::{PoifsError, Result};
