//! Unified error type for the POIFS engine.
//!
//! Errors fall into four families: format identity (the bytes are not a
//! compound file at all), structural corruption, capacity limits, and
//! plain I/O. Callers that sniff formats usually only care about the first
//! family, see [`PoifsError::is_format_identity_error`].
use std::fmt;
use thiserror::Error;

/// Where a structural corruption was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptLocation {
    /// The 512-byte header block
    Header,
    /// A big block (sector) in the main file
    Sector(u32),
    /// A 64-byte block inside the mini stream
    MiniSector(u32),
    /// A directory entry, by its index in the directory stream
    Entry(u32),
    /// The directory stream as a whole
    Directory,
}

impl fmt::Display for CorruptLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorruptLocation::Header => write!(f, "header"),
            CorruptLocation::Sector(s) => write!(f, "sector {}", s),
            CorruptLocation::MiniSector(s) => write!(f, "mini sector {}", s),
            CorruptLocation::Entry(sid) => write!(f, "directory entry {}", sid),
            CorruptLocation::Directory => write!(f, "directory"),
        }
    }
}

/// Main error type for POIFS operations.
#[derive(Error, Debug)]
pub enum PoifsError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The supplied data is zero bytes long
    #[error("The supplied file was empty (zero bytes long)")]
    EmptyFile,

    /// The data does not carry the OLE2 signature
    #[error("Not an OLE2 compound file: {0}")]
    NotOle2File(String),

    /// The data is a ZIP container (Office 2007+ XML formats)
    #[error(
        "The supplied data appears to be in the Office 2007+ XML format. \
         This engine only handles OLE2 compound files; use an OOXML reader instead"
    )]
    OfficeXmlFile,

    /// Valid signature, but parameters this engine does not handle
    #[error("Unsupported compound file: {0}")]
    UnsupportedFormat(String),

    /// Structural corruption (cyclic or dangling chains, bad indices, broken tree)
    #[error("Corrupt compound file at {location}: {detail}")]
    Corrupt {
        location: CorruptLocation,
        detail: String,
    },

    /// Declared sizes disagree with the data actually present
    #[error("Record format error: {0}")]
    RecordFormat(String),

    /// An allocation request above the configured limit
    #[error(
        "Tried to allocate {requested} bytes, but {limit} is the configured maximum. \
         If the file is not corrupt, raise the limit in PoifsOptions"
    )]
    SizeLimit { requested: u64, limit: u64 },

    /// Entry name is empty or too long
    #[error("Invalid entry name {0:?}: names must be 1 to 31 UTF-16 code units")]
    InvalidName(String),

    /// No entry with this name or path
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// An entry with this name already exists in the storage
    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    /// A storage was expected
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// A stream was expected
    #[error("Not a document: {0}")]
    NotADocument(String),

    /// Deleting a storage that still has children
    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// An operation that makes no sense for the target entry
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Mutation on a filesystem opened read-only
    #[error("The filesystem was opened read-only")]
    ReadOnly,

    /// Use after close
    #[error("The filesystem has been closed")]
    Closed,
}

impl PoifsError {
    /// Build a corruption error for a big block.
    pub fn corrupt_sector(sector: u32, detail: impl Into<String>) -> Self {
        PoifsError::Corrupt {
            location: CorruptLocation::Sector(sector),
            detail: detail.into(),
        }
    }

    /// Build a corruption error for a mini block.
    pub fn corrupt_mini_sector(sector: u32, detail: impl Into<String>) -> Self {
        PoifsError::Corrupt {
            location: CorruptLocation::MiniSector(sector),
            detail: detail.into(),
        }
    }

    /// Build a corruption error for a directory entry.
    pub fn corrupt_entry(sid: u32, detail: impl Into<String>) -> Self {
        PoifsError::Corrupt {
            location: CorruptLocation::Entry(sid),
            detail: detail.into(),
        }
    }

    /// Build a corruption error with an explicit location.
    pub fn corrupt(location: CorruptLocation, detail: impl Into<String>) -> Self {
        PoifsError::Corrupt {
            location,
            detail: detail.into(),
        }
    }

    /// True when the input is not a compound file at all and the caller
    /// should try a different parser.
    pub fn is_format_identity_error(&self) -> bool {
        matches!(
            self,
            PoifsError::EmptyFile | PoifsError::NotOle2File(_) | PoifsError::OfficeXmlFile
        )
    }

    /// True for structural corruption and size inconsistencies.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            PoifsError::Corrupt { .. } | PoifsError::RecordFormat(_)
        )
    }
}

/// Result type for POIFS operations.
pub type Result<T> = std::result::Result<T, PoifsError>;
