//! Byte sources backing a filesystem.
//!
//! A [`DataSource`] gives positional access to the raw bytes of a compound
//! file. Two implementations exist: an owned growable buffer, used for
//! in-memory and read-write filesystems, and a read-only file handle.

use crate::common::error::{PoifsError, Result};
use bytes::Bytes;
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Positional byte access.
pub trait DataSource: fmt::Debug + Send {
    /// Read up to `len` bytes starting at `offset`.
    ///
    /// The result is shorter than `len` only when the source ends first.
    /// Reading at or past the end is an error.
    fn read_at(&self, offset: u64, len: usize) -> Result<Bytes>;

    /// Write `data` at `offset`, growing the source if needed.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()>;

    /// Current size in bytes.
    fn size(&self) -> Result<u64>;

    /// Release the underlying resource. Later calls fail with `Closed`.
    fn close(&mut self) -> Result<()>;

    /// Whether `write_at` is supported.
    fn is_writable(&self) -> bool;
}

/// Owned in-memory buffer.
#[derive(Default)]
pub struct ByteArraySource {
    data: Vec<u8>,
    closed: bool,
}

impl fmt::Debug for ByteArraySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteArraySource")
            .field("len", &self.data.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl ByteArraySource {
    /// Wrap an existing buffer.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            closed: false,
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(PoifsError::Closed);
        }
        Ok(())
    }
}

impl DataSource for ByteArraySource {
    fn read_at(&self, offset: u64, len: usize) -> Result<Bytes> {
        self.check_open()?;
        let size = self.data.len() as u64;
        if offset >= size {
            return Err(PoifsError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("read at offset {} past end of data ({} bytes)", offset, size),
            )));
        }
        let start = offset as usize;
        let end = start.saturating_add(len).min(self.data.len());
        Ok(Bytes::copy_from_slice(&self.data[start..end]))
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.check_open()?;
        let start = usize::try_from(offset).map_err(|_| PoifsError::SizeLimit {
            requested: offset,
            limit: usize::MAX as u64,
        })?;
        let end = start + data.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        self.check_open()?;
        Ok(self.data.len() as u64)
    }

    fn close(&mut self) -> Result<()> {
        self.data = Vec::new();
        self.closed = true;
        Ok(())
    }

    fn is_writable(&self) -> bool {
        true
    }
}

/// Read-only file handle.
#[derive(Debug)]
pub struct FileSource {
    file: Option<File>,
    size: u64,
}

impl FileSource {
    /// Open `path` for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file: Some(file),
            size,
        })
    }

    fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or(PoifsError::Closed)
    }
}

impl DataSource for FileSource {
    fn read_at(&self, offset: u64, len: usize) -> Result<Bytes> {
        let mut file = self.file()?;
        if offset >= self.size {
            return Err(PoifsError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("read at offset {} past end of file ({} bytes)", offset, self.size),
            )));
        }
        let available = (self.size - offset).min(len as u64) as usize;
        let mut buffer = vec![0u8; available];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buffer)?;
        Ok(Bytes::from(buffer))
    }

    fn write_at(&mut self, _offset: u64, _data: &[u8]) -> Result<()> {
        self.file()?;
        Err(PoifsError::ReadOnly)
    }

    fn size(&self) -> Result<u64> {
        self.file()?;
        Ok(self.size)
    }

    fn close(&mut self) -> Result<()> {
        self.file = None;
        Ok(())
    }

    fn is_writable(&self) -> bool {
        false
    }
}
