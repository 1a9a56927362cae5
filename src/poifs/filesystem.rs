//! The compound file façade.
//!
//! [`PoifsFileSystem`] ties the pieces together: it reads the header, the
//! FAT, the directory and the mini stream when opened, serves directory
//! and document operations from memory, and lays out a fresh image on
//! [`write_filesystem`](PoifsFileSystem::write_filesystem).
//!
//! # Example
//!
//! ```no_run
//! use poifs::poifs::PoifsFileSystem;
//!
//! # fn main() -> poifs::common::Result<()> {
//! let mut fs = PoifsFileSystem::new();
//! let root = fs.root()?;
//! let dir = fs.create_directory(root, "A")?;
//! fs.create_document(dir, "doc.bin", b"hello")?;
//!
//! let mut image = Vec::new();
//! fs.write_filesystem(&mut image)?;
//!
//! let reopened = PoifsFileSystem::from_bytes(image)?;
//! let doc = reopened.entry("A/doc.bin")?;
//! assert_eq!(reopened.read_document(doc)?, b"hello");
//! # Ok(())
//! # }
//! ```

use super::block_list::{RawBlockList, SmallBlockList};
use super::block_size::BigBlockSize;
use super::consts::*;
use super::entry::{EntryId, EntryInfo, EntryKind, EntryPath};
use super::fat::{load_bat, BlockAllocationTable, ChainLoopDetector, LoadedBat, TableKind};
use super::header::HeaderBlock;
use super::options::{LoadStrategy, PoifsOptions};
use super::property::{datetime_to_filetime, uses_small_blocks, Property, PropertyTable};
use super::source::{ByteArraySource, DataSource, FileSource};
use super::store::{BigBlockStore, BlockSpace, BlockStore, MiniBlockStore};
use super::stream::PoifsStream;
use super::writer::build_image;
use crate::common::error::{PoifsError, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// State of an open filesystem.
#[derive(Debug)]
struct Inner {
    space: BlockSpace,
    properties: PropertyTable,
    header: Option<HeaderBlock>,
    options: PoifsOptions,
}

/// An OLE2 compound file held open for reading and editing.
///
/// Mutations only touch the in-memory structures and the in-memory byte
/// source; nothing reaches disk until [`save`](Self::save) or
/// [`write_filesystem`](Self::write_filesystem). After [`close`](Self::close)
/// every method fails with [`PoifsError::Closed`].
///
/// One instance must not be shared between threads without external
/// synchronization.
#[derive(Debug)]
pub struct PoifsFileSystem {
    inner: Option<Inner>,
}

impl Default for PoifsFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl PoifsFileSystem {
    /// Create an empty filesystem with default options.
    pub fn new() -> Self {
        Self::with_options(PoifsOptions::default())
    }

    /// Create an empty filesystem.
    ///
    /// The sector size comes from `options.big_block_size`.
    pub fn with_options(options: PoifsOptions) -> Self {
        let space = BlockSpace::new(
            Box::new(ByteArraySource::default()),
            options.big_block_size,
            BlockAllocationTable::new(TableKind::Big),
            BlockAllocationTable::new(TableKind::Mini),
            Vec::new(),
        );
        Self {
            inner: Some(Inner {
                space,
                properties: PropertyTable::new(),
                header: None,
                options,
            }),
        }
    }

    /// Open an in-memory image with default options.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Result<Self> {
        Self::from_bytes_with_options(data, PoifsOptions::default())
    }

    /// Open an in-memory image.
    pub fn from_bytes_with_options(data: impl Into<Vec<u8>>, options: PoifsOptions) -> Result<Self> {
        Self::from_source(Box::new(ByteArraySource::new(data.into())), options)
    }

    /// Read `reader` to the end and open the result.
    pub fn from_reader<R: Read>(mut reader: R, options: PoifsOptions) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes_with_options(data, options)
    }

    /// Open a file read-only.
    ///
    /// Blocks are read from the file on demand; the handle is held until
    /// [`close`](Self::close) or drop.
    pub fn open_path<P: AsRef<Path>>(path: P, options: PoifsOptions) -> Result<Self> {
        let source = FileSource::open(path)?;
        Self::from_source(Box::new(source), options.with_read_only(true))
    }

    /// Open a file for editing.
    ///
    /// The file is loaded into memory and never written back implicitly.
    pub fn open_path_rw<P: AsRef<Path>>(path: P, options: PoifsOptions) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_bytes_with_options(data, options)
    }

    /// Open any byte source.
    ///
    /// The source is closed again when loading fails.
    pub fn from_source(mut source: Box<dyn DataSource>, options: PoifsOptions) -> Result<Self> {
        match load(&*source, &options) {
            Ok(loaded) => {
                let space = BlockSpace::new(
                    source,
                    loaded.header.big_block_size,
                    loaded.bat.table,
                    loaded.sbat,
                    loaded.mini_stream,
                );
                Ok(Self {
                    inner: Some(Inner {
                        space,
                        properties: loaded.properties,
                        header: Some(loaded.header),
                        options,
                    }),
                })
            },
            Err(err) => {
                if let Err(close_err) = source.close() {
                    debug!(error = %close_err, "closing source after failed load");
                }
                Err(err)
            },
        }
    }

    fn inner(&self) -> Result<&Inner> {
        self.inner.as_ref().ok_or(PoifsError::Closed)
    }

    fn inner_mut(&mut self) -> Result<&mut Inner> {
        let inner = self.inner.as_mut().ok_or(PoifsError::Closed)?;
        if inner.options.read_only {
            return Err(PoifsError::ReadOnly);
        }
        Ok(inner)
    }

    /// The options this filesystem was opened with.
    pub fn options(&self) -> Result<&PoifsOptions> {
        Ok(&self.inner()?.options)
    }

    /// The root storage.
    pub fn root(&self) -> Result<EntryId> {
        self.inner()?;
        Ok(EntryId::ROOT)
    }

    /// Children of a storage, in directory order.
    pub fn children(&self, dir: EntryId) -> Result<Vec<EntryId>> {
        Ok(self.inner()?.properties.children(dir)?.to_vec())
    }

    /// Child of `dir` called `name`.
    ///
    /// An exact match is preferred; otherwise names are compared
    /// case-insensitively.
    pub fn child(&self, dir: EntryId, name: &str) -> Result<EntryId> {
        self.inner()?
            .properties
            .find_child(dir, name)?
            .ok_or_else(|| PoifsError::NotFound(name.to_string()))
    }

    /// Resolve a path below the root.
    ///
    /// # Arguments
    ///
    /// * `path` - `"A/doc.bin"`, `"/A/doc.bin"` or `&["A", "doc.bin"]`
    pub fn entry<'p>(&self, path: impl Into<EntryPath<'p>>) -> Result<EntryId> {
        let path = path.into();
        let properties = &self.inner()?.properties;
        let mut current = EntryId::ROOT;
        for component in path.components() {
            if !properties.get(current)?.is_directory() {
                return Err(PoifsError::NotFound(path.to_string()));
            }
            current = properties
                .find_child(current, component)?
                .ok_or_else(|| PoifsError::NotFound(path.to_string()))?;
        }
        Ok(current)
    }

    /// Metadata snapshot of an entry.
    pub fn entry_info(&self, id: EntryId) -> Result<EntryInfo> {
        Ok(EntryInfo::from(self.inner()?.properties.get(id)?))
    }

    /// Parent storage of an entry, `None` for the root.
    pub fn parent(&self, id: EntryId) -> Result<Option<EntryId>> {
        self.inner()?.properties.parent(id)
    }

    /// Create a storage under `parent`.
    pub fn create_directory(&mut self, parent: EntryId, name: &str) -> Result<EntryId> {
        let inner = self.inner_mut()?;
        inner.require_directory(parent)?;
        inner.properties.add(parent, Property::new_storage(name)?)
    }

    /// Create a document under `parent` holding `data`.
    ///
    /// Documents shorter than 4096 bytes go to the mini stream.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when `parent` has a child of that name (ignoring
    /// case), `SizeLimit` when `data` exceeds the configured maximum.
    pub fn create_document(&mut self, parent: EntryId, name: &str, data: &[u8]) -> Result<EntryId> {
        let inner = self.inner_mut()?;
        inner.require_directory(parent)?;
        inner.options.check_stream_size(data.len() as u64)?;

        let id = inner.properties.add(parent, Property::new_stream(name, 0)?)?;
        match inner.write_stream(data) {
            Ok(start) => {
                let property = inner.properties.get_mut(id)?;
                property.start_block = start;
                property.size = data.len() as u64;
                inner.sync_root()?;
                debug!(%id, name, bytes = data.len(), "created document");
                Ok(id)
            },
            Err(err) => {
                inner.properties.remove(id)?;
                Err(err)
            },
        }
    }

    /// Replace the contents of a document.
    pub fn replace_contents(&mut self, doc: EntryId, data: &[u8]) -> Result<()> {
        let inner = self.inner_mut()?;
        let (start, size) = inner.require_document(doc)?;
        inner.options.check_stream_size(data.len() as u64)?;

        inner.free_stream(start, size)?;
        let property = inner.properties.get_mut(doc)?;
        property.start_block = ENDOFCHAIN;
        property.size = 0;

        let start = inner.write_stream(data)?;
        let property = inner.properties.get_mut(doc)?;
        property.start_block = start;
        property.size = data.len() as u64;
        inner.sync_root()
    }

    /// Read a whole document.
    pub fn read_document(&self, doc: EntryId) -> Result<Vec<u8>> {
        self.inner()?.read_document(doc)
    }

    /// Read part of a document.
    ///
    /// The range is clipped to the document size; an offset at or past the
    /// end yields no bytes.
    pub fn read_document_range(&self, doc: EntryId, offset: u64, len: usize) -> Result<Vec<u8>> {
        let inner = self.inner()?;
        let (start, size) = inner.require_document(doc)?;
        if offset >= size {
            return Ok(Vec::new());
        }
        let len = (len as u64).min(size - offset) as usize;
        if uses_small_blocks(size) {
            PoifsStream::new(MiniBlockStore::new(&inner.space), start).read_range(offset, len)
        } else {
            PoifsStream::new(BigBlockStore::new(&inner.space), start).read_range(offset, len)
        }
    }

    /// Delete a document or an empty storage.
    pub fn delete(&mut self, id: EntryId) -> Result<()> {
        let inner = self.inner_mut()?;
        let property = inner.properties.get(id)?;
        if property.is_document() {
            let (start, size) = (property.start_block, property.size);
            inner.properties.remove(id)?;
            inner.free_stream(start, size)?;
            inner.sync_root()?;
        } else {
            inner.properties.remove(id)?;
        }
        Ok(())
    }

    /// Delete an entry and everything below it.
    pub fn delete_recursive(&mut self, id: EntryId) -> Result<()> {
        let inner = self.inner_mut()?;
        let mut pending = vec![id];
        let mut order = Vec::new();
        while let Some(current) = pending.pop() {
            order.push(current);
            if inner.properties.get(current)?.is_directory() {
                pending.extend_from_slice(inner.properties.children(current)?);
            }
        }
        for current in order.into_iter().rev() {
            self.delete(current)?;
        }
        Ok(())
    }

    /// Rename an entry within its storage.
    pub fn rename(&mut self, id: EntryId, new_name: &str) -> Result<()> {
        self.inner_mut()?.properties.rename(id, new_name)
    }

    /// Set the class id of a storage or of the root.
    pub fn set_storage_clsid(&mut self, dir: EntryId, clsid: [u8; 16]) -> Result<()> {
        let inner = self.inner_mut()?;
        inner.require_directory(dir)?;
        inner.properties.get_mut(dir)?.clsid = clsid;
        Ok(())
    }

    /// Set the modification time of a storage or of the root.
    ///
    /// Streams carry no timestamps in the format, so documents are rejected.
    pub fn set_modified_time(&mut self, dir: EntryId, time: DateTime<Utc>) -> Result<()> {
        let inner = self.inner_mut()?;
        inner.require_directory(dir)?;
        inner.properties.get_mut(dir)?.modified = datetime_to_filetime(time);
        Ok(())
    }

    /// Sector size of this filesystem.
    pub fn big_block_size(&self) -> Result<BigBlockSize> {
        Ok(self.inner()?.space.block_size())
    }

    /// Header as read at open time; `None` for a filesystem built in memory.
    pub fn header(&self) -> Result<Option<&HeaderBlock>> {
        Ok(self.inner()?.header.as_ref())
    }

    /// FAT sector count declared by the loaded header.
    pub fn bat_count(&self) -> Result<u32> {
        Ok(self.inner()?.header.as_ref().map_or(0, |h| h.bat_count))
    }

    /// DIFAT sector count declared by the loaded header.
    pub fn xbat_count(&self) -> Result<u32> {
        Ok(self.inner()?.header.as_ref().map_or(0, |h| h.xbat_count))
    }

    /// Every entry below the root, depth first, with its `/`-joined path.
    pub fn walk(&self) -> Result<Vec<(String, EntryId)>> {
        let properties = &self.inner()?.properties;
        properties
            .pre_order()
            .into_iter()
            .filter(|&id| id != EntryId::ROOT)
            .map(|id| Ok((properties.path(id)?.join("/"), id)))
            .collect()
    }

    /// Indented text rendering of the directory tree.
    pub fn viewable_tree(&self) -> Result<String> {
        let properties = &self.inner()?.properties;
        let mut out = String::new();
        let mut stack = vec![(EntryId::ROOT, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let property = properties.get(id)?;
            let indent = "  ".repeat(depth);
            let kind = EntryKind::from(property.kind);
            // Writing to a String cannot fail.
            let _ = match kind {
                EntryKind::Document => {
                    writeln!(out, "{}{} ({} bytes)", indent, property.name, property.size)
                },
                _ => writeln!(out, "{}{}/", indent, property.name),
            };
            if kind.is_directory() {
                for &child in properties.children(id)?.iter().rev() {
                    stack.push((child, depth + 1));
                }
            }
        }
        Ok(out)
    }

    /// Raw directory stream.
    ///
    /// For a loaded filesystem this is the on-disk chain starting at the
    /// header's directory block, orphans and stale links included. A
    /// filesystem built in memory has no such chain, so its table is
    /// serialized as it would be written now.
    pub fn property_table_bytes(&self) -> Result<Vec<u8>> {
        let inner = self.inner()?;
        let Some(header) = &inner.header else {
            return Ok(inner.properties.to_bytes(inner.space.block_size()));
        };
        let stream = PoifsStream::new(BigBlockStore::new(&inner.space), header.property_start);
        let mut out = Vec::new();
        for block in stream.blocks() {
            out.extend_from_slice(&block?);
            inner.options.check_record_length(out.len() as u64)?;
        }
        Ok(out)
    }

    /// Raw contents of the mini stream.
    pub fn mini_stream_bytes(&self) -> Result<Vec<u8>> {
        let space = &self.inner()?.space;
        let store = BigBlockStore::new(space);
        let mut out = Vec::with_capacity(space.mini_stream_blocks().len() * space.block_size().bytes());
        for &block in space.mini_stream_blocks() {
            out.extend_from_slice(&store.read_block(block)?);
        }
        Ok(out)
    }

    /// Serialize the whole filesystem to `writer`.
    ///
    /// The image is laid out from scratch and fully built in memory before
    /// the first byte is written.
    pub fn write_filesystem<W: Write>(&self, writer: &mut W) -> Result<()> {
        let inner = self.inner()?;
        let image = build_image(&inner.properties, inner.space.block_size(), |id| {
            inner.read_document(id)
        })?;
        writer.write_all(&image)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the filesystem to `path` through a temporary sibling file.
    ///
    /// The target is only replaced once the complete image is on disk.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let temp = temp_sibling(path);
        let result = (|| -> Result<()> {
            let mut file = fs::File::create(&temp)?;
            self.write_filesystem(&mut file)?;
            file.sync_all()?;
            fs::rename(&temp, path)?;
            Ok(())
        })();
        if result.is_err() && temp.exists() {
            if let Err(err) = fs::remove_file(&temp) {
                warn!(path = %temp.display(), error = %err, "leaving temporary file behind");
            }
        }
        result
    }

    /// Read `source` and write it back out to `dest`.
    pub fn copy_to<P: AsRef<Path>, Q: AsRef<Path>>(source: P, dest: Q) -> Result<()> {
        let mut filesystem = Self::open_path(source, PoifsOptions::default())?;
        filesystem.save(dest)?;
        filesystem.close()
    }

    /// Release the byte source. Later calls fail with `Closed`.
    pub fn close(&mut self) -> Result<()> {
        match self.inner.take() {
            Some(mut inner) => inner.space.close(),
            None => Ok(()),
        }
    }

    /// True once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl Drop for PoifsFileSystem {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            debug!(error = %err, "closing filesystem on drop");
        }
    }
}

impl Inner {
    fn require_directory(&self, id: EntryId) -> Result<()> {
        let property = self.properties.get(id)?;
        if !property.is_directory() {
            return Err(PoifsError::NotADirectory(property.name.clone()));
        }
        Ok(())
    }

    fn require_document(&self, id: EntryId) -> Result<(u32, u64)> {
        let property = self.properties.get(id)?;
        if !property.is_document() {
            return Err(PoifsError::NotADocument(property.name.clone()));
        }
        Ok((property.start_block, property.size))
    }

    fn read_document(&self, doc: EntryId) -> Result<Vec<u8>> {
        let (start, size) = self.require_document(doc)?;
        self.options.check_stream_size(size)?;
        if size == 0 {
            return Ok(Vec::new());
        }
        if uses_small_blocks(size) {
            PoifsStream::new(MiniBlockStore::new(&self.space), start).read_to_vec(size)
        } else {
            PoifsStream::new(BigBlockStore::new(&self.space), start).read_to_vec(size)
        }
    }

    fn write_stream(&mut self, data: &[u8]) -> Result<u32> {
        if uses_small_blocks(data.len() as u64) {
            PoifsStream::new(MiniBlockStore::new(&mut self.space), ENDOFCHAIN).write(data)
        } else {
            PoifsStream::new(BigBlockStore::new(&mut self.space), ENDOFCHAIN).write(data)
        }
    }

    fn free_stream(&mut self, start: u32, size: u64) -> Result<()> {
        if size == 0 || start == ENDOFCHAIN {
            return Ok(());
        }
        if uses_small_blocks(size) {
            PoifsStream::new(MiniBlockStore::new(&mut self.space), start).free()
        } else {
            PoifsStream::new(BigBlockStore::new(&mut self.space), start).free()
        }
    }

    /// Mirror the mini stream's location into the root entry.
    fn sync_root(&mut self) -> Result<()> {
        let start = self.space.mini_stream_start();
        let size = (self.space.mini_capacity() * MINI_SECTOR_SIZE) as u64;
        let root = self.properties.get_mut(EntryId::ROOT)?;
        root.start_block = start;
        root.size = size;
        Ok(())
    }
}

/// Everything read from a source at open time.
struct Loaded {
    header: HeaderBlock,
    bat: LoadedBat,
    sbat: BlockAllocationTable,
    properties: PropertyTable,
    mini_stream: Vec<u32>,
}

fn load(source: &dyn DataSource, options: &PoifsOptions) -> Result<Loaded> {
    let size = source.size()?;
    if size == 0 {
        return Err(PoifsError::EmptyFile);
    }
    let header = HeaderBlock::parse(&source.read_at(0, HEADER_SIZE)?)?;
    let block_size = header.big_block_size;
    let bs = block_size.bytes() as u64;
    let file_blocks = size.saturating_sub(bs).div_ceil(bs) as usize;

    let mut detector = ChainLoopDetector::new(file_blocks, TableKind::Big);
    let mut bat = load_bat(&header, source, &mut detector)?;
    for &sector in &bat.bat_sectors {
        if bat.table.is_free(sector) {
            bat.table.set_next(sector, FATSECT);
        }
    }
    for &sector in &bat.xbat_sectors {
        if bat.table.is_free(sector) {
            bat.table.set_next(sector, DIFSECT);
        }
    }

    let directory = read_internal_chain(source, &bat.table, block_size, header.property_start, options)?;
    let properties = PropertyTable::parse(&directory, block_size)?;

    let root = properties.root()?;
    let mini_stream = if root.size == 0 {
        if root.start_block != ENDOFCHAIN {
            warn!(start = root.start_block, "ignoring mini stream chain of an empty root");
        }
        Vec::new()
    } else {
        let chain = bat.table.chain_to_vec(root.start_block)?;
        options.check_record_length(chain.len() as u64 * bs)?;
        chain
    };

    let sbat_data = read_internal_chain(source, &bat.table, block_size, header.sbat_start, options)?;
    let sbat_blocks = sbat_data.len() as u64 / bs;
    if sbat_blocks != header.sbat_count as u64 {
        warn!(
            declared = header.sbat_count,
            found = sbat_blocks,
            "mini-FAT sector count differs from the header"
        );
    }
    let sbat = BlockAllocationTable::from_sectors(&[sbat_data], TableKind::Mini)?;

    debug!(
        block_size = block_size.bytes(),
        entries = properties.len(),
        bat_entries = bat.table.len(),
        sbat_entries = sbat.len(),
        mini_blocks = mini_stream.len(),
        "opened filesystem"
    );

    if options.load_strategy == LoadStrategy::Consuming {
        check_block_ownership(source, &header, &bat, &sbat, &properties, options)?;
    }

    Ok(Loaded {
        header,
        bat,
        sbat,
        properties,
        mini_stream,
    })
}

/// Read a chain holding engine metadata (directory, mini-FAT).
fn read_internal_chain(
    source: &dyn DataSource,
    bat: &BlockAllocationTable,
    block_size: BigBlockSize,
    start: u32,
    options: &PoifsOptions,
) -> Result<Vec<u8>> {
    if start == ENDOFCHAIN || start == FREESECT {
        return Ok(Vec::new());
    }
    let chain = bat.chain_to_vec(start)?;
    options.check_record_length(chain.len() as u64 * block_size.bytes() as u64)?;
    let mut data = Vec::with_capacity(chain.len() * block_size.bytes());
    for block in chain {
        data.extend_from_slice(&super::store::read_big_block(source, block_size, block)?);
    }
    Ok(data)
}

/// Whole-file check that no block belongs to two structures.
///
/// Every block is loaded once and taken out of a pool as each structure
/// claims it, in the order FAT, DIFAT, directory, mini stream, mini-FAT,
/// big documents, small documents.
fn check_block_ownership(
    source: &dyn DataSource,
    header: &HeaderBlock,
    bat: &LoadedBat,
    sbat: &BlockAllocationTable,
    properties: &PropertyTable,
    options: &PoifsOptions,
) -> Result<()> {
    use super::block_list::BlockList;

    let mut blocks = RawBlockList::from_source(source, header.big_block_size, options)?;
    for &sector in bat.bat_sectors.iter().chain(&bat.xbat_sectors) {
        blocks.remove(sector)?;
    }

    blocks.fetch_blocks(&bat.table, header.property_start, NOSTREAM)?;
    let root = properties.root()?;
    let mini: Vec<Bytes> = if root.size == 0 {
        Vec::new()
    } else {
        blocks.fetch_blocks(&bat.table, root.start_block, NOSTREAM)?
    };
    blocks.fetch_blocks(&bat.table, header.sbat_start, NOSTREAM)?;

    let mut small = SmallBlockList::from_mini_stream(&mini);
    for id in properties.pre_order() {
        let property = properties.get(id)?;
        if !property.is_document() || property.size == 0 {
            continue;
        }
        let chain = if property.should_use_small_blocks() {
            small.fetch_blocks(sbat, property.start_block, NOSTREAM)?
        } else {
            blocks.fetch_blocks(&bat.table, property.start_block, header.property_start)?
        };
        let block_len = chain.first().map_or(0, |b| b.len()) as u64;
        if (chain.len() as u64) * block_len < property.size {
            return Err(PoifsError::RecordFormat(format!(
                "document {:?} declares {} bytes but its chain holds {} blocks",
                property.name,
                property.size,
                chain.len()
            )));
        }
    }

    debug!(unclaimed = blocks.remaining(), "block ownership check passed");
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.poifs-tmp", name))
}
