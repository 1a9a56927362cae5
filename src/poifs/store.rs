//! Block stores: uniform access to big blocks and mini blocks.
//!
//! Both stores sit on one [`BlockSpace`], the in-memory state of an open
//! filesystem: the byte source, the FAT, the mini-FAT and the resolved
//! chain of the mini stream. A store is a thin view over that state,
//! borrowed shared for reading and exclusively for writing:
//!
//! ```text
//! BigBlockStore<&BlockSpace>       read_block, next_block, blocks
//! BigBlockStore<&mut BlockSpace>   + write_block, free_block, free_chain
//! MiniBlockStore<...>              same, over 64-byte blocks in the mini stream
//! ```
//!
//! Chain following is shared: both stores walk their table with
//! [`BlockAllocationTable::chain`], which is bounded by a loop detector.

use super::block_size::BigBlockSize;
use super::consts::*;
use super::fat::{BlockAllocationTable, Chain, ChainLoopDetector};
use super::source::DataSource;
use crate::common::error::{PoifsError, Result};
use bytes::{Bytes, BytesMut};
use std::borrow::{Borrow, BorrowMut};
use tracing::debug;

/// Read one big block straight from a source.
///
/// A final block cut short by the end of the file is padded with zeros.
pub fn read_big_block(
    source: &dyn DataSource,
    block_size: BigBlockSize,
    index: u32,
) -> Result<Bytes> {
    let offset = block_size.offset_of(index);
    let size = source.size()?;
    if offset >= size {
        return Err(PoifsError::corrupt_sector(
            index,
            format!(
                "block at offset {} lies beyond the end of the data ({} bytes)",
                offset, size
            ),
        ));
    }

    let data = source.read_at(offset, block_size.bytes())?;
    if data.len() == block_size.bytes() {
        return Ok(data);
    }

    debug!(index, read = data.len(), "padding truncated last block");
    let mut padded = BytesMut::with_capacity(block_size.bytes());
    padded.extend_from_slice(&data);
    padded.resize(block_size.bytes(), 0);
    Ok(padded.freeze())
}

/// In-memory state shared by the block stores of one filesystem.
#[derive(Debug)]
pub struct BlockSpace {
    source: Box<dyn DataSource>,
    block_size: BigBlockSize,
    bat: BlockAllocationTable,
    sbat: BlockAllocationTable,
    mini_stream: Vec<u32>,
}

impl BlockSpace {
    /// Assemble a space from its parts.
    ///
    /// `mini_stream` is the chain of big blocks holding the mini stream.
    pub fn new(
        source: Box<dyn DataSource>,
        block_size: BigBlockSize,
        bat: BlockAllocationTable,
        sbat: BlockAllocationTable,
        mini_stream: Vec<u32>,
    ) -> Self {
        Self {
            source,
            block_size,
            bat,
            sbat,
            mini_stream,
        }
    }

    /// Big block size.
    #[inline]
    pub fn block_size(&self) -> BigBlockSize {
        self.block_size
    }

    /// The main FAT.
    #[inline]
    pub fn bat(&self) -> &BlockAllocationTable {
        &self.bat
    }

    /// The mini-FAT.
    #[inline]
    pub fn sbat(&self) -> &BlockAllocationTable {
        &self.sbat
    }

    /// Big blocks holding the mini stream, in order.
    #[inline]
    pub fn mini_stream_blocks(&self) -> &[u32] {
        &self.mini_stream
    }

    /// First big block of the mini stream.
    pub fn mini_stream_start(&self) -> u32 {
        self.mini_stream.first().copied().unwrap_or(ENDOFCHAIN)
    }

    /// Number of mini blocks the mini stream can hold.
    pub fn mini_capacity(&self) -> usize {
        self.mini_stream.len() * self.block_size.bytes() / MINI_SECTOR_SIZE
    }

    /// Release the byte source.
    pub fn close(&mut self) -> Result<()> {
        self.source.close()
    }

    fn write_big(&mut self, index: u32, within: usize, data: &[u8]) -> Result<()> {
        let offset = self.block_size.offset_of(index) + within as u64;
        self.source.write_at(offset, data)
    }

    /// Append one big block to the mini stream, zero filled.
    fn grow_mini_stream(&mut self) -> Result<()> {
        let block = self.bat.allocate_one();
        if let Some(&last) = self.mini_stream.last() {
            self.bat.set_next(last, block);
        }
        self.mini_stream.push(block);
        let zeros = vec![0u8; self.block_size.bytes()];
        self.write_big(block, 0, &zeros)?;
        debug!(block, blocks = self.mini_stream.len(), "extended mini stream");
        Ok(())
    }

    /// Locate a mini block: the big block holding it and the offset inside.
    fn locate_mini(&self, index: u32) -> Result<(u32, usize)> {
        let offset = index as usize * MINI_SECTOR_SIZE;
        let bs = self.block_size.bytes();
        match self.mini_stream.get(offset / bs) {
            Some(&big) => Ok((big, offset % bs)),
            None => Err(PoifsError::corrupt_mini_sector(
                index,
                format!(
                    "mini block lies beyond the end of the mini stream ({} blocks)",
                    self.mini_stream.len()
                ),
            )),
        }
    }
}

/// Read access to a block space.
pub trait BlockStore {
    /// Size of one block in bytes.
    fn block_size(&self) -> usize;

    /// Allocation table of this store.
    fn table(&self) -> &BlockAllocationTable;

    /// Read one block.
    fn read_block(&self, index: u32) -> Result<Bytes>;

    /// Next block of a chain.
    fn next_block(&self, index: u32) -> Result<u32> {
        self.table().next(index)
    }

    /// A fresh loop detector covering every block of this store.
    fn chain_loop_detector(&self) -> ChainLoopDetector {
        ChainLoopDetector::new(self.table().len(), self.table().kind())
    }

    /// Bounded walk over the block indices of a chain.
    fn chain(&self, start: u32) -> Chain<'_> {
        self.table().chain(start)
    }

    /// Lazily read the blocks of a chain.
    fn blocks(&self, start: u32) -> BlockIter<'_, Self>
    where
        Self: Sized,
    {
        BlockIter {
            store: self,
            chain: self.chain(start),
        }
    }
}

/// Write access to a block space.
pub trait BlockStoreMut: BlockStore {
    /// Overwrite one block. Shorter data is zero padded.
    fn write_block(&mut self, index: u32, data: &[u8]) -> Result<()>;

    /// Link `index` to `next`.
    fn set_next_block(&mut self, index: u32, next: u32);

    /// Claim one unused block, growing the store when none is left.
    fn free_block(&mut self) -> Result<u32>;

    /// Claim `count` blocks linked into one chain.
    fn allocate_chain(&mut self, count: usize) -> Result<Vec<u32>>;

    /// Release every block of a chain.
    fn free_chain(&mut self, start: u32) -> Result<usize>;
}

/// Lazy block reader returned by [`BlockStore::blocks`].
pub struct BlockIter<'s, S: BlockStore> {
    store: &'s S,
    chain: Chain<'s>,
}

impl<S: BlockStore> Iterator for BlockIter<'_, S> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.chain.next()?;
        Some(block.and_then(|index| self.store.read_block(index)))
    }
}

fn padded<'d>(data: &'d [u8], size: usize, scratch: &'d mut Vec<u8>) -> Result<&'d [u8]> {
    if data.len() > size {
        return Err(PoifsError::RecordFormat(format!(
            "block data of {} bytes exceeds the block size {}",
            data.len(),
            size
        )));
    }
    if data.len() == size {
        return Ok(data);
    }
    scratch.clear();
    scratch.extend_from_slice(data);
    scratch.resize(size, 0);
    Ok(scratch.as_slice())
}

/// Big blocks of the main file, addressed through the FAT.
#[derive(Debug)]
pub struct BigBlockStore<T> {
    space: T,
}

impl<T: Borrow<BlockSpace>> BigBlockStore<T> {
    /// View `space` as big blocks.
    pub fn new(space: T) -> Self {
        Self { space }
    }
}

impl<T: Borrow<BlockSpace>> BlockStore for BigBlockStore<T> {
    fn block_size(&self) -> usize {
        self.space.borrow().block_size.bytes()
    }

    fn table(&self) -> &BlockAllocationTable {
        &self.space.borrow().bat
    }

    fn read_block(&self, index: u32) -> Result<Bytes> {
        let space = self.space.borrow();
        read_big_block(space.source.as_ref(), space.block_size, index)
    }
}

impl<T: BorrowMut<BlockSpace>> BlockStoreMut for BigBlockStore<T> {
    fn write_block(&mut self, index: u32, data: &[u8]) -> Result<()> {
        let space = self.space.borrow_mut();
        if index as usize >= space.bat.len() {
            return Err(PoifsError::corrupt_sector(index, "write to an unallocated block"));
        }
        let mut scratch = Vec::new();
        let block = padded(data, space.block_size.bytes(), &mut scratch)?;
        space.write_big(index, 0, block)
    }

    fn set_next_block(&mut self, index: u32, next: u32) {
        self.space.borrow_mut().bat.set_next(index, next);
    }

    fn free_block(&mut self) -> Result<u32> {
        Ok(self.space.borrow_mut().bat.allocate_one())
    }

    fn allocate_chain(&mut self, count: usize) -> Result<Vec<u32>> {
        Ok(self.space.borrow_mut().bat.allocate(count))
    }

    fn free_chain(&mut self, start: u32) -> Result<usize> {
        self.space.borrow_mut().bat.free_chain(start)
    }
}

/// 64-byte blocks inside the mini stream, addressed through the mini-FAT.
#[derive(Debug)]
pub struct MiniBlockStore<T> {
    space: T,
}

impl<T: Borrow<BlockSpace>> MiniBlockStore<T> {
    /// View `space` as mini blocks.
    pub fn new(space: T) -> Self {
        Self { space }
    }
}

impl<T: BorrowMut<BlockSpace>> MiniBlockStore<T> {
    /// Make sure the mini stream can hold mini block `index`.
    fn ensure_capacity(&mut self, index: u32) -> Result<()> {
        let space = self.space.borrow_mut();
        while index as usize >= space.mini_capacity() {
            space.grow_mini_stream()?;
        }
        Ok(())
    }
}

impl<T: Borrow<BlockSpace>> BlockStore for MiniBlockStore<T> {
    fn block_size(&self) -> usize {
        MINI_SECTOR_SIZE
    }

    fn table(&self) -> &BlockAllocationTable {
        &self.space.borrow().sbat
    }

    fn read_block(&self, index: u32) -> Result<Bytes> {
        let space = self.space.borrow();
        let (big, within) = space.locate_mini(index)?;
        let block = read_big_block(space.source.as_ref(), space.block_size, big)?;
        Ok(block.slice(within..within + MINI_SECTOR_SIZE))
    }
}

impl<T: BorrowMut<BlockSpace>> BlockStoreMut for MiniBlockStore<T> {
    fn write_block(&mut self, index: u32, data: &[u8]) -> Result<()> {
        let space = self.space.borrow_mut();
        if index as usize >= space.sbat.len() {
            return Err(PoifsError::corrupt_mini_sector(
                index,
                "write to an unallocated mini block",
            ));
        }
        let (big, within) = space.locate_mini(index)?;
        let mut scratch = Vec::new();
        let block = padded(data, MINI_SECTOR_SIZE, &mut scratch)?;
        space.write_big(big, within, block)
    }

    fn set_next_block(&mut self, index: u32, next: u32) {
        self.space.borrow_mut().sbat.set_next(index, next);
    }

    fn free_block(&mut self) -> Result<u32> {
        let index = self.space.borrow_mut().sbat.allocate_one();
        self.ensure_capacity(index)?;
        Ok(index)
    }

    fn allocate_chain(&mut self, count: usize) -> Result<Vec<u32>> {
        let chain = self.space.borrow_mut().sbat.allocate(count);
        if let Some(&highest) = chain.iter().max() {
            self.ensure_capacity(highest)?;
        }
        Ok(chain)
    }

    fn free_chain(&mut self, start: u32) -> Result<usize> {
        self.space.borrow_mut().sbat.free_chain(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poifs::fat::TableKind;
    use crate::poifs::source::ByteArraySource;

    fn empty_space() -> BlockSpace {
        BlockSpace::new(
            Box::new(ByteArraySource::new(vec![0u8; 512])),
            BigBlockSize::Small,
            BlockAllocationTable::new(TableKind::Big),
            BlockAllocationTable::new(TableKind::Mini),
            Vec::new(),
        )
    }

    #[test]
    fn test_big_store_write_and_read_chain() {
        let mut space = empty_space();
        {
            let mut store = BigBlockStore::new(&mut space);
            let chain = store.allocate_chain(3).unwrap();
            for (i, &block) in chain.iter().enumerate() {
                store.write_block(block, &[i as u8 + 1; 10]).unwrap();
            }
        }

        let store = BigBlockStore::new(&space);
        let blocks: Vec<Bytes> = store.blocks(0).collect::<Result<_>>().unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2][0], 3);
        assert_eq!(blocks[2][10], 0);
        assert_eq!(blocks[0].len(), 512);
    }

    #[test]
    fn test_mini_store_grows_mini_stream() {
        let mut space = empty_space();
        {
            let mut store = MiniBlockStore::new(&mut space);
            // 9 mini blocks need two big blocks of mini stream.
            let chain = store.allocate_chain(9).unwrap();
            assert_eq!(chain.len(), 9);
            store.write_block(chain[8], b"tail").unwrap();
        }
        assert_eq!(space.mini_stream_blocks().len(), 2);
        assert_eq!(space.mini_capacity(), 16);
        assert_eq!(space.bat().chain_to_vec(space.mini_stream_start()).unwrap().len(), 2);

        let store = MiniBlockStore::new(&space);
        let block = store.read_block(8).unwrap();
        assert_eq!(&block[..4], b"tail");
        assert_eq!(block.len(), 64);
        assert!(matches!(
            store.read_block(16),
            Err(PoifsError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_free_block_and_links() {
        let mut space = empty_space();
        let mut store = BigBlockStore::new(&mut space);
        let a = store.free_block().unwrap();
        let b = store.free_block().unwrap();
        assert_eq!((a, b), (0, 1));
        store.set_next_block(a, b);
        assert_eq!(store.next_block(a).unwrap(), b);
        assert_eq!(store.next_block(b).unwrap(), ENDOFCHAIN);

        let mut detector = store.chain_loop_detector();
        detector.claim(a).unwrap();
        assert!(detector.claim(a).is_err());
    }

    #[test]
    fn test_read_beyond_end_is_corruption() {
        let space = empty_space();
        let store = BigBlockStore::new(&space);
        let err = store.read_block(3).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_block_iter_stops_on_loop() {
        let mut space = empty_space();
        {
            let mut store = BigBlockStore::new(&mut space);
            store.allocate_chain(3).unwrap();
            for b in 0..3 {
                store.write_block(b, &[]).unwrap();
            }
            store.set_next_block(2, 0);
        }
        let store = BigBlockStore::new(&space);
        let results: Vec<Result<Bytes>> = store.blocks(0).collect();
        assert_eq!(results.len(), 4);
        assert!(results[3].is_err());
    }
}
