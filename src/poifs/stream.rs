//! A document's data as a chain of blocks.

use super::consts::ENDOFCHAIN;
use super::store::{BlockIter, BlockStore, BlockStoreMut};
use crate::common::error::{PoifsError, Result};
use tracing::debug;

/// View of one block chain in a big or mini block store.
///
/// The stream borrows the store for as long as it lives; the owning
/// property's start block and size are updated by the caller.
#[derive(Debug)]
pub struct PoifsStream<S> {
    store: S,
    start: u32,
}

impl<S: BlockStore> PoifsStream<S> {
    /// Stream starting at `start`; `ENDOFCHAIN` for an empty or new stream.
    pub fn new(store: S, start: u32) -> Self {
        Self { store, start }
    }

    /// First block of the chain.
    #[inline]
    pub fn start_block(&self) -> u32 {
        self.start
    }

    /// Lazily read every block of the chain.
    pub fn blocks(&self) -> BlockIter<'_, S> {
        self.store.blocks(self.start)
    }

    /// Upper bound on the bytes any chain in the store can hold.
    fn chain_capacity(&self) -> usize {
        self.store.table().len().saturating_mul(self.store.block_size())
    }

    /// Read exactly `size` bytes.
    ///
    /// Fails with `RecordFormat` when the chain ends early.
    pub fn read_to_vec(&self, size: u64) -> Result<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let size = size as usize;
        let mut out = Vec::with_capacity(size.min(self.chain_capacity()));
        for block in self.blocks() {
            let block = block?;
            let take = (size - out.len()).min(block.len());
            out.extend_from_slice(&block[..take]);
            if out.len() == size {
                return Ok(out);
            }
        }
        Err(PoifsError::RecordFormat(format!(
            "stream declares {} bytes but its chain from block {} holds only {}",
            size,
            self.start,
            out.len()
        )))
    }

    /// Read `len` bytes starting at `offset`, only touching the blocks needed.
    pub fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let bs = self.store.block_size() as u64;
        let first = offset / bs;
        let mut skip = (offset % bs) as usize;
        let mut out = Vec::with_capacity(len.min(self.chain_capacity()));

        for (position, block) in self.store.chain(self.start).enumerate() {
            let block = block?;
            if (position as u64) < first {
                continue;
            }
            let data = self.store.read_block(block)?;
            let take = (len - out.len()).min(data.len() - skip);
            out.extend_from_slice(&data[skip..skip + take]);
            skip = 0;
            if out.len() == len {
                return Ok(out);
            }
        }
        Err(PoifsError::RecordFormat(format!(
            "range {}..{} lies beyond the chain from block {}",
            offset,
            offset + len as u64,
            self.start
        )))
    }
}

impl<S: BlockStoreMut> PoifsStream<S> {
    /// Replace the chain with `data`.
    ///
    /// Returns the new start block, `ENDOFCHAIN` when `data` is empty.
    pub fn write(&mut self, data: &[u8]) -> Result<u32> {
        self.free()?;
        if data.is_empty() {
            return Ok(ENDOFCHAIN);
        }

        let bs = self.store.block_size();
        let chain = self.store.allocate_chain(data.len().div_ceil(bs))?;
        for (&block, chunk) in chain.iter().zip(data.chunks(bs)) {
            self.store.write_block(block, chunk)?;
        }
        self.start = chain.first().copied().unwrap_or(ENDOFCHAIN);
        debug!(start = self.start, blocks = chain.len(), bytes = data.len(), "wrote stream");
        Ok(self.start)
    }

    /// Release every block of the chain.
    pub fn free(&mut self) -> Result<()> {
        if self.start != ENDOFCHAIN {
            self.store.free_chain(self.start)?;
            self.start = ENDOFCHAIN;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poifs::block_size::BigBlockSize;
    use crate::poifs::fat::{BlockAllocationTable, TableKind};
    use crate::poifs::source::ByteArraySource;
    use crate::poifs::store::{BigBlockStore, BlockSpace, MiniBlockStore};

    fn space() -> BlockSpace {
        BlockSpace::new(
            Box::new(ByteArraySource::default()),
            BigBlockSize::Small,
            BlockAllocationTable::new(TableKind::Big),
            BlockAllocationTable::new(TableKind::Mini),
            Vec::new(),
        )
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 251) as u8).collect()
    }

    #[test]
    fn test_big_stream_write_read() {
        let mut space = space();
        let data = pattern(1300);
        let start = PoifsStream::new(BigBlockStore::new(&mut space), ENDOFCHAIN)
            .write(&data)
            .unwrap();
        assert_eq!(space.bat().chain_to_vec(start).unwrap().len(), 3);

        let stream = PoifsStream::new(BigBlockStore::new(&space), start);
        assert_eq!(stream.read_to_vec(1300).unwrap(), data);
        assert_eq!(stream.read_range(510, 4).unwrap(), &data[510..514]);
        assert!(matches!(
            stream.read_to_vec(1537),
            Err(PoifsError::RecordFormat(_))
        ));
    }

    #[test]
    fn test_rewrite_frees_old_chain() {
        let mut space = space();
        let mut stream = PoifsStream::new(MiniBlockStore::new(&mut space), ENDOFCHAIN);
        stream.write(&pattern(640)).unwrap();
        let start = stream.write(&pattern(100)).unwrap();
        drop(stream);
        assert_eq!(space.sbat().used_count(), 2);
        assert_eq!(space.sbat().chain_to_vec(start).unwrap(), vec![0, 1]);

        let stream = PoifsStream::new(MiniBlockStore::new(&space), start);
        assert_eq!(stream.read_to_vec(100).unwrap(), pattern(100));
    }

    #[test]
    fn test_empty_stream() {
        let mut space = space();
        let mut stream = PoifsStream::new(BigBlockStore::new(&mut space), ENDOFCHAIN);
        assert_eq!(stream.write(&[]).unwrap(), ENDOFCHAIN);
        assert!(stream.read_to_vec(0).unwrap().is_empty());
        drop(stream);
        assert_eq!(space.bat().used_count(), 0);
    }
}
