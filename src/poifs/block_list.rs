//! Consuming block lists for the whole-file load strategy.
//!
//! Every block of the file is held in memory and handed out at most once.
//! Building a chain takes its blocks out of the list, so a block claimed by
//! two structures (a shared or circular chain) fails the second claim.

use super::block_size::BigBlockSize;
use super::consts::*;
use super::fat::BlockAllocationTable;
use super::options::PoifsOptions;
use super::source::DataSource;
use crate::common::error::{PoifsError, Result};
use bytes::Bytes;
use tracing::debug;

/// A list of blocks that can each be taken once.
pub trait BlockList {
    /// Take block `index` out of the list.
    ///
    /// Fails when the block was already taken or does not exist.
    fn remove(&mut self, index: u32) -> Result<Bytes>;

    /// Drop block `index` without returning it. Out of range is a no-op.
    fn zap(&mut self, index: u32);

    /// Total number of slots.
    fn len(&self) -> usize;

    /// True when the list has no slots.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of blocks still present.
    fn remaining(&self) -> usize;
}

/// Shared slot storage for both lists.
#[derive(Debug, Clone, Default)]
struct Slots {
    blocks: Vec<Option<Bytes>>,
}

impl Slots {
    fn remove(&mut self, index: u32) -> Result<Bytes> {
        let last = self.blocks.len() as i64 - 1;
        match self.blocks.get_mut(index as usize) {
            None => Err(PoifsError::corrupt_sector(
                index,
                format!("Cannot remove block[ {} ]; out of range[ 0 - {} ]", index, last),
            )),
            Some(slot) => slot.take().ok_or_else(|| {
                PoifsError::corrupt_sector(
                    index,
                    format!(
                        "block[ {} ] already removed - does the file have circular or \
                         duplicate block references?",
                        index
                    ),
                )
            }),
        }
    }

    fn zap(&mut self, index: u32) {
        if let Some(slot) = self.blocks.get_mut(index as usize) {
            *slot = None;
        }
    }

    fn remaining(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_some()).count()
    }
}

/// Every big block of a file.
#[derive(Debug, Clone, Default)]
pub struct RawBlockList {
    slots: Slots,
}

impl RawBlockList {
    /// Wrap blocks already in memory; block `i` is big block `i`.
    pub fn new(blocks: Vec<Bytes>) -> Self {
        Self {
            slots: Slots {
                blocks: blocks.into_iter().map(Some).collect(),
            },
        }
    }

    /// Load every big block after the header from `source`.
    ///
    /// A trailing partial block is zero padded.
    pub fn from_source(
        source: &dyn DataSource,
        block_size: BigBlockSize,
        options: &PoifsOptions,
    ) -> Result<Self> {
        let size = source.size()?;
        options.check_record_length(size)?;

        let bs = block_size.bytes();
        let count = size.saturating_sub(bs as u64).div_ceil(bs as u64) as usize;
        let mut blocks = Vec::with_capacity(count);
        for index in 0..count as u32 {
            blocks.push(super::store::read_big_block(source, block_size, index)?);
        }
        debug!(blocks = count, "loaded raw block list");
        Ok(Self::new(blocks))
    }

    /// Take the blocks of the chain starting at `start`, in order.
    pub fn fetch_blocks(
        &mut self,
        table: &BlockAllocationTable,
        start: u32,
        header_properties_start: u32,
    ) -> Result<Vec<Bytes>> {
        table.fetch_blocks(start, header_properties_start, self)
    }
}

impl BlockList for RawBlockList {
    fn remove(&mut self, index: u32) -> Result<Bytes> {
        self.slots.remove(index)
    }

    fn zap(&mut self, index: u32) {
        self.slots.zap(index)
    }

    fn len(&self) -> usize {
        self.slots.blocks.len()
    }

    fn remaining(&self) -> usize {
        self.slots.remaining()
    }
}

/// Mini blocks cut from the big blocks of the mini stream.
#[derive(Debug, Clone, Default)]
pub struct SmallBlockList {
    slots: Slots,
}

impl SmallBlockList {
    /// Split the mini stream's big blocks into 64-byte blocks.
    pub fn from_mini_stream(big_blocks: &[Bytes]) -> Self {
        let blocks = big_blocks
            .iter()
            .flat_map(|big| {
                (0..big.len() / MINI_SECTOR_SIZE)
                    .map(move |i| Some(big.slice(i * MINI_SECTOR_SIZE..(i + 1) * MINI_SECTOR_SIZE)))
            })
            .collect();
        Self {
            slots: Slots { blocks },
        }
    }

    /// Take the mini blocks of the chain starting at `start`, in order.
    pub fn fetch_blocks(
        &mut self,
        table: &BlockAllocationTable,
        start: u32,
        header_properties_start: u32,
    ) -> Result<Vec<Bytes>> {
        table.fetch_blocks(start, header_properties_start, self)
    }
}

impl BlockList for SmallBlockList {
    fn remove(&mut self, index: u32) -> Result<Bytes> {
        self.slots.remove(index).map_err(|err| match err {
            PoifsError::Corrupt { detail, .. } => PoifsError::corrupt_mini_sector(index, detail),
            other => other,
        })
    }

    fn zap(&mut self, index: u32) {
        self.slots.zap(index)
    }

    fn len(&self) -> usize {
        self.slots.blocks.len()
    }

    fn remaining(&self) -> usize {
        self.slots.remaining()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poifs::fat::TableKind;

    fn blocks(n: usize) -> Vec<Bytes> {
        (0..n).map(|i| Bytes::from(vec![i as u8; 512])).collect()
    }

    #[test]
    fn test_remove_once() {
        let mut list = RawBlockList::new(blocks(3));
        assert_eq!(list.remove(1).unwrap()[0], 1);
        let err = list.remove(1).unwrap_err();
        assert!(err.to_string().contains("already removed"));
        assert!(list.remove(3).unwrap_err().to_string().contains("out of range"));
        assert_eq!(list.remaining(), 2);
    }

    #[test]
    fn test_zap_out_of_range_is_noop() {
        let mut list = RawBlockList::new(blocks(2));
        list.zap(5);
        list.zap(0);
        assert_eq!(list.remaining(), 1);
        assert!(list.remove(0).is_err());
    }

    #[test]
    fn test_small_block_list() {
        let mini = [Bytes::from((0..=255u8).cycle().take(512).collect::<Vec<u8>>())];
        let mut list = SmallBlockList::from_mini_stream(&mini);
        assert_eq!(list.len(), 8);

        let table = BlockAllocationTable::from_entries(
            vec![3, ENDOFCHAIN, ENDOFCHAIN, 1],
            TableKind::Mini,
        );
        let chain = list.fetch_blocks(&table, 0, NOSTREAM).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[1][0], 192);
        assert!(matches!(
            list.fetch_blocks(&table, 3, NOSTREAM),
            Err(PoifsError::Corrupt { .. })
        ));
    }
}
