//! Block allocation tables (FAT and mini-FAT) and the DIFAT.
//!
//! A table maps every block index to the next block of its chain or to one
//! of the reserved markers:
//! - `ENDOFCHAIN` (0xFFFFFFFE) terminates a chain
//! - `FREESECT` (0xFFFFFFFF) marks an unused block
//! - `FATSECT` (0xFFFFFFFD) marks a block holding the FAT itself
//! - `DIFSECT` (0xFFFFFFFC) marks a block holding DIFAT entries
//!
//! Chain following is always bounded: every walk carries a
//! [`ChainLoopDetector`] sized to the table, so a cyclic table ends in a
//! corruption error after at most one pass over the blocks.

use super::block_list::BlockList;
use super::block_size::BigBlockSize;
use super::consts::*;
use super::header::HeaderBlock;
use super::source::DataSource;
use super::store::read_big_block;
use crate::common::binary::{read_u32_array_le, write_u32_blocks_le};
use crate::common::error::{PoifsError, Result};
use bytes::Bytes;
use fixedbitset::FixedBitSet;
use tracing::{debug, warn};

/// Which block space a table addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Big blocks in the main file
    Big,
    /// 64-byte blocks inside the mini stream
    Mini,
}

impl TableKind {
    pub(crate) fn corrupt(self, index: u32, detail: impl Into<String>) -> PoifsError {
        match self {
            TableKind::Big => PoifsError::corrupt_sector(index, detail),
            TableKind::Mini => PoifsError::corrupt_mini_sector(index, detail),
        }
    }
}

/// Remembers which blocks a walk has already visited.
///
/// Claims beyond the detector's capacity are ignored; those indices are
/// rejected by range checks elsewhere.
#[derive(Debug, Clone)]
pub struct ChainLoopDetector {
    used: FixedBitSet,
    kind: TableKind,
}

impl ChainLoopDetector {
    /// Create a detector covering `capacity` blocks.
    pub fn new(capacity: usize, kind: TableKind) -> Self {
        Self {
            used: FixedBitSet::with_capacity(capacity),
            kind,
        }
    }

    /// Claim a block, failing if it was claimed before.
    pub fn claim(&mut self, index: u32) -> Result<()> {
        let i = index as usize;
        if i >= self.used.len() {
            return Ok(());
        }
        if self.used.put(i) {
            return Err(self.kind.corrupt(
                index,
                format!(
                    "Potential loop detected: block {} was already claimed but was just requested again",
                    index
                ),
            ));
        }
        Ok(())
    }
}

/// An allocation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAllocationTable {
    entries: Vec<u32>,
    kind: TableKind,
}

impl BlockAllocationTable {
    /// Create an empty table.
    pub fn new(kind: TableKind) -> Self {
        Self {
            entries: Vec::new(),
            kind,
        }
    }

    /// Wrap existing entries.
    pub fn from_entries(entries: Vec<u32>, kind: TableKind) -> Self {
        Self { entries, kind }
    }

    /// Decode a table from its sectors, in order.
    pub fn from_sectors<B: AsRef<[u8]>>(sectors: &[B], kind: TableKind) -> Result<Self> {
        let mut entries = Vec::new();
        for sector in sectors {
            entries.extend(read_u32_array_le(sector.as_ref())?);
        }
        Ok(Self { entries, kind })
    }

    /// Block space addressed by this table.
    #[inline]
    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw entries.
    #[inline]
    pub fn entries(&self) -> &[u32] {
        &self.entries
    }

    /// Entry for `index`.
    pub fn next(&self, index: u32) -> Result<u32> {
        self.entries.get(index as usize).copied().ok_or_else(|| {
            self.kind.corrupt(
                index,
                format!(
                    "block index {} is outside the allocation table ({} entries)",
                    index,
                    self.entries.len()
                ),
            )
        })
    }

    /// Set the entry for `index`, growing the table with free entries.
    pub fn set_next(&mut self, index: u32, next: u32) {
        let i = index as usize;
        if i >= self.entries.len() {
            self.entries.resize(i + 1, FREESECT);
        }
        self.entries[i] = next;
    }

    /// Mark a block as unused.
    pub fn free(&mut self, index: u32) {
        if let Some(entry) = self.entries.get_mut(index as usize) {
            *entry = FREESECT;
        }
    }

    /// Whether a block is unused. Indices past the end count as free.
    pub fn is_free(&self, index: u32) -> bool {
        self.entries
            .get(index as usize)
            .is_none_or(|&entry| entry == FREESECT)
    }

    /// Number of entries that are not free.
    pub fn used_count(&self) -> usize {
        self.entries.iter().filter(|&&e| e != FREESECT).count()
    }

    /// Claim one block, first fit over free entries, growing when none is left.
    ///
    /// The block is marked as the end of a chain.
    pub fn allocate_one(&mut self) -> u32 {
        self.claim_free_from(0)
    }

    fn claim_free_from(&mut self, from: usize) -> u32 {
        let index = match self.entries[from.min(self.entries.len())..]
            .iter()
            .position(|&e| e == FREESECT)
        {
            Some(offset) => from + offset,
            None => {
                self.entries.push(FREESECT);
                self.entries.len() - 1
            },
        };
        self.entries[index] = ENDOFCHAIN;
        index as u32
    }

    /// Claim `count` blocks and link them into one chain.
    ///
    /// Returns the chain in order; empty for `count == 0`.
    pub fn allocate(&mut self, count: usize) -> Vec<u32> {
        let mut chain: Vec<u32> = Vec::with_capacity(count);
        let mut cursor = 0;
        for _ in 0..count {
            let block = self.claim_free_from(cursor);
            if let Some(&previous) = chain.last() {
                self.entries[previous as usize] = block;
            }
            chain.push(block);
            cursor = block as usize + 1;
        }
        debug!(kind = ?self.kind, count, "allocated chain");
        chain
    }

    /// Append a contiguous chain of `count` blocks at the end of the table.
    ///
    /// Used when laying out a fresh image. Returns the first block, or
    /// `ENDOFCHAIN` when `count` is zero.
    pub fn append_chain(&mut self, count: usize) -> u32 {
        if count == 0 {
            return ENDOFCHAIN;
        }
        let start = self.entries.len() as u32;
        self.entries.reserve(count);
        for i in 0..count as u32 {
            let next = if i + 1 < count as u32 {
                start + i + 1
            } else {
                ENDOFCHAIN
            };
            self.entries.push(next);
        }
        start
    }

    /// Append `count` blocks carrying a reserved marker such as `FATSECT`.
    pub fn append_special(&mut self, count: u32, marker: u32) -> u32 {
        if count == 0 {
            return ENDOFCHAIN;
        }
        let start = self.entries.len() as u32;
        self.entries
            .extend(std::iter::repeat_n(marker, count as usize));
        start
    }

    /// Walk the chain starting at `start`.
    ///
    /// The iterator yields block indices and stops at `ENDOFCHAIN`. A link to
    /// a free or reserved block, a link outside the table, or a revisited
    /// block ends the walk with an error.
    pub fn chain(&self, start: u32) -> Chain<'_> {
        Chain {
            table: self,
            current: start,
            detector: ChainLoopDetector::new(self.entries.len(), self.kind),
            finished: false,
        }
    }

    /// Collect the chain starting at `start`.
    pub fn chain_to_vec(&self, start: u32) -> Result<Vec<u32>> {
        self.chain(start).collect()
    }

    /// Free every block of the chain starting at `start`.
    ///
    /// Returns the number of blocks released.
    pub fn free_chain(&mut self, start: u32) -> Result<usize> {
        let blocks = self.chain_to_vec(start)?;
        for &block in &blocks {
            self.free(block);
        }
        Ok(blocks.len())
    }

    /// Remove the blocks of a chain from `list`, in chain order.
    ///
    /// Two historical quirks are tolerated with a warning instead of an
    /// error: a chain that runs into `header_properties_start` is cut
    /// there, and a chain whose first block is 0 and cannot be taken is
    /// treated as empty. Pass `NOSTREAM` to disable the first one.
    pub fn fetch_blocks<L: BlockList + ?Sized>(
        &self,
        start: u32,
        header_properties_start: u32,
        list: &mut L,
    ) -> Result<Vec<Bytes>> {
        let mut blocks = Vec::new();
        let mut current = start;
        let mut first_pass = true;

        while current != ENDOFCHAIN {
            match list.remove(current) {
                Ok(block) => {
                    blocks.push(block);
                    current = self.next(current)?;
                    first_pass = false;
                },
                Err(err) => {
                    if header_properties_start <= MAXREGSECT && current == header_properties_start {
                        warn!("header block comes after data blocks in the block listing");
                        current = ENDOFCHAIN;
                    } else if current == 0 && first_pass {
                        warn!(
                            "incorrectly terminated empty data blocks in the block listing \
                             (should end at -2, ended at 0)"
                        );
                        current = ENDOFCHAIN;
                    } else {
                        return Err(err);
                    }
                },
            }
        }

        Ok(blocks)
    }

    /// Check every chain for bad links, shared blocks and cycles.
    pub fn validate(&self) -> Result<()> {
        let n = self.entries.len();
        let is_link = |e: u32| !matches!(e, FREESECT | FATSECT | DIFSECT);
        let mut referenced = FixedBitSet::with_capacity(n);

        for (index, &next) in self.entries.iter().enumerate() {
            let index = index as u32;
            match next {
                FREESECT | FATSECT | DIFSECT | ENDOFCHAIN => continue,
                v if v > MAXREGSECT => {
                    return Err(self
                        .kind
                        .corrupt(index, format!("reserved value 0x{:08X} in table", v)));
                },
                v if v as usize >= n => {
                    return Err(self.kind.corrupt(
                        index,
                        format!("invalid next block {} (table has {} entries)", v, n),
                    ));
                },
                _ => {},
            }
            if !is_link(self.entries[next as usize]) {
                return Err(self.kind.corrupt(
                    index,
                    format!("links to block {} which is not part of any chain", next),
                ));
            }
            if referenced.put(next as usize) {
                return Err(self
                    .kind
                    .corrupt(next, "block is shared by two chains"));
            }
        }

        // With every block referenced at most once, a walk from a chain head
        // can never enter a cycle, so these walks terminate.
        let mut visited = FixedBitSet::with_capacity(n);
        for head in 0..n {
            if !is_link(self.entries[head]) || referenced.contains(head) {
                continue;
            }
            let mut current = head;
            loop {
                visited.insert(current);
                match self.entries[current] {
                    ENDOFCHAIN => break,
                    next => current = next as usize,
                }
            }
        }

        for index in 0..n {
            if is_link(self.entries[index]) && !visited.contains(index) {
                return Err(self
                    .kind
                    .corrupt(index as u32, "circular reference in block chain"));
            }
        }

        Ok(())
    }

    /// Number of big blocks needed to store this table.
    pub fn sectors_needed(&self, block_size: BigBlockSize) -> usize {
        self.entries.len().div_ceil(block_size.bat_entries_per_block())
    }

    /// Serialize into big blocks, padding the last one with free entries.
    pub fn to_sectors(&self, block_size: BigBlockSize) -> Vec<Vec<u8>> {
        write_u32_blocks_le(&self.entries, block_size.bytes())
    }
}

/// Bounded walk over one chain, see [`BlockAllocationTable::chain`].
#[derive(Debug)]
pub struct Chain<'t> {
    table: &'t BlockAllocationTable,
    current: u32,
    detector: ChainLoopDetector,
    finished: bool,
}

impl Chain<'_> {
    fn step(&mut self, block: u32) -> Result<u32> {
        let kind = self.table.kind;
        if block > MAXREGSECT {
            return Err(kind.corrupt(
                block,
                format!("chain reaches reserved marker 0x{:08X}", block),
            ));
        }
        let next = self.table.next(block)?;
        self.detector.claim(block)?;
        match next {
            FREESECT => Err(kind.corrupt(block, "chain runs into a free block")),
            FATSECT | DIFSECT => Err(kind.corrupt(
                block,
                "chain runs into an allocation table block",
            )),
            _ => Ok(next),
        }
    }
}

impl Iterator for Chain<'_> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.current == ENDOFCHAIN {
            return None;
        }

        let block = self.current;
        match self.step(block) {
            Ok(next) => {
                self.current = next;
                Some(Ok(block))
            },
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            },
        }
    }
}

/// The main FAT as read from a file, with the sectors it came from.
#[derive(Debug, Clone)]
pub struct LoadedBat {
    /// The decoded table
    pub table: BlockAllocationTable,
    /// Sectors holding the FAT, in table order
    pub bat_sectors: Vec<u32>,
    /// Sectors holding DIFAT entries, in chain order
    pub xbat_sectors: Vec<u32>,
}

/// Read the FAT of a file.
///
/// FAT sector ids come from the header, then from the DIFAT chain. Every
/// FAT and DIFAT sector is claimed once in `detector`, so a sector listed
/// twice or a looping DIFAT chain is rejected.
pub fn load_bat(
    header: &HeaderBlock,
    source: &dyn DataSource,
    detector: &mut ChainLoopDetector,
) -> Result<LoadedBat> {
    let block_size = header.big_block_size;
    let per_xbat = block_size.xbat_entries_per_block();
    let mut remaining = header.bat_count as usize;

    let mut bat_sectors: Vec<u32> = header.bat_array().to_vec();
    remaining = remaining.saturating_sub(bat_sectors.len());

    let mut xbat_sectors = Vec::new();
    let mut next_xbat = header.xbat_start;
    for _ in 0..header.xbat_count {
        if next_xbat == ENDOFCHAIN || next_xbat == FREESECT {
            warn!(
                found = xbat_sectors.len(),
                declared = header.xbat_count,
                "DIFAT chain ended before the declared count"
            );
            break;
        }
        detector.claim(next_xbat)?;
        let data = read_big_block(source, block_size, next_xbat)?;
        let values = read_u32_array_le(&data)?;
        xbat_sectors.push(next_xbat);

        let take = remaining.min(per_xbat);
        let mut taken = 0;
        for &fat_at in &values[..take] {
            if fat_at == FREESECT || fat_at == ENDOFCHAIN {
                warn!(sector = next_xbat, "DIFAT list ended early");
                break;
            }
            bat_sectors.push(fat_at);
            taken += 1;
        }
        remaining -= taken;
        if taken < take {
            remaining = 0;
        }
        next_xbat = values[per_xbat];
    }

    if remaining > 0 {
        warn!(
            missing = remaining,
            declared = header.bat_count,
            "fewer FAT sectors listed than the header declares"
        );
    }

    let mut sectors = Vec::with_capacity(bat_sectors.len());
    for &fat_at in &bat_sectors {
        detector.claim(fat_at)?;
        sectors.push(read_big_block(source, block_size, fat_at)?);
    }
    let table = BlockAllocationTable::from_sectors(&sectors, TableKind::Big)?;
    debug!(
        bat_sectors = bat_sectors.len(),
        xbat_sectors = xbat_sectors.len(),
        entries = table.len(),
        "loaded allocation table"
    );

    Ok(LoadedBat {
        table,
        bat_sectors,
        xbat_sectors,
    })
}

/// FAT and DIFAT sector counts for a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatLayout {
    /// Number of FAT sectors
    pub fat_sectors: u32,
    /// Number of DIFAT sectors
    pub difat_sectors: u32,
}

/// Sizes the FAT and DIFAT for a fresh image.
///
/// The FAT must describe its own sectors and the DIFAT sectors, which in
/// turn depend on the FAT size, so the counts are iterated to a fixed point.
#[derive(Debug, Clone, Copy)]
pub struct LayoutPlanner {
    block_size: BigBlockSize,
}

impl LayoutPlanner {
    /// Create a planner for the given block size.
    pub fn new(block_size: BigBlockSize) -> Self {
        Self { block_size }
    }

    /// Plan for `used` data sectors.
    pub fn plan(&self, used: u32) -> FatLayout {
        let per_fat = self.block_size.bat_entries_per_block() as u32;
        let per_difat = self.block_size.xbat_entries_per_block() as u32;

        let mut n_fat: u32 = 0;
        let mut n_difat: u32 = 0;
        loop {
            let total = used + n_fat + n_difat;
            let new_n_fat = total.div_ceil(per_fat).max(1);
            let new_n_difat = new_n_fat
                .saturating_sub(HEADER_DIFAT_ENTRIES as u32)
                .div_ceil(per_difat);
            if new_n_fat == n_fat && new_n_difat == n_difat {
                break;
            }
            n_fat = new_n_fat;
            n_difat = new_n_difat;
        }

        FatLayout {
            fat_sectors: n_fat,
            difat_sectors: n_difat,
        }
    }

    /// Build DIFAT sectors listing the FAT sectors past the header's 109.
    ///
    /// DIFAT sectors are contiguous from `first_difat`; each ends with the
    /// index of the next one, the last with `ENDOFCHAIN`.
    pub fn difat_sectors(&self, fat_sectors: &[u32], first_difat: u32) -> Vec<Vec<u8>> {
        if fat_sectors.len() <= HEADER_DIFAT_ENTRIES {
            return Vec::new();
        }
        let per_difat = self.block_size.xbat_entries_per_block();
        let next_offset = self.block_size.next_xbat_chain_offset();
        let overflow = &fat_sectors[HEADER_DIFAT_ENTRIES..];
        let count = overflow.len().div_ceil(per_difat);

        overflow
            .chunks(per_difat)
            .enumerate()
            .map(|(i, ids)| {
                let mut sector = vec![0xFFu8; self.block_size.bytes()];
                for (j, id) in ids.iter().enumerate() {
                    sector[j * 4..j * 4 + 4].copy_from_slice(&id.to_le_bytes());
                }
                let next = if i + 1 < count {
                    first_difat + i as u32 + 1
                } else {
                    ENDOFCHAIN
                };
                sector[next_offset..next_offset + 4].copy_from_slice(&next.to_le_bytes());
                sector
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poifs::block_list::RawBlockList;

    #[test]
    fn test_allocate_reuses_free_blocks() {
        let mut table = BlockAllocationTable::from_entries(
            vec![ENDOFCHAIN, FREESECT, ENDOFCHAIN, FREESECT],
            TableKind::Big,
        );
        let chain = table.allocate(3);
        assert_eq!(chain, vec![1, 3, 4]);
        assert_eq!(table.entries(), &[ENDOFCHAIN, 3, ENDOFCHAIN, 4, ENDOFCHAIN]);
        assert_eq!(table.chain_to_vec(1).unwrap(), vec![1, 3, 4]);
    }

    #[test]
    fn test_free_chain() {
        let mut table = BlockAllocationTable::new(TableKind::Mini);
        let chain = table.allocate(4);
        assert_eq!(table.free_chain(chain[0]).unwrap(), 4);
        assert_eq!(table.used_count(), 0);
        assert!(table.is_free(2));
        assert!(table.is_free(99));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let table =
            BlockAllocationTable::from_entries(vec![1, 2, 0], TableKind::Big);
        let result = table.chain_to_vec(0);
        assert!(matches!(result, Err(PoifsError::Corrupt { .. })));
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_chain_termination_is_bounded() {
        // Every block links to its successor, the last one back to the start.
        let n = 1000u32;
        let entries: Vec<u32> = (0..n).map(|i| (i + 1) % n).collect();
        let table = BlockAllocationTable::from_entries(entries, TableKind::Big);
        for start in [0, 500, 999] {
            let steps = table.chain(start).count();
            assert!(steps <= n as usize + 1);
            assert!(table.chain(start).last().unwrap().is_err());
        }
    }

    #[test]
    fn test_chain_into_free_or_out_of_range() {
        let table = BlockAllocationTable::from_entries(
            vec![1, FREESECT, 7, FATSECT],
            TableKind::Big,
        );
        assert!(table.chain_to_vec(0).unwrap_err().is_corruption());
        assert!(table.chain_to_vec(2).unwrap_err().is_corruption());
        assert!(table.chain_to_vec(42).unwrap_err().is_corruption());
        assert_eq!(table.chain_to_vec(ENDOFCHAIN).unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn test_validate_shared_block() {
        let table = BlockAllocationTable::from_entries(
            vec![2, 2, ENDOFCHAIN],
            TableKind::Big,
        );
        assert!(table.validate().is_err());

        let mut good = BlockAllocationTable::new(TableKind::Big);
        good.append_chain(3);
        good.append_special(1, FATSECT);
        good.append_chain(2);
        assert!(good.validate().is_ok());
    }

    #[test]
    fn test_fetch_blocks() {
        // One BAT block describing several documents, some of them broken.
        let mut values: Vec<u32> = vec![
            FATSECT,    // the BAT block itself
            ENDOFCHAIN, // document 2: one block, start 1
            2,          // document 3: loops on itself, start 2
            4,          // document 4: runs into document 2, start 3
            1,
            6,          // document 5: includes an unused block, start 5
            FREESECT,
            8,          // document 6: includes the BAT block, start 7
            0,
            10,         // document 7: includes a DIFAT block, start 9
            DIFSECT,
            1000,       // document 8: goes off into space, start 11
        ];
        // document 9: no problems, start 12
        let mut index = 13;
        while values.len() < 127 {
            values.push(index);
            index += 1;
        }
        values.push(ENDOFCHAIN);

        let bat_block = write_u32_blocks_le(&values, 512).remove(0);
        let mut blocks = vec![Bytes::from(bat_block.clone())];
        blocks.extend((1..128).map(|_| Bytes::from(vec![0u8; 512])));
        let mut list = RawBlockList::new(blocks);

        let table =
            BlockAllocationTable::from_sectors(&[bat_block], TableKind::Big).unwrap();
        list.remove(0).unwrap();

        let cases: [(u32, Option<usize>); 9] = [
            (ENDOFCHAIN, Some(0)),
            (1, Some(1)),
            (2, None),
            (3, None),
            (5, None),
            (7, None),
            (9, None),
            (11, None),
            (12, Some(116)),
        ];
        for (start, expected) in cases {
            let result = table.fetch_blocks(start, NOSTREAM, &mut list);
            match expected {
                Some(len) => assert_eq!(result.unwrap().len(), len, "start {}", start),
                None => assert!(result.is_err(), "start {} should fail", start),
            }
        }
    }

    #[test]
    fn test_fetch_blocks_quirks() {
        let table = BlockAllocationTable::from_entries(
            vec![ENDOFCHAIN, 0, ENDOFCHAIN, 3],
            TableKind::Big,
        );
        let blocks = (0..4).map(|_| Bytes::from(vec![0u8; 512])).collect();
        let mut list = RawBlockList::new(blocks);

        // The chain 1 -> 0 stops at the property table start instead of failing.
        list.remove(0).unwrap();
        assert_eq!(table.fetch_blocks(1, 0, &mut list).unwrap().len(), 1);

        // An empty chain that points at an already taken block 0.
        assert_eq!(table.fetch_blocks(0, NOSTREAM, &mut list).unwrap().len(), 0);
    }

    #[test]
    fn test_planner_small_file() {
        let planner = LayoutPlanner::new(BigBlockSize::Small);
        assert_eq!(
            planner.plan(3),
            FatLayout {
                fat_sectors: 1,
                difat_sectors: 0
            }
        );
        // 127 data sectors + 1 FAT sector fill one FAT block exactly.
        assert_eq!(planner.plan(127).fat_sectors, 1);
        assert_eq!(planner.plan(128).fat_sectors, 2);
    }

    #[test]
    fn test_planner_needs_difat() {
        let planner = LayoutPlanner::new(BigBlockSize::Small);
        let layout = planner.plan(110 * 128);
        assert!(layout.fat_sectors > 109);
        assert_eq!(
            layout.difat_sectors,
            (layout.fat_sectors - 109).div_ceil(127)
        );
        let total = 110 * 128 + layout.fat_sectors + layout.difat_sectors;
        assert!(total <= layout.fat_sectors * 128);
    }

    #[test]
    fn test_difat_sector_chain() {
        let planner = LayoutPlanner::new(BigBlockSize::Small);
        let fat_ids: Vec<u32> = (0..250).collect();
        let sectors = planner.difat_sectors(&fat_ids, 300);
        assert_eq!(sectors.len(), 2);
        let first = read_u32_array_le(&sectors[0]).unwrap();
        assert_eq!(first[0], 109);
        assert_eq!(first[127], 301);
        let second = read_u32_array_le(&sectors[1]).unwrap();
        assert_eq!(second[13], 249);
        assert_eq!(second[14], FREESECT);
        assert_eq!(second[127], ENDOFCHAIN);
    }
}
