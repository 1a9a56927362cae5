//! Fresh image layout for `write_filesystem`.
//!
//! Nothing is patched in place: every structure is laid out again,
//! contiguously, in this order:
//!
//! 1. big documents, in directory order
//! 2. the mini stream
//! 3. the directory
//! 4. the mini-FAT
//! 5. DIFAT sectors, then FAT sectors
//!
//! The FAT is validated before any byte is produced.

use super::block_size::BigBlockSize;
use super::consts::*;
use super::entry::EntryId;
use super::fat::{BlockAllocationTable, LayoutPlanner, TableKind};
use super::header::HeaderBlock;
use super::property::{uses_small_blocks, PropertyTable};
use crate::common::error::Result;
use tracing::debug;

/// Lay out `table` and the documents returned by `read_document` as a
/// complete compound file image.
pub(crate) fn build_image<F>(
    table: &PropertyTable,
    block_size: BigBlockSize,
    mut read_document: F,
) -> Result<Vec<u8>>
where
    F: FnMut(EntryId) -> Result<Vec<u8>>,
{
    let mut table = table.clone();
    let bs = block_size.bytes();
    let mut bat = BlockAllocationTable::new(TableKind::Big);
    let mut sbat = BlockAllocationTable::new(TableKind::Mini);
    let mut mini_stream: Vec<u8> = Vec::new();
    let mut large: Vec<(EntryId, Vec<u8>)> = Vec::new();

    for id in table.pre_order() {
        if !table.get(id)?.is_document() {
            continue;
        }
        let data = read_document(id)?;
        let size = data.len() as u64;
        let start = if data.is_empty() {
            ENDOFCHAIN
        } else if uses_small_blocks(size) {
            let start = sbat.append_chain(data.len().div_ceil(MINI_SECTOR_SIZE));
            mini_stream.extend_from_slice(&data);
            mini_stream.resize(mini_stream.len().next_multiple_of(MINI_SECTOR_SIZE), 0);
            start
        } else {
            large.push((id, data));
            continue;
        };
        let property = table.get_mut(id)?;
        property.start_block = start;
        property.size = size;
    }

    let mut placed: Vec<(u32, Vec<u8>)> = Vec::with_capacity(large.len() + 4);
    for (id, data) in large {
        let start = bat.append_chain(data.len().div_ceil(bs));
        let property = table.get_mut(id)?;
        property.start_block = start;
        property.size = data.len() as u64;
        placed.push((start, data));
    }

    let mini_start = bat.append_chain(mini_stream.len().div_ceil(bs));
    {
        let root = table.get_mut(EntryId::ROOT)?;
        root.start_block = mini_start;
        root.size = mini_stream.len() as u64;
    }
    placed.push((mini_start, mini_stream));

    let dir_blocks = table.len().div_ceil(block_size.properties_per_block());
    let dir_start = bat.append_chain(dir_blocks);
    placed.push((dir_start, table.to_bytes(block_size)));

    let sbat_sectors = if sbat.is_empty() {
        Vec::new()
    } else {
        sbat.to_sectors(block_size)
    };
    let sbat_start = bat.append_chain(sbat_sectors.len());
    placed.push((sbat_start, sbat_sectors.concat()));

    let planner = LayoutPlanner::new(block_size);
    let layout = planner.plan(bat.len() as u32);
    let difat_start = bat.append_special(layout.difat_sectors, DIFSECT);
    let fat_start = bat.append_special(layout.fat_sectors, FATSECT);
    bat.validate()?;

    let fat_ids: Vec<u32> = (fat_start..fat_start + layout.fat_sectors).collect();
    placed.push((difat_start, planner.difat_sectors(&fat_ids, difat_start).concat()));
    placed.push((fat_start, bat.to_sectors(block_size).concat()));

    let mut header = HeaderBlock::new(block_size);
    header.num_dir_sectors = match block_size {
        BigBlockSize::Small => 0,
        BigBlockSize::Large => dir_blocks as u32,
    };
    header.bat_count = layout.fat_sectors;
    header.property_start = dir_start;
    header.sbat_start = sbat_start;
    header.sbat_count = sbat.sectors_needed(block_size) as u32;
    header.xbat_start = if layout.difat_sectors > 0 {
        difat_start
    } else {
        ENDOFCHAIN
    };
    header.xbat_count = layout.difat_sectors;
    header.set_bat_array(&fat_ids);

    let mut image = vec![0u8; (bat.len() + 1) * bs];
    image[..bs].copy_from_slice(&header.to_block());
    for (start, data) in placed {
        if start == ENDOFCHAIN || data.is_empty() {
            continue;
        }
        let offset = block_size.offset_of(start) as usize;
        image[offset..offset + data.len()].copy_from_slice(&data);
    }

    debug!(
        blocks = bat.len(),
        fat_sectors = layout.fat_sectors,
        difat_sectors = layout.difat_sectors,
        bytes = image.len(),
        "laid out image"
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poifs::property::Property;

    #[test]
    fn test_empty_image() {
        let table = PropertyTable::new();
        let image = build_image(&table, BigBlockSize::Small, |_| Ok(Vec::new())).unwrap();
        // header, directory, FAT
        assert_eq!(image.len(), 3 * 512);

        let header = HeaderBlock::parse(&image).unwrap();
        assert_eq!(header.property_start, 0);
        assert_eq!(header.bat_count, 1);
        assert_eq!(header.bat_array(), &[1]);
        assert_eq!(header.sbat_start, ENDOFCHAIN);
        let fat = &image[1024..1036];
        assert_eq!(fat, &[0xFE, 0xFF, 0xFF, 0xFF, 0xFD, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_large_before_mini_stream() {
        let mut table = PropertyTable::new();
        let small = table
            .add(EntryId::ROOT, Property::new_stream("small", 0).unwrap())
            .unwrap();
        let big = table
            .add(EntryId::ROOT, Property::new_stream("WordDocument", 0).unwrap())
            .unwrap();
        let image = build_image(&table, BigBlockSize::Small, |id| {
            Ok(if id == small { vec![1; 100] } else if id == big { vec![2; 5000] } else { Vec::new() })
        })
        .unwrap();

        // WordDocument occupies blocks 0..10, the mini stream starts at 10.
        assert_eq!(image[512], 2);
        assert_eq!(image[512 * 11], 1);
        let header = HeaderBlock::parse(&image).unwrap();
        assert_eq!(header.property_start, 11);
        assert_eq!(header.sbat_start, 12);
        assert_eq!(header.sbat_count, 1);
    }
}
