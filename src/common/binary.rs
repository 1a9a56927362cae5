//! Binary data parsing utilities.
//!
//! Little-endian integer access and UTF-16LE string handling for the
//! on-disk structures of a compound file.

use thiserror::Error;
use zerocopy::{FromBytes, LE, U32};

/// Binary parsing error type
#[derive(Error, Debug, Clone)]
pub enum BinaryError {
    /// Not enough data to read the requested type
    #[error("Insufficient data: expected {expected}, got {available}")]
    InsufficientData { expected: usize, available: usize },
    /// Failed to parse the data
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type for binary operations
pub type BinaryResult<T> = Result<T, BinaryError>;

#[inline]
fn check_len(data: &[u8], offset: usize, width: usize) -> BinaryResult<()> {
    if offset + width > data.len() {
        return Err(BinaryError::InsufficientData {
            expected: offset + width,
            available: data.len(),
        });
    }
    Ok(())
}

/// Read a little-endian u32 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use poifs::common::binary::read_u32_le;
/// let data = [0xFE, 0xFF, 0xFF, 0xFF];
/// assert_eq!(read_u32_le(&data, 0).unwrap(), 0xFFFF_FFFE);
/// ```
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> BinaryResult<u32> {
    check_len(data, offset, 4)?;
    U32::<LE>::read_from_bytes(&data[offset..offset + 4])
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read u32".to_string()))
}

/// Read a packed array of little-endian u32 values.
///
/// Trailing bytes that do not form a whole value are ignored.
pub fn read_u32_array_le(data: &[u8]) -> BinaryResult<Vec<u32>> {
    let usable = data.len() - data.len() % 4;
    let words = <[U32<LE>]>::ref_from_bytes(&data[..usable])
        .map_err(|_| BinaryError::ParseError("Failed to read u32 array".to_string()))?;
    Ok(words.iter().map(|w| w.get()).collect())
}

/// Pack u32 values little-endian into blocks of `block_size` bytes.
///
/// The tail of the last block is filled with `0xFF` bytes, which reads back
/// as the free-sector marker in allocation tables.
pub fn write_u32_blocks_le(values: &[u32], block_size: usize) -> Vec<Vec<u8>> {
    let per_block = block_size / 4;
    values
        .chunks(per_block)
        .map(|chunk| {
            let mut block = vec![0xFFu8; block_size];
            for (i, value) in chunk.iter().enumerate() {
                block[i * 4..i * 4 + 4].copy_from_slice(&value.to_le_bytes());
            }
            block
        })
        .collect()
}

/// Decode UTF-16LE bytes into a `String`, dropping trailing NUL characters.
///
/// Unpaired surrogates are replaced rather than rejected; directory entry
/// names written by other tools are not always well-formed.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let (text, _) = encoding_rs::UTF_16LE.decode_without_bom_handling(bytes);
    text.trim_end_matches('\0').to_string()
}

/// Encode a string as UTF-16LE bytes without terminator.
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()
}

/// Number of UTF-16 code units in a string.
#[inline]
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_out_of_bounds() {
        let data = [0u8; 3];
        assert!(matches!(
            read_u32_le(&data, 0),
            Err(BinaryError::InsufficientData { expected: 4, available: 3 })
        ));
    }

    #[test]
    fn test_u32_array_ignores_tail() {
        let data = [1, 0, 0, 0, 0xFE, 0xFF, 0xFF, 0xFF, 9];
        assert_eq!(read_u32_array_le(&data).unwrap(), vec![1, 0xFFFF_FFFE]);
    }

    #[test]
    fn test_u32_blocks_padding() {
        let blocks = write_u32_blocks_le(&[7, 8, 9], 8);
        assert_eq!(blocks.len(), 2);
        assert_eq!(&blocks[0][..4], &7u32.to_le_bytes());
        assert_eq!(&blocks[1][..4], &9u32.to_le_bytes());
        assert_eq!(&blocks[1][4..], &[0xFF; 4]);
    }

    #[test]
    fn test_utf16_round_trip() {
        let encoded = encode_utf16le("Root Entry");
        assert_eq!(encoded.len(), 20);
        let mut padded = encoded.clone();
        padded.extend_from_slice(&[0, 0]);
        assert_eq!(decode_utf16le(&padded), "Root Entry");
        assert_eq!(utf16_len("\u{1F600}"), 2);
    }
}
