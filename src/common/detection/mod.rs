//! Format sniffing for byte sources handed to the filesystem.
//!
//! Only the leading signature is inspected. The point is to tell callers
//! *why* an input was rejected: an OOXML file should be retried with a
//! different parser, anything else is simply not a compound file.

// Submodule declarations
pub mod types;
pub mod utils;

// Re-exports
pub use types::FileMagic;
pub use utils::OLE2_SIGNATURE;

/// Check if data starts with the OLE2 signature.
///
/// # Examples
///
/// ```
/// use poifs::common::detection::{has_ole2_signature, OLE2_SIGNATURE};
///
/// assert!(has_ole2_signature(OLE2_SIGNATURE));
/// assert!(!has_ole2_signature(b"PK\x03\x04"));
/// ```
#[inline]
pub fn has_ole2_signature(data: &[u8]) -> bool {
    utils::signature_matches(data, OLE2_SIGNATURE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_known_signatures() {
        assert_eq!(FileMagic::detect(OLE2_SIGNATURE), FileMagic::Ole2);
        assert_eq!(FileMagic::detect(b"<?xml version=\"1.0\"?>"), FileMagic::Xml);
        assert_eq!(FileMagic::detect(&[0x09, 0x04, 0x06, 0x00, 0x00]), FileMagic::Biff4);
        assert_eq!(FileMagic::detect(b"{\\rtf1"), FileMagic::Rtf);
    }

    #[test]
    fn test_short_input_is_unknown() {
        assert_eq!(FileMagic::detect(&[0xD0, 0xCF]), FileMagic::Unknown);
        assert!(!has_ole2_signature(&[]));
    }
}
