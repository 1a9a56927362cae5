//! Signature constants for format sniffing.

/// OLE2 compound file signature
pub const OLE2_SIGNATURE: &[u8; 8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
/// ZIP local file header, the container of every OOXML file
pub const ZIP_SIGNATURE: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
/// Raw XML documents (Office 2003 XML and friends)
pub const XML_SIGNATURE: &[u8] = b"<?xml";
/// Rich text format
pub const RTF_SIGNATURE: &[u8] = b"{\\rtf";
/// PDF document
pub const PDF_SIGNATURE: &[u8] = b"%PDF";
/// BIFF2 BOF record (Excel 2.x worksheet)
pub const BIFF2_SIGNATURE: &[u8] = &[0x09, 0x00, 0x04, 0x00];
/// BIFF3 BOF record (Excel 3.x worksheet)
pub const BIFF3_SIGNATURE: &[u8] = &[0x09, 0x02, 0x06, 0x00];
/// BIFF4 BOF record (Excel 4.x worksheet)
pub const BIFF4_SIGNATURE: &[u8] = &[0x09, 0x04, 0x06, 0x00];

/// Check if a byte slice starts with a given signature.
#[inline]
pub fn signature_matches(data: &[u8], signature: &[u8]) -> bool {
    data.len() >= signature.len() && &data[..signature.len()] == signature
}
