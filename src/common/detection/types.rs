//! Leading-signature classification.

use super::utils::*;

/// What the first bytes of an input look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMagic {
    /// OLE2 compound file
    Ole2,
    /// ZIP container (OOXML)
    Ooxml,
    /// Raw XML document
    Xml,
    /// Rich text format
    Rtf,
    /// PDF document
    Pdf,
    /// Excel 2.x BIFF stream without an OLE2 container
    Biff2,
    /// Excel 3.x BIFF stream without an OLE2 container
    Biff3,
    /// Excel 4.x BIFF stream without an OLE2 container
    Biff4,
    /// Nothing we recognise
    Unknown,
}

impl FileMagic {
    /// Classify data by its leading bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use poifs::common::detection::FileMagic;
    ///
    /// assert_eq!(FileMagic::detect(b"PK\x03\x04rest"), FileMagic::Ooxml);
    /// assert_eq!(FileMagic::detect(b"hello"), FileMagic::Unknown);
    /// ```
    pub fn detect(data: &[u8]) -> Self {
        const TABLE: &[(&[u8], FileMagic)] = &[
            (OLE2_SIGNATURE as &[u8], FileMagic::Ole2),
            (ZIP_SIGNATURE, FileMagic::Ooxml),
            (XML_SIGNATURE, FileMagic::Xml),
            (RTF_SIGNATURE, FileMagic::Rtf),
            (PDF_SIGNATURE, FileMagic::Pdf),
            (BIFF2_SIGNATURE, FileMagic::Biff2),
            (BIFF3_SIGNATURE, FileMagic::Biff3),
            (BIFF4_SIGNATURE, FileMagic::Biff4),
        ];

        TABLE
            .iter()
            .find(|(signature, _)| signature_matches(data, signature))
            .map(|&(_, magic)| magic)
            .unwrap_or(FileMagic::Unknown)
    }

    /// Human readable description used in error messages.
    pub fn describe(self) -> &'static str {
        match self {
            FileMagic::Ole2 => "an OLE2 compound file",
            FileMagic::Ooxml => "a ZIP based Office 2007+ XML file",
            FileMagic::Xml => {
                "a raw XML file; formats such as Office 2003 XML are not compound files"
            },
            FileMagic::Rtf => "a rich text (RTF) file",
            FileMagic::Pdf => "a PDF document",
            FileMagic::Biff2 => "an Excel 2.x BIFF file, which predates OLE2 containers",
            FileMagic::Biff3 => "an Excel 3.x BIFF file, which predates OLE2 containers",
            FileMagic::Biff4 => "an Excel 4.x BIFF file, which predates OLE2 containers",
            FileMagic::Unknown => "data of an unknown format",
        }
    }
}
