//! Handles and metadata for directory entries.

use super::property::{Property, PropertyType};
use chrono::{DateTime, Utc};
use smallvec::SmallVec;
use std::fmt;

/// Stable handle to a directory entry of an open filesystem.
///
/// Handles stay valid across other mutations; a handle to a deleted entry
/// makes every call fail with `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) u32);

impl EntryId {
    /// The root storage.
    pub const ROOT: EntryId = EntryId(0);

    /// Arena slot of this entry.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// The root storage
    Root,
    /// A storage (directory)
    Storage,
    /// A stream (document)
    Document,
}

impl EntryKind {
    /// True for the root and for storages.
    #[inline]
    pub fn is_directory(self) -> bool {
        !matches!(self, EntryKind::Document)
    }
}

impl From<PropertyType> for EntryKind {
    fn from(kind: PropertyType) -> Self {
        match kind {
            PropertyType::Root => EntryKind::Root,
            PropertyType::Storage => EntryKind::Storage,
            PropertyType::Stream => EntryKind::Document,
        }
    }
}

/// Snapshot of an entry's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Entry name
    pub name: String,
    /// Entry kind
    pub kind: EntryKind,
    /// Size in bytes (for the root, the mini stream size)
    pub size: u64,
    /// Class id
    pub clsid: [u8; 16],
    /// User state bits
    pub state_bits: u32,
    /// Creation time, if recorded
    pub created: Option<DateTime<Utc>>,
    /// Modification time, if recorded
    pub modified: Option<DateTime<Utc>>,
}

impl From<&Property> for EntryInfo {
    fn from(property: &Property) -> Self {
        Self {
            name: property.name.clone(),
            kind: property.kind.into(),
            size: property.size,
            clsid: property.clsid,
            state_bits: property.state_bits,
            created: property.created_time(),
            modified: property.modified_time(),
        }
    }
}

/// Path of an entry below the root, as name components.
///
/// Built from a `/`-separated string or from a slice of names. Empty
/// components are ignored, so `"/A//doc.bin"` and `["A", "doc.bin"]` agree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryPath<'p> {
    components: SmallVec<[&'p str; 8]>,
}

impl<'p> EntryPath<'p> {
    /// The components, outermost first.
    pub fn components(&self) -> &[&'p str] {
        &self.components
    }

    /// True for the root.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }
}

impl<'p> From<&'p str> for EntryPath<'p> {
    fn from(path: &'p str) -> Self {
        Self {
            components: path.split('/').filter(|c| !c.is_empty()).collect(),
        }
    }
}

impl<'p> From<&'p String> for EntryPath<'p> {
    fn from(path: &'p String) -> Self {
        Self::from(path.as_str())
    }
}

impl<'p> From<&'p [&'p str]> for EntryPath<'p> {
    fn from(components: &'p [&'p str]) -> Self {
        Self {
            components: components.iter().copied().filter(|c| !c.is_empty()).collect(),
        }
    }
}

impl<'p, const N: usize> From<&'p [&'p str; N]> for EntryPath<'p> {
    fn from(components: &'p [&'p str; N]) -> Self {
        Self::from(&components[..])
    }
}

impl fmt::Display for EntryPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.components.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_path_forms_agree() {
        let a = EntryPath::from("/A//doc.bin");
        let b = EntryPath::from(&["A", "doc.bin"]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "/A/doc.bin");
        assert!(EntryPath::from("/").is_root());
    }
}
