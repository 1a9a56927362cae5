//! Extract the contents of a filesystem to a directory tree.

use super::entry::{EntryId, EntryKind};
use super::filesystem::PoifsFileSystem;
use crate::common::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extra raw structures to write next to the extracted tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpOptions {
    /// Write the raw directory stream to `_properties.bin`
    pub dump_props: bool,
    /// Write the raw mini stream to `_mini_stream.bin`
    pub dump_mini: bool,
}

/// `<file>_dump`, next to `input`.
pub fn default_dump_dir(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}_dump", name))
}

/// Make an entry name usable as a single path component.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".repeat(cleaned.len().max(1)),
        _ => cleaned,
    }
}

/// Write every document of `filesystem` below `out_dir/<root name>/`.
///
/// Storages become directories. Returns the number of documents written.
pub fn dump_filesystem(
    filesystem: &PoifsFileSystem,
    out_dir: &Path,
    options: DumpOptions,
) -> Result<usize> {
    let root = filesystem.root()?;
    let root_name = sanitize_name(&filesystem.entry_info(root)?.name);
    let mut written = 0;

    let mut stack: Vec<(EntryId, PathBuf)> = vec![(root, out_dir.join(root_name))];
    while let Some((dir, path)) = stack.pop() {
        fs::create_dir_all(&path)?;
        for child in filesystem.children(dir)? {
            let info = filesystem.entry_info(child)?;
            let target = path.join(sanitize_name(&info.name));
            match info.kind {
                EntryKind::Document => {
                    fs::write(&target, filesystem.read_document(child)?)?;
                    debug!(path = %target.display(), bytes = info.size, "dumped document");
                    written += 1;
                },
                EntryKind::Storage | EntryKind::Root => stack.push((child, target)),
            }
        }
    }

    if options.dump_props {
        fs::write(out_dir.join("_properties.bin"), filesystem.property_table_bytes()?)?;
    }
    if options.dump_mini {
        fs::write(out_dir.join("_mini_stream.bin"), filesystem.mini_stream_bytes()?)?;
    }

    info!(documents = written, out = %out_dir.display(), "dump finished");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("\u{5}SummaryInformation"), "_SummaryInformation");
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_name(".."), "__");
        assert_eq!(sanitize_name("Root Entry"), "Root Entry");
    }

    #[test]
    fn test_default_dump_dir() {
        assert_eq!(
            default_dump_dir(Path::new("/tmp/book.xls")),
            PathBuf::from("/tmp/book.xls_dump")
        );
    }

    #[test]
    fn test_dump_writes_tree_and_raw_structures() {
        let mut filesystem = PoifsFileSystem::new();
        let root = filesystem.root().unwrap();
        let dir = filesystem.create_directory(root, "Sub").unwrap();
        filesystem.create_document(dir, "x", b"abc").unwrap();
        filesystem.create_document(root, "\u{1}Ole", &[7u8; 20]).unwrap();

        let out = tempfile::tempdir().unwrap();
        let options = DumpOptions {
            dump_props: true,
            dump_mini: true,
        };
        assert_eq!(dump_filesystem(&filesystem, out.path(), options).unwrap(), 2);
        let base = out.path().join("Root Entry");
        assert_eq!(fs::read(base.join("Sub").join("x")).unwrap(), b"abc");
        assert_eq!(fs::read(base.join("_Ole")).unwrap(), vec![7u8; 20]);
        assert_eq!(fs::read(out.path().join("_properties.bin")).unwrap().len(), 512);
        let mini = fs::read(out.path().join("_mini_stream.bin")).unwrap();
        assert_eq!(mini.len(), 512);
        assert_eq!(&mini[..3], b"abc");
    }
}
