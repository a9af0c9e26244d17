use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Bytes used by the files below `path`, skipping the trees in `skip`.
///
/// Hard links are counted once per link; unreadable entries are ignored.
pub fn directory_size(path: &Path, skip: &[PathBuf]) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !skip.iter().any(|tree| entry.path() == tree.as_path()))
        .filter_map(Result::ok)
        .filter_map(|entry| entry.metadata().ok())
        .filter(|metadata| !metadata.is_dir())
        .map(|metadata| metadata.len())
        .sum()
}

/// Number of entries in the tree below `path`, `path` included.
pub fn file_count(path: &Path) -> u64 {
    WalkDir::new(path).follow_links(false).into_iter().filter_map(Result::ok).count() as u64
}

/// Rounds bytes up to whole mebibytes.
pub fn mebibytes(bytes: u64) -> u64 { (bytes + 1024 * 1024 - 1) / (1024 * 1024) }
