//! Path filters applied to raw directory listings
//!
//! A filter decides which entries a watch root tracks at all. Rejected
//! entries are invisible to the diff: they never produce events, and a
//! rejected directory is never descended into.

use crate::error::{Result, WatchError};
use crate::ordering::CaseSensitivity;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

/// Predicate over candidate entries
pub trait PathFilter: Send + Sync {
    /// Return true to track `path`
    fn accept(&self, path: &Path) -> bool;
}

impl<F> PathFilter for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn accept(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Shared, type-erased filter
pub type SharedFilter = Arc<dyn PathFilter>;

fn file_name(path: &Path) -> std::borrow::Cow<'_, str> {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default()
}

/// Accepts every path
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl PathFilter for AcceptAll {
    fn accept(&self, _path: &Path) -> bool {
        true
    }
}

/// Rejects every path
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAll;

impl PathFilter for RejectAll {
    fn accept(&self, _path: &Path) -> bool {
        false
    }
}

/// Accepts entries whose file name equals one of the given names
#[derive(Debug, Clone)]
pub struct NameFilter {
    names: Vec<String>,
    case: CaseSensitivity,
}

impl NameFilter {
    pub fn new<I, S>(names: I, case: CaseSensitivity) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            case,
        }
    }
}

impl PathFilter for NameFilter {
    fn accept(&self, path: &Path) -> bool {
        let name = file_name(path);
        self.names.iter().any(|n| self.case.equals(&name, n))
    }
}

/// Accepts entries whose file name starts with one of the given prefixes
#[derive(Debug, Clone)]
pub struct PrefixFilter {
    prefixes: Vec<String>,
    case: CaseSensitivity,
}

impl PrefixFilter {
    pub fn new<I, S>(prefixes: I, case: CaseSensitivity) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            case,
        }
    }
}

impl PathFilter for PrefixFilter {
    fn accept(&self, path: &Path) -> bool {
        let name = file_name(path);
        self.prefixes.iter().any(|p| self.case.starts_with(&name, p))
    }
}

/// Accepts entries whose file name ends with one of the given suffixes
#[derive(Debug, Clone)]
pub struct SuffixFilter {
    suffixes: Vec<String>,
    case: CaseSensitivity,
}

impl SuffixFilter {
    pub fn new<I, S>(suffixes: I, case: CaseSensitivity) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes.into_iter().map(Into::into).collect(),
            case,
        }
    }
}

impl PathFilter for SuffixFilter {
    fn accept(&self, path: &Path) -> bool {
        let name = file_name(path);
        self.suffixes.iter().any(|s| self.case.ends_with(&name, s))
    }
}

/// Metadata of the entry itself, never of a symlink target
///
/// Type checks here must agree with how the snapshot records entries.
fn entry_metadata(path: &Path) -> Option<fs::Metadata> {
    fs::symlink_metadata(path).ok()
}

/// Accepts directories only (a symlink to a directory is not one)
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryFilter;

impl PathFilter for DirectoryFilter {
    fn accept(&self, path: &Path) -> bool {
        entry_metadata(path).is_some_and(|meta| meta.is_dir())
    }
}

/// Accepts every existing entry that is not a directory, symlinks included
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFilter;

impl PathFilter for FileFilter {
    fn accept(&self, path: &Path) -> bool {
        entry_metadata(path).is_some_and(|meta| !meta.is_dir())
    }
}

/// Accepts files by size
///
/// With `accept_larger` set, files of at least `threshold` bytes pass;
/// otherwise files strictly smaller than `threshold`. Directories never pass.
#[derive(Debug, Clone, Copy)]
pub struct SizeFilter {
    threshold: u64,
    accept_larger: bool,
}

impl SizeFilter {
    pub fn new(threshold: u64, accept_larger: bool) -> Self {
        Self {
            threshold,
            accept_larger,
        }
    }

    /// Files of at least `threshold` bytes
    pub fn at_least(threshold: u64) -> Self {
        Self::new(threshold, true)
    }
}

impl PathFilter for SizeFilter {
    fn accept(&self, path: &Path) -> bool {
        match entry_metadata(path) {
            Some(meta) if !meta.is_dir() => (meta.len() >= self.threshold) == self.accept_larger,
            _ => false,
        }
    }
}

/// Files between `min` and `max` bytes, both inclusive
pub fn size_range(min: u64, max: u64) -> AndFilter {
    AndFilter::new(vec![
        Arc::new(SizeFilter::new(min, true)) as SharedFilter,
        Arc::new(SizeFilter::new(max.saturating_add(1), false)),
    ])
}

/// Accepts entries by modification time
///
/// With `accept_older` set, entries modified at or before `cutoff` pass;
/// otherwise entries modified after it. Entries without a readable
/// modification time never pass.
#[derive(Debug, Clone, Copy)]
pub struct AgeFilter {
    cutoff: SystemTime,
    accept_older: bool,
}

impl AgeFilter {
    pub fn new(cutoff: SystemTime, accept_older: bool) -> Self {
        Self {
            cutoff,
            accept_older,
        }
    }
}

impl PathFilter for AgeFilter {
    fn accept(&self, path: &Path) -> bool {
        match fs::symlink_metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => (modified <= self.cutoff) == self.accept_older,
            Err(_) => false,
        }
    }
}

/// Accepts regular files whose bytes at `offset` equal a magic number
#[derive(Debug, Clone)]
pub struct MagicNumberFilter {
    magic: Vec<u8>,
    offset: u64,
}

impl MagicNumberFilter {
    /// Fails if `magic` is empty
    pub fn new(magic: impl Into<Vec<u8>>, offset: u64) -> Result<Self> {
        let magic = magic.into();
        if magic.is_empty() {
            return Err(WatchError::InvalidFilter(
                "magic number must contain at least one byte".to_string(),
            ));
        }
        Ok(Self { magic, offset })
    }

    fn matches(&self, path: &Path) -> std::io::Result<bool> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = vec![0u8; self.magic.len()];
        match file.read_exact(&mut buf) {
            Ok(()) => Ok(buf == self.magic),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl PathFilter for MagicNumberFilter {
    fn accept(&self, path: &Path) -> bool {
        entry_metadata(path).is_some_and(|meta| meta.is_file())
            && self.matches(path).unwrap_or(false)
    }
}

/// Accepts when every inner filter accepts (an empty list rejects)
#[derive(Clone)]
pub struct AndFilter {
    filters: Vec<SharedFilter>,
}

impl AndFilter {
    pub fn new(filters: Vec<SharedFilter>) -> Self {
        Self { filters }
    }

    pub fn push(&mut self, filter: SharedFilter) {
        self.filters.push(filter);
    }
}

impl PathFilter for AndFilter {
    fn accept(&self, path: &Path) -> bool {
        !self.filters.is_empty() && self.filters.iter().all(|f| f.accept(path))
    }
}

/// Accepts when any inner filter accepts (an empty list rejects)
#[derive(Clone)]
pub struct OrFilter {
    filters: Vec<SharedFilter>,
}

impl OrFilter {
    pub fn new(filters: Vec<SharedFilter>) -> Self {
        Self { filters }
    }

    pub fn push(&mut self, filter: SharedFilter) {
        self.filters.push(filter);
    }
}

impl PathFilter for OrFilter {
    fn accept(&self, path: &Path) -> bool {
        self.filters.iter().any(|f| f.accept(path))
    }
}

/// Inverts another filter
#[derive(Clone)]
pub struct NotFilter {
    inner: SharedFilter,
}

impl NotFilter {
    pub fn new(inner: SharedFilter) -> Self {
        Self { inner }
    }
}

impl PathFilter for NotFilter {
    fn accept(&self, path: &Path) -> bool {
        !self.inner.accept(path)
    }
}

pub fn and(filters: Vec<SharedFilter>) -> SharedFilter {
    Arc::new(AndFilter::new(filters))
}

pub fn or(filters: Vec<SharedFilter>) -> SharedFilter {
    Arc::new(OrFilter::new(filters))
}

pub fn not(filter: SharedFilter) -> SharedFilter {
    Arc::new(NotFilter::new(filter))
}

/// Restrict `filter` to regular files
pub fn files_only(filter: SharedFilter) -> SharedFilter {
    and(vec![Arc::new(FileFilter) as SharedFilter, filter])
}

/// Restrict `filter` to directories
pub fn directories_only(filter: SharedFilter) -> SharedFilter {
    and(vec![Arc::new(DirectoryFilter) as SharedFilter, filter])
}

/// Reject version-control metadata directories, then apply `filter` if given
pub fn vcs_aware(filter: Option<SharedFilter>) -> SharedFilter {
    let vcs_dirs = directories_only(Arc::new(NameFilter::new(
        ["CVS", ".svn", ".git", ".hg", ".jj"],
        CaseSensitivity::Sensitive,
    )));
    match filter {
        Some(filter) => and(vec![not(vcs_dirs), filter]),
        None => not(vcs_dirs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_closure_is_a_filter() {
        let filter = |path: &Path| path.extension().is_some_and(|e| e == "rs");
        assert!(filter.accept(Path::new("src/lib.rs")));
        assert!(!filter.accept(Path::new("README.md")));
    }

    #[test]
    fn test_name_prefix_suffix_filters() {
        let names = NameFilter::new(["Makefile"], CaseSensitivity::Insensitive);
        assert!(names.accept(Path::new("/p/makefile")));
        assert!(!NameFilter::new(["Makefile"], CaseSensitivity::Sensitive).accept(Path::new("/p/makefile")));

        let prefixes = PrefixFilter::new(["tmp_", "draft"], CaseSensitivity::Sensitive);
        assert!(prefixes.accept(Path::new("/p/tmp_1")));
        assert!(!prefixes.accept(Path::new("/p/Draft")));

        let suffixes = SuffixFilter::new([".log"], CaseSensitivity::Insensitive);
        assert!(suffixes.accept(Path::new("/p/DEBUG.LOG")));
        assert!(!suffixes.accept(Path::new("/p/debug.txt")));
    }

    #[test]
    fn test_file_and_directory_filters() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("f.txt");
        let dir = temp_dir.path().join("d");
        fs::write(&file, b"x").unwrap();
        fs::create_dir(&dir).unwrap();

        assert!(FileFilter.accept(&file));
        assert!(!FileFilter.accept(&dir));
        assert!(DirectoryFilter.accept(&dir));
        assert!(!DirectoryFilter.accept(&file));
        assert!(!FileFilter.accept(&temp_dir.path().join("missing")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_classified_as_entries() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("d");
        fs::create_dir(&dir).unwrap();
        let link = temp_dir.path().join("link");
        std::os::unix::fs::symlink(&dir, &link).unwrap();

        // A link to a directory is tracked as a plain entry
        assert!(!DirectoryFilter.accept(&link));
        assert!(FileFilter.accept(&link));
        assert!(!directories_only(Arc::new(AcceptAll)).accept(&link));
        assert!(!SizeFilter::at_least(0).accept(&dir));
        assert!(SizeFilter::at_least(0).accept(&link));
    }

    #[test]
    fn test_size_filters() {
        let temp_dir = TempDir::new().unwrap();
        let small = temp_dir.path().join("small");
        let large = temp_dir.path().join("large");
        fs::write(&small, vec![0u8; 10]).unwrap();
        fs::write(&large, vec![0u8; 100]).unwrap();

        assert!(SizeFilter::at_least(100).accept(&large));
        assert!(!SizeFilter::at_least(100).accept(&small));
        assert!(SizeFilter::new(100, false).accept(&small));
        assert!(!SizeFilter::at_least(0).accept(temp_dir.path()));

        let range = size_range(10, 50);
        assert!(range.accept(&small));
        assert!(!range.accept(&large));
    }

    #[test]
    fn test_age_filter() {
        let temp_dir = TempDir::new().unwrap();
        let old = temp_dir.path().join("old.txt");
        fs::write(&old, b"old").unwrap();
        let old_time = SystemTime::now() - Duration::from_secs(600);
        set_file_mtime(&old, FileTime::from_system_time(old_time)).unwrap();

        let cutoff = SystemTime::now() - Duration::from_secs(60);
        assert!(AgeFilter::new(cutoff, true).accept(&old));
        assert!(!AgeFilter::new(cutoff, false).accept(&old));
        assert!(!AgeFilter::new(cutoff, true).accept(&temp_dir.path().join("missing")));
    }

    #[test]
    fn test_magic_number_filter() {
        let temp_dir = TempDir::new().unwrap();
        let png = temp_dir.path().join("image.png");
        let text = temp_dir.path().join("notes.txt");
        let tiny = temp_dir.path().join("tiny");
        fs::write(&png, b"\x89PNG\r\n\x1a\nrest").unwrap();
        fs::write(&text, b"hello world").unwrap();
        fs::write(&tiny, b"\x89").unwrap();

        let filter = MagicNumberFilter::new(b"\x89PNG".to_vec(), 0).unwrap();
        assert!(filter.accept(&png));
        assert!(!filter.accept(&text));
        assert!(!filter.accept(&tiny));
        assert!(!filter.accept(temp_dir.path()));

        let offset = MagicNumberFilter::new("world", 6).unwrap();
        assert!(offset.accept(&text));
    }

    #[test]
    fn test_magic_number_rejects_empty_magic() {
        let result = MagicNumberFilter::new(Vec::new(), 0);
        assert!(matches!(result, Err(WatchError::InvalidFilter(_))));
    }

    #[test]
    fn test_combinators() {
        let txt: SharedFilter = Arc::new(SuffixFilter::new([".txt"], CaseSensitivity::Sensitive));
        let notes: SharedFilter = Arc::new(PrefixFilter::new(["notes"], CaseSensitivity::Sensitive));

        let both = and(vec![txt.clone(), notes.clone()]);
        assert!(both.accept(Path::new("notes.txt")));
        assert!(!both.accept(Path::new("todo.txt")));

        let either = or(vec![txt.clone(), notes.clone()]);
        assert!(either.accept(Path::new("todo.txt")));
        assert!(either.accept(Path::new("notes.md")));
        assert!(!either.accept(Path::new("todo.md")));

        assert!(not(txt).accept(Path::new("todo.md")));
        assert!(!and(Vec::new()).accept(Path::new("x")));
        assert!(!or(Vec::new()).accept(Path::new("x")));
        assert!(AcceptAll.accept(Path::new("x")));
        assert!(!RejectAll.accept(Path::new("x")));
    }

    #[test]
    fn test_vcs_aware() {
        let temp_dir = TempDir::new().unwrap();
        let git = temp_dir.path().join(".git");
        let src = temp_dir.path().join("src");
        fs::create_dir(&git).unwrap();
        fs::create_dir(&src).unwrap();
        // A plain file named like a VCS directory is kept
        let svn_file = temp_dir.path().join(".svn");
        fs::write(&svn_file, b"").unwrap();

        let filter = vcs_aware(None);
        assert!(!filter.accept(&git));
        assert!(filter.accept(&src));
        assert!(filter.accept(&svn_file));

        let src_only: SharedFilter = Arc::new(NameFilter::new(["src"], CaseSensitivity::Sensitive));
        let only_src = vcs_aware(Some(src_only));
        assert!(only_src.accept(&src));
        assert!(!only_src.accept(&git));
    }
}
