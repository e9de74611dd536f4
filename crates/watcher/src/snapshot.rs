//! Snapshot tree recorded by a watch root
//!
//! Each node holds the attributes observed for one path during the last scan
//! and the sorted list of its children. Nodes are refreshed in place when a
//! path is matched across scans and rebuilt when a path is created.

use std::ffi::{OsStr, OsString};
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Recorded state of one filesystem path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotNode {
    /// Full path of the entry
    path: PathBuf,
    /// Final path component
    name: OsString,
    exists: bool,
    is_dir: bool,
    /// Nanoseconds since the UNIX epoch (0 if the path is missing)
    last_modified: i64,
    /// Length in bytes (0 for directories and missing paths)
    size: u64,
    /// Children, sorted by the owning watch root's ordering
    children: Vec<SnapshotNode>,
    /// Nesting depth below the watch root (root = 0)
    depth: usize,
}

impl SnapshotNode {
    /// Create an unrefreshed root node
    pub fn root(path: impl Into<PathBuf>) -> Self {
        Self::with_depth(path.into(), 0)
    }

    /// Create an unrefreshed child of this node
    pub fn new_child(&self, path: impl Into<PathBuf>) -> Self {
        Self::with_depth(path.into(), self.depth + 1)
    }

    fn with_depth(path: PathBuf, depth: usize) -> Self {
        let name = path
            .file_name()
            .map(OsStr::to_os_string)
            .unwrap_or_else(|| path.as_os_str().to_os_string());

        Self {
            path,
            name,
            exists: false,
            is_dir: false,
            last_modified: 0,
            size: 0,
            children: Vec::new(),
            depth,
        }
    }

    /// Re-read this node's attributes from `path`
    ///
    /// The path may differ from the stored one (e.g. a case-only rename matched
    /// under a case-insensitive ordering); it replaces the stored path.
    /// Symlinks are not followed except at the root.
    ///
    /// Returns true if `exists`, `is_dir`, `last_modified` or `size` changed.
    pub fn refresh(&mut self, path: &Path) -> bool {
        let metadata = if self.depth == 0 {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        };
        self.refresh_from(path, metadata.ok().as_ref())
    }

    /// Replace this node's attributes with the given metadata
    fn refresh_from(&mut self, path: &Path, metadata: Option<&Metadata>) -> bool {
        let before = (self.exists, self.is_dir, self.last_modified, self.size);

        if path != self.path {
            self.path = path.to_path_buf();
            self.name = path
                .file_name()
                .map(OsStr::to_os_string)
                .unwrap_or_else(|| path.as_os_str().to_os_string());
        }

        match metadata {
            Some(meta) => {
                self.exists = true;
                self.is_dir = meta.is_dir();
                self.last_modified = meta.modified().map(timestamp_nanos).unwrap_or(0);
                self.size = if self.is_dir { 0 } else { meta.len() };
            }
            None => {
                self.exists = false;
                self.is_dir = false;
                self.last_modified = 0;
                self.size = 0;
            }
        }

        before != (self.exists, self.is_dir, self.last_modified, self.size)
    }

    /// Full path of the entry
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Modification time in nanoseconds since the UNIX epoch
    pub fn last_modified(&self) -> i64 {
        self.last_modified
    }

    /// Length in bytes (always 0 for directories)
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Nesting level below the watch root
    pub fn level(&self) -> usize {
        self.depth
    }

    /// Sorted children
    pub fn children(&self) -> &[SnapshotNode] {
        &self.children
    }

    /// Replace the children wholesale
    ///
    /// Callers must pass a list already sorted by the watch root's ordering.
    pub fn set_children(&mut self, children: Vec<SnapshotNode>) {
        self.children = children;
    }

    /// Detach and return the children, leaving the node childless
    pub fn take_children(&mut self) -> Vec<SnapshotNode> {
        std::mem::take(&mut self.children)
    }

    /// Number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SnapshotNode::node_count).sum::<usize>()
    }

    /// Find the node recorded for `path` within this subtree
    pub fn find(&self, path: &Path) -> Option<&SnapshotNode> {
        if self.path == path {
            return Some(self);
        }
        let rest = path.strip_prefix(&self.path).ok()?;
        let mut current = self;
        for component in rest.components() {
            current = current
                .children
                .iter()
                .find(|child| child.name == component.as_os_str())?;
        }
        Some(current)
    }

    /// Visit this node and its descendants top-down in sorted order
    pub fn walk<F: FnMut(&SnapshotNode)>(&self, visit: &mut F) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Convert a modification time to signed nanoseconds since the UNIX epoch
fn timestamp_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_nanos()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_nanos())
            .map(|n| -n)
            .unwrap_or(i64::MIN),
    }
}
