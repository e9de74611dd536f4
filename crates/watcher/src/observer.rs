//! Watch root: snapshot ownership, merge-diff and listener notification
//!
//! A [`WatchRoot`] keeps the snapshot tree of one directory. Each call to
//! [`WatchRoot::scan`] lists the directory again and walks the previous and
//! current listings side by side. Both listings are sorted by the same
//! [`NameOrdering`], so a single forward pass classifies every entry:
//!
//! - current entry sorts first: created (own event, then descendants top-down)
//! - entries compare equal: matched (change event if attributes differ, then
//!   recurse into children)
//! - previous entry sorts first: deleted (descendants bottom-up, then own event)

use crate::error::{Result, WatchError};
use crate::filter::{PathFilter, SharedFilter};
use crate::listener::{EntryType, EventKind, ListenerSet, ScanListener, WatchEvent};
use crate::ordering::{CaseSensitivity, NameOrdering};
use crate::snapshot::SnapshotNode;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Builder for [`WatchRoot`]
pub struct WatchRootBuilder {
    root: PathBuf,
    filter: Option<SharedFilter>,
    case: CaseSensitivity,
}

impl WatchRootBuilder {
    /// Only track entries accepted by `filter`
    pub fn filter(mut self, filter: impl PathFilter + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Only track entries accepted by an already shared filter
    pub fn shared_filter(mut self, filter: SharedFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Case policy for sorting and matching entry names (default: system)
    pub fn case_sensitivity(mut self, case: CaseSensitivity) -> Self {
        self.case = case;
        self
    }

    /// Build the watch root
    ///
    /// Fails if the root path is empty. The path does not need to exist yet.
    pub fn build(self) -> Result<WatchRoot> {
        if self.root.as_os_str().is_empty() {
            return Err(WatchError::MissingRoot);
        }

        Ok(WatchRoot {
            tree: Mutex::new(SnapshotNode::root(&self.root)),
            root: self.root,
            filter: self.filter,
            ordering: NameOrdering::new(self.case),
            listeners: ListenerSet::new(),
            scanning: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        })
    }
}

/// Event counts for one scan, used for logging
#[derive(Debug, Default, Clone, Copy)]
struct ScanStats {
    created: usize,
    changed: usize,
    deleted: usize,
}

/// Clears the in-progress flag when a scan ends, even by panic
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, AtomicOrdering::Release);
    }
}

/// Owner of one watched directory tree
///
/// Holds the snapshot recorded by the last scan, the optional path filter,
/// the name ordering and the registered listeners.
///
/// A scan diffs a private copy of the tree and only stores it once every
/// event has been dispatched, so listeners may call back into the root.
pub struct WatchRoot {
    root: PathBuf,
    filter: Option<SharedFilter>,
    ordering: NameOrdering,
    listeners: ListenerSet,
    tree: Mutex<SnapshotNode>,
    scanning: AtomicBool,
    /// Bumped under the tree lock by `initialize` and `destroy`
    generation: AtomicU64,
}

impl WatchRoot {
    /// Start building a watch root for `path`
    pub fn builder(path: impl Into<PathBuf>) -> WatchRootBuilder {
        WatchRootBuilder {
            root: path.into(),
            filter: None,
            case: CaseSensitivity::default(),
        }
    }

    /// Watch root with no filter and the platform case policy
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(path).build()
    }

    /// The watched directory
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// The active path filter, if any
    pub fn filter(&self) -> Option<&SharedFilter> {
        self.filter.as_ref()
    }

    /// The ordering used to sort and match entries
    pub fn ordering(&self) -> NameOrdering {
        self.ordering
    }

    /// Register a listener (registering twice delivers every event twice)
    pub fn add_listener(&self, listener: Arc<dyn ScanListener>) {
        self.listeners.add(listener);
    }

    /// Remove all registrations of a listener; unknown listeners are ignored
    pub fn remove_listener(&self, listener: &Arc<dyn ScanListener>) {
        self.listeners.remove(listener);
    }

    /// Listeners currently registered, in registration order
    pub fn listeners(&self) -> Vec<Arc<dyn ScanListener>> {
        self.listeners.snapshot().to_vec()
    }

    /// Clone of the snapshot tree recorded by the last completed scan
    ///
    /// While a scan is running this is still the previous tree.
    pub fn snapshot(&self) -> SnapshotNode {
        self.tree.lock().clone()
    }

    /// Record the baseline tree without notifying anyone
    ///
    /// A missing root is not an error (it is recorded as non-existent), but a
    /// root that cannot be inspected at all is.
    pub fn initialize(&self) -> Result<()> {
        match fs::metadata(&self.root) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(WatchError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        }

        let mut root = SnapshotNode::root(&self.root);
        root.refresh(&self.root);
        let children = self.capture_children(&root);
        root.set_children(children);

        info!(
            "Initialized watch root {} ({} entries)",
            self.root.display(),
            root.node_count() - 1
        );
        self.store_reset(root);
        Ok(())
    }

    /// Compare the filesystem against the last snapshot and notify listeners
    ///
    /// Filesystem errors are never reported: vanished paths become deletions
    /// and unreadable directories are treated as empty. A call that overlaps
    /// a scan already running on this root is skipped.
    ///
    /// The updated tree is discarded if a listener panics, or if `initialize`
    /// or `destroy` ran while the scan was in progress.
    pub fn scan(&self) {
        if self
            .scanning
            .compare_exchange(false, true, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .is_err()
        {
            warn!(
                "Scan of {} already in progress, skipping overlapping scan",
                self.root.display()
            );
            return;
        }
        let _guard = ScanGuard(&self.scanning);

        self.listeners.for_each(|listener| listener.on_scan_start(self));

        let (mut tree, generation) = {
            let stored = self.tree.lock();
            (stored.clone(), self.generation.load(AtomicOrdering::Acquire))
        };
        let stats = self.scan_root(&mut tree);

        {
            let mut stored = self.tree.lock();
            if self.generation.load(AtomicOrdering::Acquire) == generation {
                *stored = tree;
            } else {
                debug!(
                    "Watch root {} was reset during the scan, dropping scan result",
                    self.root.display()
                );
            }
        }
        debug!(
            "Scanned {}: {} created, {} changed, {} deleted",
            self.root.display(),
            stats.created,
            stats.changed,
            stats.deleted
        );

        self.listeners.for_each(|listener| listener.on_scan_end(self));
    }

    /// Drop the recorded snapshot
    ///
    /// Safe to call repeatedly. Call `initialize` again before reusing the
    /// root, otherwise the next scan reports every entry as created.
    pub fn destroy(&self) {
        let live = {
            let tree = self.tree.lock();
            tree.exists() || !tree.children().is_empty()
        };
        if live {
            info!("Destroying watch root {}", self.root.display());
        }
        self.store_reset(SnapshotNode::root(&self.root));
    }

    /// Replace the stored tree outside of a scan
    fn store_reset(&self, root: SnapshotNode) {
        let mut tree = self.tree.lock();
        self.generation.fetch_add(1, AtomicOrdering::AcqRel);
        *tree = root;
    }

    fn scan_root(&self, root: &mut SnapshotNode) -> ScanStats {
        let mut stats = ScanStats::default();
        let existed = root.exists();
        root.refresh(&self.root);

        if root.exists() {
            let listing = self.list_entries(root);
            self.diff_children(root, listing, &mut stats);
        } else if existed {
            self.diff_children(root, Vec::new(), &mut stats);
        }
        // Otherwise it didn't exist and still doesn't

        stats
    }

    /// Merge the previous children of `parent` against the current listing
    fn diff_children(&self, parent: &mut SnapshotNode, current: Vec<PathBuf>, stats: &mut ScanStats) {
        let previous = parent.take_children();
        let mut next = Vec::with_capacity(current.len());
        let mut current = current.into_iter().peekable();

        for mut entry in previous {
            while let Some(path) = current
                .next_if(|path| self.ordering.compare(entry.path(), path) == Ordering::Greater)
            {
                let created = self.create_node(parent, &path);
                self.notify_created(&created, stats);
                next.push(created);
            }

            match current
                .next_if(|path| self.ordering.compare(entry.path(), path) == Ordering::Equal)
            {
                Some(path) => {
                    if entry.refresh(&path) {
                        stats.changed += 1;
                        self.notify(&entry, EventKind::Change);
                    }
                    let listing = self.list_entries(&entry);
                    self.diff_children(&mut entry, listing, stats);
                    next.push(entry);
                }
                None => {
                    self.diff_children(&mut entry, Vec::new(), stats);
                    stats.deleted += 1;
                    self.notify(&entry, EventKind::Delete);
                }
            }
        }

        for path in current {
            let created = self.create_node(parent, &path);
            self.notify_created(&created, stats);
            next.push(created);
        }

        parent.set_children(next);
    }

    /// Snapshot a newly seen path together with its whole subtree
    fn create_node(&self, parent: &SnapshotNode, path: &Path) -> SnapshotNode {
        let mut node = parent.new_child(path);
        node.refresh(path);
        let children = self.capture_children(&node);
        node.set_children(children);
        node
    }

    fn capture_children(&self, node: &SnapshotNode) -> Vec<SnapshotNode> {
        self.list_entries(node)
            .iter()
            .map(|path| self.create_node(node, path))
            .collect()
    }

    /// List, filter and sort the entries of a directory node
    ///
    /// Non-directories and unreadable directories yield an empty listing.
    fn list_entries(&self, node: &SnapshotNode) -> Vec<PathBuf> {
        if !node.is_dir() {
            return Vec::new();
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(node.path())
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
        {
            match entry {
                Ok(entry) => {
                    let path = entry.into_path();
                    if self.accepts(&path) {
                        entries.push(path);
                    }
                }
                Err(e) => {
                    debug!("Treating unreadable entry under {} as absent: {}", node.path().display(), e);
                }
            }
        }

        self.ordering.sort(&mut entries);
        entries
    }

    fn accepts(&self, path: &Path) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter.accept(path))
    }

    /// Fire create events for a node, then for its descendants top-down
    fn notify_created(&self, node: &SnapshotNode, stats: &mut ScanStats) {
        stats.created += 1;
        self.notify(node, EventKind::Create);
        for child in node.children() {
            self.notify_created(child, stats);
        }
    }

    fn notify(&self, node: &SnapshotNode, kind: EventKind) {
        let entry = if node.is_dir() {
            EntryType::Directory
        } else {
            EntryType::File
        };
        self.listeners.dispatch(&WatchEvent::new(node.path(), kind, entry));
    }
}

impl std::fmt::Display for WatchRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WatchRoot[path='{}'", self.root.display())?;
        if self.filter.is_some() {
            write!(f, ", filtered")?;
        }
        write!(f, ", listeners={}]", self.listeners.len())
    }
}

impl std::fmt::Debug for WatchRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRoot")
            .field("root", &self.root)
            .field("filtered", &self.filter.is_some())
            .field("ordering", &self.ordering)
            .field("listeners", &self.listeners)
            .finish()
    }
}
