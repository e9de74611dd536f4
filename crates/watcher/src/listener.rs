//! Listener capability and dispatch
//!
//! Listeners receive one callback per detected change, bracketed by
//! `on_scan_start` / `on_scan_end` for every scan. The listener set is
//! copy-on-write: each dispatch iterates a snapshot, so a callback may add or
//! remove listeners without disturbing the event being delivered.

use crate::observer::WatchRoot;
use crossbeam_channel::Sender;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Callbacks invoked by a [`WatchRoot`] while scanning
///
/// Every method has an empty default body, so implementors only override the
/// events they care about.
pub trait ScanListener: Send + Sync {
    /// A scan is starting
    fn on_scan_start(&self, _root: &WatchRoot) {}

    /// A directory appeared
    fn on_directory_create(&self, _path: &Path) {}

    /// A directory's own attributes changed
    fn on_directory_change(&self, _path: &Path) {}

    /// A directory disappeared (after all of its descendants)
    fn on_directory_delete(&self, _path: &Path) {}

    /// A file appeared
    fn on_file_create(&self, _path: &Path) {}

    /// A file's size, modification time or type changed
    fn on_file_change(&self, _path: &Path) {}

    /// A file disappeared
    fn on_file_delete(&self, _path: &Path) {}

    /// A scan has finished
    fn on_scan_end(&self, _root: &WatchRoot) {}
}

/// Kind of change detected for a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Path created
    Create,
    /// Path attributes changed
    Change,
    /// Path deleted
    Delete,
}

/// Whether the affected entry is a file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    File,
    Directory,
}

/// A single detected change
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: EventKind,
    /// Type of entry
    pub entry: EntryType,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind, entry: EntryType) -> Self {
        Self {
            path: path.into(),
            kind,
            entry,
        }
    }

    /// Route this event to the matching listener callback
    pub fn deliver(&self, listener: &dyn ScanListener) {
        let path = self.path.as_path();
        match (self.kind, self.entry) {
            (EventKind::Create, EntryType::Directory) => listener.on_directory_create(path),
            (EventKind::Change, EntryType::Directory) => listener.on_directory_change(path),
            (EventKind::Delete, EntryType::Directory) => listener.on_directory_delete(path),
            (EventKind::Create, EntryType::File) => listener.on_file_create(path),
            (EventKind::Change, EntryType::File) => listener.on_file_change(path),
            (EventKind::Delete, EntryType::File) => listener.on_file_delete(path),
        }
    }
}

impl std::fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            EventKind::Create => "create",
            EventKind::Change => "change",
            EventKind::Delete => "delete",
        };
        let entry = match self.entry {
            EntryType::File => "file",
            EntryType::Directory => "dir",
        };
        write!(f, "{} {} {}", kind, entry, self.path.display())
    }
}

/// Copy-on-write list of registered listeners
///
/// Registration order is preserved. Writers replace the whole list, readers
/// clone the `Arc` of the current list, so iteration never observes a
/// half-applied update.
#[derive(Default)]
pub struct ListenerSet {
    inner: RwLock<Arc<Vec<Arc<dyn ScanListener>>>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener (the same listener may be registered twice)
    pub fn add(&self, listener: Arc<dyn ScanListener>) {
        let mut guard = self.inner.write();
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(listener);
        *guard = Arc::new(next);
    }

    /// Remove every registration of `listener`
    ///
    /// Returns the number of registrations removed.
    pub fn remove(&self, listener: &Arc<dyn ScanListener>) -> usize {
        let mut guard = self.inner.write();
        let before = guard.len();
        let next: Vec<_> = guard
            .iter()
            .filter(|registered| !same_listener(registered, listener))
            .cloned()
            .collect();
        let removed = before - next.len();
        if removed > 0 {
            *guard = Arc::new(next);
        }
        removed
    }

    /// The current list, unaffected by later registrations
    pub fn snapshot(&self) -> Arc<Vec<Arc<dyn ScanListener>>> {
        Arc::clone(&self.inner.read())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Invoke `f` for every listener registered at the time of the call
    pub fn for_each<F: FnMut(&dyn ScanListener)>(&self, mut f: F) {
        for listener in self.snapshot().iter() {
            f(listener.as_ref());
        }
    }

    /// Deliver a path event to every listener in registration order
    pub fn dispatch(&self, event: &WatchEvent) {
        self.for_each(|listener| event.deliver(listener));
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet").field("len", &self.len()).finish()
    }
}

/// Identity comparison on the data pointer, ignoring vtables
fn same_listener(a: &Arc<dyn ScanListener>, b: &Arc<dyn ScanListener>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Listener that forwards path events over a channel
///
/// Scan start/end callbacks are not forwarded.
pub struct ChannelListener {
    tx: Sender<WatchEvent>,
}

impl ChannelListener {
    pub fn new(tx: Sender<WatchEvent>) -> Self {
        Self { tx }
    }

    /// Create a listener together with the receiving end of its channel
    pub fn unbounded() -> (Self, crossbeam_channel::Receiver<WatchEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }

    fn forward(&self, path: &Path, kind: EventKind, entry: EntryType) {
        if let Err(e) = self.tx.send(WatchEvent::new(path, kind, entry)) {
            debug!("Dropping watch event, receiver gone: {}", e.0);
        }
    }
}

impl ScanListener for ChannelListener {
    fn on_directory_create(&self, path: &Path) {
        self.forward(path, EventKind::Create, EntryType::Directory);
    }

    fn on_directory_change(&self, path: &Path) {
        self.forward(path, EventKind::Change, EntryType::Directory);
    }

    fn on_directory_delete(&self, path: &Path) {
        self.forward(path, EventKind::Delete, EntryType::Directory);
    }

    fn on_file_create(&self, path: &Path) {
        self.forward(path, EventKind::Create, EntryType::File);
    }

    fn on_file_change(&self, path: &Path) {
        self.forward(path, EventKind::Change, EntryType::File);
    }

    fn on_file_delete(&self, path: &Path) {
        self.forward(path, EventKind::Delete, EntryType::File);
    }
}
