//! Shared helpers for watcher integration tests

use filetime::FileTime;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use watcher::{CaseSensitivity, ScanListener, WatchRoot};

/// Listener that records every callback as a short line of text
///
/// Paths are recorded relative to the watched root, e.g. `create file a/c.txt`.
pub struct Recorder {
    root: PathBuf,
    events: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new(root: &Path) -> Arc<Self> {
        Arc::new(Self {
            root: root.to_path_buf(),
            events: Mutex::new(Vec::new()),
        })
    }

    /// Drain everything recorded so far
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock())
    }

    fn push(&self, what: &str, path: &Path) {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.events
            .lock()
            .push(format!("{} {}", what, relative.display()));
    }
}

impl ScanListener for Recorder {
    fn on_scan_start(&self, _root: &WatchRoot) {
        self.events.lock().push("start".to_string());
    }

    fn on_directory_create(&self, path: &Path) {
        self.push("create dir", path);
    }

    fn on_directory_change(&self, path: &Path) {
        self.push("change dir", path);
    }

    fn on_directory_delete(&self, path: &Path) {
        self.push("delete dir", path);
    }

    fn on_file_create(&self, path: &Path) {
        self.push("create file", path);
    }

    fn on_file_change(&self, path: &Path) {
        self.push("change file", path);
    }

    fn on_file_delete(&self, path: &Path) {
        self.push("delete file", path);
    }

    fn on_scan_end(&self, _root: &WatchRoot) {
        self.events.lock().push("end".to_string());
    }
}

/// Initialised watch root with a recorder attached
pub fn watch(dir: &Path, case: CaseSensitivity) -> (Arc<WatchRoot>, Arc<Recorder>) {
    let root = Arc::new(
        WatchRoot::builder(dir)
            .case_sensitivity(case)
            .build()
            .unwrap(),
    );
    let recorder = Recorder::new(dir);
    root.add_listener(recorder.clone());
    root.initialize().unwrap();
    (root, recorder)
}

/// Run one scan and return what the recorder saw
pub fn scan(root: &WatchRoot, recorder: &Recorder) -> Vec<String> {
    root.scan();
    recorder.take()
}

/// Events of a scan, framed by start/end
pub fn framed(events: &[&str]) -> Vec<String> {
    let mut framed = vec!["start".to_string()];
    framed.extend(events.iter().map(|e| e.to_string()));
    framed.push("end".to_string());
    framed
}

pub fn mtime(path: &Path) -> FileTime {
    FileTime::from_last_modification_time(&fs::metadata(path).unwrap())
}

/// Put back a modification time recorded earlier
pub fn pin_mtime(path: &Path, time: FileTime) {
    filetime::set_file_mtime(path, time).unwrap();
}
