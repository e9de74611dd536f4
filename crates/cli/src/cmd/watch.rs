//! Watch a directory and print changes

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use watcher::{
    CaseSensitivity, EntryType, EventKind, PollMonitor, ScanListener, WatchConfig, WatchEvent,
    WatchRoot,
};

/// Command line settings for `pollwatch watch`
pub struct WatchOptions {
    pub root: Option<PathBuf>,
    pub interval_ms: Option<u64>,
    pub case: Option<CaseSensitivity>,
    pub config: Option<PathBuf>,
    pub no_ignore: bool,
    pub exclude: Vec<String>,
}

impl WatchOptions {
    /// Merge the config file (if any) with command line overrides
    fn resolve(self) -> Result<WatchConfig> {
        let mut config = match (&self.config, &self.root) {
            (Some(path), _) => WatchConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            (None, Some(root)) => WatchConfig::new(root),
            (None, None) => anyhow::bail!("No directory to watch (pass ROOT or --config)"),
        };

        if let Some(root) = self.root {
            config.root = root;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.poll_interval_ms = interval_ms;
        }
        if let Some(case) = self.case {
            config.case_sensitivity = case;
        }
        if self.no_ignore {
            config.ignore.use_gitignore = false;
            config.ignore.use_pollignore = false;
        }
        config.exclude_names.extend(self.exclude);

        config.validate().context("Invalid watch settings")?;
        Ok(config)
    }
}

/// Prints one line per event to stdout
struct PrintListener {
    root: PathBuf,
    events: AtomicUsize,
}

impl PrintListener {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            events: AtomicUsize::new(0),
        }
    }

    fn print(&self, path: &Path, kind: EventKind, entry: EntryType) {
        self.events.fetch_add(1, Ordering::Relaxed);
        let event = WatchEvent::new(path, kind, entry);
        println!("{}", util::format_event(&self.root, &event));
    }
}

impl ScanListener for PrintListener {
    fn on_scan_start(&self, _root: &WatchRoot) {
        self.events.store(0, Ordering::Relaxed);
    }

    fn on_directory_create(&self, path: &Path) {
        self.print(path, EventKind::Create, EntryType::Directory);
    }

    fn on_directory_change(&self, path: &Path) {
        self.print(path, EventKind::Change, EntryType::Directory);
    }

    fn on_directory_delete(&self, path: &Path) {
        self.print(path, EventKind::Delete, EntryType::Directory);
    }

    fn on_file_create(&self, path: &Path) {
        self.print(path, EventKind::Create, EntryType::File);
    }

    fn on_file_change(&self, path: &Path) {
        self.print(path, EventKind::Change, EntryType::File);
    }

    fn on_file_delete(&self, path: &Path) {
        self.print(path, EventKind::Delete, EntryType::File);
    }

    fn on_scan_end(&self, root: &WatchRoot) {
        let count = self.events.load(Ordering::Relaxed);
        if count > 0 {
            debug!("{} event(s) under {}", count, root.root_path().display());
        }
    }
}

pub async fn run(options: WatchOptions) -> Result<()> {
    let config = options.resolve()?;

    let observer = Arc::new(
        config
            .build_observer()
            .with_context(|| format!("Failed to set up watch on {}", config.root.display()))?,
    );
    observer.add_listener(Arc::new(PrintListener::new(&config.root)));

    println!(
        "{} {} (every {} ms, Ctrl-C to stop)",
        "Watching".bold(),
        config.root.display().to_string().cyan(),
        config.poll_interval_ms
    );
    info!("Watching {}", observer);

    let mut monitor = PollMonitor::new(config.poll_interval());
    monitor.add_observer(observer);
    monitor
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await
        .context("Watch failed")?;

    println!("{}", "Stopped".dimmed());
    Ok(())
}
