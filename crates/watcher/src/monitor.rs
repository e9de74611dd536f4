//! Periodic polling monitor
//!
//! Drives one or more watch roots on a fixed interval. Scans run on the
//! blocking thread pool and are awaited one after another, so two scans of
//! the same root never overlap.

use crate::error::Result;
use crate::observer::WatchRoot;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default poll interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Periodic scanner for a set of watch roots
pub struct PollMonitor {
    /// Time between two scan rounds
    interval: Duration,

    /// Watch roots scanned on every tick, in registration order
    observers: Vec<Arc<WatchRoot>>,
}

impl PollMonitor {
    /// Create a monitor with the given poll interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            observers: Vec::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Add a watch root to scan on every tick
    pub fn add_observer(&mut self, observer: Arc<WatchRoot>) {
        self.observers.push(observer);
    }

    /// Stop scanning a watch root
    pub fn remove_observer(&mut self, observer: &Arc<WatchRoot>) {
        self.observers.retain(|o| !Arc::ptr_eq(o, observer));
    }

    pub fn observers(&self) -> &[Arc<WatchRoot>] {
        &self.observers
    }

    /// Run the polling loop until `shutdown` completes
    ///
    /// Every watch root is initialised first; an initialisation failure
    /// aborts the run. On shutdown every watch root is destroyed.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        for observer in &self.observers {
            let observer = Arc::clone(observer);
            if let Some(result) = run_blocking(move || observer.initialize()).await {
                result?;
            }
        }

        info!(
            "Starting poll monitor for {} root(s) (interval: {:?})",
            self.observers.len(),
            self.interval
        );

        let mut timer = interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = timer.tick() => self.scan_all().await,
            }
        }

        for observer in &self.observers {
            observer.destroy();
        }
        info!("Poll monitor stopped");
        Ok(())
    }

    /// Scan every watch root once, sequentially
    async fn scan_all(&self) {
        for observer in &self.observers {
            let observer = Arc::clone(observer);
            let root = observer.root_path().to_path_buf();
            if run_blocking(move || observer.scan()).await.is_none() {
                warn!("Scan of {} did not complete", root.display());
            } else {
                debug!("Tick complete for {}", root.display());
            }
        }
    }
}

impl Default for PollMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

/// Run blocking filesystem work off the async worker threads
async fn run_blocking<T, F>(f: F) -> Option<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Blocking scan task failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{ChannelListener, EntryType, EventKind};
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_monitor_reports_new_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("existing.txt"), b"old").unwrap();

        let observer = Arc::new(WatchRoot::new(temp_dir.path()).unwrap());
        let (listener, rx) = ChannelListener::unbounded();
        observer.add_listener(Arc::new(listener));

        let mut monitor = PollMonitor::new(Duration::from_millis(50));
        monitor.add_observer(observer.clone());

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(monitor.run_until(async {
            let _ = stop_rx.await;
        }));

        // Let the baseline settle before changing anything
        tokio::time::sleep(Duration::from_millis(200)).await;
        let created = temp_dir.path().join("created.txt");
        fs::write(&created, b"new").unwrap();

        let event = tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(5)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.path, created);
        assert_eq!(event.kind, EventKind::Create);
        assert_eq!(event.entry, EntryType::File);

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();

        // Destroyed on shutdown
        assert!(observer.snapshot().children().is_empty());
    }

    #[tokio::test]
    async fn test_monitor_stops_immediately() {
        let temp_dir = TempDir::new().unwrap();
        let mut monitor = PollMonitor::new(Duration::from_secs(3600));
        monitor.add_observer(Arc::new(WatchRoot::new(temp_dir.path()).unwrap()));

        monitor.run_until(async {}).await.unwrap();
    }

    #[test]
    fn test_add_and_remove_observers() {
        let first = Arc::new(WatchRoot::new("/a").unwrap());
        let second = Arc::new(WatchRoot::new("/b").unwrap());

        let mut monitor = PollMonitor::default();
        monitor.add_observer(first.clone());
        monitor.add_observer(second.clone());
        monitor.remove_observer(&first);

        assert_eq!(monitor.observers().len(), 1);
        assert_eq!(monitor.observers()[0].root_path(), std::path::Path::new("/b"));
        assert_eq!(monitor.interval(), DEFAULT_INTERVAL);
    }
}
