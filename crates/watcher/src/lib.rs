//! Polling directory watcher
//!
//! This crate detects changes under a directory tree by periodically
//! re-scanning it and diffing against the previous snapshot:
//! - Sorted merge-diff with top-down creates and bottom-up deletes
//! - Pluggable path filters, including gitignore-style rules
//! - Configurable case sensitivity for entry names
//! - Copy-on-write listener registration
//! - A tokio-driven poll loop for one or more roots

pub mod config;
pub mod error;
pub mod filter;
pub mod ignore_rules;
pub mod listener;
pub mod monitor;
pub mod observer;
pub mod ordering;
pub mod snapshot;

pub use config::WatchConfig;
pub use error::{Result, WatchError};
pub use filter::{PathFilter, SharedFilter};
pub use ignore_rules::{IgnoreConfig, IgnoreRules};
pub use listener::{ChannelListener, EntryType, EventKind, ListenerSet, ScanListener, WatchEvent};
pub use monitor::PollMonitor;
pub use observer::{WatchRoot, WatchRootBuilder};
pub use ordering::{CaseSensitivity, NameOrdering};
pub use snapshot::SnapshotNode;
