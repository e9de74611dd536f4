//! Error types for the watcher crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring or initialising a watch root
///
/// `WatchRoot::scan` never produces these: filesystem trouble during a scan is
/// folded into the diff as deletions or empty listings.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The root path supplied at construction was empty
    #[error("root directory is missing")]
    MissingRoot,

    /// The root path could not be inspected
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A path filter was constructed with invalid arguments
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The configuration file could not be read
    #[error("failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for `WatchConfig`
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// An ignore file could not be compiled
    #[error("failed to load ignore rules: {0}")]
    Ignore(#[from] ignore::Error),
}

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;
