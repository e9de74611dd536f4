//! Watch configuration loaded from TOML
//!
//! ```toml
//! root = "/srv/incoming"
//! poll_interval_ms = 500
//! case_sensitivity = "insensitive"
//! exclude_names = ["node_modules", "target"]
//!
//! [ignore]
//! use_gitignore = true
//! additional_patterns = ["*.part"]
//! ```

use crate::error::{Result, WatchError};
use crate::filter::{self, NameFilter, SharedFilter};
use crate::ignore_rules::{IgnoreConfig, IgnoreRules};
use crate::observer::WatchRoot;
use crate::ordering::CaseSensitivity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Accepted range for `poll_interval_ms`
const MIN_INTERVAL_MS: u64 = 10;
const MAX_INTERVAL_MS: u64 = 3_600_000;

/// Configuration for one watched directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Directory to watch
    pub root: PathBuf,

    /// Time between scans in milliseconds (default: 1000)
    #[serde(default = "default_interval_ms")]
    pub poll_interval_ms: u64,

    /// Case policy for entry names (default: system)
    #[serde(default)]
    pub case_sensitivity: CaseSensitivity,

    /// Ignore rules applied to every listing
    #[serde(default)]
    pub ignore: IgnoreConfig,

    /// Entry names never tracked, at any depth
    #[serde(default)]
    pub exclude_names: Vec<String>,
}

fn default_interval_ms() -> u64 {
    1000
}

impl WatchConfig {
    /// Default configuration for `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            poll_interval_ms: default_interval_ms(),
            case_sensitivity: CaseSensitivity::default(),
            ignore: IgnoreConfig::default(),
            exclude_names: Vec::new(),
        }
    }

    /// Read and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| WatchError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a configuration document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is in range
    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(WatchError::MissingRoot);
        }

        if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&self.poll_interval_ms) {
            return Err(WatchError::Config(format!(
                "poll_interval_ms must be between {} and {}, got {}",
                MIN_INTERVAL_MS, MAX_INTERVAL_MS, self.poll_interval_ms
            )));
        }

        if let Some(name) = self.exclude_names.iter().find(|n| n.is_empty() || n.contains('/')) {
            return Err(WatchError::Config(format!(
                "exclude_names entries must be plain names, got '{}'",
                name
            )));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Combined filter: ignore rules, minus excluded names
    pub fn build_filter(&self) -> Result<SharedFilter> {
        let rules: SharedFilter = Arc::new(IgnoreRules::load(&self.root, self.ignore.clone())?);
        if self.exclude_names.is_empty() {
            return Ok(rules);
        }

        let excluded: SharedFilter = Arc::new(NameFilter::new(
            self.exclude_names.iter().cloned(),
            self.case_sensitivity,
        ));
        Ok(filter::and(vec![rules, filter::not(excluded)]))
    }

    /// Build a watch root from this configuration
    pub fn build_observer(&self) -> Result<WatchRoot> {
        self.validate()?;
        WatchRoot::builder(&self.root)
            .shared_filter(self.build_filter()?)
            .case_sensitivity(self.case_sensitivity)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_minimal_document() {
        let config = WatchConfig::from_toml_str("root = \"/srv/data\"").unwrap();
        assert_eq!(config, WatchConfig::new("/srv/data"));
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_full_document() {
        let config = WatchConfig::from_toml_str(
            r#"
root = "/srv/data"
poll_interval_ms = 250
case_sensitivity = "insensitive"
exclude_names = ["target"]

[ignore]
use_gitignore = false
additional_patterns = ["*.part"]
"#,
        )
        .unwrap();

        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.case_sensitivity, CaseSensitivity::Insensitive);
        assert_eq!(config.exclude_names, vec!["target".to_string()]);
        assert!(!config.ignore.use_gitignore);
        assert!(config.ignore.use_pollignore);
        assert_eq!(config.ignore.additional_patterns, vec!["*.part".to_string()]);
    }

    #[test]
    fn test_interval_out_of_range() {
        let result = WatchConfig::from_toml_str("root = \"/r\"\npoll_interval_ms = 1");
        assert!(matches!(result, Err(WatchError::Config(_))));
    }

    #[test]
    fn test_invalid_exclude_name() {
        let mut config = WatchConfig::new("/r");
        config.exclude_names = vec!["a/b".to_string()];
        assert!(matches!(config.validate(), Err(WatchError::Config(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = WatchConfig::from_toml_str("root = [unclosed");
        assert!(matches!(result, Err(WatchError::ConfigParse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = WatchConfig::load(Path::new("/this/config/does/not/exist.toml"));
        assert!(matches!(result, Err(WatchError::ConfigRead { .. })));
    }

    #[test]
    fn test_build_observer_applies_exclusions() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("target")).unwrap();
        fs::write(temp_dir.path().join("target/out.bin"), b"x").unwrap();
        fs::write(temp_dir.path().join("main.rs"), b"fn main() {}").unwrap();
        fs::create_dir(temp_dir.path().join(".git")).unwrap();

        let config_path = temp_dir.path().join("watch.toml");
        fs::write(
            &config_path,
            format!(
                "root = {:?}\nexclude_names = [\"target\", \"watch.toml\"]\n",
                temp_dir.path().display().to_string()
            ),
        )
        .unwrap();

        let config = WatchConfig::load(&config_path).unwrap();
        let observer = config.build_observer().unwrap();
        observer.initialize().unwrap();

        let tree = observer.snapshot();
        let names: Vec<_> = tree
            .children()
            .iter()
            .map(|c| c.name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["main.rs"]);
    }
}
