//! Ignore pattern management
//!
//! Supports multiple sources of ignore patterns:
//! 1. Built-in patterns (VCS metadata, editor temp files - always active)
//! 2. .gitignore patterns (optional, enabled by default)
//! 3. .pollignore patterns (watcher-specific, optional)
//! 4. Config-based patterns (additional gitignore-style lines)
//!
//! `IgnoreRules` is a [`PathFilter`]: it accepts every path that is not
//! ignored, so it can be handed straight to a watch root.

use crate::error::Result;
use crate::filter::PathFilter;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Directory names that are never watched
const VCS_DIRS: &[&str] = &[".git", ".jj", ".hg", ".svn", "CVS"];

/// Name of the watcher-specific ignore file
pub const POLLIGNORE_FILE: &str = ".pollignore";

/// Ignore rule manager
///
/// Combines multiple sources of ignore patterns with proper precedence:
/// 1. Built-in patterns (highest priority - always enforced)
/// 2. .pollignore patterns (a whitelist entry overrides .gitignore)
/// 3. .gitignore patterns
/// 4. Additional config patterns
pub struct IgnoreRules {
    /// Watched root directory
    root: PathBuf,

    /// Gitignore patterns (optional)
    gitignore: Option<Gitignore>,

    /// Watcher-specific ignore patterns (optional)
    pollignore: Option<Gitignore>,

    /// Patterns from configuration
    additional: Option<Gitignore>,

    /// Configuration
    config: IgnoreConfig,
}

impl IgnoreRules {
    /// Load ignore rules for a watched root
    pub fn load(root: &Path, config: IgnoreConfig) -> Result<Self> {
        let mut rules = Self {
            root: root.to_path_buf(),
            gitignore: None,
            pollignore: None,
            additional: None,
            config,
        };

        rules.reload_ignore_files()?;
        Ok(rules)
    }

    /// Reload ignore files from disk
    ///
    /// This can be called to pick up changes to .gitignore/.pollignore
    pub fn reload_ignore_files(&mut self) -> Result<()> {
        self.gitignore = if self.config.use_gitignore {
            self.build_from_file(".gitignore")?
        } else {
            None
        };

        self.pollignore = if self.config.use_pollignore {
            self.build_from_file(POLLIGNORE_FILE)?
        } else {
            None
        };

        self.additional = if self.config.additional_patterns.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new(&self.root);
            for pattern in &self.config.additional_patterns {
                builder.add_line(None, pattern)?;
            }
            Some(builder.build()?)
        };

        debug!(
            "Loaded ignore rules for {} ({} sources)",
            self.root.display(),
            self.active_sources()
        );
        Ok(())
    }

    fn build_from_file(&self, file_name: &str) -> Result<Option<Gitignore>> {
        let path = self.root.join(file_name);
        if !path.exists() {
            return Ok(None);
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        if let Some(err) = builder.add(&path) {
            return Err(err.into());
        }
        Ok(Some(builder.build()?))
    }

    /// Check if path should be ignored
    ///
    /// Accepts paths relative to the root or absolute paths below it.
    pub fn should_ignore(&self, path: &Path) -> bool {
        let relative = match path.strip_prefix(&self.root) {
            Ok(relative) => relative,
            // Rules only cover the tree below the root
            Err(_) if path.is_absolute() => return false,
            Err(_) => path,
        };
        if relative.as_os_str().is_empty() {
            return false;
        }

        // 1. Built-in patterns (highest priority - always enforced)
        if is_builtin_ignored(relative) {
            return true;
        }

        let is_dir = self.root.join(relative).is_dir();

        // 2. .pollignore (its whitelist entries override .gitignore)
        if let Some(ref pollignore) = self.pollignore {
            let matched = pollignore.matched(relative, is_dir);
            if matched.is_ignore() {
                return true;
            }
            if matched.is_whitelist() {
                return false;
            }
        }

        // 3. .gitignore
        if let Some(ref gitignore) = self.gitignore {
            if gitignore.matched(relative, is_dir).is_ignore() {
                return true;
            }
        }

        // 4. Additional config patterns
        if let Some(ref additional) = self.additional {
            if additional
                .matched_path_or_any_parents(relative, is_dir)
                .is_ignore()
            {
                return true;
            }
        }

        false
    }

    /// Get number of active ignore sources
    pub fn active_sources(&self) -> usize {
        let mut count = 1; // Built-in always active
        if self.gitignore.is_some() {
            count += 1;
        }
        if self.pollignore.is_some() {
            count += 1;
        }
        if self.additional.is_some() {
            count += 1;
        }
        count
    }

    /// Get watched root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Update configuration and reload
    pub fn update_config(&mut self, config: IgnoreConfig) -> Result<()> {
        self.config = config;
        self.reload_ignore_files()
    }
}

impl PathFilter for IgnoreRules {
    fn accept(&self, path: &Path) -> bool {
        !self.should_ignore(path)
    }
}

/// Check if a relative path matches built-in ignore patterns
///
/// These are always enforced regardless of configuration
fn is_builtin_ignored(relative: &Path) -> bool {
    let in_vcs_dir = relative.components().any(|component| match component {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|name| VCS_DIRS.contains(&name)),
        _ => false,
    });
    if in_vcs_dir {
        return true;
    }

    relative
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(is_temp_file_name)
}

/// Check if a file name is an editor temporary file or OS metadata file
///
/// Covers: Vim, Emacs, MacOS/Windows system files
fn is_temp_file_name(filename: &str) -> bool {
    // Vim swap files (.swp, .swo, .swn, .swm)
    if filename.ends_with(".swp")
        || filename.ends_with(".swo")
        || filename.ends_with(".swn")
        || filename.ends_with(".swm")
    {
        return true;
    }

    // Vim/Emacs backup files (~)
    if filename.ends_with('~') {
        return true;
    }

    // Emacs auto-save files (#*#)
    if filename.len() > 1 && filename.starts_with('#') && filename.ends_with('#') {
        return true;
    }

    // Emacs lock files (.#*)
    if filename.starts_with(".#") {
        return true;
    }

    // MacOS system files
    if filename == ".DS_Store" || filename.starts_with("._") {
        return true;
    }

    // Windows system files
    filename == "Thumbs.db" || filename == "desktop.ini"
}

/// Ignore configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Use .gitignore patterns (default: true)
    #[serde(default = "default_true")]
    pub use_gitignore: bool,

    /// Use .pollignore patterns (default: true)
    #[serde(default = "default_true")]
    pub use_pollignore: bool,

    /// Additional gitignore-style patterns from config
    #[serde(default)]
    pub additional_patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            use_pollignore: true,
            additional_patterns: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}
