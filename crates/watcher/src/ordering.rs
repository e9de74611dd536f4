//! Name ordering used to sort directory listings and match entries across scans

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Case-sensitivity policy for comparing entry names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseSensitivity {
    /// Names differing only in case are different entries
    Sensitive,
    /// Names differing only in case are the same entry
    Insensitive,
    /// Insensitive on Windows, sensitive everywhere else
    #[default]
    System,
}

impl CaseSensitivity {
    /// Resolve `System` to the concrete policy of the running platform
    pub fn resolve(self) -> Self {
        match self {
            CaseSensitivity::System if cfg!(windows) => CaseSensitivity::Insensitive,
            CaseSensitivity::System => CaseSensitivity::Sensitive,
            other => other,
        }
    }

    /// Whether names are compared case-sensitively under this policy
    pub fn is_sensitive(self) -> bool {
        self.resolve() == CaseSensitivity::Sensitive
    }

    /// Compare two strings under this policy
    pub fn compare_str(self, a: &str, b: &str) -> Ordering {
        if self.is_sensitive() {
            a.cmp(b)
        } else {
            a.chars()
                .flat_map(char::to_lowercase)
                .cmp(b.chars().flat_map(char::to_lowercase))
        }
    }

    /// Check two strings for equality under this policy
    pub fn equals(self, a: &str, b: &str) -> bool {
        self.compare_str(a, b) == Ordering::Equal
    }

    /// Check whether `s` starts with `prefix` under this policy
    pub fn starts_with(self, s: &str, prefix: &str) -> bool {
        if self.is_sensitive() {
            s.starts_with(prefix)
        } else {
            s.to_lowercase().starts_with(&prefix.to_lowercase())
        }
    }

    /// Check whether `s` ends with `suffix` under this policy
    pub fn ends_with(self, s: &str, suffix: &str) -> bool {
        if self.is_sensitive() {
            s.ends_with(suffix)
        } else {
            s.to_lowercase().ends_with(&suffix.to_lowercase())
        }
    }
}

impl std::str::FromStr for CaseSensitivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sensitive" => Ok(CaseSensitivity::Sensitive),
            "insensitive" => Ok(CaseSensitivity::Insensitive),
            "system" => Ok(CaseSensitivity::System),
            other => Err(format!(
                "unknown case sensitivity '{}' (expected sensitive, insensitive or system)",
                other
            )),
        }
    }
}

/// Ordering function over directory entries
///
/// Entries are ordered by file name only. The same ordering must be used to
/// sort both listings handed to the merge-diff, otherwise matches are missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NameOrdering {
    case: CaseSensitivity,
}

impl NameOrdering {
    /// Create an ordering with the given case policy
    pub fn new(case: CaseSensitivity) -> Self {
        Self { case }
    }

    /// The case policy this ordering was built with
    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }

    /// Compare two bare names
    ///
    /// Case folding only applies to valid UTF-8. Names that fold to the same
    /// text but are not valid UTF-8 are told apart by their raw bytes, after
    /// every valid name of that folded text.
    pub fn compare_names(&self, a: &OsStr, b: &OsStr) -> Ordering {
        if self.case.is_sensitive() {
            return a.cmp(b);
        }

        self.case
            .compare_str(&a.to_string_lossy(), &b.to_string_lossy())
            .then_with(|| match (a.to_str().is_some(), b.to_str().is_some()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => a.cmp(b),
            })
    }

    /// Compare two paths by their final component
    pub fn compare(&self, a: &Path, b: &Path) -> Ordering {
        let empty = OsStr::new("");
        self.compare_names(
            a.file_name().unwrap_or(empty),
            b.file_name().unwrap_or(empty),
        )
    }

    /// Sort a listing in place
    pub fn sort(&self, paths: &mut [PathBuf]) {
        paths.sort_by(|a, b| self.compare(a, b));
    }
}
