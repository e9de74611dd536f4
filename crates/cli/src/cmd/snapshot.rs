//! Print the tree a watch root records on initialisation

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use watcher::{CaseSensitivity, SnapshotNode, WatchRoot};

pub fn run(root: &Path, case: Option<CaseSensitivity>) -> Result<()> {
    let observer = WatchRoot::builder(root)
        .case_sensitivity(case.unwrap_or_default())
        .build()?;
    observer
        .initialize()
        .with_context(|| format!("Failed to read {}", root.display()))?;

    let tree = observer.snapshot();
    if !tree.exists() {
        anyhow::bail!("{} does not exist", root.display());
    }

    println!("{}", root.display().to_string().bold());
    let mut files = 0usize;
    let mut dirs = 0usize;
    tree.walk(&mut |node: &SnapshotNode| {
        if node.level() == 0 {
            return;
        }
        println!("{}", render_line(node));
        if node.is_dir() {
            dirs += 1;
        } else {
            files += 1;
        }
    });

    println!();
    println!("{} directories, {} files", dirs, files);
    Ok(())
}

/// Indented by nesting level, directories marked with a trailing slash
fn render_line(node: &SnapshotNode) -> String {
    let indent = "  ".repeat(node.level());
    let name = node.name().to_string_lossy();
    if node.is_dir() {
        format!("{}{}/", indent, name.blue())
    } else {
        format!(
            "{}{} {}",
            indent,
            name,
            format!("({})", util::format_size(node.size())).dimmed()
        )
    }
}
