//! Shared utilities for CLI commands

use owo_colors::OwoColorize;
use std::path::Path;
use watcher::{CaseSensitivity, EntryType, EventKind, WatchEvent};

/// clap value parser for `--case`
pub fn parse_case(value: &str) -> Result<CaseSensitivity, String> {
    value.parse::<CaseSensitivity>().map_err(|e| e.to_string())
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Path shown relative to the watched root when possible
pub fn display_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative.display().to_string(),
        _ => path.display().to_string(),
    }
}

/// One coloured line per event, e.g. `+ dir  src/new`
pub fn format_event(root: &Path, event: &WatchEvent) -> String {
    let entry = match event.entry {
        EntryType::File => "file",
        EntryType::Directory => "dir ",
    };
    let path = display_path(root, &event.path);

    match event.kind {
        EventKind::Create => format!("{} {} {}", "+".green(), entry.dimmed(), path.green()),
        EventKind::Change => format!("{} {} {}", "~".yellow(), entry.dimmed(), path.yellow()),
        EventKind::Delete => format!("{} {} {}", "-".red(), entry.dimmed(), path.red()),
    }
}
