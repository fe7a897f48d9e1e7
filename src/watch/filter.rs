// src/watch/filter.rs

//! Decides which filesystem events count as source changes.

use std::path::Path;

use notify::event::ModifyKind;
use notify::{Event, EventKind};

use crate::watch::roots::WatchRoots;

/// Filename-level relevance rules for one source language.
///
/// A path is relevant when its base name:
/// - does not start with `#` or `.` (editor backups, swap files),
/// - has the source extension,
/// - is not a test file (`_test.<ext>`).
#[derive(Debug, Clone)]
pub struct SourceFilter {
    extension: String,
    test_suffix: String,
}

impl SourceFilter {
    pub fn new(extension: &str) -> Self {
        let extension = extension.trim_start_matches('.').to_string();
        let test_suffix = format!("_test.{extension}");
        Self {
            extension,
            test_suffix,
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn is_relevant_path(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if name.starts_with('#') || name.starts_with('.') {
            return false;
        }
        let has_extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == self.extension);
        has_extension && !name.ends_with(&self.test_suffix)
    }
}

/// Create, data write, remove and rename count; metadata and access noise
/// does not.
pub fn is_relevant_kind(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Any => true,
        EventKind::Modify(modify) => matches!(
            modify,
            ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any
        ),
        EventKind::Access(_) | EventKind::Other => false,
    }
}

/// Combines the event-kind check, ignored prefixes and the filename rules.
#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    roots: WatchRoots,
    filter: SourceFilter,
}

impl ChangeClassifier {
    pub fn new(roots: WatchRoots, filter: SourceFilter) -> Self {
        Self { roots, filter }
    }

    /// Whether any path of `event` should schedule a rebuild.
    pub fn triggers_rebuild(&self, event: &Event) -> bool {
        if !is_relevant_kind(&event.kind) {
            return false;
        }
        event
            .paths
            .iter()
            .any(|path| !self.roots.is_ignored(path) && self.filter.is_relevant_path(path))
    }
}
