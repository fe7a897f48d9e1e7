// src/watch/roots.rs

//! Startup discovery of the directories to subscribe to.

use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use crate::config::WatchSection;
use crate::errors::{RebirthError, Result};
use crate::fs::FileSystem;

/// Watch root plus ignored prefixes, both resolved against the same base so
/// that string-prefix comparison against walked paths is meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRoots {
    root: PathBuf,
    ignore: Vec<String>,
}

impl WatchRoots {
    /// `ignore` entries are resolved relative to `root`; absolute entries are
    /// kept as-is.
    pub fn new(root: impl Into<PathBuf>, ignore: &[String]) -> Self {
        let root = root.into();
        let ignore = ignore
            .iter()
            .map(|p| resolve_under(&root, Path::new(p)).to_string_lossy().into_owned())
            .collect();
        Self { root, ignore }
    }

    /// Resolve `[watch]` against the working directory.
    pub fn from_config(cfg: &WatchSection, workdir: &Path) -> Self {
        Self::new(resolve_under(workdir, &cfg.root), &cfg.ignore)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ignored_prefixes(&self) -> &[String] {
        &self.ignore
    }

    /// Plain string-prefix match, not a glob: `vendor` also covers `vendor2`.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let path = strip_cur_dir(path);
        let path = path.to_string_lossy();
        self.ignore.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Walk the tree once and return the root plus every non-ignored
    /// directory beneath it, sorted. Hidden directories directly under the
    /// root (`.git`, `.rebirth`) are skipped with their subtree; deeper
    /// dot-directories are watched.
    ///
    /// Directories created later are not picked up.
    pub fn discover(&self, fs: &dyn FileSystem) -> Result<Vec<PathBuf>> {
        if !fs.is_dir(&self.root) {
            return Err(RebirthError::ConfigError(format!(
                "watch root {} is not a directory",
                self.root.display()
            )));
        }

        let mut dirs = vec![self.root.clone()];
        let mut stack = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            let entries = if dir == self.root {
                fs.read_dir(&dir)
                    .with_context(|| format!("listing watch root {}", dir.display()))?
            } else {
                match fs.read_dir(&dir) {
                    Ok(entries) => entries,
                    Err(err) => {
                        warn!(dir = %dir.display(), error = %err, "skipping unreadable directory");
                        continue;
                    }
                }
            };

            for entry in entries {
                let hidden = dir == self.root && is_hidden(&entry);
                if !fs.is_dir(&entry) || hidden || self.is_ignored(&entry) {
                    continue;
                }
                debug!(dir = %entry.display(), "discovered watch directory");
                dirs.push(entry.clone());
                stack.push(entry);
            }
        }

        dirs.sort();
        Ok(dirs)
    }
}

/// Number of entries directly inside the given directories. Reported when a
/// subscription fails, since the usual cause is the inotify watch limit.
pub fn count_entries(fs: &dyn FileSystem, dirs: &[PathBuf]) -> usize {
    dirs.iter()
        .map(|d| fs.read_dir(d).map(|e| e.len()).unwrap_or(0))
        .sum()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Join `path` onto `base` unless it is absolute, dropping `.` components.
pub fn resolve_under(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        strip_cur_dir(path)
    } else {
        strip_cur_dir(&base.join(path))
    }
}

fn strip_cur_dir(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        if component != Component::CurDir {
            out.push(component);
        }
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}
