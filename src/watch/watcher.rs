// src/watch/watcher.rs

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::{RebirthError, Result};
use crate::fs::FileSystem;
use crate::watch::debounce::{Debouncer, RebuildCallback};
use crate::watch::filter::{ChangeClassifier, SourceFilter};
use crate::watch::roots::{count_entries, WatchRoots};

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching, which in turn ends the event and debounce tasks.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    dirs: usize,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("dirs", &self.dirs)
            .finish()
    }
}

/// Subscribe to every directory discovered under `roots` and call
/// `on_rebuild` once per settled burst of relevant changes.
///
/// Failing to create the notify backend or to subscribe any directory is
/// returned before watching begins. Errors reported by the backend later on
/// are only logged.
pub fn spawn_watcher(
    roots: WatchRoots,
    filter: SourceFilter,
    quiet_period: Duration,
    fs: &dyn FileSystem,
    on_rebuild: RebuildCallback,
) -> Result<WatcherHandle> {
    let dirs = roots.discover(fs)?;

    // Channel from the blocking notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // Receiver gone means the watcher is shutting down.
            let _ = event_tx.send(res);
        },
        Config::default(),
    )?;

    for dir in &dirs {
        println!("Watching {}", dir.display());
        if let Err(err) = watcher.watch(dir, RecursiveMode::NonRecursive) {
            return Err(RebirthError::WatchPath {
                path: dir.clone(),
                watched_files: count_entries(fs, &dirs),
                source: err,
            });
        }
    }

    info!(
        root = %roots.root().display(),
        dirs = dirs.len(),
        extension = filter.extension(),
        "file watcher started"
    );

    let classifier = ChangeClassifier::new(roots, filter);
    let debouncer = Debouncer::spawn(quiet_period, on_rebuild);
    forward_events(event_rx, classifier, debouncer);

    Ok(WatcherHandle {
        _inner: watcher,
        dirs: dirs.len(),
    })
}

/// Feed backend notifications into the debouncer until the sender side is
/// dropped. Backend errors are logged and a panic while handling one event is
/// contained to that event.
pub fn forward_events(
    mut event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    classifier: ChangeClassifier,
    debouncer: Debouncer,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(res) = event_rx.recv().await {
            match res {
                Ok(event) => {
                    let handled = panic::catch_unwind(AssertUnwindSafe(|| {
                        route_event(&classifier, &debouncer, &event)
                    }));
                    if let Err(payload) = handled {
                        error!(
                            panic = %panic_message(payload.as_ref()),
                            "panic while handling file event; watcher keeps running"
                        );
                    }
                }
                Err(err) => {
                    warn!(error = %err, "file watch error");
                }
            }
        }
        debug!("watcher event loop finished");
    })
}

fn route_event(classifier: &ChangeClassifier, debouncer: &Debouncer, event: &Event) {
    if classifier.triggers_rebuild(event) {
        debug!(kind = ?event.kind, paths = ?event.paths, "relevant source change");
        debouncer.notify();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
