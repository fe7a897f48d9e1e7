use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{CreateKind, DataChange, ModifyKind};
use notify::{Event, EventKind};
use tokio::sync::mpsc;

use rebirth::errors::RebirthError;
use rebirth::fs::mock::MockFileSystem;
use rebirth::fs::RealFileSystem;
use rebirth::watch::{
    forward_events, spawn_watcher, ChangeClassifier, Debouncer, RebuildCallback, SourceFilter,
    WatchRoots,
};
use rebirth_test_utils::{eventually, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn std::error::Error>>;

const QUIET: Duration = Duration::from_millis(300);
/// Comfortably longer than the quiet period plus inotify delivery.
const SETTLE: Duration = Duration::from_millis(900);

fn counter() -> (Arc<AtomicUsize>, RebuildCallback) {
    let count = Arc::new(AtomicUsize::new(0));
    let cb = {
        let count = Arc::clone(&count);
        Arc::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    };
    (count, cb)
}

#[tokio::test]
async fn real_directories_route_source_writes_into_one_rebuild() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    std::fs::create_dir_all(root.join("vendor"))?;
    std::fs::write(root.join("main.go"), "package main")?;

    let (count, on_rebuild) = counter();
    let _watcher = spawn_watcher(
        WatchRoots::new(&root, &["vendor".to_string()]),
        SourceFilter::new("go"),
        QUIET,
        &RealFileSystem,
        on_rebuild,
    )?;

    std::fs::write(root.join("vendor/x.go"), "package x")?;
    tokio::time::sleep(SETTLE).await;
    assert_eq!(count.load(Ordering::SeqCst), 0, "ignored directory rebuilt");

    for body in ["package main // 1", "package main // 2", "package main // 3"] {
        std::fs::write(root.join("main.go"), body)?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(eventually(|| count.load(Ordering::SeqCst) == 1).await);
    tokio::time::sleep(SETTLE).await;
    assert_eq!(count.load(Ordering::SeqCst), 1, "burst rebuilt more than once");
    Ok(())
}

#[tokio::test]
async fn directories_created_after_startup_are_not_watched() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    std::fs::write(root.join("main.go"), "package main")?;

    let (count, on_rebuild) = counter();
    let _watcher = spawn_watcher(
        WatchRoots::new(&root, &[]),
        SourceFilter::new("go"),
        QUIET,
        &RealFileSystem,
        on_rebuild,
    )?;

    std::fs::create_dir(root.join("newpkg"))?;
    std::fs::write(root.join("newpkg/n.go"), "package newpkg")?;
    tokio::time::sleep(SETTLE).await;

    assert_eq!(count.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn non_directory_root_fails_before_watching() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("main.go");
    std::fs::write(&file, "package main")?;

    let (count, on_rebuild) = counter();
    let result = spawn_watcher(
        WatchRoots::new(&file, &[]),
        SourceFilter::new("go"),
        QUIET,
        &RealFileSystem,
        on_rebuild,
    );

    assert!(matches!(result, Err(RebirthError::ConfigError(_))));
    assert_eq!(count.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn failing_to_subscribe_a_directory_is_fatal() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    // Listed by the filesystem view but absent on disk.
    let root = dir.path().join("gone");
    let fs = MockFileSystem::new();
    fs.add_file(root.join("main.go"), "package main");
    fs.add_file(root.join("pkg/lib.go"), "package pkg");

    let (count, on_rebuild) = counter();
    let result = spawn_watcher(
        WatchRoots::new(&root, &[]),
        SourceFilter::new("go"),
        QUIET,
        &fs,
        on_rebuild,
    );

    match result {
        Err(RebirthError::WatchPath { path, watched_files, .. }) => {
            assert_eq!(path, root);
            assert_eq!(watched_files, 3);
        }
        other => panic!("expected a subscription error, got {other:?}"),
    }
    assert_eq!(count.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn backend_errors_are_logged_and_later_events_still_rebuild() -> TestResult {
    init_tracing();
    let (count, on_rebuild) = counter();
    let classifier = ChangeClassifier::new(WatchRoots::new("/proj", &[]), SourceFilter::new("go"));
    let debouncer = Debouncer::spawn(Duration::from_millis(100), on_rebuild);
    let (tx, rx) = mpsc::unbounded_channel();
    let task = forward_events(rx, classifier, debouncer);

    tx.send(Err(notify::Error::generic("queue overflow")))?;
    tx.send(Ok(Event::new(EventKind::Create(CreateKind::File))
        .add_path(PathBuf::from("/proj/README.md"))))?;
    tx.send(Ok(Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
        .add_path(PathBuf::from("/proj/main.go"))))?;

    assert!(eventually(|| count.load(Ordering::SeqCst) == 1).await);

    drop(tx);
    with_timeout(task).await?;
    Ok(())
}
