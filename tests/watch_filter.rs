use std::path::{Path, PathBuf};

use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};
use proptest::prelude::*;

use rebirth::watch::{is_relevant_kind, ChangeClassifier, SourceFilter, WatchRoots};

fn event(kind: EventKind, paths: &[&str]) -> Event {
    paths
        .iter()
        .fold(Event::new(kind), |ev, p| ev.add_path(PathBuf::from(p)))
}

fn write(paths: &[&str]) -> Event {
    event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), paths)
}

#[test]
fn source_files_are_relevant() {
    let filter = SourceFilter::new("go");
    assert!(filter.is_relevant_path(Path::new("/proj/main.go")));
    assert!(filter.is_relevant_path(Path::new("pkg/server/handler.go")));
}

#[test]
fn hidden_backup_and_test_files_are_not_relevant() {
    let filter = SourceFilter::new("go");
    assert!(!filter.is_relevant_path(Path::new("/proj/.main.go")));
    assert!(!filter.is_relevant_path(Path::new("/proj/#main.go#")));
    assert!(!filter.is_relevant_path(Path::new("/proj/#main.go")));
    assert!(!filter.is_relevant_path(Path::new("/proj/main_test.go")));
    assert!(!filter.is_relevant_path(Path::new("/proj/README.md")));
    assert!(!filter.is_relevant_path(Path::new("/proj/main.go~")));
    assert!(!filter.is_relevant_path(Path::new("/proj/go")));
}

#[test]
fn leading_dot_in_extension_is_accepted() {
    let filter = SourceFilter::new(".rs");
    assert_eq!(filter.extension(), "rs");
    assert!(filter.is_relevant_path(Path::new("src/lib.rs")));
    assert!(!filter.is_relevant_path(Path::new("src/lib_test.rs")));
}

#[test]
fn metadata_and_access_events_are_ignored() {
    assert!(is_relevant_kind(&EventKind::Create(CreateKind::File)));
    assert!(is_relevant_kind(&EventKind::Remove(RemoveKind::File)));
    assert!(is_relevant_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))));
    assert!(is_relevant_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Any))));
    assert!(!is_relevant_kind(&EventKind::Modify(ModifyKind::Metadata(
        MetadataKind::Permissions
    ))));
    assert!(!is_relevant_kind(&EventKind::Access(AccessKind::Read)));
    assert!(!is_relevant_kind(&EventKind::Other));
}

#[test]
fn classifier_skips_ignored_prefixes() {
    let roots = WatchRoots::new("/proj", &["/proj/vendor".to_string()]);
    let classifier = ChangeClassifier::new(roots, SourceFilter::new("go"));

    assert!(!classifier.triggers_rebuild(&write(&["/proj/vendor/x.go"])));
    assert!(!classifier.triggers_rebuild(&write(&["/proj/vendor/lib/y.go"])));
    assert!(classifier.triggers_rebuild(&write(&["/proj/main.go"])));
}

#[test]
fn relative_ignores_resolve_under_root() {
    let roots = WatchRoots::new(".", &["vendor".to_string()]);
    let classifier = ChangeClassifier::new(roots, SourceFilter::new("go"));

    assert!(!classifier.triggers_rebuild(&write(&["./vendor/x.go"])));
    assert!(!classifier.triggers_rebuild(&write(&["vendor/x.go"])));
    assert!(classifier.triggers_rebuild(&write(&["./main.go"])));
}

#[test]
fn rename_event_with_one_relevant_path_triggers() {
    let roots = WatchRoots::new("/proj", &[]);
    let classifier = ChangeClassifier::new(roots, SourceFilter::new("go"));

    // Editors save by writing a hidden temp file and renaming it over the source.
    let rename = event(
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
        &["/proj/.main.go.swp", "/proj/main.go"],
    );
    assert!(classifier.triggers_rebuild(&rename));
}

proptest! {
    #[test]
    fn irrelevant_names_never_trigger(stem in "[a-z][a-z0-9_]{0,11}") {
        let roots = WatchRoots::new("/proj", &[]);
        let classifier = ChangeClassifier::new(roots, SourceFilter::new("go"));

        for name in [
            format!(".{stem}.go"),
            format!("#{stem}.go"),
            format!("{stem}_test.go"),
            format!("{stem}.txt"),
        ] {
            let path = format!("/proj/{name}");
            prop_assert!(!classifier.triggers_rebuild(&write(&[path.as_str()])), "{}", path);
        }
    }

    #[test]
    fn burst_triggers_iff_it_contains_a_relevant_path(
        stems in proptest::collection::vec("[a-z]{1,8}", 1..6),
        include_relevant in any::<bool>(),
    ) {
        let roots = WatchRoots::new("/proj", &[]);
        let classifier = ChangeClassifier::new(roots, SourceFilter::new("go"));

        let mut paths: Vec<String> = stems
            .iter()
            .flat_map(|s| [format!("/proj/.{s}.go"), format!("/proj/{s}_test.go")])
            .collect();
        if include_relevant {
            paths.push(format!("/proj/{}.go", stems[0]));
        }
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();

        prop_assert_eq!(classifier.triggers_rebuild(&write(&refs)), include_relevant);
    }
}
