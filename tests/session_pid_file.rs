use std::path::PathBuf;
use std::sync::Arc;

use rebirth::config::ConfigFile;
use rebirth::errors::RebirthError;
use rebirth::fs::mock::MockFileSystem;
use rebirth::fs::{FileSystem, RealFileSystem};
use rebirth::session::{PidFile, ReloadSession, SessionPaths};
use rebirth::types::OperatingMode;
use rebirth_test_utils::builders::ConfigFileBuilder;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn paths_live_under_dot_rebirth() {
    let paths = SessionPaths::new("/work");

    assert_eq!(paths.pid_file, PathBuf::from("/work/.rebirth/server.pid"));
    assert_eq!(paths.program, PathBuf::from("/work/.rebirth/program"));
    assert_eq!(paths.container_supervisor, PathBuf::from("/work/.rebirth/__rebirth"));
    assert_eq!(paths.container_marker, PathBuf::from("/.dockerenv"));
    assert_eq!(paths.container_supervisor_command(), "./.rebirth/__rebirth");
}

#[test]
fn pid_round_trips_through_the_file() -> TestResult {
    let fs = Arc::new(MockFileSystem::new());
    let pid_file = PidFile::new("/work/.rebirth/server.pid", fs.clone());

    pid_file.write(4242)?;

    assert_eq!(fs.read_to_string(pid_file.path())?, "4242");
    assert_eq!(pid_file.read()?, 4242);
    Ok(())
}

#[test]
fn current_pid_is_recorded_on_disk() -> TestResult {
    let dir = tempfile::tempdir()?;
    let paths = SessionPaths::new(dir.path());
    let pid_file = PidFile::new(&paths.pid_file, Arc::new(RealFileSystem));

    let pid = pid_file.write_current()?;

    assert_eq!(pid, std::process::id());
    assert_eq!(std::fs::read_to_string(&paths.pid_file)?, pid.to_string());
    Ok(())
}

#[test]
fn surrounding_whitespace_is_tolerated() -> TestResult {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/work/.rebirth/server.pid", " 17\n");

    assert_eq!(PidFile::new("/work/.rebirth/server.pid", fs).read()?, 17);
    Ok(())
}

#[test]
fn missing_or_garbled_pid_file_is_an_error() {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/work/garbled.pid", "not-a-pid");

    let missing = PidFile::new("/work/none.pid", fs.clone()).read().unwrap_err();
    let garbled = PidFile::new("/work/garbled.pid", fs).read().unwrap_err();

    assert!(matches!(missing, RebirthError::PidFile(_)), "{missing:?}");
    assert!(matches!(garbled, RebirthError::PidFile(_)), "{garbled:?}");
}

#[test]
fn mode_follows_config_and_container_marker() {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/marker/.dockerenv", "");
    let with_marker = || SessionPaths::new("/work").with_container_marker("/marker/.dockerenv");
    let without_marker = || SessionPaths::new("/work").with_container_marker("/nowhere/.dockerenv");

    let standalone = ConfigFileBuilder::new().build();
    let split = ConfigFileBuilder::new().with_container("app").build();

    let mode = |cfg: &ConfigFile, paths: SessionPaths| ReloadSession::detect(cfg, paths, fs.clone()).mode;

    assert_eq!(mode(&standalone, without_marker()), OperatingMode::Standalone);
    assert_eq!(mode(&standalone, with_marker()), OperatingMode::Standalone);
    assert_eq!(
        mode(&split, without_marker()),
        OperatingMode::HostSide {
            container: "app".to_string()
        }
    );
    assert_eq!(mode(&split, with_marker()), OperatingMode::ContainerSide);
}

#[test]
fn only_the_host_side_skips_the_pid_file_and_only_the_container_skips_watching() {
    let host = OperatingMode::HostSide {
        container: "app".to_string(),
    };

    assert!(OperatingMode::Standalone.owns_pid_file());
    assert!(OperatingMode::ContainerSide.owns_pid_file());
    assert!(!host.owns_pid_file());

    assert!(OperatingMode::Standalone.watches_sources());
    assert!(host.watches_sources());
    assert!(!OperatingMode::ContainerSide.watches_sources());
    assert_eq!(host.container(), Some("app"));
}
