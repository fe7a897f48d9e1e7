use std::path::PathBuf;
use std::time::Duration;

use rebirth::config::loader::{default_config_path, DEFAULT_CONFIG_FILE};
use rebirth::config::{load_and_validate, load_for_workdir, ConfigFile};
use rebirth::errors::RebirthError;
use rebirth_test_utils::builders::ConfigFileBuilder;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn full_config_parses() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    std::fs::write(
        &path,
        r#"
[host]
docker = "app"
workdir = "/go/src/app"

[build]
main = "./cmd/server"
env = { CGO_CFLAGS = "-I./include" }

[run]
env = { PORT = "8080" }

[watch]
ignore = ["vendor", "node_modules"]
quiet_period_ms = 500
"#,
    )?;

    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.host.container(), Some("app"));
    assert_eq!(cfg.host.workdir.as_deref(), Some("/go/src/app"));
    assert_eq!(cfg.build.main, "./cmd/server");
    assert_eq!(cfg.build.command, "go");
    assert_eq!(cfg.build.env["CGO_CFLAGS"], "-I./include");
    assert_eq!(cfg.run.env["PORT"], "8080");
    assert_eq!(cfg.watch.root, PathBuf::from("."));
    assert_eq!(cfg.watch.ignore, vec!["vendor", "node_modules"]);
    assert_eq!(cfg.watch.extension, "go");
    assert_eq!(cfg.watch.quiet_period(), Duration::from_millis(500));
    Ok(())
}

#[test]
fn missing_default_file_gives_defaults() -> TestResult {
    let dir = tempfile::tempdir()?;

    let cfg = load_for_workdir(None, dir.path())?;

    assert_eq!(cfg.host.container(), None);
    assert_eq!(cfg.build.main, ".");
    assert_eq!(cfg.watch.quiet_period(), Duration::from_millis(2000));
    Ok(())
}

#[test]
fn default_file_in_workdir_is_used() -> TestResult {
    let dir = tempfile::tempdir()?;
    std::fs::write(default_config_path(dir.path()), "[host]\ndocker = \"web\"\n")?;

    let cfg = load_for_workdir(None, dir.path())?;

    assert_eq!(cfg.host.container(), Some("web"));
    Ok(())
}

#[test]
fn missing_explicit_file_is_an_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("elsewhere.toml");

    let err = load_for_workdir(Some(&missing), dir.path()).unwrap_err();

    assert!(matches!(err, RebirthError::IoError(_)), "{err:?}");
    Ok(())
}

#[test]
fn malformed_toml_is_reported() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[watch\nroot = ")?;

    let err = load_and_validate(&path).unwrap_err();

    assert!(matches!(err, RebirthError::TomlError(_)), "{err:?}");
    Ok(())
}

#[test]
fn validation_rejects_bad_values() {
    let cases = [
        ConfigFileBuilder::new().with_container("  ").raw(),
        ConfigFileBuilder::new().with_main("").raw(),
        ConfigFileBuilder::new().with_quiet_period_ms(0).raw(),
        ConfigFileBuilder::new().with_build_env("", "x").raw(),
        ConfigFileBuilder::new().with_run_env("A=B", "x").raw(),
    ];

    for raw in cases {
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, RebirthError::ConfigError(_)), "{err:?}");
    }
}

#[test]
fn empty_extension_is_rejected() {
    let mut raw = ConfigFileBuilder::new().raw();
    raw.watch.extension = ".".to_string();

    assert!(ConfigFile::try_from(raw).is_err());
}
