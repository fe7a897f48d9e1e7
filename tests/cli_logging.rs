use std::path::PathBuf;

use clap::Parser;

use rebirth::cli::{CliArgs, LogLevel};
use rebirth::logging::resolve_level;

#[test]
fn defaults_leave_everything_unset() {
    let args = CliArgs::try_parse_from(["rebirth"]).unwrap();

    assert_eq!(args.config, None);
    assert_eq!(args.workdir, None);
    assert!(args.log_level.is_none());
    assert!(!args.dry_run);
}

#[test]
fn all_flags_parse() {
    let args = CliArgs::try_parse_from([
        "rebirth",
        "--config",
        "dev.toml",
        "--workdir",
        "/srv/app",
        "--log-level",
        "debug",
        "--dry-run",
    ])
    .unwrap();

    assert_eq!(args.config, Some(PathBuf::from("dev.toml")));
    assert_eq!(args.workdir, Some(PathBuf::from("/srv/app")));
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    assert!(args.dry_run);
}

#[test]
fn unknown_log_level_is_rejected() {
    assert!(CliArgs::try_parse_from(["rebirth", "--log-level", "loud"]).is_err());
}

#[test]
fn cli_level_beats_environment() {
    assert_eq!(resolve_level(Some(LogLevel::Warn), Some("trace")), tracing::Level::WARN);
}

#[test]
fn environment_level_is_used_when_flag_absent() {
    assert_eq!(resolve_level(None, Some("debug")), tracing::Level::DEBUG);
    assert_eq!(resolve_level(None, Some(" WARNING ")), tracing::Level::WARN);
}

#[test]
fn unknown_or_missing_levels_fall_back_to_info() {
    assert_eq!(resolve_level(None, Some("chatty")), tracing::Level::INFO);
    assert_eq!(resolve_level(None, None), tracing::Level::INFO);
}
