// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Variants are split along the lines the supervisor cares about:
//! - startup failures (config, watcher, PID file) abort before `Running`;
//! - build failures are printed and absorbed by the reload loop;
//! - container exec failures are printed and absorbed on the host side.

use std::path::PathBuf;

use thiserror::Error;

/// Message shown when the musl cross toolchain is not on `PATH`.
pub const CROSS_COMPILER_HINT: &str = "
Please install cross compiler by the following command

$ brew install FiloSottile/musl-cross/musl-cross
";

#[derive(Error, Debug)]
pub enum RebirthError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("file watch error: {0}")]
    WatchError(#[from] notify::Error),

    /// Subscribing a discovered directory failed, usually the inotify limit.
    #[error("failed to add path {path}. current total watching file number is {watched_files}: {source}")]
    WatchPath {
        path: PathBuf,
        watched_files: usize,
        #[source]
        source: notify::Error,
    },

    #[error("cross compiler not found (looked for {compiler}){hint}", hint = CROSS_COMPILER_HINT)]
    CrossCompilerMissing { compiler: String },

    /// The compiler ran and failed. Displays the compiler's stderr verbatim.
    #[error("{stderr}")]
    BuildFailed { status: Option<i32>, stderr: String },

    #[error("command {command:?} failed in container '{container}': {message}")]
    ContainerExec {
        container: String,
        command: Vec<String>,
        message: String,
    },

    #[error("PID file error: {0}")]
    PidFile(String),

    #[error("no supervisor binary available for the container: {0}")]
    SupervisorBinaryMissing(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RebirthError {
    /// Whether the developer can fix this by editing sources and saving again.
    pub fn is_retryable_by_developer(&self) -> bool {
        matches!(self, RebirthError::BuildFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, RebirthError>;
