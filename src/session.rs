// src/session.rs

//! Per-instance session state: where things live on disk, which side of a
//! host/container split we are on, and the PID file used to address signals.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::errors::{RebirthError, Result};
use crate::fs::FileSystem;
use crate::types::OperatingMode;

/// Directory (under the working directory) holding rebirth's artifacts.
pub const CONFIG_DIR: &str = ".rebirth";
pub const PID_FILE: &str = "server.pid";
pub const PROGRAM_FILE: &str = "program";
pub const CONTAINER_SUPERVISOR_FILE: &str = "__rebirth";

/// File whose presence means we are running inside a Docker container.
pub const CONTAINER_MARKER: &str = "/.dockerenv";

/// All paths derived from the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub workdir: PathBuf,
    pub config_dir: PathBuf,
    pub pid_file: PathBuf,
    pub program: PathBuf,
    pub container_supervisor: PathBuf,
    pub container_marker: PathBuf,
}

impl SessionPaths {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        let workdir = workdir.into();
        let config_dir = workdir.join(CONFIG_DIR);
        Self {
            pid_file: config_dir.join(PID_FILE),
            program: config_dir.join(PROGRAM_FILE),
            container_supervisor: config_dir.join(CONTAINER_SUPERVISOR_FILE),
            container_marker: PathBuf::from(CONTAINER_MARKER),
            config_dir,
            workdir,
        }
    }

    /// Override the container marker location (tests).
    pub fn with_container_marker(mut self, marker: impl Into<PathBuf>) -> Self {
        self.container_marker = marker.into();
        self
    }

    /// Path of the supervisor binary as seen from inside the container,
    /// relative to the container's working directory.
    pub fn container_supervisor_command(&self) -> String {
        format!("./{CONFIG_DIR}/{CONTAINER_SUPERVISOR_FILE}")
    }
}

/// The PID file shared by host and container through the working directory.
///
/// Written once at startup by the side that owns signal delivery and only
/// read afterwards, so no locking is needed.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, pid: u32) -> Result<()> {
        self.fs
            .write(&self.path, pid.to_string().as_bytes())
            .map_err(|e| {
                RebirthError::PidFile(format!(
                    "failed to write pid file {}: {e:#}",
                    self.path.display()
                ))
            })?;
        debug!(pid, path = %self.path.display(), "wrote pid file");
        Ok(())
    }

    pub fn write_current(&self) -> Result<u32> {
        let pid = std::process::id();
        self.write(pid)?;
        Ok(pid)
    }

    pub fn read(&self) -> Result<i32> {
        let contents = self.fs.read_to_string(&self.path).map_err(|e| {
            RebirthError::PidFile(format!(
                "failed to read pid file {}: {e:#}",
                self.path.display()
            ))
        })?;
        contents.trim().parse::<i32>().map_err(|e| {
            RebirthError::PidFile(format!(
                "failed to parse pid number {:?} from {}: {e}",
                contents,
                self.path.display()
            ))
        })
    }
}

/// Role, container and paths for this supervisor instance.
#[derive(Debug, Clone)]
pub struct ReloadSession {
    pub mode: OperatingMode,
    pub paths: SessionPaths,
    pub pid_file: PidFile,
}

impl ReloadSession {
    pub fn new(mode: OperatingMode, paths: SessionPaths, fs: Arc<dyn FileSystem>) -> Self {
        let pid_file = PidFile::new(paths.pid_file.clone(), fs);
        Self {
            mode,
            paths,
            pid_file,
        }
    }

    /// Decide the operating mode from config and the container marker.
    pub fn detect(cfg: &ConfigFile, paths: SessionPaths, fs: Arc<dyn FileSystem>) -> Self {
        let inside = fs.exists(&paths.container_marker);
        let mode = OperatingMode::detect(cfg.host.container(), inside);
        info!(%mode, "operating mode decided");
        Self::new(mode, paths, fs)
    }
}
