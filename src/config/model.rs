// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Quiet period used when `[watch].quiet_period_ms` is not set.
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 2000;

/// Top-level configuration as read from `rebirth.toml`, before validation.
///
/// ```toml
/// [host]
/// docker = "app"
///
/// [build]
/// main = "./cmd/server"
/// env = { CGO_CFLAGS = "-I./include" }
///
/// [run]
/// env = { PORT = "8080" }
///
/// [watch]
/// root = "."
/// ignore = ["vendor"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub host: HostSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub run: RunSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration. Only constructed through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub host: HostSection,
    pub build: BuildSection,
    pub run: RunSection,
    pub watch: WatchSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        host: HostSection,
        build: BuildSection,
        run: RunSection,
        watch: WatchSection,
    ) -> Self {
        Self {
            host,
            build,
            run,
            watch,
        }
    }
}

/// `[host]` section: where the supervised program runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostSection {
    /// Name of the container the program should run in. Absent means the
    /// program runs on this machine.
    #[serde(default)]
    pub docker: Option<String>,

    /// Working directory inside the container (passed to `docker exec -w`).
    #[serde(default)]
    pub workdir: Option<String>,

    /// Prebuilt supervisor binary for the container's platform.
    ///
    /// Required when the host is not Linux; on Linux the running executable
    /// is used when this is unset.
    #[serde(default)]
    pub supervisor_binary: Option<PathBuf>,
}

impl HostSection {
    pub fn container(&self) -> Option<&str> {
        self.docker.as_deref()
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    /// Source entry point handed to the compiler.
    #[serde(default = "default_main")]
    pub main: String,

    /// Toolchain executable.
    #[serde(default = "default_command")]
    pub command: String,

    /// Extra environment for the compiler. Values starting with `./`,
    /// `-I./` or `-L./` are made absolute.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_main() -> String {
    ".".to_string()
}

fn default_command() -> String {
    "go".to_string()
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            main: default_main(),
            command: default_command(),
            env: BTreeMap::new(),
        }
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunSection {
    /// Extra environment for the supervised program.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Path prefixes (relative to `root`) excluded from watching.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Source file extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,

    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_extension() -> String {
    "go".to_string()
}

fn default_quiet_period_ms() -> u64 {
    DEFAULT_QUIET_PERIOD_MS
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            ignore: Vec::new(),
            extension: default_extension(),
            quiet_period_ms: default_quiet_period_ms(),
        }
    }
}

impl WatchSection {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}
