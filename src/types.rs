use std::fmt;
use std::str::FromStr;

use nix::sys::signal::Signal;

/// How this instance participates in a session, decided once at startup.
///
/// - `Standalone`: no container configured; watch, build and run locally.
/// - `HostSide`: a container is configured and we are on the host; we watch
///   and cross-build, and the supervised process lives in `container`.
/// - `ContainerSide`: we are the supervisor running inside the container; we
///   only own the local process and react to relayed signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatingMode {
    Standalone,
    HostSide { container: String },
    ContainerSide,
}

impl OperatingMode {
    /// Decide the mode from the configured container and whether the
    /// container marker file is present.
    pub fn detect(container: Option<&str>, inside_container: bool) -> Self {
        match container {
            None => OperatingMode::Standalone,
            Some(_) if inside_container => OperatingMode::ContainerSide,
            Some(name) => OperatingMode::HostSide {
                container: name.to_string(),
            },
        }
    }

    /// Instances that own the filesystem watcher.
    pub fn watches_sources(&self) -> bool {
        !matches!(self, OperatingMode::ContainerSide)
    }

    /// Instances that write their own PID into the PID file.
    pub fn owns_pid_file(&self) -> bool {
        !matches!(self, OperatingMode::HostSide { .. })
    }

    pub fn container(&self) -> Option<&str> {
        match self {
            OperatingMode::HostSide { container } => Some(container),
            _ => None,
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingMode::Standalone => f.write_str("standalone"),
            OperatingMode::HostSide { container } => write!(f, "host (container '{container}')"),
            OperatingMode::ContainerSide => f.write_str("container"),
        }
    }
}

/// Logical signal exchanged between host and container.
///
/// Translated to an OS signal only at the relay boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaySignal {
    Reload,
    Quit,
}

impl RelaySignal {
    pub fn os_signal(self) -> Signal {
        match self {
            RelaySignal::Reload => Signal::SIGHUP,
            RelaySignal::Quit => Signal::SIGQUIT,
        }
    }

    /// Short signal name as accepted by `kill -<NAME>`, e.g. `HUP`.
    pub fn kill_name(self) -> &'static str {
        let full = self.os_signal().as_str();
        full.strip_prefix("SIG").unwrap_or(full)
    }
}

impl FromStr for RelaySignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reload" | "hup" => Ok(RelaySignal::Reload),
            "quit" => Ok(RelaySignal::Quit),
            other => Err(format!(
                "invalid relay signal: {other} (expected \"reload\" or \"quit\")"
            )),
        }
    }
}

/// Debounce state of the watcher.
///
/// `Busy` means at least one relevant change has been seen and a rebuild is
/// pending once the quiet period elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchState {
    #[default]
    Idle,
    Busy,
}
