// src/bridge.rs

//! Host → container signal relay.
//!
//! The container-side supervisor records its PID in `.rebirth/server.pid`,
//! which lives in the working directory shared with the host. The host reads
//! that PID and asks the container to `kill -<SIG> <pid>`. Nothing is cached
//! here: the PID file is read again for every relay, so a restarted container
//! supervisor is picked up automatically.

use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::Result;
use crate::exec::ContainerExec;
use crate::session::PidFile;
use crate::types::RelaySignal;

#[derive(Clone)]
pub struct ContainerBridge {
    exec: Arc<dyn ContainerExec>,
}

impl std::fmt::Debug for ContainerBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBridge").finish_non_exhaustive()
    }
}

impl ContainerBridge {
    pub fn new(exec: Arc<dyn ContainerExec>) -> Self {
        Self { exec }
    }

    /// Command run inside the container to deliver `signal` to `pid`.
    pub fn kill_command(pid: i32, signal: RelaySignal) -> Vec<String> {
        vec![
            "kill".to_string(),
            format!("-{}", signal.kill_name()),
            pid.to_string(),
        ]
    }

    /// Deliver `signal` to `pid` inside `container`.
    pub async fn relay_signal(&self, container: &str, pid: i32, signal: RelaySignal) -> Result<()> {
        let command = Self::kill_command(pid, signal);
        match self.exec.output(container, &command).await {
            Ok(_) => {
                info!(container, pid, ?signal, "relayed signal to container");
                Ok(())
            }
            Err(err) => {
                warn!(container, pid, ?signal, error = %err, "signal relay failed");
                Err(err)
            }
        }
    }

    /// Read the PID file and relay `signal` to the PID recorded there.
    /// Returns the PID that was addressed.
    pub async fn relay_to_recorded(
        &self,
        container: &str,
        pid_file: &PidFile,
        signal: RelaySignal,
    ) -> Result<i32> {
        let pid = pid_file.read()?;
        self.relay_signal(container, pid, signal).await?;
        Ok(pid)
    }
}
