// src/exec/process.rs

//! One spawned generation of the supervised program.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, Context};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::errors::{RebirthError, Result};

/// What to run: the built binary plus its extra environment.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub env: Vec<(String, String)>,
    pub dir: Option<PathBuf>,
}

impl LaunchSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            env: Vec::new(),
            dir: None,
        }
    }

    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }
}

/// Reported when a generation exits without having been asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub generation: u64,
    pub pid: u32,
    pub code: Option<i32>,
}

/// A running (or recently exited) child in its own process group.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    generation: u64,
    exited: Arc<AtomicBool>,
    stopping: Arc<AtomicBool>,
}

impl ProcessHandle {
    /// Spawn `spec` and return immediately.
    ///
    /// stdout/stderr are copied to ours by background tasks, and another task
    /// waits for the exit and sends a [`ProcessExit`] on `exits` unless
    /// [`stop`](Self::stop) was called first.
    pub fn start(
        spec: &LaunchSpec,
        generation: u64,
        exits: mpsc::UnboundedSender<ProcessExit>,
    ) -> Result<Self> {
        let mut cmd = Command::new(&spec.program);
        cmd.envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);
        if let Some(dir) = &spec.dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to start {}", spec.program.display()))?;
        let pid = child
            .id()
            .ok_or_else(|| anyhow!("spawned process {} has no pid", spec.program.display()))?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(copy_output(stdout, tokio::io::stdout(), pid));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(copy_output(stderr, tokio::io::stderr(), pid));
        }

        let exited = Arc::new(AtomicBool::new(false));
        let stopping = Arc::new(AtomicBool::new(false));
        tokio::spawn(watch_exit(
            child,
            pid,
            generation,
            Arc::clone(&exited),
            Arc::clone(&stopping),
            exits,
        ));

        info!(pid, generation, program = %spec.program.display(), "started process");

        Ok(Self {
            pid,
            generation,
            exited,
            stopping,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        !self.exited.load(Ordering::SeqCst)
    }

    /// Kill the whole process group.
    ///
    /// Returns once the kill syscall returns; the exit itself is observed by
    /// the exit-watch task. Calling this on an exited process, or twice, is
    /// fine.
    pub fn stop(&self) -> Result<()> {
        if !self.is_running() {
            debug!(pid = self.pid, "process already exited; nothing to stop");
            return Ok(());
        }
        self.stopping.store(true, Ordering::SeqCst);

        let pgid = Pid::from_raw(self.pid as i32);
        match killpg(pgid, Signal::SIGKILL) {
            Ok(()) => {
                debug!(pid = self.pid, "sent SIGKILL to process group");
                Ok(())
            }
            Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(RebirthError::Other(
                anyhow!(errno).context(format!("failed to kill process group {}", self.pid)),
            )),
        }
    }
}

/// The supervisor's slot for the current generation. Empty until the first
/// successful start and after a stop.
#[derive(Debug, Default)]
pub struct SupervisedProcess {
    current: Option<ProcessHandle>,
}

impl SupervisedProcess {
    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn pid(&self) -> Option<u32> {
        self.current.as_ref().map(ProcessHandle::pid)
    }

    pub fn is_running(&self) -> bool {
        self.current.as_ref().is_some_and(ProcessHandle::is_running)
    }

    pub fn generation(&self) -> Option<u64> {
        self.current.as_ref().map(ProcessHandle::generation)
    }

    /// Stop and forget the current generation, if any.
    ///
    /// The slot is cleared even when the kill fails: a failed kill is taken
    /// to mean the process may already be gone.
    pub fn stop(&mut self) -> Result<()> {
        match self.current.take() {
            Some(handle) => handle.stop(),
            None => Ok(()),
        }
    }

    /// Install a freshly started generation. The slot must be empty.
    pub fn install(&mut self, handle: ProcessHandle) {
        debug_assert!(self.current.is_none(), "previous generation still installed");
        self.current = Some(handle);
    }

    /// Forget `generation` after it exited on its own. Exits of older
    /// generations are ignored.
    pub fn clear_exited(&mut self, generation: u64) -> bool {
        if self.generation() == Some(generation) {
            self.current = None;
            true
        } else {
            false
        }
    }
}

async fn copy_output<R, W>(mut reader: R, mut writer: W, pid: u32)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if let Err(err) = tokio::io::copy(&mut reader, &mut writer).await {
        debug!(pid, error = %err, "output copy ended with error");
    }
}

async fn watch_exit(
    mut child: Child,
    pid: u32,
    generation: u64,
    exited: Arc<AtomicBool>,
    stopping: Arc<AtomicBool>,
    exits: mpsc::UnboundedSender<ProcessExit>,
) {
    let status = child.wait().await;
    exited.store(true, Ordering::SeqCst);

    if stopping.load(Ordering::SeqCst) {
        debug!(pid, generation, "stopped process exited");
        return;
    }

    let code = match &status {
        Ok(status) if status.success() => {
            info!(pid, generation, "process exited");
            status.code()
        }
        Ok(status) => {
            warn!(pid, generation, exit_code = ?status.code(), "process exited unexpectedly");
            status.code()
        }
        Err(err) => {
            error!(pid, generation, error = %err, "failed waiting for process");
            None
        }
    };

    let _ = exits.send(ProcessExit {
        generation,
        pid,
        code,
    });
}
