// src/supervisor/reload.rs

use std::fmt;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bridge::ContainerBridge;
use crate::build::env::expand_env;
use crate::build::{host_os, resolve_target, BuildBackend, BuildTarget, TargetRequest};
use crate::config::ConfigFile;
use crate::errors::{RebirthError, Result};
use crate::exec::{ContainerExec, LaunchSpec, ProcessExit, ProcessHandle, SupervisedProcess};
use crate::fs::FileSystem;
use crate::session::ReloadSession;
use crate::supervisor::state::{
    ReloadOutcome, ReloadTrigger, SupervisorCommand, SupervisorCore, SupervisorEvent,
    SupervisorState,
};
use crate::types::{OperatingMode, RelaySignal};
use crate::watch::roots::resolve_under;

/// How long the host waits for the container supervisor to print its last
/// output and exit after being asked to quit.
pub const CONTAINER_EXIT_GRACE: Duration = Duration::from_secs(3);

/// Owns the supervised program for one session.
///
/// This is the async/IO shell around [`SupervisorCore`]: it reads events,
/// asks the core what to do, and performs the builds, restarts and relays.
/// Reloads run one at a time inside [`run`](Self::run); requests that arrive
/// meanwhile wait in the event channel.
pub struct ReloadSupervisor<B: BuildBackend> {
    core: SupervisorCore,
    session: ReloadSession,
    config: ConfigFile,
    builder: B,
    exec: Arc<dyn ContainerExec>,
    bridge: ContainerBridge,
    fs: Arc<dyn FileSystem>,
    process: SupervisedProcess,
    exit_tx: mpsc::UnboundedSender<ProcessExit>,
    exit_rx: mpsc::UnboundedReceiver<ProcessExit>,
    next_generation: u64,
    container_supervisor: Option<JoinHandle<()>>,
}

impl<B: BuildBackend> fmt::Debug for ReloadSupervisor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadSupervisor")
            .field("state", &self.core.state())
            .field("mode", &self.session.mode)
            .field("process", &self.process)
            .finish_non_exhaustive()
    }
}

impl<B: BuildBackend> ReloadSupervisor<B> {
    pub fn new(
        session: ReloadSession,
        config: ConfigFile,
        builder: B,
        exec: Arc<dyn ContainerExec>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        Self {
            core: SupervisorCore::new(),
            bridge: ContainerBridge::new(Arc::clone(&exec)),
            session,
            config,
            builder,
            exec,
            fs,
            process: SupervisedProcess::default(),
            exit_tx,
            exit_rx,
            next_generation: 1,
            container_supervisor: None,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.core.state()
    }

    pub fn session(&self) -> &ReloadSession {
        &self.session
    }

    pub fn process(&self) -> &SupervisedProcess {
        &self.process
    }

    /// Initializing → Running.
    ///
    /// Standalone and container-side instances record their PID, then build
    /// (or pick up the prebuilt program) and start it. The host side places
    /// a supervisor binary in the shared working directory, builds the
    /// program for the container and launches the supervisor there.
    ///
    /// PID file and provisioning failures are returned; build failures are
    /// reported and the supervisor still enters Running.
    pub async fn initialize(&mut self) -> Result<()> {
        info!(mode = %self.session.mode, "initializing supervisor");

        if self.session.mode.owns_pid_file() {
            let pid = self.session.pid_file.write_current()?;
            info!(pid, path = %self.session.pid_file.path().display(), "recorded supervisor pid");
        }

        match self.session.mode.clone() {
            OperatingMode::Standalone | OperatingMode::ContainerSide => {
                let outcome = self.restart_local().await;
                debug!(?outcome, "initial start finished");
            }
            OperatingMode::HostSide { container } => {
                self.provision_container_supervisor().await?;
                if let Err(outcome) = self.build_program(Some(container.as_str())).await {
                    debug!(?outcome, "initial container build failed");
                }
                self.launch_container_supervisor(&container);
            }
        }

        self.core.mark_running();
        Ok(())
    }

    /// One stop → build → start cycle (or build → relay on the host side).
    pub async fn reload(&mut self, trigger: ReloadTrigger) -> ReloadOutcome {
        info!(?trigger, mode = %self.session.mode, "reloading");
        println!("Reloading...");

        let outcome = match self.session.mode.container().map(str::to_string) {
            Some(container) => self.reload_container(&container).await,
            None => self.restart_local().await,
        };

        if outcome.is_success() {
            info!(?outcome, "reload finished");
        } else {
            warn!(?outcome, "reload did not complete");
        }
        outcome
    }

    /// Stop whatever this instance is responsible for.
    ///
    /// The host side asks the container-side supervisor to quit, addressing
    /// it through the PID file, and gives its exec stream
    /// [`CONTAINER_EXIT_GRACE`] to drain. Everyone else kills the local
    /// process.
    pub async fn shutdown(&mut self) -> Result<()> {
        match self.session.mode.container().map(str::to_string) {
            Some(container) => {
                let relayed = self
                    .bridge
                    .relay_to_recorded(&container, &self.session.pid_file, RelaySignal::Quit)
                    .await;
                if let Some(mut task) = self.container_supervisor.take() {
                    let drained = relayed.is_ok()
                        && tokio::time::timeout(CONTAINER_EXIT_GRACE, &mut task)
                            .await
                            .is_ok();
                    if !drained {
                        warn!(container = %container, "container supervisor still attached; detaching");
                        task.abort();
                    }
                }
                let pid = relayed?;
                info!(pid, container = %container, "asked container supervisor to quit");
                Ok(())
            }
            None => self.process.stop(),
        }
    }

    /// Event loop. Returns after shutdown has been carried out.
    ///
    /// `shutdown` is watched separately from `events` so that it can cut an
    /// in-flight reload short; the abandoned build is killed when its future
    /// is dropped.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<SupervisorEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        self.core.mark_running();
        info!(mode = %self.session.mode, "supervisor running");

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => SupervisorEvent::ShutdownRequested,
                Some(exit) = self.exit_rx.recv() => SupervisorEvent::ProcessExited(exit),
                received = events.recv() => received.unwrap_or_else(|| {
                    info!("all event sources closed; shutting down");
                    SupervisorEvent::ShutdownRequested
                }),
            };

            debug!(?event, state = %self.core.state(), "supervisor received event");
            let step = self.core.step(event);

            let mut keep_running = step.keep_running;
            for command in step.commands {
                keep_running &= self.execute(command, &mut shutdown).await?;
            }
            if !keep_running {
                break;
            }
        }

        info!("supervisor exiting");
        Ok(())
    }

    /// Returns whether the loop should keep going.
    async fn execute(
        &mut self,
        command: SupervisorCommand,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<bool> {
        match command {
            SupervisorCommand::Reload(trigger) => {
                let finished = tokio::select! {
                    biased;
                    _ = shutdown_requested(shutdown) => None,
                    outcome = self.reload(trigger) => Some(outcome),
                };
                match finished {
                    Some(_) => {
                        self.core.reload_finished();
                        Ok(true)
                    }
                    None => {
                        warn!("shutdown requested during reload; abandoning it");
                        self.core.step(SupervisorEvent::ShutdownRequested);
                        self.shutdown_reporting().await;
                        Ok(false)
                    }
                }
            }
            SupervisorCommand::ForgetProcess { generation } => {
                if self.process.clear_exited(generation) {
                    println!("Program exited; waiting for the next change");
                }
                Ok(true)
            }
            SupervisorCommand::Shutdown => {
                self.shutdown_reporting().await;
                Ok(false)
            }
        }
    }

    async fn shutdown_reporting(&mut self) {
        info!("shutting down");
        if let Err(err) = self.shutdown().await {
            error!(error = %err, "shutdown incomplete");
            eprintln!("shutdown incomplete: {err}");
        }
    }

    async fn restart_local(&mut self) -> ReloadOutcome {
        if let Err(err) = self.process.stop() {
            warn!(error = %err, "failed to stop previous process; assuming it is gone");
            eprintln!("failed to stop previous process: {err}");
        }

        if matches!(self.session.mode, OperatingMode::ContainerSide) {
            let program = &self.session.paths.program;
            if !self.fs.exists(program) {
                warn!(program = %program.display(), "prebuilt program missing");
                eprintln!(
                    "{} has not been built yet; save a source file on the host to build it",
                    program.display()
                );
                return ReloadOutcome::ArtifactMissing;
            }
        } else if let Err(outcome) = self.build_program(None).await {
            return outcome;
        }

        self.start_program()
    }

    async fn reload_container(&mut self, container: &str) -> ReloadOutcome {
        if let Err(outcome) = self.build_program(Some(container)).await {
            return outcome;
        }

        match self
            .bridge
            .relay_to_recorded(container, &self.session.pid_file, RelaySignal::Reload)
            .await
        {
            Ok(pid) => ReloadOutcome::Relayed { pid },
            Err(err) => {
                eprintln!("failed to signal container '{container}': {err}");
                ReloadOutcome::RelayFailed {
                    message: err.to_string(),
                }
            }
        }
    }

    async fn build_program(&self, container: Option<&str>) -> std::result::Result<(), ReloadOutcome> {
        let target = self
            .resolve_target(container)
            .await
            .map_err(report_build_error)?;
        self.builder
            .build(&target)
            .await
            .map_err(report_build_error)
    }

    async fn resolve_target(&self, container: Option<&str>) -> Result<BuildTarget> {
        let request = TargetRequest {
            output: self.session.paths.program.clone(),
            entry: &self.config.build.main,
            env: &self.config.build.env,
            toolchain: &self.config.build.command,
            container,
        };
        resolve_target(request, self.exec.as_ref()).await
    }

    fn start_program(&mut self) -> ReloadOutcome {
        let generation = self.next_generation;
        self.next_generation += 1;

        let run_env: Vec<(String, String)> = self
            .config
            .run
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let spec = LaunchSpec::new(&self.session.paths.program)
            .with_env(expand_env(&run_env, &self.session.paths.workdir))
            .with_dir(&self.session.paths.workdir);

        match ProcessHandle::start(&spec, generation, self.exit_tx.clone()) {
            Ok(handle) => {
                let pid = handle.pid();
                self.process.install(handle);
                ReloadOutcome::Restarted { pid, generation }
            }
            Err(err) => {
                error!(
                    error = %err,
                    generation,
                    "build succeeded but the program could not be started; it stays stopped"
                );
                eprintln!("failed to start {}: {err}", spec.program.display());
                ReloadOutcome::StartFailed {
                    message: err.to_string(),
                }
            }
        }
    }

    async fn provision_container_supervisor(&self) -> Result<()> {
        let dest = &self.session.paths.container_supervisor;
        let source = match &self.config.host.supervisor_binary {
            Some(path) => resolve_under(&self.session.paths.workdir, path),
            None if host_os() == "linux" => {
                std::env::current_exe().context("locating the running rebirth executable")?
            }
            None => {
                return Err(RebirthError::SupervisorBinaryMissing(format!(
                    "this host is {}; set [host] supervisor_binary to a linux build of rebirth",
                    host_os()
                )));
            }
        };

        if !self.fs.exists(&source) {
            return Err(RebirthError::SupervisorBinaryMissing(format!(
                "{} does not exist",
                source.display()
            )));
        }

        if source != *dest {
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            // Unlink first: the old copy may still be running in the container.
            match tokio::fs::remove_file(dest).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(anyhow::Error::new(err)
                        .context(format!("removing old {}", dest.display()))
                        .into());
                }
            }
            tokio::fs::copy(&source, dest).await.with_context(|| {
                format!("copying {} to {}", source.display(), dest.display())
            })?;
        }

        tokio::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o755))
            .await
            .with_context(|| format!("making {} executable", dest.display()))?;

        info!(source = %source.display(), dest = %dest.display(), "provisioned container supervisor");
        Ok(())
    }

    fn launch_container_supervisor(&mut self, container: &str) {
        let exec = Arc::clone(&self.exec);
        let container = container.to_string();
        let command = vec![self.session.paths.container_supervisor_command()];

        self.container_supervisor = Some(tokio::spawn(async move {
            info!(container = %container, ?command, "launching supervisor in container");
            match exec.stream(&container, &command).await {
                Ok(()) => info!(container = %container, "container supervisor exited"),
                Err(err) => {
                    error!(container = %container, error = %err, "container supervisor failed");
                    eprintln!("container supervisor failed: {err}");
                }
            }
        }));
    }
}

/// Print a build error for the developer and turn it into an outcome.
/// Compiler diagnostics are shown verbatim.
fn report_build_error(err: RebirthError) -> ReloadOutcome {
    let message = match &err {
        RebirthError::BuildFailed { status, stderr } => {
            error!(exit_code = ?status, "build failed");
            eprintln!("{}", stderr.trim_end());
            stderr.clone()
        }
        other => {
            error!(error = %other, "build could not run");
            eprintln!("{other}");
            other.to_string()
        }
    };
    ReloadOutcome::BuildFailed { message }
}

/// Resolves once `true` has been published. A dropped sender never resolves.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}
