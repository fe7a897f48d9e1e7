// src/supervisor/state.rs

//! Pure supervisor state machine.
//!
//! [`SupervisorCore`] consumes [`SupervisorEvent`]s and answers with the
//! commands the async shell (`supervisor::reload`) should execute. It owns no
//! processes, channels or files, so its transitions can be tested directly.

use std::fmt;

use crate::exec::ProcessExit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorState {
    #[default]
    Initializing,
    Running,
    ReloadInFlight,
    ShuttingDown,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SupervisorState::Initializing => "initializing",
            SupervisorState::Running => "running",
            SupervisorState::ReloadInFlight => "reload in flight",
            SupervisorState::ShuttingDown => "shutting down",
        };
        f.write_str(s)
    }
}

/// What asked for a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTrigger {
    /// The debounced watcher saw source changes settle.
    FileWatch,
    /// SIGHUP delivered to this process (by an operator or relayed by the
    /// host).
    HangUp,
}

/// Inputs to the supervisor loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    ReloadRequested(ReloadTrigger),
    /// A supervised generation exited without being asked to.
    ProcessExited(ProcessExit),
    /// SIGINT / SIGQUIT, or every event source went away.
    ShutdownRequested,
}

/// Work for the async shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorCommand {
    Reload(ReloadTrigger),
    ForgetProcess { generation: u64 },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorStep {
    pub commands: Vec<SupervisorCommand>,
    pub keep_running: bool,
}

impl SupervisorStep {
    fn run(commands: Vec<SupervisorCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn stop(commands: Vec<SupervisorCommand>) -> Self {
        Self {
            commands,
            keep_running: false,
        }
    }
}

/// How one reload ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A new local generation is running.
    Restarted { pid: u32, generation: u64 },
    /// The program was rebuilt and the container side was told to reload.
    Relayed { pid: i32 },
    /// The build failed; `message` is what was shown to the developer.
    BuildFailed { message: String },
    /// No prebuilt program was found (container side).
    ArtifactMissing,
    /// Built, but the new process could not be started.
    StartFailed { message: String },
    /// Built, but the container could not be signalled.
    RelayFailed { message: String },
}

impl ReloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ReloadOutcome::Restarted { .. } | ReloadOutcome::Relayed { .. }
        )
    }
}

#[derive(Debug, Default)]
pub struct SupervisorCore {
    state: SupervisorState,
}

impl SupervisorCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Startup work finished.
    pub fn mark_running(&mut self) {
        if self.state == SupervisorState::Initializing {
            self.state = SupervisorState::Running;
        }
    }

    /// The reload issued by the last step has completed (successfully or
    /// not). Failures do not change the state: the next save retries.
    pub fn reload_finished(&mut self) {
        if self.state == SupervisorState::ReloadInFlight {
            self.state = SupervisorState::Running;
        }
    }

    pub fn step(&mut self, event: SupervisorEvent) -> SupervisorStep {
        if self.state == SupervisorState::ShuttingDown {
            return SupervisorStep::stop(Vec::new());
        }

        match event {
            SupervisorEvent::ShutdownRequested => {
                self.state = SupervisorState::ShuttingDown;
                SupervisorStep::stop(vec![SupervisorCommand::Shutdown])
            }
            SupervisorEvent::ReloadRequested(trigger) => {
                self.state = SupervisorState::ReloadInFlight;
                SupervisorStep::run(vec![SupervisorCommand::Reload(trigger)])
            }
            SupervisorEvent::ProcessExited(exit) => {
                SupervisorStep::run(vec![SupervisorCommand::ForgetProcess {
                    generation: exit.generation,
                }])
            }
        }
    }
}
