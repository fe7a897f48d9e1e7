// src/supervisor/signals.rs

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::supervisor::state::{ReloadTrigger, SupervisorEvent};

/// Exit status when a second interrupt arrives while shutdown is underway.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Listen for SIGHUP (reload) and SIGINT/SIGQUIT (shutdown).
///
/// Handlers are installed before this returns, so a failure to install one
/// is a startup error. Reload requests go through `events` in arrival order;
/// shutdown is published on `shutdown` so it can preempt a running reload.
/// The listener stays up after that: another SIGINT/SIGQUIT while shutdown
/// is still running exits the process.
pub fn spawn_signal_listeners(
    events: mpsc::Sender<SupervisorEvent>,
    shutdown: watch::Sender<bool>,
) -> Result<JoinHandle<()>> {
    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut quit = signal(SignalKind::quit())?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = hangup.recv() => {
                    info!("received SIGHUP; reload requested");
                    let event = SupervisorEvent::ReloadRequested(ReloadTrigger::HangUp);
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
                Some(()) = interrupt.recv() => request_shutdown(&shutdown, "SIGINT"),
                Some(()) = quit.recv() => request_shutdown(&shutdown, "SIGQUIT"),
                else => break,
            }
        }
        debug!("signal listener finished");
    }))
}

fn request_shutdown(shutdown: &watch::Sender<bool>, name: &str) {
    if *shutdown.borrow() {
        warn!(signal = name, "second shutdown signal; exiting without cleanup");
        std::process::exit(FORCED_EXIT_CODE);
    }
    info!(signal = name, "shutting down");
    shutdown.send_replace(true);
}
