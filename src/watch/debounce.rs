// src/watch/debounce.rs

//! Quiet-period debouncer.
//!
//! Two tasks cooperate: whoever observes changes calls [`Debouncer::notify`],
//! and a background loop owns the Idle/Busy transitions. They share a
//! depth-1 wake channel and a mutex-protected [`WatchState`].
//!
//! - Idle: the loop blocks until the first wake.
//! - Busy: the loop waits for another wake with the quiet period as timeout.
//!   Each wake restarts the wait. On timeout the rebuild callback runs while
//!   the state lock is held, a wake that raced with the expiry is drained, and
//!   the state returns to Idle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::types::WatchState;

/// Invoked once per settled burst of changes.
pub type RebuildCallback = Arc<dyn Fn() + Send + Sync>;

pub struct Debouncer {
    state: Arc<Mutex<WatchState>>,
    wake: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Debouncer {
    /// Start the debounce loop on the current Tokio runtime.
    pub fn spawn(quiet_period: Duration, on_rebuild: RebuildCallback) -> Self {
        let state = Arc::new(Mutex::new(WatchState::Idle));
        let (wake, wake_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(debounce_loop(
            quiet_period,
            Arc::clone(&state),
            wake_rx,
            on_rebuild,
        ));

        Self { state, wake, task }
    }

    /// Record one relevant change.
    ///
    /// Blocks while a rebuild callback is running, so a change made during
    /// the callback starts a fresh busy phase instead of being swallowed.
    pub fn notify(&self) {
        let mut state = lock_state(&self.state);
        *state = WatchState::Busy;
        match self.wake.try_send(()) {
            Ok(()) => {}
            // A wake is already queued; it covers this change too.
            Err(TrySendError::Full(())) => {}
            Err(TrySendError::Closed(())) => {
                debug!("debounce loop has stopped; dropping change notification");
            }
        }
    }

    pub fn state(&self) -> WatchState {
        *lock_state(&self.state)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn debounce_loop(
    quiet_period: Duration,
    state: Arc<Mutex<WatchState>>,
    mut wake_rx: mpsc::Receiver<()>,
    on_rebuild: RebuildCallback,
) {
    while wake_rx.recv().await.is_some() {
        debug!(?quiet_period, "change detected; waiting for quiet period");
        loop {
            match tokio::time::timeout(quiet_period, wake_rx.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_elapsed) => {
                    finish_busy_phase(&state, &mut wake_rx, &on_rebuild);
                    break;
                }
            }
        }
    }
    debug!("debounce loop finished (wake channel closed)");
}

fn finish_busy_phase(
    state: &Mutex<WatchState>,
    wake_rx: &mut mpsc::Receiver<()>,
    on_rebuild: &RebuildCallback,
) {
    let mut guard = lock_state(state);
    info!("quiet period elapsed; requesting rebuild");
    on_rebuild();
    if wake_rx.try_recv().is_ok() {
        debug!("drained change that arrived at quiet-period expiry");
    }
    *guard = WatchState::Idle;
}

fn lock_state(state: &Mutex<WatchState>) -> MutexGuard<'_, WatchState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
