use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use rebirth::errors::{RebirthError, Result};
use rebirth::exec::{BoxFuture, ContainerExec};

/// One recorded container command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCall {
    pub container: String,
    pub command: Vec<String>,
}

/// A fake container runtime that records every command and answers
/// `go env GOOS` / `go env GOARCH` with a fixed platform.
#[derive(Clone)]
pub struct FakeContainerExec {
    outputs: Arc<Mutex<Vec<ExecCall>>>,
    streams: Arc<Mutex<Vec<ExecCall>>>,
    responses: Arc<Mutex<BTreeMap<String, String>>>,
    unreachable: Arc<AtomicBool>,
    hold_streams: Arc<AtomicBool>,
    quit_sent: Arc<watch::Sender<bool>>,
    finished_streams: Arc<AtomicUsize>,
}

impl FakeContainerExec {
    pub fn new() -> Self {
        let fake = Self {
            outputs: Arc::new(Mutex::new(Vec::new())),
            streams: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(Mutex::new(BTreeMap::new())),
            unreachable: Arc::new(AtomicBool::new(false)),
            hold_streams: Arc::new(AtomicBool::new(false)),
            quit_sent: Arc::new(watch::channel(false).0),
            finished_streams: Arc::new(AtomicUsize::new(0)),
        };
        fake.respond("go env GOOS", "linux\n");
        fake.respond("go env GOARCH", "amd64\n");
        fake
    }

    /// Answer `command` (space-joined) with `stdout`.
    pub fn respond(&self, command: &str, stdout: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), stdout.to_string());
    }

    /// Make every following command fail as if the container were gone.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Keep streamed commands running until a `kill -QUIT` is executed,
    /// like a container supervisor that exits on SIGQUIT.
    pub fn hold_streams_until_quit(&self) {
        self.hold_streams.store(true, Ordering::SeqCst);
    }

    /// Streamed commands that ran to completion.
    pub fn finished_streams(&self) -> usize {
        self.finished_streams.load(Ordering::SeqCst)
    }

    pub fn output_calls(&self) -> Vec<ExecCall> {
        self.outputs.lock().unwrap().clone()
    }

    pub fn stream_calls(&self) -> Vec<ExecCall> {
        self.streams.lock().unwrap().clone()
    }

    /// Recorded `kill ...` commands.
    pub fn kill_commands(&self) -> Vec<Vec<String>> {
        self.output_calls()
            .into_iter()
            .filter(|c| c.command.first().map(String::as_str) == Some("kill"))
            .map(|c| c.command)
            .collect()
    }

    fn fail(&self, container: &str, command: &[String]) -> Option<RebirthError> {
        if self.unreachable.load(Ordering::SeqCst) {
            Some(RebirthError::ContainerExec {
                container: container.to_string(),
                command: command.to_vec(),
                message: format!("No such container: {container}"),
            })
        } else {
            None
        }
    }
}

impl Default for FakeContainerExec {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerExec for FakeContainerExec {
    fn output<'a>(
        &'a self,
        container: &'a str,
        command: &'a [String],
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.outputs.lock().unwrap().push(ExecCall {
                container: container.to_string(),
                command: command.to_vec(),
            });
            if let Some(err) = self.fail(container, command) {
                return Err(err);
            }
            if command.first().map(String::as_str) == Some("kill")
                && command.get(1).map(String::as_str) == Some("-QUIT")
            {
                self.quit_sent.send_replace(true);
            }
            let stdout = self
                .responses
                .lock()
                .unwrap()
                .get(&command.join(" "))
                .cloned()
                .unwrap_or_default();
            Ok(rebirth::exec::container::chomp(&stdout))
        })
    }

    fn stream<'a>(&'a self, container: &'a str, command: &'a [String]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.streams.lock().unwrap().push(ExecCall {
                container: container.to_string(),
                command: command.to_vec(),
            });
            if let Some(err) = self.fail(container, command) {
                return Err(err);
            }
            if self.hold_streams.load(Ordering::SeqCst) {
                let mut quit = self.quit_sent.subscribe();
                let _ = quit.wait_for(|sent| *sent).await;
            }
            self.finished_streams.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}
