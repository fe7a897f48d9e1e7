// src/exec/container.rs

//! Running commands inside a named container.
//!
//! The supervisor only needs two primitives: run a command and capture its
//! stdout (platform queries, `kill`), and run a command while streaming its
//! output to ours (the container-side supervisor). [`DockerCli`] implements
//! both on top of `docker exec`; tests substitute a recording fake.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::Context;
use tokio::process::Command;
use tracing::debug;

use crate::errors::{RebirthError, Result};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait ContainerExec: Send + Sync {
    /// Run `command` in `container` and return its stdout with trailing
    /// newlines removed.
    fn output<'a>(&'a self, container: &'a str, command: &'a [String])
        -> BoxFuture<'a, Result<String>>;

    /// Run `command` in `container`, streaming its stdout/stderr to ours until
    /// it exits.
    fn stream<'a>(&'a self, container: &'a str, command: &'a [String]) -> BoxFuture<'a, Result<()>>;
}

/// `docker exec` through the Docker CLI.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
    workdir: Option<String>,
}

impl DockerCli {
    pub fn new(workdir: Option<String>) -> Self {
        Self {
            program: "docker".to_string(),
            workdir,
        }
    }

    /// Argument list passed to the client executable.
    pub fn exec_args(&self, container: &str, command: &[String]) -> Vec<String> {
        let mut args = vec!["exec".to_string()];
        if let Some(dir) = &self.workdir {
            args.push("-w".to_string());
            args.push(dir.clone());
        }
        args.push(container.to_string());
        args.extend(command.iter().cloned());
        args
    }

    fn command(&self, container: &str, command: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.exec_args(container, command))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

impl ContainerExec for DockerCli {
    fn output<'a>(
        &'a self,
        container: &'a str,
        command: &'a [String],
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            debug!(container, ?command, "container exec (captured)");
            let output = self
                .command(container, command)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output()
                .await
                .with_context(|| format!("failed to run {} exec", self.program))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                let message = if stderr.is_empty() {
                    format!("exit status {:?}", output.status.code())
                } else {
                    stderr
                };
                return Err(RebirthError::ContainerExec {
                    container: container.to_string(),
                    command: command.to_vec(),
                    message,
                });
            }

            Ok(chomp(&String::from_utf8_lossy(&output.stdout)))
        })
    }

    fn stream<'a>(&'a self, container: &'a str, command: &'a [String]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            debug!(container, ?command, "container exec (streaming)");
            let status = self
                .command(container, command)
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .await
                .with_context(|| format!("failed to run {} exec", self.program))?;

            if status.success() {
                Ok(())
            } else {
                Err(RebirthError::ContainerExec {
                    container: container.to_string(),
                    command: command.to_vec(),
                    message: format!("exit status {:?}", status.code()),
                })
            }
        })
    }
}

/// Strip trailing newlines, as shell `$(...)` would.
pub fn chomp(s: &str) -> String {
    s.trim_end_matches('\n').to_string()
}
