// src/build/runner.rs

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, info};

use crate::build::env::{build_args, compose_env, needs_cross_toolchain, CROSS_CC};
use crate::build::target::{host_os, BuildTarget};
use crate::errors::{RebirthError, Result};
use crate::exec::BoxFuture;

/// Something that can turn a [`BuildTarget`] into a binary.
///
/// Production code uses [`BuildRunner`]; tests provide fakes that write a
/// script or fail on demand.
pub trait BuildBackend: Send + Sync {
    fn build<'a>(&'a self, target: &'a BuildTarget) -> BoxFuture<'a, Result<()>>;
}

/// Runs the external toolchain (`go build` by default).
#[derive(Debug, Clone)]
pub struct BuildRunner {
    toolchain: String,
    workdir: PathBuf,
}

impl BuildRunner {
    pub fn new(toolchain: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            toolchain: toolchain.into(),
            workdir: workdir.into(),
        }
    }

    async fn run(&self, target: &BuildTarget) -> Result<()> {
        let cross_toolchain = needs_cross_toolchain(target, host_os());
        if cross_toolchain && which::which(CROSS_CC).is_err() {
            return Err(RebirthError::CrossCompilerMissing {
                compiler: CROSS_CC.to_string(),
            });
        }

        if let Some(parent) = target.output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating output dir {}", parent.display()))?;
        }

        let env = compose_env(target, &self.workdir, cross_toolchain);
        let args = build_args(target);
        info!(
            entry = %target.entry,
            output = %target.output.display(),
            os = %target.os,
            arch = %target.arch,
            cross = target.is_cross(),
            "building"
        );
        debug!(toolchain = %self.toolchain, ?args, ?env, "build command");

        let child = Command::new(&self.toolchain)
            .args(&args)
            .envs(env)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to run build command '{}'", self.toolchain))?;

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("waiting for build command '{}'", self.toolchain))?;

        if output.status.success() {
            info!(output = %target.output.display(), "build succeeded");
            Ok(())
        } else {
            Err(RebirthError::BuildFailed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}

impl BuildBackend for BuildRunner {
    fn build<'a>(&'a self, target: &'a BuildTarget) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.run(target))
    }
}
