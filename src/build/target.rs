// src/build/target.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::errors::Result;
use crate::exec::ContainerExec;

/// Everything one compiler invocation needs. Built fresh for each build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub output: PathBuf,
    pub entry: String,
    pub os: String,
    pub arch: String,
    pub env: Vec<(String, String)>,
    pub container: Option<String>,
}

impl BuildTarget {
    /// Built for a container rather than for this machine.
    pub fn is_cross(&self) -> bool {
        self.container.is_some()
    }
}

/// Host OS in the toolchain's naming (`GOOS`).
pub fn host_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// Host architecture in the toolchain's naming (`GOARCH`).
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
}

/// Inputs for [`resolve_target`] that come from configuration.
#[derive(Debug, Clone)]
pub struct TargetRequest<'a> {
    pub output: PathBuf,
    pub entry: &'a str,
    pub env: &'a BTreeMap<String, String>,
    pub toolchain: &'a str,
    pub container: Option<&'a str>,
}

/// Fill in the target platform: the host's own, or whatever the toolchain
/// inside `container` reports.
pub async fn resolve_target(
    request: TargetRequest<'_>,
    exec: &dyn ContainerExec,
) -> Result<BuildTarget> {
    let (os, arch) = match request.container {
        Some(container) => {
            let os = query_toolchain_env(exec, container, request.toolchain, "GOOS").await?;
            let arch = query_toolchain_env(exec, container, request.toolchain, "GOARCH").await?;
            debug!(container, %os, %arch, "resolved container platform");
            (os, arch)
        }
        None => (host_os().to_string(), host_arch().to_string()),
    };

    Ok(BuildTarget {
        output: request.output,
        entry: request.entry.to_string(),
        os,
        arch,
        env: request
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        container: request.container.map(str::to_string),
    })
}

async fn query_toolchain_env(
    exec: &dyn ContainerExec,
    container: &str,
    toolchain: &str,
    var: &str,
) -> Result<String> {
    let command = vec![toolchain.to_string(), "env".to_string(), var.to_string()];
    let value = exec.output(container, &command).await.map_err(|e| {
        crate::errors::RebirthError::Other(
            anyhow::Error::new(e).context(format!("failed to get {var} env on container")),
        )
    })?;
    Ok(value.trim().to_string())
}
