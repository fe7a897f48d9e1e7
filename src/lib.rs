// src/lib.rs

pub mod bridge;
pub mod build;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod session;
pub mod supervisor;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::build::BuildRunner;
use crate::cli::CliArgs;
use crate::config::{load_for_workdir, ConfigFile};
use crate::errors::Result;
use crate::exec::{ContainerExec, DockerCli};
use crate::fs::{FileSystem, RealFileSystem};
use crate::session::{ReloadSession, SessionPaths};
use crate::supervisor::{spawn_signal_listeners, ReloadSupervisor, ReloadTrigger, SupervisorEvent};
use crate::watch::{spawn_watcher, RebuildCallback, SourceFilter, WatchRoots};

/// Capacity of the supervisor's event channel. Reload requests beyond this
/// while a reload runs are dropped; the queued ones already cover them.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and operating-mode detection
/// - the debounced file watcher (standalone and host side only)
/// - SIGHUP / SIGINT / SIGQUIT handling
/// - the reload supervisor
pub async fn run(args: CliArgs) -> Result<()> {
    let workdir = resolve_workdir(args.workdir.as_deref())?;
    let cfg = load_for_workdir(args.config.as_deref(), &workdir)?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let session = ReloadSession::detect(&cfg, SessionPaths::new(&workdir), Arc::clone(&fs));
    let roots = WatchRoots::from_config(&cfg.watch, &workdir);

    if args.dry_run {
        print_dry_run(&cfg, &session, &roots, fs.as_ref());
        return Ok(());
    }

    let (event_tx, event_rx) = mpsc::channel::<SupervisorEvent>(EVENT_CHANNEL_CAPACITY);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let _watcher_handle = if session.mode.watches_sources() {
        let tx = event_tx.clone();
        let on_rebuild: RebuildCallback = Arc::new(move || {
            let event = SupervisorEvent::ReloadRequested(ReloadTrigger::FileWatch);
            if let Err(err) = tx.try_send(event) {
                debug!(error = %err, "could not queue file-watch reload");
            }
        });
        Some(spawn_watcher(
            roots,
            SourceFilter::new(&cfg.watch.extension),
            cfg.watch.quiet_period(),
            fs.as_ref(),
            on_rebuild,
        )?)
    } else {
        info!("running inside the container; the host watches sources");
        None
    };

    let _signal_task = spawn_signal_listeners(event_tx, shutdown_tx)?;

    let exec: Arc<dyn ContainerExec> = Arc::new(DockerCli::new(cfg.host.workdir.clone()));
    let builder = BuildRunner::new(cfg.build.command.clone(), &workdir);

    let mut supervisor = ReloadSupervisor::new(session, cfg, builder, exec, fs);
    supervisor.initialize().await?;
    supervisor.run(event_rx, shutdown_rx).await
}

/// Absolute working directory: `--workdir` if given, else the current one.
fn resolve_workdir(explicit: Option<&Path>) -> Result<PathBuf> {
    let dir = match explicit {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("reading current directory")?,
    };
    let dir = dir
        .canonicalize()
        .with_context(|| format!("resolving working directory {}", dir.display()))?;
    Ok(dir)
}

/// Print what a real run would do, without building or watching.
fn print_dry_run(cfg: &ConfigFile, session: &ReloadSession, roots: &WatchRoots, fs: &dyn FileSystem) {
    println!("rebirth dry-run");
    println!("  mode = {}", session.mode);
    println!("  workdir = {}", session.paths.workdir.display());
    println!("  pid_file = {}", session.paths.pid_file.display());
    println!("  program = {}", session.paths.program.display());
    println!();

    println!("build:");
    println!("  command: {} build {}", cfg.build.command, cfg.build.main);
    for (key, value) in &cfg.build.env {
        println!("  env: {key}={value}");
    }
    if !cfg.run.env.is_empty() {
        println!("run:");
        for (key, value) in &cfg.run.env {
            println!("  env: {key}={value}");
        }
    }
    println!();

    if session.mode.watches_sources() {
        println!(
            "watch (*.{}, quiet period {} ms):",
            cfg.watch.extension, cfg.watch.quiet_period_ms
        );
        match roots.discover(fs) {
            Ok(dirs) => {
                for dir in dirs {
                    println!("  - {}", dir.display());
                }
            }
            Err(err) => println!("  cannot walk {}: {err}", roots.root().display()),
        }
    }

    debug!("dry-run complete (nothing built or started)");
}
