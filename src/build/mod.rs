// src/build/mod.rs

//! Producing the supervised binary.
//!
//! - [`target`] resolves a `BuildTarget` (host platform, or the container's
//!   platform queried through `ContainerExec`).
//! - [`env`] composes the compiler environment and arguments.
//! - [`runner`] runs the toolchain and classifies failures.

pub mod env;
pub mod runner;
pub mod target;

pub use runner::{BuildBackend, BuildRunner};
pub use target::{host_arch, host_os, resolve_target, BuildTarget, TargetRequest};
