// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`process`] owns one generation of the supervised program
//!   (`ProcessHandle`) and the supervisor's slot for it (`SupervisedProcess`).
//! - [`container`] provides the `ContainerExec` trait used to run commands in
//!   the remote container, and the `docker exec` implementation.

pub mod container;
pub mod process;

pub use container::{BoxFuture, ContainerExec, DockerCli};
pub use process::{LaunchSpec, ProcessExit, ProcessHandle, SupervisedProcess};
