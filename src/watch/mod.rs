// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Discovering which directories to subscribe to at startup (`roots`).
//! - Deciding which notifications are source changes (`filter`).
//! - Collapsing bursts of changes into one rebuild request (`debounce`).
//! - Wiring up the cross-platform `notify` backend (`watcher`).
//!
//! It does **not** know how to build or restart anything; it only calls the
//! rebuild callback it was given.

pub mod debounce;
pub mod filter;
pub mod roots;
pub mod watcher;

pub use debounce::{Debouncer, RebuildCallback};
pub use filter::{is_relevant_kind, ChangeClassifier, SourceFilter};
pub use roots::WatchRoots;
pub use watcher::{forward_events, spawn_watcher, WatcherHandle};
