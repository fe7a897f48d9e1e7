// src/supervisor/mod.rs

//! Reload supervision.
//!
//! The pure state machine lives in [`state`]; [`reload`] is the async shell
//! that builds, restarts and relays; [`signals`] turns OS signals into
//! supervisor events.

pub mod reload;
pub mod signals;
pub mod state;

pub use reload::ReloadSupervisor;
pub use signals::spawn_signal_listeners;
pub use state::{
    ReloadOutcome, ReloadTrigger, SupervisorCommand, SupervisorCore, SupervisorEvent,
    SupervisorState, SupervisorStep,
};
