use rebirth::exec::ProcessExit;
use rebirth::supervisor::{
    ReloadOutcome, ReloadTrigger, SupervisorCommand, SupervisorCore, SupervisorEvent,
    SupervisorState,
};

#[test]
fn starts_initializing_then_runs() {
    let mut core = SupervisorCore::new();
    assert_eq!(core.state(), SupervisorState::Initializing);

    core.mark_running();
    assert_eq!(core.state(), SupervisorState::Running);
}

#[test]
fn reload_request_puts_a_reload_in_flight() {
    let mut core = SupervisorCore::new();
    core.mark_running();

    let step = core.step(SupervisorEvent::ReloadRequested(ReloadTrigger::HangUp));

    assert_eq!(step.commands, vec![SupervisorCommand::Reload(ReloadTrigger::HangUp)]);
    assert!(step.keep_running);
    assert_eq!(core.state(), SupervisorState::ReloadInFlight);

    core.reload_finished();
    assert_eq!(core.state(), SupervisorState::Running);
}

#[test]
fn shutdown_is_final() {
    let mut core = SupervisorCore::new();
    core.mark_running();
    core.step(SupervisorEvent::ReloadRequested(ReloadTrigger::FileWatch));

    let step = core.step(SupervisorEvent::ShutdownRequested);
    assert_eq!(step.commands, vec![SupervisorCommand::Shutdown]);
    assert!(!step.keep_running);
    assert_eq!(core.state(), SupervisorState::ShuttingDown);

    // Nothing leaves ShuttingDown.
    core.reload_finished();
    core.mark_running();
    let step = core.step(SupervisorEvent::ReloadRequested(ReloadTrigger::FileWatch));
    assert!(step.commands.is_empty());
    assert!(!step.keep_running);
    assert_eq!(core.state(), SupervisorState::ShuttingDown);
}

#[test]
fn unexpected_exit_forgets_that_generation() {
    let mut core = SupervisorCore::new();
    core.mark_running();

    let step = core.step(SupervisorEvent::ProcessExited(ProcessExit {
        generation: 3,
        pid: 1234,
        code: Some(1),
    }));

    assert_eq!(step.commands, vec![SupervisorCommand::ForgetProcess { generation: 3 }]);
    assert!(step.keep_running);
    assert_eq!(core.state(), SupervisorState::Running);
}

#[test]
fn only_restart_and_relay_count_as_success() {
    assert!(ReloadOutcome::Restarted { pid: 1, generation: 1 }.is_success());
    assert!(ReloadOutcome::Relayed { pid: 1 }.is_success());
    assert!(!ReloadOutcome::ArtifactMissing.is_success());
    assert!(!ReloadOutcome::BuildFailed { message: String::new() }.is_success());
    assert!(!ReloadOutcome::StartFailed { message: String::new() }.is_success());
    assert!(!ReloadOutcome::RelayFailed { message: String::new() }.is_success());
}
