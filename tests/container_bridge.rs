use std::sync::Arc;

use rebirth::bridge::ContainerBridge;
use rebirth::errors::RebirthError;
use rebirth::exec::{container::chomp, DockerCli};
use rebirth::fs::mock::MockFileSystem;
use rebirth::session::PidFile;
use rebirth::types::RelaySignal;
use rebirth_test_utils::fake_container::FakeContainerExec;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn strings(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn reload_becomes_kill_hup() -> TestResult {
    let exec = FakeContainerExec::new();
    let bridge = ContainerBridge::new(Arc::new(exec.clone()));

    bridge.relay_signal("app", 4242, RelaySignal::Reload).await?;

    let calls = exec.output_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].container, "app");
    assert_eq!(calls[0].command, strings(&["kill", "-HUP", "4242"]));
    Ok(())
}

#[tokio::test]
async fn quit_becomes_kill_quit() -> TestResult {
    let exec = FakeContainerExec::new();
    let bridge = ContainerBridge::new(Arc::new(exec.clone()));

    bridge.relay_signal("app", 99, RelaySignal::Quit).await?;

    assert_eq!(exec.kill_commands(), vec![strings(&["kill", "-QUIT", "99"])]);
    Ok(())
}

#[tokio::test]
async fn pid_is_read_from_the_pid_file_on_every_relay() -> TestResult {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/work/.rebirth/server.pid", "100");
    let pid_file = PidFile::new("/work/.rebirth/server.pid", fs.clone());
    let exec = FakeContainerExec::new();
    let bridge = ContainerBridge::new(Arc::new(exec.clone()));

    assert_eq!(bridge.relay_to_recorded("app", &pid_file, RelaySignal::Reload).await?, 100);
    // The container-side supervisor restarted and recorded a new PID.
    fs.add_file("/work/.rebirth/server.pid", "200");
    assert_eq!(bridge.relay_to_recorded("app", &pid_file, RelaySignal::Reload).await?, 200);

    assert_eq!(
        exec.kill_commands(),
        vec![
            strings(&["kill", "-HUP", "100"]),
            strings(&["kill", "-HUP", "200"]),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn unreachable_container_is_an_error() {
    let exec = FakeContainerExec::new();
    exec.set_unreachable(true);
    let bridge = ContainerBridge::new(Arc::new(exec));

    let err = bridge
        .relay_signal("gone", 1, RelaySignal::Reload)
        .await
        .unwrap_err();

    assert!(matches!(err, RebirthError::ContainerExec { .. }), "{err:?}");
}

#[tokio::test]
async fn missing_pid_file_sends_nothing() {
    let fs = Arc::new(MockFileSystem::new());
    let pid_file = PidFile::new("/work/.rebirth/server.pid", fs);
    let exec = FakeContainerExec::new();
    let bridge = ContainerBridge::new(Arc::new(exec.clone()));

    assert!(bridge.relay_to_recorded("app", &pid_file, RelaySignal::Quit).await.is_err());
    assert!(exec.kill_commands().is_empty());
}

#[test]
fn docker_exec_arguments() {
    let cmd = strings(&["go", "env", "GOOS"]);

    assert_eq!(
        DockerCli::new(None).exec_args("app", &cmd),
        strings(&["exec", "app", "go", "env", "GOOS"])
    );
    assert_eq!(
        DockerCli::new(Some("/go/src/app".to_string())).exec_args("app", &cmd),
        strings(&["exec", "-w", "/go/src/app", "app", "go", "env", "GOOS"])
    );
}

#[test]
fn container_output_is_chomped() {
    assert_eq!(chomp("linux\n"), "linux");
    assert_eq!(chomp("amd64\n\n"), "amd64");
    assert_eq!(chomp("  spaced "), "  spaced ");
}

#[test]
fn relay_signal_names() {
    assert_eq!(RelaySignal::Reload.kill_name(), "HUP");
    assert_eq!(RelaySignal::Quit.kill_name(), "QUIT");
    assert_eq!("reload".parse::<RelaySignal>(), Ok(RelaySignal::Reload));
    assert_eq!("QUIT".parse::<RelaySignal>(), Ok(RelaySignal::Quit));
    assert!("term".parse::<RelaySignal>().is_err());
}
