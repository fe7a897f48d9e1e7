use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rebirth::build::{BuildBackend, BuildTarget};
use rebirth::errors::{RebirthError, Result};
use rebirth::exec::BoxFuture;

/// Script written as the "built" program: stays alive until killed.
pub const LONG_RUNNING_SCRIPT: &str = "#!/bin/sh\nexec sleep 30\n";

/// A fake build backend that:
/// - records every target it was asked to build
/// - optionally waits, to simulate a slow compiler
/// - writes an executable shell script to the output path, or
/// - fails with the configured compiler diagnostics.
///
/// Clones share state, so a test can keep one and hand the other to the
/// supervisor.
#[derive(Clone)]
pub struct FakeBuildBackend {
    script: Arc<Mutex<String>>,
    failure: Arc<Mutex<Option<(Option<i32>, String)>>>,
    builds: Arc<Mutex<Vec<BuildTarget>>>,
    delay: Arc<Mutex<Duration>>,
    skip_output: Arc<AtomicBool>,
}

impl FakeBuildBackend {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(LONG_RUNNING_SCRIPT.to_string())),
            failure: Arc::new(Mutex::new(None)),
            builds: Arc::new(Mutex::new(Vec::new())),
            delay: Arc::new(Mutex::new(Duration::ZERO)),
            skip_output: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_script(self, script: &str) -> Self {
        *self.script.lock().unwrap() = script.to_string();
        self
    }

    /// Make every following build fail like the compiler would.
    pub fn fail_with(&self, status: i32, stderr: &str) {
        *self.failure.lock().unwrap() = Some((Some(status), stderr.to_string()));
    }

    pub fn succeed(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Make every following build take `delay` before finishing.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Report success without writing a program, so starting it fails.
    pub fn skip_output(&self) {
        self.skip_output.store(true, Ordering::SeqCst);
    }

    pub fn builds(&self) -> Vec<BuildTarget> {
        self.builds.lock().unwrap().clone()
    }
}

impl Default for FakeBuildBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildBackend for FakeBuildBackend {
    fn build<'a>(&'a self, target: &'a BuildTarget) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.builds.lock().unwrap().push(target.clone());

            let delay = *self.delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            if let Some((status, stderr)) = self.failure.lock().unwrap().clone() {
                return Err(RebirthError::BuildFailed { status, stderr });
            }

            if self.skip_output.load(Ordering::SeqCst) {
                return Ok(());
            }
            let script = self.script.lock().unwrap().clone();
            write_executable(&target.output, &script)?;
            Ok(())
        })
    }
}

/// Replace `path` with an executable file holding `contents`.
pub fn write_executable(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    std::fs::write(path, contents)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}
