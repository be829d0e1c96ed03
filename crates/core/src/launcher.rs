use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Child, Command, ExitStatus};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared handle to the process started by [`launch`], so an interrupt
/// handler on another thread can terminate it.
#[derive(Debug, Clone, Default)]
pub struct ChildSlot {
    inner: Arc<Mutex<Option<Child>>>,
}

impl ChildSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Child>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, child: Child) {
        *self.lock() = Some(child);
    }

    #[cfg(all(test, unix))]
    fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    /// Kills and reaps the tracked process, if any.
    pub fn kill(&self) {
        if let Some(mut child) = self.lock().take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn poll(&self) -> Result<Option<ExitStatus>> {
        let mut guard = self.lock();
        let Some(child) = guard.as_mut() else {
            anyhow::bail!("The launched process was terminated");
        };
        let status = child
            .try_wait()
            .context("Could not query the launched process")?;
        if status.is_some() {
            guard.take();
        }
        Ok(status)
    }
}

/// Opens `path` with the platform's default handler and blocks until the
/// handler process exits or is killed through `slot`.
///
/// Only the opener process is tracked. `cmd /C start /WAIT` and `open -W`
/// wait for the application, but `xdg-open` usually returns as soon as it
/// has handed the file over, so on Linux and the BSDs this returns early and
/// an interrupt has nothing left to kill.
pub fn launch(path: &Path, slot: &ChildSlot) -> Result<ExitStatus> {
    let mut command = opener_command(path);
    debug!(?command, "launching");
    let child = command
        .spawn()
        .with_context(|| format!("Could not open '{}'", path.display()))?;
    slot.set(child);
    wait(slot)
}

fn wait(slot: &ChildSlot) -> Result<ExitStatus> {
    loop {
        if let Some(status) = slot.poll()? {
            return Ok(status);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(target_os = "windows")]
fn opener_command(path: &Path) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", "/WAIT", ""]).arg(path);
    command
}

#[cfg(target_os = "macos")]
fn opener_command(path: &Path) -> Command {
    let mut command = Command::new("open");
    command.arg("-W").arg(path);
    command
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn opener_command(path: &Path) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(path);
    command
}
